use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
}

/// Fold Portuguese diacritics to ASCII. Other non-ASCII characters are dropped.
fn fold_to_ascii(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        c if c.is_ascii() => c,
        _ => return None,
    };
    Some(folded)
}

/// Normalise a raw report header: "Estado - Sigla" -> "estado_sigla"
pub fn normalize_column_name(raw: &str) -> String {
    let ascii: String = raw
        .trim()
        .replace('\u{feff}', "")
        .chars()
        .filter_map(fold_to_ascii)
        .collect();
    let lowered = ascii.trim().to_lowercase().replace('-', "");
    WHITESPACE_RUN.replace_all(&lowered, "_").into_owned()
}

pub fn normalize_column_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter().map(|name| normalize_column_name(name.as_ref())).collect()
}
