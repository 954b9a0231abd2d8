//! Prompt Templates
//!
//! Deterministic prompts for query synthesis and query repair. Both embed the
//! live schema snapshot and the extracted question hints.

use crate::config::DomainColumns;
use crate::dataset::SchemaSnapshot;
use crate::error_classifier::classify;
use crate::params::QuestionParams;

/// One literal row of the prepared dataset, shown to the model as a shape hint
const SAMPLE_ROW: &str = "\
regiao_sigla | estado_sigla | municipio | revenda    | cnpj_da_revenda | bairro     | produto  | data_da_coleta | valor_de_venda | valor_de_compra | unidade_de_medida | bandeira  | regiao
SE           | SP           | GUARULHOS | AUTO POSTO | 49051667000102  | BONSUCESSO | GASOLINA | 2004-05-11     | 1.967          | 1.6623          | R$ / litro        | PETROBRAS | Sudeste";

/// Everything a prompt needs besides the question
pub struct PromptContext<'a> {
    pub table_name: &'a str,
    pub schema: &'a SchemaSnapshot,
    pub params: &'a QuestionParams,
    pub columns: &'a DomainColumns,
}

pub fn build_synthesis_prompt(question: &str, ctx: &PromptContext<'_>) -> String {
    let date = &ctx.columns.date_column;
    let product = &ctx.columns.product_column;
    let table = ctx.table_name;

    format!(
        r#"Gere APENAS uma query SQL válida para: '{question}'

TABELA: {table}
COLUNAS: {schema}
PARÂMETROS IDENTIFICADOS: {params}

REGRAS ABSOLUTAS:
1. Retorne SOMENTE a query SQL
2. Sem explicações, sem texto adicional
3. Use apenas estas colunas
4. Para extrair ano: EXTRACT(YEAR FROM {date}) = X
5. Para gasolina: WHERE {product} = 'GASOLINA' (valores de {product} são sempre MAIÚSCULOS)
6. Quando usar AVG(), COUNT(), SUM() com outras colunas, ADICIONE GROUP BY

EXEMPLOS CORRETOS:
- "preço em 2014": SELECT AVG(valor_de_venda) FROM {table} WHERE {product} = 'GASOLINA' AND EXTRACT(YEAR FROM {date}) = 2014
- "preço em São Paulo": SELECT AVG(valor_de_venda) FROM {table} WHERE {product} = 'GASOLINA' AND estado_sigla = 'SP'

EXEMPLO DOS DADOS:
{sample}

Gere a query SQL:"#,
        schema = ctx.schema,
        params = ctx.params.to_prompt_json(),
        sample = SAMPLE_ROW,
    )
}

pub fn build_repair_prompt(question: &str, failed_sql: &str, error: &str, ctx: &PromptContext<'_>) -> String {
    let date = &ctx.columns.date_column;
    let product = &ctx.columns.product_column;
    let hint = classify(error)
        .hint(ctx.table_name)
        .map(|h| format!("DICA: {}\n", h))
        .unwrap_or_default();

    format!(
        r#"A query SQL falhou: {failed_sql}
ERRO: {error}
{hint}
TABELA: {table}
COLUNAS VÁLIDAS: {schema}
PARÂMETROS IDENTIFICADOS: {params}

REGRAS ESTRITAS:
1. Use EXTRACT(YEAR FROM {date}) = X para anos
2. Para gasolina: WHERE {product} = 'GASOLINA'
3. Retorne APENAS a query SQL sem explicações
4. Use somente as colunas válidas

Corrija a query para: '{question}'"#,
        table = ctx.table_name,
        schema = ctx.schema,
        params = ctx.params.to_prompt_json(),
    )
}
