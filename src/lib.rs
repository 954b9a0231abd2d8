pub mod assistant;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod error_classifier;
pub mod formatter;
pub mod llm;
pub mod params;
pub mod prepare;
pub mod prompts;
pub mod repl;
pub mod sanitizer;
pub mod session;
