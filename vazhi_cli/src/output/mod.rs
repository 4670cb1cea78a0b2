use crate::cli::OutputFormat;
use crate::commands::Result;
use serde::Serialize;
use vazhi_core::classify::{Language, Topic};
use vazhi_core::config::RouterConfig;
use vazhi_core::pipeline::{
    AnswerResult, DigestResult, FactCheckResult, PapersResult, RetrievalResult,
};
use vazhi_core::registry::BindingInfo;

mod pretty;
pub use pretty::render;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutputData {
    Answer(AnswerResult<Topic>),
    MultilingualAnswer(AnswerResult<Language>),
    Retrieval(RetrievalResult<Topic>),
    Digest(DigestResult),
    FactCheck(FactCheckResult),
    Papers(PapersResult),
    Bindings {
        default_topic: String,
        default_language: String,
        topics: Vec<BindingInfo>,
        languages: Vec<BindingInfo>,
    },
    ConfigInfo {
        path: String,
        exists: bool,
        config: RouterConfig,
    },
}

pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Pretty => {
            print!("{}", render(data)?);
        }
    }
    Ok(())
}
