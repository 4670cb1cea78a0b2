//! The generative backend and the prompts sent to it.

pub mod openai;
pub mod prompts;

pub use openai::OpenAiGenerator;

use crate::error::GenerationError;
use crate::GeneratorHandle;
use std::time::Duration;
use tokio::time::timeout;

/// Run one generation under `timeout_ms`.
pub async fn generate_with_timeout(
    generator: &GeneratorHandle,
    prompt: &str,
    timeout_ms: u64,
) -> Result<String, GenerationError> {
    match timeout(Duration::from_millis(timeout_ms), generator.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(timeout_ms)),
    }
}
