//! Backend adapter implementations for anvil.
//!
//! Each adapter translates between the normalized message model in
//! `anvil-core` and one provider's wire format. All provider-specific field
//! names are confined to the adapter that owns them.

pub mod anthropic;
pub mod openai_compat;

use std::sync::Arc;

use anvil_config::AppConfig;
use anvil_core::{Backend, Error};

pub use anthropic::AnthropicBackend;
pub use openai_compat::OpenAiCompatBackend;

/// Build the configured backend.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Backend>, Error> {
    match config.backend.as_str() {
        "anthropic" => {
            let api_key = config.anthropic.api_key.clone().ok_or_else(|| {
                Error::Config("anthropic backend selected but no API key configured".into())
            })?;
            Ok(Arc::new(
                AnthropicBackend::new(api_key, &config.anthropic.model, config.max_tokens)
                    .with_base_url(&config.anthropic.base_url),
            ))
        }
        "local" => Ok(Arc::new(OpenAiCompatBackend::new(
            "llama.cpp",
            &config.local.base_url,
            &config.local.api_key,
            &config.local.model,
            config.max_tokens,
        ))),
        other => Err(Error::Config(format!("unknown backend '{other}'"))),
    }
}
