//! Model client factory.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::domain::models::{Config, TurnSignal};
use crate::domain::ports::{ModelClient, ModelTurn};
use crate::infrastructure::model::http_api::HttpModelClient;
use crate::infrastructure::model::mock::MockModelClient;
use crate::infrastructure::model::retry::RetryPolicy;

/// Builds a model client from the configured provider.
pub struct ModelClientFactory;

impl ModelClientFactory {
    /// Create the configured client, or a scripted stand-in when
    /// `force_mock` is set (the `--mock` dry-run flag).
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or when the HTTP client
    /// cannot be constructed.
    pub fn create(config: &Config, force_mock: bool) -> Result<Arc<dyn ModelClient>> {
        if force_mock || config.model.provider == "mock" {
            return Ok(Arc::new(Self::dry_run_client()));
        }

        match config.model.provider.as_str() {
            "http" => {
                let retry = RetryPolicy::from_config(&config.retry);
                let client = HttpModelClient::new(&config.model, retry)
                    .context("failed to build HTTP model client")?;
                Ok(Arc::new(client))
            }
            other => bail!("unknown model provider: {other}"),
        }
    }

    /// Mock client that answers every agent, so a dry run exercises the
    /// full wiring without a network call.
    fn dry_run_client() -> MockModelClient {
        MockModelClient::new().with_default_turn(ModelTurn::message(
            "Dry run reply; no model is configured.",
            TurnSignal::Done,
        ))
    }
}
