//! Configuration loading and validation for the image-encryptor binary.
//!
//! Values are read from `IMAGE_ENCRYPTOR_*` environment variables at startup;
//! every field has a default, so an empty environment is valid.

use anyhow::{Context, Result};
use common::ContainerEncoding;
use envelope::{EnvelopeOptions, NonceLength};
use serde::Deserialize;

/// Prefix of every environment variable this binary reads.
pub const ENV_PREFIX: &str = "IMAGE_ENCRYPTOR";

/// Validated image-encryptor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Nonce length for new containers: `12` or `16`.
    #[serde(default)]
    pub nonce_length: NonceLength,

    /// Encoding of binary container fields: `base64` or `legacy`.
    #[serde(default)]
    pub encoding: ContainerEncoding,

    /// Upper bound on files processed at the same time.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Seal inputs whose content type is not `image/*`.
    #[serde(default)]
    pub accept_any_type: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_max_concurrency() -> usize {
    4
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build image-encryptor configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise image-encryptor configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Envelope settings derived from this configuration.
    pub fn envelope_options(&self) -> EnvelopeOptions {
        EnvelopeOptions {
            nonce_length: self.nonce_length,
            encoding: self.encoding,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("{ENV_PREFIX}_LOG_LEVEL must not be empty");
        }
        if self.max_concurrency == 0 {
            anyhow::bail!("{ENV_PREFIX}_MAX_CONCURRENCY must be > 0");
        }
        Ok(())
    }
}
