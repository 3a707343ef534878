// src/config.rs

//! Environment-variable-driven configuration for all three services,
//! loaded through the `config` crate's `Environment` source and validated
//! before use.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Integ,
    Staging,
    Test,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Test
    }
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_workers() -> usize {
    4
}

fn validate_common(
    http_host: &str,
    http_port: u16,
    http_workers: usize,
) -> Result<()> {
    if http_host.is_empty() {
        return Err(anyhow!("HTTP_HOST must not be empty"));
    }
    if http_port == 0 {
        return Err(anyhow!("HTTP_PORT must be a nonzero port number"));
    }
    if http_workers == 0 {
        return Err(anyhow!("HTTP_WORKERS must be at least 1"));
    }
    Ok(())
}

/// Configuration for the artifact puller binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullerConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    pub http_port: u16,
    #[serde(default = "default_http_workers")]
    pub http_workers: usize,
    pub master_url: String,
    pub remote_model_directory: String,
    pub local_model_directory: PathBuf,
    pub temporary_model_download_directory: PathBuf,
    #[serde(with = "humantime_serde")]
    pub remote_model_pull_frequency: Duration,
    pub gcs_bucket: String,
    pub gcs_access_token: String,
}

impl PullerConfig {
    pub fn from_env() -> Result<Self> {
        let cfg: PullerConfig = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("loading puller configuration from environment")?
            .try_deserialize()
            .context("deserializing puller configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(&self.http_host, self.http_port, self.http_workers)?;
        if self.master_url.is_empty() {
            return Err(anyhow!("MASTER_URL must not be empty"));
        }
        if self.remote_model_directory.is_empty() {
            return Err(anyhow!("REMOTE_MODEL_DIRECTORY must not be empty"));
        }
        Ok(())
    }
}

/// Configuration for the serving-config synchronizer binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchronizerConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    pub http_port: u16,
    #[serde(default = "default_http_workers")]
    pub http_workers: usize,
    pub master_url: String,
    pub local_model_directory: PathBuf,
    pub tensorflow_serving_config_file: PathBuf,
    pub tensorflow_serving_grpc_target: String,
    #[serde(with = "humantime_serde")]
    pub config_update_frequency: Duration,
}

impl SynchronizerConfig {
    pub fn from_env() -> Result<Self> {
        let cfg: SynchronizerConfig = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("loading synchronizer configuration from environment")?
            .try_deserialize()
            .context("deserializing synchronizer configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(&self.http_host, self.http_port, self.http_workers)?;
        if self.master_url.is_empty() {
            return Err(anyhow!("MASTER_URL must not be empty"));
        }
        if self.tensorflow_serving_grpc_target.is_empty() {
            return Err(anyhow!("TENSORFLOW_SERVING_GRPC_TARGET must not be empty"));
        }
        Ok(())
    }
}

/// Configuration for the coordinator binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    pub http_port: u16,
    #[serde(default = "default_http_workers")]
    pub http_workers: usize,
    pub remote_model_directory: String,
    pub gcs_bucket: String,
    pub gcs_access_token: String,
    /// Directory the two registry cache files are persisted under.
    #[serde(default = "default_registry_cache_dir")]
    pub registry_cache_dir: PathBuf,
}

fn default_registry_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

impl CoordinatorConfig {
    pub fn from_env() -> Result<Self> {
        let cfg: CoordinatorConfig = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("loading coordinator configuration from environment")?
            .try_deserialize()
            .context("deserializing coordinator configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        validate_common(&self.http_host, self.http_port, self.http_workers)?;
        if self.remote_model_directory.is_empty() {
            return Err(anyhow!("REMOTE_MODEL_DIRECTORY must not be empty"));
        }
        Ok(())
    }
}
