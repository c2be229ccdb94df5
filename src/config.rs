use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::delay::Pacing;
use crate::domain::Coordinate;
use crate::error::BackupError;
use crate::locator::{NEAREST_URL, REQUEST_TIMEOUT};
use crate::retry::{BACKOFF_STEP, MAX_RETRY, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "toko-backup.json";
pub const SMOKE_TEST_CODE: &str = "FWCL";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub input: Option<Utf8PathBuf>,
    #[serde(default)]
    pub snapshot: Option<Utf8PathBuf>,
    #[serde(default)]
    pub token_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub smoke_test_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retry: Option<u32>,
    #[serde(default)]
    pub backoff_step_ms: Option<u64>,
    #[serde(default)]
    pub pacing_min_ms: Option<u64>,
    #[serde(default)]
    pub pacing_max_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input: Option<Utf8PathBuf>,
    pub snapshot: Option<Utf8PathBuf>,
    pub token_file: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: Utf8PathBuf,
    pub snapshot: Utf8PathBuf,
    pub token_file: Utf8PathBuf,
    pub endpoint: String,
    pub smoke_test_code: String,
    pub coordinate: Coordinate,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, BackupError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if config_path.as_std_path().exists() {
            let content = fs::read_to_string(config_path.as_std_path())
                .map_err(|_| BackupError::ConfigRead(config_path.clone().into_std_path_buf()))?;
            serde_json::from_str(&content).map_err(|err| BackupError::ConfigParse(err.to_string()))?
        } else if path.is_some() {
            return Err(BackupError::MissingConfig(config_path.into_std_path_buf()));
        } else {
            Config::default()
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, BackupError> {
        let pacing_min_ms = config.pacing_min_ms.unwrap_or(Pacing::DEFAULT_MIN_MS);
        let pacing_max_ms = config.pacing_max_ms.unwrap_or(Pacing::DEFAULT_MAX_MS);
        if pacing_min_ms > pacing_max_ms {
            return Err(BackupError::InvalidConfig(format!(
                "pacing_min_ms ({pacing_min_ms}) exceeds pacing_max_ms ({pacing_max_ms})"
            )));
        }

        let coordinate = Coordinate::new(
            config.latitude.unwrap_or(Coordinate::REFERENCE.latitude),
            config.longitude.unwrap_or(Coordinate::REFERENCE.longitude),
        );
        if !coordinate.latitude.is_finite() || !coordinate.longitude.is_finite() {
            return Err(BackupError::InvalidConfig(
                "latitude and longitude must be finite".to_string(),
            ));
        }

        let smoke_test_code = config
            .smoke_test_code
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| SMOKE_TEST_CODE.to_string());

        Ok(ResolvedConfig {
            input: overrides
                .input
                .or(config.input)
                .unwrap_or_else(|| Utf8PathBuf::from("toko.txt")),
            snapshot: overrides
                .snapshot
                .or(config.snapshot)
                .unwrap_or_else(|| Utf8PathBuf::from("toko.json")),
            token_file: overrides
                .token_file
                .or(config.token_file)
                .unwrap_or_else(|| Utf8PathBuf::from("token.txt")),
            endpoint: config.endpoint.unwrap_or_else(|| NEAREST_URL.to_string()),
            smoke_test_code,
            coordinate,
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(REQUEST_TIMEOUT),
            retry: RetryPolicy {
                max_retry: config.max_retry.unwrap_or(MAX_RETRY),
                backoff_step: config
                    .backoff_step_ms
                    .map(Duration::from_millis)
                    .unwrap_or(BACKOFF_STEP),
            },
            pacing: Pacing::new(pacing_min_ms, pacing_max_ms),
        })
    }
}
