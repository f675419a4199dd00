//! Layered run configuration.
//!
//! Values are resolved in order: built-in defaults, an optional TOML/YAML/JSON
//! file, then `SOLAR_ATLAS__<SECTION>__<KEY>` environment variables. CLI flags
//! are applied on top by the command layer.

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::error::Result;
use crate::models::BoundingBox;
use crate::readers::acquisition::{Identifier, TempAverage};
use crate::utils::constants::*;
use crate::writers::SyncMode;

const ENV_PREFIX: &str = "SOLAR_ATLAS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub bbox: BoundingBox,
    #[validate(nested)]
    pub filter: FilterSettings,
    #[validate(nested)]
    pub acquisition: AcquisitionSettings,
    #[validate(nested)]
    pub geocoder: GeocoderSettings,
    pub output: OutputSettings,
    #[validate(nested)]
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FilterSettings {
    pub missing_sentinel: f64,
    /// Categorical columns removed before filtering.
    pub drop_columns: Vec<String>,
    #[validate(length(min = 1))]
    pub value_column: String,
    /// Metadata lines before the CSV header.
    pub skip_rows: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            missing_sentinel: MISSING_SENTINEL,
            drop_columns: vec![PARAMETER_COLUMN.to_string()],
            value_column: ANNUAL_COLUMN.to_string(),
            skip_rows: CSV_METADATA_ROWS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AcquisitionSettings {
    #[validate(length(min = 1))]
    pub endpoint: String,
    #[validate(length(min = 1))]
    pub parameters: Vec<String>,
    pub identifier: Identifier,
    pub temp_average: TempAverage,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            endpoint: POWER_ENDPOINT.to_string(),
            parameters: vec![DEFAULT_PARAMETERS.to_string()],
            identifier: Identifier::Global,
            temp_average: TempAverage::Climatology,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GeocoderSettings {
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub user_agent: String,
    /// Sent as `accept-language` when set.
    pub language: Option<String>,
    pub min_interval_ms: u64,
    #[validate(range(min = 1))]
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: NOMINATIM_REVERSE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: None,
            min_interval_ms: GEOCODE_MIN_INTERVAL_MS,
            max_attempts: GEOCODE_MAX_ATTEMPTS,
            retry_delay_secs: GEOCODE_RETRY_DELAY_SECS,
            timeout_secs: GEOCODE_TIMEOUT_SECS,
        }
    }
}

impl GeocoderSettings {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: PathBuf,
    /// Skip coordinates already present in `path` instead of re-geocoding them.
    pub resume: bool,
    pub sync: SyncMode,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            resume: false,
            sync: SyncMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    #[validate(length(min = 1))]
    pub table: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_FILE),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("filter.drop_columns")
                .with_list_parse_key("acquisition.parameters"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
