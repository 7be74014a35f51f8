use crate::error::{DashboardError, Result};
use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Longest revenue/expense chart a config may ask for.
pub const MAX_TRAILING_MONTHS: u32 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default = "default_cache_ttl_seconds")]
    #[schemars(description = "How long a computed dashboard snapshot stays in the cache")]
    pub cache_ttl_seconds: i64,

    #[serde(default = "default_trailing_months")]
    #[schemars(description = "Number of months in the revenue/expense chart, current month included")]
    pub trailing_months: u32,

    #[serde(default = "default_upcoming_window_days")]
    #[schemars(description = "Unpaid expenses due within this many days from today are upcoming bills")]
    pub upcoming_window_days: u64,

    #[serde(default)]
    #[schemars(description = "Keep at most this many upcoming bills (soonest first). Unlimited when absent.")]
    pub upcoming_bills_limit: Option<usize>,

    #[serde(default = "default_other_category_label")]
    #[schemars(description = "Chart bucket for paid expenses without a category")]
    pub other_category_label: String,

    #[serde(default = "default_unlisted_category_key")]
    pub unlisted_category_key: String,

    #[serde(default = "default_unlisted_category_label")]
    pub unlisted_category_label: String,
}

fn default_cache_ttl_seconds() -> i64 {
    300
}

fn default_trailing_months() -> u32 {
    6
}

fn default_upcoming_window_days() -> u64 {
    30
}

fn default_other_category_label() -> String {
    "Other".to_string()
}

fn default_unlisted_category_key() -> String {
    "unlisted".to_string()
}

fn default_unlisted_category_label() -> String {
    "Not budgeted".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl_seconds(),
            trailing_months: default_trailing_months(),
            upcoming_window_days: default_upcoming_window_days(),
            upcoming_bills_limit: None,
            other_category_label: default_other_category_label(),
            unlisted_category_key: default_unlisted_category_key(),
            unlisted_category_label: default_unlisted_category_label(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_seconds <= 0 {
            return Err(DashboardError::InvalidInput(format!(
                "cacheTtlSeconds must be positive, got {}",
                self.cache_ttl_seconds
            )));
        }
        if Duration::try_seconds(self.cache_ttl_seconds).is_none() {
            return Err(DashboardError::InvalidInput(format!(
                "cacheTtlSeconds {} is out of range",
                self.cache_ttl_seconds
            )));
        }
        if self.trailing_months == 0 || self.trailing_months > MAX_TRAILING_MONTHS {
            return Err(DashboardError::InvalidInput(format!(
                "trailingMonths must be between 1 and {}, got {}",
                MAX_TRAILING_MONTHS, self.trailing_months
            )));
        }
        if self.unlisted_category_key.trim().is_empty() {
            return Err(DashboardError::InvalidInput(
                "unlistedCategoryKey must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Saturates instead of panicking for a value `validate` would reject.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_seconds(self.cache_ttl_seconds).unwrap_or(Duration::MAX)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(EngineConfig))
    }
}
