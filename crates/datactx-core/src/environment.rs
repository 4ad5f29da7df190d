//! Explicit view of the process environment and global configuration
//!
//! Core logic never reads `std::env` directly. A [`Environment`] is handed to
//! the context at construction, which keeps tests deterministic.

use crate::Result;
use crate::substitution::Substitutions;
use datactx_fs::{ConfigStore, NormalizedPath};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;

/// Opt-out flag for usage statistics.
pub const USAGE_STATS_ENV: &str = "DATACTX_USAGE_STATS";

/// Override for the context identity.
pub const DATA_CONTEXT_ID_ENV: &str = "DATACTX_DATA_CONTEXT_ID";

/// Override for the usage statistics endpoint.
pub const USAGE_STATISTICS_URL_ENV: &str = "DATACTX_USAGE_STATISTICS_URL";

/// Values of [`USAGE_STATS_ENV`] that opt out of usage statistics.
pub const FALSEY_STRINGS: [&str; 6] = ["FALSE", "false", "False", "f", "F", "0"];

/// File name of the global configuration inside the global config directory.
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(BTreeMap<String, String>),
}

/// Source of environment variables and global configuration for a context.
#[derive(Debug, Clone)]
pub struct Environment {
    source: EnvSource,
    global_config_dir: Option<NormalizedPath>,
}

/// `[anonymous_usage_statistics]` table of the global config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalUsageStatistics {
    pub enabled: Option<bool>,
    pub data_context_id: Option<String>,
    pub usage_statistics_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalConfig {
    #[serde(default)]
    anonymous_usage_statistics: GlobalUsageStatistics,
}

impl Environment {
    /// Live view of the process environment and the user's config directory.
    pub fn process() -> Self {
        Self {
            source: EnvSource::Process,
            global_config_dir: dirs::config_dir().map(|dir| NormalizedPath::new(dir.join("datactx"))),
        }
    }

    /// A fixed set of variables with no global config directory.
    pub fn fixed<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            source: EnvSource::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            global_config_dir: None,
        }
    }

    /// An environment with no variables at all.
    pub fn empty() -> Self {
        Self::fixed(Vec::<(String, String)>::new())
    }

    /// Add or replace a variable. A process environment is snapshotted first.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut vars = self.vars();
        vars.insert(name.into(), value.into());
        self.source = EnvSource::Fixed(vars);
        self
    }

    /// Override the global config directory (useful for testing).
    pub fn with_global_config_dir(mut self, dir: impl Into<NormalizedPath>) -> Self {
        self.global_config_dir = Some(dir.into());
        self
    }

    /// Ignore any global config file.
    pub fn without_global_config(mut self) -> Self {
        self.global_config_dir = None;
        self
    }

    pub fn global_config_dir(&self) -> Option<&NormalizedPath> {
        self.global_config_dir.as_ref()
    }

    /// Look up one variable. Empty values count as unset.
    pub fn var(&self, name: &str) -> Option<String> {
        let value = match &self.source {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// All variables, read fresh for a process environment.
    pub fn vars(&self) -> BTreeMap<String, String> {
        match &self.source {
            EnvSource::Process => unicode_vars(std::env::vars_os()),
            EnvSource::Fixed(vars) => vars.clone(),
        }
    }

    /// Variables as substitution values.
    pub fn substitutions(&self) -> Substitutions {
        self.vars()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    }

    /// Read the `[anonymous_usage_statistics]` table of the global config file.
    ///
    /// A missing directory or file yields an empty table.
    pub fn global_usage_statistics(&self) -> Result<GlobalUsageStatistics> {
        let Some(dir) = &self.global_config_dir else {
            return Ok(GlobalUsageStatistics::default());
        };
        let config: Option<GlobalConfig> = ConfigStore::new().load_optional(&dir.join(GLOBAL_CONFIG_FILE))?;
        Ok(config.unwrap_or_default().anonymous_usage_statistics)
    }

    /// Whether usage statistics are disabled by environment or global config.
    pub fn usage_statistics_opted_out(&self) -> bool {
        if let Some(flag) = self.var(USAGE_STATS_ENV) {
            if FALSEY_STRINGS.contains(&flag.as_str()) {
                return true;
            }
            tracing::warn!(
                "{} environment variable must be one of: {:?}",
                USAGE_STATS_ENV,
                FALSEY_STRINGS
            );
        }

        match self.global_usage_statistics() {
            Ok(global) => global.enabled == Some(false),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unreadable global config");
                false
            }
        }
    }

    /// Global context identity override, environment first.
    pub fn data_context_id_override(&self) -> Option<String> {
        self.var(DATA_CONTEXT_ID_ENV).or_else(|| {
            self.global_usage_statistics()
                .ok()
                .and_then(|g| g.data_context_id)
                .filter(|v| !v.is_empty())
        })
    }

    /// Global usage statistics URL override, environment first.
    pub fn usage_statistics_url_override(&self) -> Option<String> {
        self.var(USAGE_STATISTICS_URL_ENV).or_else(|| {
            self.global_usage_statistics()
                .ok()
                .and_then(|g| g.usage_statistics_url)
                .filter(|v| !v.is_empty())
        })
    }
}

// Non-UTF-8 names or values cannot appear in a substitution, so they are skipped.
fn unicode_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> BTreeMap<String, String> {
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (name, _) => {
                tracing::debug!(variable = ?name, "Skipping environment variable that is not valid UTF-8");
                None
            }
        })
        .collect()
}

impl Default for Environment {
    fn default() -> Self {
        Self::process()
    }
}
