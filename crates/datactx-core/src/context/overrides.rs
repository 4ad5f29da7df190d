//! Environment-level overrides of usage statistics settings

use crate::Result;
use crate::config::ProjectConfig;
use crate::environment::Environment;
use serde_json::{Map, json};

/// Copy of `config` with global usage statistics overrides applied.
///
/// Invalid override values are reported together in one warning and
/// otherwise ignored.
pub(crate) fn apply_global_config_overrides(config: &ProjectConfig, env: &Environment) -> Result<ProjectConfig> {
    let mut config = config.clone();
    let mut usage = config.anonymous_usage_statistics()?;
    let mut validation_errors = Map::new();

    if env.usage_statistics_opted_out() {
        tracing::info!("Usage statistics is disabled globally. Applying override to project config.");
        usage.enabled = false;
    }

    if let Some(id) = env.data_context_id_override() {
        if uuid::Uuid::parse_str(&id).is_ok() {
            tracing::info!("data_context_id is defined globally. Applying override to project config.");
            usage.data_context_id = Some(id);
        } else {
            validation_errors.insert("data_context_id".to_string(), json!(["Not a valid UUID."]));
        }
    }

    if let Some(url) = env.usage_statistics_url_override() {
        let valid = url::Url::parse(&url).is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"));
        if valid {
            tracing::info!("usage_statistics_url is defined globally. Applying override to project config.");
            usage.usage_statistics_url = Some(url);
        } else {
            validation_errors.insert("usage_statistics_url".to_string(), json!(["Not a valid URL."]));
        }
    }

    if !validation_errors.is_empty() {
        tracing::warn!(
            "The following globally-defined config variables failed validation:\n{}\n\n\
             Please fix the variables if you would like to apply global values to the project config.",
            serde_json::to_string_pretty(&validation_errors)?
        );
    }

    config.set_anonymous_usage_statistics(&usage)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{DATA_CONTEXT_ID_ENV, USAGE_STATISTICS_URL_ENV, USAGE_STATS_ENV};
    use pretty_assertions::assert_eq;

    const ID: &str = "6a52bdfa-e182-455b-a825-e69f076e67d6";

    #[test]
    fn opt_out_disables_usage_statistics() {
        let env = Environment::fixed([(USAGE_STATS_ENV, "False")]);
        let config = apply_global_config_overrides(&ProjectConfig::default(), &env).unwrap();
        assert!(!config.anonymous_usage_statistics().unwrap().enabled);
    }

    #[test]
    fn valid_overrides_apply() {
        let env = Environment::fixed([
            (DATA_CONTEXT_ID_ENV, ID),
            (USAGE_STATISTICS_URL_ENV, "https://stats.example.invalid/v1"),
        ]);
        let usage = apply_global_config_overrides(&ProjectConfig::default(), &env)
            .unwrap()
            .anonymous_usage_statistics()
            .unwrap();
        assert_eq!(usage.data_context_id.as_deref(), Some(ID));
        assert_eq!(
            usage.usage_statistics_url.as_deref(),
            Some("https://stats.example.invalid/v1")
        );
        assert!(usage.enabled);
    }

    #[test]
    fn overrides_keep_extra_usage_keys() {
        let original = ProjectConfig::from_value(serde_json::json!({
            "anonymous_usage_statistics": {"enabled": true, "data_context_id": ID, "contact": "ops@example.invalid"}
        }))
        .unwrap();
        let env = Environment::fixed([(USAGE_STATS_ENV, "0")]);
        let overridden = apply_global_config_overrides(&original, &env).unwrap();
        let section = overridden
            .section_map(crate::config::VariableSchema::AnonymousUsageStatistics)
            .unwrap();
        assert_eq!(section["contact"], serde_json::json!("ops@example.invalid"));
        assert_eq!(section["enabled"], serde_json::json!(false));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let original = ProjectConfig::default();
        let env = Environment::fixed([
            (DATA_CONTEXT_ID_ENV, "not-a-uuid"),
            (USAGE_STATISTICS_URL_ENV, "ftp://stats"),
        ]);
        let overridden = apply_global_config_overrides(&original, &env).unwrap();
        assert_eq!(
            overridden.anonymous_usage_statistics().unwrap(),
            original.anonymous_usage_statistics().unwrap()
        );
    }
}
