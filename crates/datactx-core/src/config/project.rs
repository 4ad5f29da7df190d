//! The project configuration document

use super::VariableSchema;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Config version written by new projects.
pub const CURRENT_CONFIG_VERSION: f64 = 3.0;

pub const DEFAULT_EXPECTATIONS_STORE_NAME: &str = "expectations_store";
pub const DEFAULT_VALIDATIONS_STORE_NAME: &str = "validations_store";
pub const DEFAULT_EVALUATION_PARAMETER_STORE_NAME: &str = "evaluation_parameter_store";
pub const DEFAULT_CHECKPOINT_STORE_NAME: &str = "checkpoint_store";
pub const DEFAULT_PROFILER_STORE_NAME: &str = "profiler_store";

/// Project configuration keyed by [`VariableSchema`] section.
///
/// Only schema sections may appear at the top level. Section values are kept
/// as raw JSON-like values so `${VAR}` placeholders survive until read time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    sections: Map<String, Value>,
}

/// `anonymous_usage_statistics` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatisticsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_statistics_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for UsageStatisticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_context_id: Some(uuid::Uuid::new_v4().to_string()),
            usage_statistics_url: None,
        }
    }
}

/// `concurrency` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// `progress_bars` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressBarsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub globally: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profilers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_calculations: Option<bool>,
}

pub(crate) fn filesystem_store(class_name: &str, base_directory: &str, suppress_id: bool) -> Value {
    let mut backend = json!({
        "class_name": "FilesystemStoreBackend",
        "base_directory": base_directory,
    });
    if suppress_id {
        backend["suppress_store_backend_id"] = Value::Bool(true);
    }
    json!({"class_name": class_name, "store_backend": backend})
}

fn in_memory_store(class_name: &str) -> Value {
    json!({"class_name": class_name, "store_backend": {"class_name": "InMemoryStoreBackend"}})
}

impl ProjectConfig {
    /// Validate a raw document and fill in the sections every context needs.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(sections) = value else {
            return Err(Error::configuration(
                "project configuration must be a mapping of section names",
            ));
        };

        for key in sections.keys() {
            let section: VariableSchema = key
                .parse()
                .map_err(|_| Error::configuration(format!("unknown top-level key `{key}`")))?;
            if !section.is_section() {
                return Err(Error::configuration(format!(
                    "`{key}` addresses the whole document and cannot be a section"
                )));
            }
        }

        let mut config = Self { sections };
        config.fill_required_sections();
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    /// Defaults for a project on disk: filesystem stores under the root.
    pub fn filesystem_defaults() -> Self {
        let value = json!({
            "config_version": CURRENT_CONFIG_VERSION,
            "datasources": {},
            "config_variables_file_path": datactx_fs::ProjectPath::ConfigVariablesFile.as_str(),
            "plugins_directory": "plugins/",
            "stores": {
                DEFAULT_EXPECTATIONS_STORE_NAME: filesystem_store("ExpectationsStore", "expectations/", false),
                DEFAULT_VALIDATIONS_STORE_NAME: filesystem_store("ValidationsStore", "uncommitted/validations/", false),
                DEFAULT_EVALUATION_PARAMETER_STORE_NAME: {"class_name": "EvaluationParameterStore"},
                DEFAULT_CHECKPOINT_STORE_NAME: filesystem_store("CheckpointStore", "checkpoints/", true),
                DEFAULT_PROFILER_STORE_NAME: filesystem_store("ProfilerStore", "profilers/", true),
            },
            "expectations_store_name": DEFAULT_EXPECTATIONS_STORE_NAME,
            "validations_store_name": DEFAULT_VALIDATIONS_STORE_NAME,
            "evaluation_parameter_store_name": DEFAULT_EVALUATION_PARAMETER_STORE_NAME,
            "checkpoint_store_name": DEFAULT_CHECKPOINT_STORE_NAME,
            "profiler_store_name": DEFAULT_PROFILER_STORE_NAME,
            "data_docs_sites": {},
        });
        let mut config = Self {
            sections: value.as_object().cloned().unwrap_or_default(),
        };
        config.fill_required_sections();
        config
    }

    /// Defaults for a process-only project: every store lives in memory.
    pub fn in_memory_defaults() -> Self {
        let value = json!({
            "config_version": CURRENT_CONFIG_VERSION,
            "datasources": {},
            "stores": {
                DEFAULT_EXPECTATIONS_STORE_NAME: in_memory_store("ExpectationsStore"),
                DEFAULT_VALIDATIONS_STORE_NAME: in_memory_store("ValidationsStore"),
                DEFAULT_EVALUATION_PARAMETER_STORE_NAME: in_memory_store("EvaluationParameterStore"),
                DEFAULT_CHECKPOINT_STORE_NAME: in_memory_store("CheckpointStore"),
                DEFAULT_PROFILER_STORE_NAME: in_memory_store("ProfilerStore"),
            },
            "expectations_store_name": DEFAULT_EXPECTATIONS_STORE_NAME,
            "validations_store_name": DEFAULT_VALIDATIONS_STORE_NAME,
            "evaluation_parameter_store_name": DEFAULT_EVALUATION_PARAMETER_STORE_NAME,
            "checkpoint_store_name": DEFAULT_CHECKPOINT_STORE_NAME,
            "profiler_store_name": DEFAULT_PROFILER_STORE_NAME,
        });
        let mut config = Self {
            sections: value.as_object().cloned().unwrap_or_default(),
        };
        config.fill_required_sections();
        config
    }

    // Checkpoint and profiler store names are not filled: their
    // absence drives legacy directory discovery.
    fn fill_required_sections(&mut self) {
        let defaults = [
            (VariableSchema::ConfigVersion, json!(CURRENT_CONFIG_VERSION)),
            (VariableSchema::Datasources, json!({})),
            (
                VariableSchema::Stores,
                json!({
                    DEFAULT_EXPECTATIONS_STORE_NAME: in_memory_store("ExpectationsStore"),
                    DEFAULT_VALIDATIONS_STORE_NAME: in_memory_store("ValidationsStore"),
                    DEFAULT_EVALUATION_PARAMETER_STORE_NAME: in_memory_store("EvaluationParameterStore"),
                }),
            ),
            (VariableSchema::ExpectationsStoreName, json!(DEFAULT_EXPECTATIONS_STORE_NAME)),
            (VariableSchema::ValidationsStoreName, json!(DEFAULT_VALIDATIONS_STORE_NAME)),
            (
                VariableSchema::EvaluationParameterStoreName,
                json!(DEFAULT_EVALUATION_PARAMETER_STORE_NAME),
            ),
        ];
        // An empty YAML key such as `datasources:` reads as null.
        for (section, value) in defaults {
            let entry = self.sections.entry(section.as_str()).or_insert(Value::Null);
            if entry.is_null() {
                *entry = value;
            }
        }

        let usage = self
            .sections
            .entry(VariableSchema::AnonymousUsageStatistics.as_str())
            .or_insert(Value::Null);
        if usage.is_null() {
            *usage = json!({});
        }
        if let Value::Object(usage) = usage {
            usage.entry("enabled").or_insert(Value::Bool(true));
            let has_id = usage
                .get("data_context_id")
                .is_some_and(|id| id.as_str().is_some_and(|s| !s.is_empty()));
            if !has_id {
                usage.insert(
                    "data_context_id".to_string(),
                    Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
        }
    }

    pub fn get(&self, section: VariableSchema) -> Option<&Value> {
        self.sections.get(section.as_str()).filter(|v| !v.is_null())
    }

    pub fn contains(&self, section: VariableSchema) -> bool {
        self.get(section).is_some()
    }

    /// Replace a whole section.
    pub fn set(&mut self, section: VariableSchema, value: Value) -> Result<()> {
        if !section.is_section() {
            return Err(Error::InvalidKey {
                key: section.to_string(),
                message: "the whole document cannot be assigned as a section".to_string(),
            });
        }
        self.sections.insert(section.as_str().to_string(), value);
        Ok(())
    }

    /// Remove a section, returning its previous value.
    pub fn remove(&mut self, section: VariableSchema) -> Option<Value> {
        self.sections.shift_remove(section.as_str())
    }

    /// Mutable access to a name-keyed section, creating it when absent.
    pub fn section_map_mut(&mut self, section: VariableSchema) -> Result<&mut Map<String, Value>> {
        let entry = self
            .sections
            .entry(section.as_str())
            .or_insert_with(|| Value::Object(Map::new()));
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        entry
            .as_object_mut()
            .ok_or_else(|| Error::backend(format!("section `{section}` is not a mapping")))
    }

    pub fn section_map(&self, section: VariableSchema) -> Option<&Map<String, Value>> {
        self.get(section).and_then(Value::as_object)
    }

    /// Names of the sections present in the document.
    pub fn section_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.sections.clone())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.sections)?)
    }

    /// Deserialize a section into a typed value. Absent sections yield `None`.
    pub fn typed<T: DeserializeOwned>(&self, section: VariableSchema) -> Result<Option<T>> {
        self.get(section)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(|e| Error::configuration(format!("invalid `{section}` section: {e}")))
    }

    pub fn str_value(&self, section: VariableSchema) -> Option<&str> {
        self.get(section).and_then(Value::as_str)
    }

    pub fn expectations_store_name(&self) -> Option<&str> {
        self.str_value(VariableSchema::ExpectationsStoreName)
    }

    pub fn validations_store_name(&self) -> Option<&str> {
        self.str_value(VariableSchema::ValidationsStoreName)
    }

    pub fn evaluation_parameter_store_name(&self) -> Option<&str> {
        self.str_value(VariableSchema::EvaluationParameterStoreName)
    }

    pub fn stores(&self) -> Option<&Map<String, Value>> {
        self.section_map(VariableSchema::Stores)
    }

    pub fn datasources(&self) -> Option<&Map<String, Value>> {
        self.section_map(VariableSchema::Datasources)
    }

    pub fn anonymous_usage_statistics(&self) -> Result<UsageStatisticsConfig> {
        Ok(self
            .typed(VariableSchema::AnonymousUsageStatistics)?
            .unwrap_or_default())
    }

    /// Write the typed usage fields, keeping any other keys in the section.
    pub fn set_anonymous_usage_statistics(&mut self, usage: &UsageStatisticsConfig) -> Result<()> {
        let section = self.section_map_mut(VariableSchema::AnonymousUsageStatistics)?;
        section.insert("enabled".to_string(), Value::Bool(usage.enabled));
        for (field, value) in [
            ("data_context_id", &usage.data_context_id),
            ("usage_statistics_url", &usage.usage_statistics_url),
        ] {
            match value {
                Some(value) => {
                    section.insert(field.to_string(), Value::String(value.clone()));
                }
                None => {
                    section.shift_remove(field);
                }
            }
        }
        Ok(())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::in_memory_defaults()
    }
}

impl Serialize for ProjectConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.sections.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProjectConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_unknown_top_level_keys() {
        let err = ProjectConfig::from_value(json!({"not_a_section": 1})).unwrap_err();
        assert!(err.to_string().contains("not_a_section"));

        let err = ProjectConfig::from_value(json!({"data_context_variables": {}})).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn rejects_non_mapping_documents() {
        assert!(ProjectConfig::from_value(json!(["datasources"])).is_err());
    }

    #[test]
    fn fills_required_sections_but_not_legacy_store_names() {
        let config = ProjectConfig::from_value(json!({"config_version": 3.0})).unwrap();
        assert_eq!(config.expectations_store_name(), Some(DEFAULT_EXPECTATIONS_STORE_NAME));
        assert!(config.datasources().unwrap().is_empty());
        assert!(!config.contains(VariableSchema::CheckpointStoreName));
        assert!(!config.contains(VariableSchema::ProfilerStoreName));

        let usage = config.anonymous_usage_statistics().unwrap();
        assert!(usage.enabled);
        assert!(usage.data_context_id.is_some());
    }

    #[test]
    fn empty_sections_are_filled() {
        let config = ProjectConfig::from_yaml_str(
            "config_version: 3.0\ndatasources:\nstores:\nanonymous_usage_statistics:\n",
        )
        .unwrap();
        assert!(config.datasources().unwrap().is_empty());
        assert!(config.stores().unwrap().contains_key(DEFAULT_EXPECTATIONS_STORE_NAME));
        assert!(config.anonymous_usage_statistics().unwrap().data_context_id.is_some());
    }

    #[test]
    fn usage_update_keeps_unknown_keys() {
        let mut config = ProjectConfig::from_value(json!({
            "anonymous_usage_statistics": {"enabled": true, "data_context_id": "abc", "team": "analytics"}
        }))
        .unwrap();
        let mut usage = config.anonymous_usage_statistics().unwrap();
        usage.enabled = false;
        usage.usage_statistics_url = Some("https://stats.example.invalid".to_string());
        config.set_anonymous_usage_statistics(&usage).unwrap();

        assert_eq!(
            config.get(VariableSchema::AnonymousUsageStatistics).unwrap(),
            &json!({
                "enabled": false,
                "data_context_id": "abc",
                "team": "analytics",
                "usage_statistics_url": "https://stats.example.invalid"
            })
        );
    }

    #[test]
    fn keeps_existing_data_context_id() {
        let config = ProjectConfig::from_value(json!({
            "anonymous_usage_statistics": {"enabled": false, "data_context_id": "abc"}
        }))
        .unwrap();
        let usage = config.anonymous_usage_statistics().unwrap();
        assert!(!usage.enabled);
        assert_eq!(usage.data_context_id.as_deref(), Some("abc"));
    }

    #[test]
    fn yaml_round_trip_preserves_placeholders() {
        let yaml = "config_version: 3.0\ndatasources:\n  db:\n    class_name: SimpleSqlDatasource\n    connection_string: ${DB_URL}\n";
        let config = ProjectConfig::from_yaml_str(yaml).unwrap();
        let reparsed = ProjectConfig::from_yaml_str(&config.to_yaml_string().unwrap()).unwrap();
        assert_eq!(reparsed, config);
        assert_eq!(
            config.datasources().unwrap()["db"]["connection_string"],
            json!("${DB_URL}")
        );
    }

    #[test]
    fn section_map_mut_refuses_scalars() {
        let mut config = ProjectConfig::default();
        config.set(VariableSchema::Notebooks, json!("scalar")).unwrap();
        assert!(config.section_map_mut(VariableSchema::Notebooks).is_err());
        assert!(config.section_map_mut(VariableSchema::DataDocsSites).unwrap().is_empty());
    }

    #[test]
    fn typed_sections() {
        let mut config = ProjectConfig::default();
        config
            .set(VariableSchema::Concurrency, json!({"enabled": true}))
            .unwrap();
        let concurrency: ConcurrencyConfig = config.typed(VariableSchema::Concurrency).unwrap().unwrap();
        assert!(concurrency.enabled);
        assert_eq!(config.typed::<ProgressBarsConfig>(VariableSchema::ProgressBars).unwrap(), None);
    }
}
