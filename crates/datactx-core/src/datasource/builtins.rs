//! Built-in datasource types

use super::{Datasource, DatasourceContext};
use crate::{Error, Result};
use datactx_fs::NormalizedPath;
use serde_json::{Map, Value, json};

/// Datasource driven by an execution engine.
#[derive(Debug)]
pub struct ExecutionEngineDatasource {
    name: String,
    execution_engine: String,
    data_connectors: Vec<String>,
    data_context_root_directory: Option<NormalizedPath>,
    config: Map<String, Value>,
}

impl ExecutionEngineDatasource {
    pub const CLASS_NAME: &'static str = "Datasource";

    pub fn from_config(name: &str, config: &Map<String, Value>, ctx: &DatasourceContext) -> Result<Self> {
        let engine = config
            .get("execution_engine")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::configuration("`execution_engine` must be a mapping"))?;
        let execution_engine = engine
            .get("class_name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::configuration("`execution_engine` requires a `class_name`"))?
            .to_string();

        let data_connectors = match config.get("data_connectors") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(connectors)) => connectors.keys().cloned().collect(),
            Some(_) => return Err(Error::configuration("`data_connectors` must be a mapping")),
        };

        let mut config = config.clone();
        config.insert("name".to_string(), json!(name));

        Ok(Self {
            name: name.to_string(),
            execution_engine,
            data_connectors,
            data_context_root_directory: config
                .get("data_context_root_directory")
                .and_then(Value::as_str)
                .map(NormalizedPath::new)
                .or_else(|| ctx.root_directory.clone()),
            config,
        })
    }

    pub fn execution_engine(&self) -> &str {
        &self.execution_engine
    }

    pub fn data_connectors(&self) -> &[String] {
        &self.data_connectors
    }

    pub fn data_context_root_directory(&self) -> Option<&NormalizedPath> {
        self.data_context_root_directory.as_ref()
    }
}

impl Datasource for ExecutionEngineDatasource {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn config(&self) -> &Map<String, Value> {
        &self.config
    }
}

/// SQL datasource reached through a connection string or credentials.
#[derive(Debug)]
pub struct SqlDatasource {
    name: String,
    connection_string: Option<String>,
    config: Map<String, Value>,
}

impl SqlDatasource {
    pub const CLASS_NAME: &'static str = "SimpleSqlDatasource";

    /// Normalise a stored config: default introspection and tables.
    pub fn build_configuration(mut config: Map<String, Value>) -> Result<Map<String, Value>> {
        if !config.contains_key("connection_string") && !config.contains_key("credentials") {
            return Err(Error::configuration(
                "SimpleSqlDatasource requires `connection_string` or `credentials`",
            ));
        }
        config
            .entry("introspection")
            .or_insert_with(|| json!({"whole_table": {}}));
        config.entry("tables").or_insert_with(|| json!({}));
        Ok(config)
    }

    pub fn from_config(name: &str, config: &Map<String, Value>) -> Result<Self> {
        let connection_string = match config.get("connection_string") {
            Some(Value::String(url)) => {
                if !url.contains("://") {
                    return Err(Error::configuration(format!(
                        "invalid connection string for `{name}`"
                    )));
                }
                Some(url.clone())
            }
            Some(_) => return Err(Error::configuration("`connection_string` must be a string")),
            None => None,
        };
        if connection_string.is_none() {
            match config.get("credentials") {
                Some(Value::Object(_)) => {}
                _ => {
                    return Err(Error::configuration(
                        "SimpleSqlDatasource requires `connection_string` or a `credentials` mapping",
                    ));
                }
            }
        }

        let mut config = config.clone();
        config.insert("name".to_string(), json!(name));
        Ok(Self {
            name: name.to_string(),
            connection_string,
            config,
        })
    }

    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }
}

impl Datasource for SqlDatasource {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn config(&self) -> &Map<String, Value> {
        &self.config
    }
}
