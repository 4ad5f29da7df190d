//! Core orchestration layer for datactx
//!
//! This crate owns everything a data context needs between the filesystem
//! layer and the CLI:
//!
//! - **Project configuration**: the `datactx.yml` schema, shared document and defaults
//! - **Substitution**: `${VAR}` resolution over config variables, environment and runtime values
//! - **Stores**: a backend contract with in-memory, filesystem, inline and cloud implementations
//! - **DataContext**: construction, datasource lifecycle, suites and evaluation parameters
//!
//! # Architecture
//!
//! ```text
//!                 datactx-cli
//!                      |
//!                 datactx-core
//!        +--------+----+----+-----------+
//!        |        |         |           |
//!     config    store   datasource   context
//!        |        |
//!        +-- datactx-fs --+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use datactx_core::{ContextOptions, DataContext};
//!
//! fn example() -> datactx_core::Result<()> {
//!     let mut ctx = DataContext::create("my_project", ContextOptions::default())?;
//!     ctx.save_config_variable("DB_PASSWORD", "secret")?;
//!     for store in ctx.list_active_stores()? {
//!         println!("{store}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod datasource;
pub mod environment;
pub mod error;
pub mod masking;
pub mod metrics;
pub mod store;
pub mod substitution;
pub mod suite;
pub mod usage;
pub mod validation;
pub mod variables;

pub use config::{ConfigDocument, ProjectConfig, UsageStatisticsConfig, VariableSchema};
pub use context::{ContextOptions, DATASOURCE_STORE_NAME, DataContext};
pub use datasource::{Datasource, DatasourceContext, DatasourceRegistry};
pub use environment::Environment;
pub use error::{Error, Result};
pub use masking::{mask_credentials, mask_url_password};
pub use metrics::{EvaluationParameterDependencies, MetricRequest, ValidationMetricIdentifier};
pub use store::{Store, StoreBackend, StoreKey, StoreKind, StoreRegistry};
pub use substitution::{Substitutions, substitute_config};
pub use suite::{ExpectationConfiguration, ExpectationSuite};
pub use usage::UsageStatisticsHandler;
pub use validation::{RunIdentifier, ValidationResult};
pub use variables::{DataContextVariables, VariablesBackend};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_key_lookup_displays_key() {
        let error = Error::key_lookup(StoreKey::new(["datasources", "events"]));
        let display = error.to_string();
        assert!(
            display.contains("(datasources, events)"),
            "Error display should contain the key, got: {display}"
        );
    }
}
