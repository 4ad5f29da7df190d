//! Fixed set of top-level project configuration sections

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A top-level section of the project configuration.
///
/// [`VariableSchema::AllVariables`] is not a section itself; it addresses the
/// whole document at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableSchema {
    AllVariables,
    ConfigVersion,
    Datasources,
    ExpectationsStoreName,
    ValidationsStoreName,
    EvaluationParameterStoreName,
    CheckpointStoreName,
    ProfilerStoreName,
    PluginsDirectory,
    Stores,
    DataDocsSites,
    Notebooks,
    ConfigVariablesFilePath,
    AnonymousUsageStatistics,
    Concurrency,
    ProgressBars,
}

impl VariableSchema {
    /// Every member, including [`VariableSchema::AllVariables`].
    pub const ALL: [VariableSchema; 16] = [
        Self::AllVariables,
        Self::ConfigVersion,
        Self::Datasources,
        Self::ExpectationsStoreName,
        Self::ValidationsStoreName,
        Self::EvaluationParameterStoreName,
        Self::CheckpointStoreName,
        Self::ProfilerStoreName,
        Self::PluginsDirectory,
        Self::Stores,
        Self::DataDocsSites,
        Self::Notebooks,
        Self::ConfigVariablesFilePath,
        Self::AnonymousUsageStatistics,
        Self::Concurrency,
        Self::ProgressBars,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllVariables => "data_context_variables",
            Self::ConfigVersion => "config_version",
            Self::Datasources => "datasources",
            Self::ExpectationsStoreName => "expectations_store_name",
            Self::ValidationsStoreName => "validations_store_name",
            Self::EvaluationParameterStoreName => "evaluation_parameter_store_name",
            Self::CheckpointStoreName => "checkpoint_store_name",
            Self::ProfilerStoreName => "profiler_store_name",
            Self::PluginsDirectory => "plugins_directory",
            Self::Stores => "stores",
            Self::DataDocsSites => "data_docs_sites",
            Self::Notebooks => "notebooks",
            Self::ConfigVariablesFilePath => "config_variables_file_path",
            Self::AnonymousUsageStatistics => "anonymous_usage_statistics",
            Self::Concurrency => "concurrency",
            Self::ProgressBars => "progress_bars",
        }
    }

    /// Members that name an actual section of the document.
    pub fn sections() -> impl Iterator<Item = VariableSchema> {
        Self::ALL.into_iter().filter(|s| s.is_section())
    }

    pub fn is_section(&self) -> bool {
        *self != Self::AllVariables
    }

    /// Sections whose value is a name-keyed mapping.
    pub fn is_named_collection(&self) -> bool {
        matches!(self, Self::Datasources | Self::Stores | Self::DataDocsSites)
    }
}

impl FromStr for VariableSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|member| member.as_str() == s)
            .ok_or_else(|| Error::InvalidKey {
                key: s.to_string(),
                message: "not a recognized configuration section".to_string(),
            })
    }
}

impl fmt::Display for VariableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
