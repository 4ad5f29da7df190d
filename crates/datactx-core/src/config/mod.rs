//! Project configuration: schema, document and sharing

mod document;
mod project;
mod schema;

pub use document::{ConfigDocument, DocumentSink, FileSink, NullSink};
pub use project::{
    CURRENT_CONFIG_VERSION, ConcurrencyConfig, DEFAULT_CHECKPOINT_STORE_NAME,
    DEFAULT_EVALUATION_PARAMETER_STORE_NAME, DEFAULT_EXPECTATIONS_STORE_NAME,
    DEFAULT_PROFILER_STORE_NAME, DEFAULT_VALIDATIONS_STORE_NAME, ProgressBarsConfig,
    ProjectConfig, UsageStatisticsConfig,
};
pub use schema::VariableSchema;

pub(crate) use project::filesystem_store;
