//! Filesystem abstraction for datactx projects
//!
//! Provides normalized path handling, locked atomic writes and a
//! format-agnostic loader/saver for the project's YAML, JSON and TOML documents.

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use constants::ProjectPath;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, validate_path_segment};
