pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::cli::PythonEnvRuntime;
pub use core::{engine::StackEngine, pipeline::LocalStackPipeline};
pub use utils::error::{Result, StackError};
