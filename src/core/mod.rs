pub mod engine;
pub mod pipeline;
pub mod provision;
pub mod readiness;
pub mod sequence;

pub use crate::domain::model::{
    LaunchReport, ProvisionReport, ReadinessSpec, ServiceHandle, ServiceSpec, StackOutcome,
};
pub use crate::domain::ports::{ConfigProvider, EnvRuntime, StackPipeline};
pub use crate::utils::error::Result;
