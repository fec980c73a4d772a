pub mod cli;
pub mod sequence_config;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{ReadinessSpec, ServiceSpec};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "small-stack")]
#[command(about = "A small launcher for local backend/frontend stacks")]
pub struct CliConfig {
    #[arg(long, default_value = "./backend")]
    pub backend_dir: String,

    #[arg(long, default_value = "./frontend")]
    pub frontend_dir: String,

    #[arg(long, default_value = ".venv")]
    pub env_dir_name: String,

    #[arg(long, default_value = "requirements.txt")]
    pub manifest_name: String,

    #[arg(long, default_value = "python server.py")]
    pub backend_command: String,

    #[arg(long, default_value = "python app.py")]
    pub frontend_command: String,

    #[arg(long, default_value = "http://127.0.0.1:8000/health")]
    pub backend_health: String,

    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub frontend_url: String,

    #[arg(long, default_value = "30")]
    pub readiness_timeout_seconds: u64,

    #[arg(long, default_value = "250")]
    pub readiness_interval_ms: u64,

    #[arg(long, default_value = "python3")]
    pub python: String,

    #[arg(long, help = "Re-run dependency installation even if the environment exists")]
    pub force_provision: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    fn service_spec(
        &self,
        name: &str,
        dir: &str,
        command: &str,
        url: Option<String>,
        readiness: ReadinessSpec,
    ) -> ServiceSpec {
        let workdir = PathBuf::from(dir);
        ServiceSpec {
            name: name.to_string(),
            env_dir: workdir.join(&self.env_dir_name),
            manifest: workdir.join(&self.manifest_name),
            workdir,
            command: command.split_whitespace().map(String::from).collect(),
            env: HashMap::new(),
            url,
            readiness,
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("backend_dir", &self.backend_dir)?;
        validation::validate_path("frontend_dir", &self.frontend_dir)?;
        validation::validate_non_empty_string("env_dir_name", &self.env_dir_name)?;
        validation::validate_non_empty_string("manifest_name", &self.manifest_name)?;
        validation::validate_non_empty_string("backend_command", &self.backend_command)?;
        validation::validate_non_empty_string("frontend_command", &self.frontend_command)?;
        validation::validate_url("backend_health", &self.backend_health)?;
        validation::validate_url("frontend_url", &self.frontend_url)?;
        validation::validate_range("readiness_timeout_seconds", self.readiness_timeout_seconds, 1, 600)?;
        validation::validate_range("readiness_interval_ms", self.readiness_interval_ms, 10, 60_000)?;
        validation::validate_non_empty_string("python", &self.python)?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn backend_spec(&self) -> ServiceSpec {
        self.service_spec(
            "backend",
            &self.backend_dir,
            &self.backend_command,
            None,
            ReadinessSpec::Http {
                url: self.backend_health.clone(),
                timeout: Duration::from_secs(self.readiness_timeout_seconds),
                interval: Duration::from_millis(self.readiness_interval_ms),
            },
        )
    }

    fn frontend_spec(&self) -> ServiceSpec {
        self.service_spec(
            "frontend",
            &self.frontend_dir,
            &self.frontend_command,
            Some(self.frontend_url.clone()),
            ReadinessSpec::None,
        )
    }

    fn python_binary(&self) -> &str {
        &self.python
    }

    fn force_provision(&self) -> bool {
        self.force_provision
    }
}
