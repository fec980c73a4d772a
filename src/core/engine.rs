use crate::core::{Result, StackOutcome, StackPipeline};
use crate::utils::monitor::SystemMonitor;

pub struct StackEngine<P: StackPipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: StackPipeline> StackEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<StackOutcome> {
        println!("Starting stack launch...");
        self.monitor.log_stats("Launch started");

        // Provision
        println!("Provisioning environments...");
        let provision = self.pipeline.provision().await?;
        for report in &provision {
            println!(
                "  {}: {}",
                report.service,
                if report.created {
                    "environment created"
                } else if report.installed {
                    "dependencies re-installed"
                } else {
                    "already present, skipped"
                }
            );
        }
        self.monitor.log_stats("Provisioning complete");

        // Backend
        println!("Starting backend...");
        let backend = self.pipeline.start_backend().await?;
        if let Some(pid) = backend.report.pid {
            self.monitor.track_child(pid, &backend.report.service);
        }
        println!("Backend running (pid {:?})", backend.report.pid);
        self.monitor.log_stats("Backend ready");

        // Frontend，前景執行直到結束
        println!("Starting frontend...");
        let mut outcome = self.pipeline.run_frontend(backend).await?;
        outcome.provision = provision;

        println!("Frontend exited with code {:?}", outcome.exit_code);
        self.monitor.log_final_stats();

        Ok(outcome)
    }
}
