use crate::core::pipeline::spawn_service;
use crate::core::provision::ensure_env;
use crate::core::readiness;
use crate::core::{EnvRuntime, ProvisionReport, Result, ServiceHandle, ServiceSpec};
use crate::domain::model::LaunchReport;
use crate::utils::error::StackError;
use crate::utils::monitor::SystemMonitor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 啟動上下文，在服務之間傳遞已啟動服務的資訊
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub reports: Vec<LaunchReport>,
    pub shared_data: HashMap<String, serde_json::Value>,
    pub execution_id: String,
}

impl LaunchContext {
    pub fn new(execution_id: String) -> Self {
        Self {
            reports: Vec::new(),
            shared_data: HashMap::new(),
            execution_id,
        }
    }

    /// 獲取上一個啟動的服務報告
    pub fn get_previous_report(&self) -> Option<&LaunchReport> {
        self.reports.last()
    }

    /// 獲取指定名稱的服務報告
    pub fn get_report_by_name(&self, name: &str) -> Option<&LaunchReport> {
        self.reports.iter().find(|r| r.service == name)
    }

    pub fn add_report(&mut self, report: LaunchReport) {
        self.reports.push(report);
    }

    pub fn add_shared_data(&mut self, key: String, value: serde_json::Value) {
        self.shared_data.insert(key, value);
    }

    pub fn get_shared_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.shared_data.get(key)
    }
}

/// 序列中的一個受管服務
#[async_trait::async_trait]
pub trait ManagedService: Send + Sync {
    fn name(&self) -> &str;

    /// 根據上下文決定是否啟動
    fn should_launch(&self, _ctx: &LaunchContext) -> bool {
        true
    }

    async fn provision(&self) -> Result<ProvisionReport>;

    async fn start(&self, ctx: &LaunchContext) -> Result<ServiceHandle>;

    async fn await_ready(&self, handle: &mut ServiceHandle) -> Result<Option<Duration>>;
}

/// 以 ServiceSpec 描述的受管服務，佈建與就緒都走標準流程
pub struct SpecService<E: EnvRuntime> {
    spec: ServiceSpec,
    runtime: Arc<E>,
    client: reqwest::Client,
    force: bool,
    enabled: bool,
}

impl<E: EnvRuntime> SpecService<E> {
    pub fn new(spec: ServiceSpec, runtime: Arc<E>, force: bool) -> Self {
        Self {
            spec,
            runtime,
            client: reqwest::Client::new(),
            force,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[async_trait::async_trait]
impl<E: EnvRuntime + 'static> ManagedService for SpecService<E> {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn should_launch(&self, _ctx: &LaunchContext) -> bool {
        self.enabled
    }

    async fn provision(&self) -> Result<ProvisionReport> {
        ensure_env(self.runtime.as_ref(), &self.spec, self.force).await
    }

    async fn start(&self, _ctx: &LaunchContext) -> Result<ServiceHandle> {
        spawn_service(self.runtime.as_ref(), &self.spec)
    }

    async fn await_ready(&self, handle: &mut ServiceHandle) -> Result<Option<Duration>> {
        readiness::wait_until_ready(
            &self.client,
            &self.spec.name,
            &self.spec.readiness,
            &mut handle.child,
        )
        .await
    }
}

/// 服務序列：依宣告順序啟動，每個服務就緒後才輪到下一個
pub struct ServiceSequence {
    services: Vec<Box<dyn ManagedService>>,
    monitor: Option<SystemMonitor>,
    monitor_enabled: bool,
    execution_id: String,
}

impl ServiceSequence {
    pub fn new(execution_id: String) -> Self {
        Self {
            services: Vec::new(),
            monitor: None,
            monitor_enabled: false,
            execution_id,
        }
    }

    /// 啟用或禁用系統監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        if enabled {
            self.monitor = Some(SystemMonitor::new(enabled));
        }
        self
    }

    pub fn add_service(&mut self, service: Box<dyn ManagedService>) {
        self.services.push(service);
    }

    /// 依序佈建並啟動所有服務。任何一步失敗都會把已啟動的服務
    /// 反向關閉後回報錯誤，後面的服務不會啟動。
    pub async fn execute_all(&mut self) -> Result<(Vec<ServiceHandle>, LaunchContext)> {
        let mut context = LaunchContext::new(self.execution_id.clone());
        let mut handles: Vec<ServiceHandle> = Vec::new();

        if self.monitor_enabled {
            if let Some(monitor) = &self.monitor {
                monitor.log_stats("Sequence launch started");
            }
        }

        for service in &self.services {
            if !service.should_launch(&context) {
                tracing::info!(
                    "⏭️ Skipping service: {} (condition not met)",
                    service.name()
                );
                continue;
            }

            tracing::info!("📦 Provisioning service: {}", service.name());
            if let Err(e) = self.launch_one(service.as_ref(), &mut context, &mut handles).await {
                shutdown_all(&mut handles).await;
                return Err(e);
            }

            if let Some(monitor) = &self.monitor {
                monitor.log_stats(&format!("'{}' ready", service.name()));
            }
        }

        Ok((handles, context))
    }

    async fn launch_one(
        &self,
        service: &dyn ManagedService,
        context: &mut LaunchContext,
        handles: &mut Vec<ServiceHandle>,
    ) -> Result<()> {
        let provision = service.provision().await?;
        tracing::info!(
            "📦 '{}' environment {}",
            service.name(),
            if provision.created {
                "created"
            } else {
                "already present"
            }
        );

        let mut handle = service.start(context).await?;
        let ready_after = service.await_ready(&mut handle).await?;
        handle.report.ready_after = ready_after;

        if let Some(monitor) = &self.monitor {
            if let Some(pid) = handle.report.pid {
                monitor.track_child(pid, service.name());
            }
        }

        context.add_report(handle.report.clone());
        handles.push(handle);
        Ok(())
    }

    /// 彙總啟動結果
    pub fn get_execution_summary(
        reports: &[LaunchReport],
    ) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        summary.insert(
            "total_services".to_string(),
            serde_json::Value::Number(reports.len().into()),
        );

        let total_ready_ms: u64 = reports
            .iter()
            .filter_map(|r| r.ready_after)
            .map(|d| d.as_millis() as u64)
            .sum();
        summary.insert(
            "total_ready_ms".to_string(),
            serde_json::Value::Number(total_ready_ms.into()),
        );

        let launched: Vec<serde_json::Value> = reports
            .iter()
            .map(|r| serde_json::Value::String(r.service.clone()))
            .collect();
        summary.insert("launched_services".to_string(), serde_json::Value::Array(launched));

        summary
    }
}

/// 前景等待最後一個服務結束（或 Ctrl-C），然後反向關閉其餘服務
pub async fn supervise(mut handles: Vec<ServiceHandle>) -> Result<Option<i32>> {
    let Some(mut last) = handles.pop() else {
        return Ok(None);
    };

    tracing::info!("🎬 '{}' running in the foreground", last.report.service);

    let status = tokio::select! {
        status = last.child.wait() => Some(status.map_err(StackError::IoError)?),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("🛑 Ctrl-C received, shutting down the sequence");
            let _ = last.child.kill().await;
            None
        }
    };

    shutdown_all(&mut handles).await;

    Ok(status.and_then(|s| s.code()))
}

/// 反向終止所有仍在背景執行的服務
pub async fn shutdown_all(handles: &mut Vec<ServiceHandle>) {
    for handle in handles.iter_mut().rev() {
        let _ = handle.child.kill().await;
        tracing::info!("🛑 Stopped '{}'", handle.report.service);
    }
    handles.clear();
}
