use crate::core::{ReadinessSpec, Result};
use crate::utils::error::StackError;
use std::time::{Duration, Instant};
use tokio::process::Child;

/// 單次 HTTP 健康檢查，2xx 視為就緒
pub async fn http_ready(client: &reqwest::Client, url: &str, per_try_timeout: Duration) -> bool {
    match client.get(url).timeout(per_try_timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// 單次 TCP 連線檢查
pub async fn tcp_ready(address: &str, per_try_timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(per_try_timeout, tokio::net::TcpStream::connect(address)).await,
        Ok(Ok(_))
    )
}

/// 等待服務就緒。輪詢期間同時監看子行程，提早退出會立即回報
/// 而不是等到超時。
pub async fn wait_until_ready(
    client: &reqwest::Client,
    service: &str,
    spec: &ReadinessSpec,
    child: &mut Child,
) -> Result<Option<Duration>> {
    match spec {
        ReadinessSpec::None => Ok(None),
        ReadinessSpec::Delay { duration } => {
            tracing::warn!(
                "⚠️ '{}' uses a fixed startup delay ({:?}); this races against slow startups, prefer an http/tcp readiness check",
                service,
                duration
            );
            tokio::time::sleep(*duration).await;
            check_still_running(service, child)?;
            Ok(Some(*duration))
        }
        ReadinessSpec::Http {
            url,
            timeout,
            interval,
        } => {
            let started = Instant::now();
            loop {
                check_still_running(service, child)?;

                if http_ready(client, url, *interval).await {
                    return Ok(Some(started.elapsed()));
                }

                if started.elapsed() >= *timeout {
                    return Err(StackError::ReadinessTimeout {
                        service: service.to_string(),
                        endpoint: url.clone(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }

                tokio::time::sleep(*interval).await;
            }
        }
        ReadinessSpec::Tcp {
            address,
            timeout,
            interval,
        } => {
            let started = Instant::now();
            loop {
                check_still_running(service, child)?;

                if tcp_ready(address, *interval).await {
                    return Ok(Some(started.elapsed()));
                }

                if started.elapsed() >= *timeout {
                    return Err(StackError::ReadinessTimeout {
                        service: service.to_string(),
                        endpoint: address.clone(),
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }

                tokio::time::sleep(*interval).await;
            }
        }
    }
}

fn check_still_running(service: &str, child: &mut Child) -> Result<()> {
    if let Some(status) = child.try_wait()? {
        return Err(StackError::ProcessExited {
            service: service.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}
