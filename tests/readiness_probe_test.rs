use httpmock::prelude::*;
use small_stack::core::readiness::{self, http_ready, tcp_ready};
use small_stack::core::ReadinessSpec;
use small_stack::utils::error::StackError;
use std::time::{Duration, Instant};

async fn long_running_child() -> tokio::process::Child {
    tokio::process::Command::new("/bin/sh")
        .args(["-c", "sleep 30"])
        .kill_on_drop(true)
        .spawn()
        .unwrap()
}

#[tokio::test]
async fn test_http_ready_accepts_2xx_only() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200).body(r#"{"status":"healthy"}"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(503);
    });

    let client = reqwest::Client::new();

    assert!(http_ready(&client, &server.url("/health"), Duration::from_secs(1)).await);
    assert!(!http_ready(&client, &server.url("/broken"), Duration::from_secs(1)).await);
    assert!(!http_ready(&client, "http://127.0.0.1:1/health", Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_tcp_ready_reflects_listener_state() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    assert!(tcp_ready(&address, Duration::from_secs(1)).await);
    assert!(!tcp_ready("127.0.0.1:1", Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_readiness_poll_survives_a_slow_startup() {
    // 先佔一個埠再放掉，讓「服務」300ms 後才真正開始監聽
    let placeholder = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = placeholder.local_addr().unwrap().to_string();
    drop(placeholder);

    let slow_service = tokio::spawn({
        let address = address.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let listener = tokio::net::TcpListener::bind(&address).await.unwrap();
            // 撐住監聽直到測試結束
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(listener);
        }
    });

    let client = reqwest::Client::new();
    let mut child = long_running_child().await;
    let spec = ReadinessSpec::Tcp {
        address,
        timeout: Duration::from_secs(5),
        interval: Duration::from_millis(50),
    };

    let started = Instant::now();
    let ready = readiness::wait_until_ready(&client, "backend", &spec, &mut child)
        .await
        .unwrap();

    assert!(ready.is_some());
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(started.elapsed() < Duration::from_secs(5));

    slow_service.abort();
    let _ = child.kill().await;
}

#[tokio::test]
async fn test_timeout_error_reports_the_endpoint() {
    let client = reqwest::Client::new();
    let mut child = long_running_child().await;
    let spec = ReadinessSpec::Http {
        url: "http://127.0.0.1:1/health".to_string(),
        timeout: Duration::from_millis(300),
        interval: Duration::from_millis(50),
    };

    let err = readiness::wait_until_ready(&client, "backend", &spec, &mut child)
        .await
        .unwrap_err();

    match err {
        StackError::ReadinessTimeout {
            service,
            endpoint,
            waited_ms,
        } => {
            assert_eq!(service, "backend");
            assert_eq!(endpoint, "http://127.0.0.1:1/health");
            assert!(waited_ms >= 300);
        }
        other => panic!("expected ReadinessTimeout, got {:?}", other),
    }
    let _ = child.kill().await;
}
