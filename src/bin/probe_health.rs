use small_stack::core::readiness;
use small_stack::utils::error::Result;
use std::time::{Duration, Instant};

/// 就緒探測的除錯工具：反覆打一個健康端點直到成功或放棄
#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "http://127.0.0.1:8000/health".to_string());
    let attempts: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(10);

    println!("🚀 測試健康端點: {}", url);
    println!("📋 最多嘗試 {} 次，間隔 500ms", attempts);

    let client = reqwest::Client::new();

    for attempt in 1..=attempts {
        let started = Instant::now();
        let ready = readiness::http_ready(&client, &url, Duration::from_secs(2)).await;
        let elapsed = started.elapsed();

        if ready {
            println!("  ✅ 第 {} 次: 就緒 ({:?})", attempt, elapsed);
            println!("\n🎉 服務已就緒！");
            return Ok(());
        }

        println!("  ❌ 第 {} 次: 未就緒 ({:?})", attempt, elapsed);
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    println!("\n💡 服務一直沒有就緒，檢查它的啟動日誌。");
    std::process::exit(2);
}
