//! furiwake 进程入口
//!
//! 加载配置 → 初始化日志 → 启动 HTTP 服务，收到 SIGINT/SIGTERM
//! 后优雅停机，给在途请求最多 10 秒的排空时间。

use clap::Parser;
use furiwake::config::Config;
use furiwake::server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const DEBUG_LOG_FILE: &str = "furiwake-debug.log";

#[derive(Debug, Parser)]
#[command(name = "furiwake", about = "Anthropic messages 反向代理")]
struct Cli {
    /// 配置文件路径
    #[arg(long, default_value = "furiwake.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing();

    let state = match AppState::new(cfg) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("server error: {e}");
            std::process::exit(1);
        }
    };
    let state = Arc::new(state);
    let app = build_router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&state.cfg.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("server error: failed to bind {}: {e}", state.cfg.listen);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "furiwake listening on {} (timeout={}s)",
        state.cfg.listen,
        state.cfg.timeout_seconds,
    );

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let shutdown_rx = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown_rx.notified().await })
            .await
    });

    wait_for_signal().await;
    tracing::warn!("received shutdown signal, draining in-flight requests");
    shutdown.notify_one();

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => {
            tracing::error!("server error: {e}");
            std::process::exit(1);
        }
        Ok(Err(e)) => {
            tracing::error!("server task failed: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            tracing::error!("graceful shutdown timed out");
            std::process::exit(1);
        }
    }
}

/// 控制台输出 INFO 及以上，调试日志全量落盘
fn init_tracing() {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(tracing_subscriber::filter::LevelFilter::INFO);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(DEBUG_LOG_FILE);

    match file {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .init();
        }
        Err(_) => {
            tracing_subscriber::registry().with(stdout_layer).init();
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
