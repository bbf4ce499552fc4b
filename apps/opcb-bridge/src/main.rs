//! 网桥进程入口：CLI、配置加载、组件接线与任务监督。
//!
//! 启动顺序：解析命令行 → 加载环境变量文件 → 初始化日志 → 加载并校验配置
//! （失败以退出码 2 结束）→ 装配缓存/信箱/四个长驻任务 → 等待退出信号或
//! 任一任务终止 → 取消其余任务并逐个等待，收尾异常只记录不再上抛。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use opcb_cache::LastValueCache;
use opcb_config::AppConfig;
use opcb_frontend::{FrontendPublisher, SubscriptionProxy};
use opcb_influx::InfluxSink;
use opcb_source::{SimTransport, SourceClient};
use tracing::{error, info};

/// Bridge between OPC-UA server and web-based HMI.
#[derive(Debug, Parser)]
#[command(name = "opcb-bridge", version, after_help = env_help())]
struct Cli {
    /// Path of a file containing configuration environment variables
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    /// Print configuration object and exit
    #[arg(long = "config")]
    print_config: bool,

    /// Be more verbose (print debug informations)
    #[arg(short, long)]
    verbose: bool,
}

/// `--help` 尾部的环境变量对照表。
fn env_help() -> String {
    let mut help = String::from("Environment variables:\n");
    for (name, description) in opcb_config::ENV_HELP {
        help.push_str(&format!("  {name:<24}{description}\n"));
    }
    help
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(env_file) = &cli.env_file {
        if let Err(err) = dotenvy::from_path(env_file) {
            eprintln!("cannot load env file {}: {err}", env_file.display());
            return ExitCode::from(2);
        }
    } else {
        // 本地 .env（如存在），便于直接 cargo run 启动
        dotenvy::dotenv().ok();
    }

    if cli.verbose {
        opcb_telemetry::init_tracing_verbose();
    } else {
        opcb_telemetry::init_tracing();
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}. See `--help` option for more informations");
            return ExitCode::from(2);
        }
    };

    if cli.print_config {
        println!("{config:#?}");
        return ExitCode::SUCCESS;
    }

    run(config).await
}

/// 装配全部组件并监督到进程结束。
async fn run(config: AppConfig) -> ExitCode {
    let cache = Arc::new(LastValueCache::new());
    let (frontend_mailbox, frontend_inbox) =
        opcb_mailbox::bounded("Frontend messaging publisher", opcb_mailbox::DEFAULT_CAPACITY);
    let (influx_mailbox, influx_inbox) =
        opcb_mailbox::bounded("InfluxDB writer", opcb_mailbox::DEFAULT_CAPACITY);

    let publisher = FrontendPublisher::new(config.centrifugo.clone());
    let proxy = SubscriptionProxy::new(
        config.centrifugo,
        cache.clone(),
        frontend_mailbox.clone(),
    );
    let influx = InfluxSink::new(config.influxdb);
    // TODO: 厂商 OPC-UA 客户端库接入后在此替换模拟传输
    let transport = Arc::new(SimTransport::new());
    let source = SourceClient::new(config.opc, transport, cache, frontend_mailbox, influx_mailbox);

    // 四个任务都是无限循环，任何一个正常返回都视为异常终止
    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(async move {
        publisher.run(frontend_inbox).await;
        ("frontend messaging publisher", Ok(()))
    });
    tasks.spawn(async move {
        (
            "centrifugo proxy server",
            proxy.run().await.map_err(|err| err.to_string()),
        )
    });
    tasks.spawn(async move {
        (
            "influxdb writer",
            influx.run(influx_inbox).await.map_err(|err| err.to_string()),
        )
    });
    tasks.spawn(async move {
        (
            "opc client",
            source.run().await.map_err(|err| err.to_string()),
        )
    });

    let exit = tokio::select! {
        _ = shutdown_signal() => ExitCode::SUCCESS,
        joined = tasks.join_next() => match joined {
            Some(Ok((name, Err(err)))) => {
                error!("{name} task failed: {err}");
                ExitCode::FAILURE
            }
            Some(Ok((name, Ok(())))) => {
                error!("{name} task ended unexpectedly");
                ExitCode::FAILURE
            }
            Some(Err(err)) => {
                error!("task panicked: {err}");
                ExitCode::FAILURE
            }
            None => ExitCode::FAILURE,
        },
    };

    info!("Waiting for {} outstanding tasks to finish", tasks.len());
    tasks.abort_all();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Err(err))) => error!("{name} task ended during shutdown: {err}"),
            Ok(_) => {}
            Err(err) if err.is_cancelled() => {}
            Err(err) => error!("task panicked during shutdown: {err}"),
        }
    }
    info!("Shutdown complete");
    exit
}

/// 等待退出信号（SIGINT，类 Unix 平台还包括 SIGTERM）。
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!("cannot install SIGTERM handler: {err}");
                if let Err(err) = tokio::signal::ctrl_c().await {
                    error!("cannot listen for SIGINT: {err}");
                }
                info!("Received exit signal SIGINT");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received exit signal SIGINT"),
            _ = sigterm.recv() => info!("Received exit signal SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("cannot listen for SIGINT: {err}");
        }
        info!("Received exit signal SIGINT");
    }
}
