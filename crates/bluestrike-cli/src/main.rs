//! Bluestrike CLI
//!
//! 命令行前端：扫描、查询设备和执行攻击

mod console;

use anyhow::{Result, bail};
use bluestrike_core::{
    Attack, AttackConfig, AttackKind, BdAddr, BluezHost, HostStack, Session, Settings,
    SimulatedHost, error_string,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bluestrike", version, about = "Bluetooth penetration testing engine")]
struct Cli {
    /// 使用内存模拟协议栈（不访问真实适配器）
    #[arg(long, global = true)]
    simulate: bool,

    /// 诊断日志阈值（覆盖配置文件）
    #[arg(long, global = true)]
    debug_level: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 扫描附近设备
    Scan {
        /// 最多返回的设备数
        #[arg(short, long)]
        max: Option<usize>,
        /// 扫描超时时间 (秒)
        #[arg(short, long)]
        timeout: Option<u64>,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 查询单个设备
    Info {
        /// 设备地址
        address: String,
    },
    /// 执行攻击
    Attack {
        /// 攻击类型 (名称或 id)
        kind: AttackKind,
        /// 目标地址
        target: String,
        /// BlueSmack 包大小
        #[arg(long)]
        size: Option<u16>,
        /// BlueSmack 包数量
        #[arg(long)]
        count: Option<u32>,
    },
    /// 列出支持的攻击
    List,
    /// 列出结果码
    Errors,
}

fn simulated_host() -> SimulatedHost {
    SimulatedHost::new()
        .with_peer(BdAddr::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]), Some("Headset"), -48)
        .with_peer(BdAddr::new([0x5C, 0xF3, 0x70, 0x8B, 0x21, 0x04]), Some("Car Kit"), -71)
        .with_peer(BdAddr::new([0xF0, 0x0D, 0xCA, 0xFE, 0xBA, 0xBE]), None, -85)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（bluestrike-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bluestrike_core=debug")),
        )
        .try_init();

    let cli = Cli::parse();
    let settings = Settings::load();

    match cli.command {
        Commands::List => {
            for kind in AttackKind::ALL {
                let status = if kind.is_supported() { "" } else { " (unsupported)" };
                println!(
                    "  [{}] {:<16} {}{}",
                    kind.id(),
                    kind.slug(),
                    kind.description(),
                    status
                );
            }
            return Ok(());
        }
        Commands::Errors => {
            for code in [0, -1, -2, -3, -4, -5] {
                println!("  {code:>3}  {}", error_string(code));
            }
            return Ok(());
        }
        _ => {}
    }

    let host: Arc<dyn HostStack> = if cli.simulate {
        tracing::info!("Using simulated Bluetooth host");
        Arc::new(simulated_host())
    } else {
        Arc::new(BluezHost::new(Some(settings.bluetooth.interface.clone())))
    };

    let session = Arc::new(Session::new(host));
    session
        .diagnostics()
        .set_debug_level(cli.debug_level.unwrap_or(settings.debug_level));

    if let Err(e) = session.init().await {
        bail!("{} ({})", e, error_string(e.code()));
    }

    let result = run(&session, &settings, cli.command).await;
    session.cleanup().await;
    result
}

async fn run(session: &Arc<Session>, settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Scan { max, timeout, json } => {
            let max = max.unwrap_or(settings.bluetooth.max_devices);
            let timeout = timeout.map_or_else(|| settings.bluetooth.scan_timeout(), Duration::from_secs);

            println!("🔍 扫描设备 ({}s)...", timeout.as_secs());
            let devices = session.scan(max, timeout).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("   未发现设备");
            } else {
                for (i, dev) in devices.iter().enumerate() {
                    console::print_device(i, dev);
                }
            }
        }
        Commands::Info { address } => {
            let device = session.device_info(&address).await?;
            console::print_device(0, &device);
        }
        Commands::Attack {
            kind,
            target,
            size,
            count,
        } => {
            let mut attack = Attack::from_kind(kind, &settings.attacks);
            if let Attack::Bluesmack {
                packet_size,
                count: packet_count,
            } = &mut attack
            {
                *packet_size = size.unwrap_or(*packet_size);
                *packet_count = count.unwrap_or(*packet_count);
            }

            let config = AttackConfig::new(kind, target);
            println!("⚔️  {} -> {}", kind, config.target_address);

            // Ctrl-C 请求停止，循环攻击在下一次迭代时退出
            let stopper = {
                let session = session.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() && session.is_attacking() {
                        println!("⏹️  停止攻击");
                        session.stop();
                    }
                })
            };

            let outcome = session
                .execute(&config.target_address, &attack, Arc::new(console::ConsoleSink))
                .await;
            stopper.abort();

            match outcome {
                Ok(outcome) => {
                    println!(
                        "✅ {} packet(s), {} byte(s){}",
                        outcome.packets_sent,
                        outcome.bytes_sent,
                        if outcome.cancelled { ", stopped" } else { "" }
                    );
                }
                Err(e) => bail!("{} ({})", e, error_string(e.code())),
            }
        }
        Commands::List | Commands::Errors => {}
    }

    Ok(())
}
