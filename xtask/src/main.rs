use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask", about = "Bluestrike 开发任务自动化")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 构建 CLI (release)
    Build,
    /// 使用模拟协议栈运行一次攻击演示
    Demo {
        /// 日志级别 (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },
    /// 设置 capabilities (免 sudo 打开原始套接字)
    SetupCaps,
    /// 运行测试
    Test,
    /// 运行测试并生成覆盖率报告
    Coverage,
    /// 清理构建产物
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // 确保在项目根目录执行
    let project_root = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => std::path::PathBuf::from(dir)
            .parent()
            .map(|p| p.to_path_buf())
            .context("xtask 目录没有上级目录")?,
        Err(_) => std::env::current_dir()?,
    };
    sh.change_dir(&project_root);

    match cli.command {
        Commands::Build => build(&sh)?,
        Commands::Demo { log_level } => demo(&sh, &log_level)?,
        Commands::SetupCaps => setup_caps(&sh)?,
        Commands::Test => test(&sh)?,
        Commands::Coverage => coverage(&sh)?,
        Commands::Clean => clean(&sh)?,
    }

    Ok(())
}

fn build(sh: &Shell) -> Result<()> {
    println!("🔨 构建 bluestrike...");
    cmd!(sh, "cargo build --release -p bluestrike-cli").run()?;
    println!("✅ 构建完成: target/release/bluestrike");
    Ok(())
}

fn demo(sh: &Shell, log_level: &str) -> Result<()> {
    println!("🧪 模拟模式演示 (不访问真实适配器)");
    println!("   日志级别: {}", log_level);
    println!();

    let rust_log = format!("{level},bluestrike_core={level}", level = log_level);
    let _env = sh.push_env("RUST_LOG", rust_log);

    cmd!(sh, "cargo run -p bluestrike-cli -- --simulate scan").run()?;
    cmd!(
        sh,
        "cargo run -p bluestrike-cli -- --simulate --debug-level 2 attack bluesmack 00:1A:7D:DA:71:13 --count 20"
    )
    .run()?;
    Ok(())
}

fn setup_caps(sh: &Shell) -> Result<()> {
    println!("🔐 设置 capabilities (免 sudo 网络操作)...");

    build(sh)?;

    // CAP_NET_ADMIN: 适配器控制与查询
    // CAP_NET_RAW: L2CAP/RFCOMM 原始套接字
    cmd!(
        sh,
        "sudo setcap 'cap_net_admin,cap_net_raw+eip' target/release/bluestrike"
    )
    .run()?;

    println!("✅ Capabilities 设置完成");
    println!("   bluestrike 现在可以免 sudo 运行");
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    println!("🧪 运行测试...");
    cmd!(sh, "cargo test --workspace").run()?;
    println!("✅ 测试完成");
    Ok(())
}

fn coverage(sh: &Shell) -> Result<()> {
    println!("📊 运行测试覆盖率分析...");

    // 检查 cargo-tarpaulin 是否安装
    if cmd!(sh, "cargo tarpaulin --version").run().is_err() {
        println!("📦 安装 cargo-tarpaulin...");
        cmd!(sh, "cargo install cargo-tarpaulin").run()?;
    }

    println!("🔍 分析中...");
    cmd!(
        sh,
        "cargo tarpaulin --packages bluestrike-core --out Html --output-dir target/coverage"
    )
    .run()?;

    println!("✅ 覆盖率报告已生成");
    println!("   HTML 报告: target/coverage/tarpaulin-report.html");
    Ok(())
}

fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 清理构建产物...");
    cmd!(sh, "cargo clean").run()?;
    println!("✅ 清理完成");
    Ok(())
}
