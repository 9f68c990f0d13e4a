//! initme 宿主程序：把自身注册为 Windows 服务并在服务形态下运行后台任务。
//!
//! 子命令：
//! - `register` / `start` / `stop` / `status` / `disable` / `delete`：调用 `sc.exe` 管理服务
//! - `run`：由 SCM 启动时使用，进入服务调度器
//! - `console`：以控制台模式运行同一控制循环（Ctrl+C 视为 Stop，用于开发调试）
//! - `auto`：按会话类型自动选择 `run` 或 `console`
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use initme_core::controller::Controller;
use initme_core::invoker::CommandOutcome;
use initme_core::job::Job;
use initme_core::service::Service;
use initme_core::settings::{load_config, ControllerSettings};
use initme_core::status::{ChangeRequest, ControlCommand, ServiceState, Status, CMDS_ACCEPTED};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// 命令行参数。
///
/// 说明：
/// - `--config` 指向配置文件（默认 `initme.json`），包含服务描述与控制循环参数
#[derive(Debug, Parser)]
#[command(name = "initme-agent", version)]
struct Cli {
    #[arg(long, default_value = "initme.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Commands {
    /// 注册服务（sc create）。
    Register,
    /// 启动服务（sc start）。
    Start,
    /// 停止服务（sc stop）。
    Stop,
    /// 查询服务状态（sc query）。
    Status,
    /// 禁用服务（sc config start= disabled）。
    Disable,
    /// 删除服务（sc delete）。
    Delete,
    /// 以服务身份运行（由 SCM 调用）。
    Run,
    /// 以控制台模式运行。
    Console,
    /// 交互式会话中按控制台运行，否则按服务运行。
    Auto,
}

/// 程序入口：解析参数、读取配置、初始化日志并分发子命令。
///
/// 异常处理：
/// - 配置读取失败、描述校验失败、`sc.exe` 无法启动时返回错误
/// - `sc.exe` 返回非 0 退出码时，以相同退出码结束进程
fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).context("加载配置失败")?;

    let mode = match cli.command {
        Commands::Auto if interactive()? => Commands::Console,
        Commands::Auto => Commands::Run,
        other => other,
    };
    init_logging(mode == Commands::Run, &config.service.name)?;

    let settings = config.controller.clone();
    let service = initme_windows::new_service(config.service, settings.clone());
    match mode {
        Commands::Register => finish(service.register()?),
        Commands::Start => finish(service.start()),
        Commands::Stop => finish(service.stop()),
        Commands::Status => finish(service.status()),
        Commands::Disable => finish(service.disable()),
        Commands::Delete => finish(service.delete()),
        Commands::Run => service.run(agent_job()),
        Commands::Console | Commands::Auto => run_console(settings, agent_job()),
    }
}

#[cfg(windows)]
fn interactive() -> Result<bool> {
    initme_windows::session::is_interactive_session()
}

#[cfg(not(windows))]
fn interactive() -> Result<bool> {
    Ok(true)
}

/// 初始化日志。
///
/// 服务模式没有控制台，日志写入可执行文件同目录下的 `<服务名>.log`。
fn init_logging(service_mode: bool, service_name: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if service_mode {
        let name = if service_name.is_empty() { "initme" } else { service_name };
        let path = std::env::current_exe()
            .context("获取可执行文件路径失败")?
            .with_file_name(format!("{name}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("打开日志文件失败: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
    Ok(())
}

/// 输出控制命令结果；非 0 退出码原样作为进程退出码。
fn finish(outcome: CommandOutcome) -> Result<()> {
    print!("{}", outcome.output);
    if let Some(e) = outcome.error {
        return Err(anyhow::Error::new(e).context("无法启动服务控制程序"));
    }
    match outcome.code {
        Some(0) => Ok(()),
        Some(code) => std::process::exit(code),
        None => Err(anyhow!("服务控制程序未返回退出码")),
    }
}

/// 宿主的后台任务：定期打点，收到停止信号后退出。
fn agent_job() -> Job {
    Job::new(|mut shutdown| async move {
        info!("initme-agent running");
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => info!("后台任务运行中"),
                _ = shutdown.cancelled() => break,
            }
        }
        info!("后台任务已退出");
    })
}

/// 控制台模式：在本进程内驱动控制循环，Ctrl+C 转换为 Stop 请求。
fn run_console(settings: ControllerSettings, job: Job) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("创建 tokio 运行时失败")?;

    runtime.block_on(async move {
        let (request_tx, mut request_rx) = mpsc::channel::<ChangeRequest>(8);
        let (status_tx, mut status_rx) = mpsc::channel::<Status>(8);

        let printer = tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                info!(state = ?status.state, accepts = ?status.accepts, "状态上报");
            }
        });
        let ctrl_c = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let stop = ChangeRequest {
                        command: ControlCommand::Stop,
                        current_status: Status {
                            state: ServiceState::Running,
                            accepts: CMDS_ACCEPTED,
                        },
                    };
                    let _ = request_tx.send(stop).await;
                }
                Err(e) => warn!("监听 Ctrl+C 失败: {e}"),
            }
        });

        let args = std::env::args().collect();
        let result = Controller::new(settings)
            .execute(args, &mut request_rx, &status_tx, job)
            .await;
        ctrl_c.abort();
        drop(status_tx);
        let _ = printer.await;

        let exit = result.context("控制循环异常退出")?;
        info!(?exit, "控制台模式结束");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_defaults_to_initme_json() {
        let cli = Cli::try_parse_from(["initme-agent", "status"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("initme.json"));
        assert_eq!(cli.command, Commands::Status);
    }
}
