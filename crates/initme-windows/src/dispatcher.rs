//! 服务调度器对接（基于 `windows-service` crate）。
//!
//! 流程：
//! - `run_dispatcher` 保存运行上下文并启动服务调度器（阻塞直到服务停止）
//! - SCM 回调服务入口后：注册控制处理器，把控制请求转为 [`ChangeRequest`] 投递给核心状态机
//! - 状态机上报的 [`Status`] 由转发任务逐条写回 SCM；写回失败即关闭状态通道
//! - 状态机返回后上报 Stopped（附带退出码）
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::ffi::OsString;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use initme_core::controller::Controller;
use initme_core::job::Job;
use initme_core::settings::ControllerSettings;
use initme_core::status::{Accepts, ChangeRequest, ControlCommand, ServiceState, Status};
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use windows_service::service::{
    ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState as ScmState, ServiceStatus,
    ServiceType,
};
use windows_service::service_control_handler::{self, ServiceControlHandlerResult, ServiceStatusHandle};
use windows_service::{define_windows_service, service_dispatcher};

/// 控制请求队列长度。
const REQUEST_QUEUE: usize = 32;
/// 状态上报队列长度。
const STATUS_QUEUE: usize = 32;

/// 服务入口所需的上下文（由 `run_dispatcher` 注入，供 SCM 回调使用）。
struct RunContext {
    name: String,
    settings: ControllerSettings,
    job: Mutex<Option<Job>>,
}

static RUN_CONTEXT: OnceCell<RunContext> = OnceCell::new();

define_windows_service!(ffi_service_main, service_main);

/// 启动服务调度器。
///
/// 异常处理：
/// - 同一进程重复调用返回错误
/// - 进程并非由 SCM 启动时，调度器启动失败（ERROR_FAILED_SERVICE_CONTROLLER_CONNECT）
pub fn run_dispatcher(name: &str, settings: ControllerSettings, job: Job) -> Result<()> {
    RUN_CONTEXT
        .set(RunContext {
            name: name.to_string(),
            settings,
            job: Mutex::new(Some(job)),
        })
        .map_err(|_| anyhow!("服务调度器已启动"))?;
    service_dispatcher::start(name, ffi_service_main).context("启动服务调度器失败")?;
    Ok(())
}

/// 服务入口（签名由宏固定；真实逻辑在 [`run_service`]）。
fn service_main(arguments: Vec<OsString>) {
    if let Err(e) = run_service(arguments) {
        error!("服务运行失败: {e:#}");
    }
}

fn run_service(arguments: Vec<OsString>) -> Result<()> {
    let ctx = RUN_CONTEXT.get().ok_or_else(|| anyhow!("缺少服务运行上下文"))?;
    let job = ctx
        .job
        .lock()
        .map_err(|_| anyhow!("后台任务锁已损坏"))?
        .take()
        .ok_or_else(|| anyhow!("后台任务已启动过"))?;

    let (request_tx, mut request_rx) = mpsc::channel::<ChangeRequest>(REQUEST_QUEUE);
    let (status_tx, status_rx) = mpsc::channel::<Status>(STATUS_QUEUE);
    let last_status = Arc::new(Mutex::new(Status::pending(ServiceState::StartPending)));

    let handler_status = last_status.clone();
    let status_handle = service_control_handler::register(&ctx.name, move |control| {
        let command = match control {
            ServiceControl::Interrogate => ControlCommand::Interrogate,
            ServiceControl::Stop => ControlCommand::Stop,
            ServiceControl::Shutdown => ControlCommand::Shutdown,
            ServiceControl::Pause => ControlCommand::Pause,
            ServiceControl::Continue => ControlCommand::Continue,
            other => ControlCommand::Other(other.raw_value()),
        };
        let current_status = handler_status
            .lock()
            .map(|s| *s)
            .unwrap_or(Status::pending(ServiceState::StartPending));
        // 阻塞投递：队列满时等待，不丢弃控制请求。
        if request_tx.blocking_send(ChangeRequest { command, current_status }).is_err() {
            warn!(?command, "控制循环已退出，忽略控制请求");
        }
        match command {
            ControlCommand::Other(_) => ServiceControlHandlerResult::NotImplemented,
            _ => ServiceControlHandlerResult::NoError,
        }
    })
    .context("注册服务控制处理器失败")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("创建 tokio 运行时失败")?;

    let args: Vec<String> = arguments
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let controller = Controller::new(ctx.settings.clone());
    let outcome = runtime.block_on(async move {
        let forwarder = tokio::spawn(forward_status(status_handle, status_rx, last_status));
        let result = controller.execute(args, &mut request_rx, &status_tx, job).await;
        drop(status_tx);
        if let Err(e) = forwarder.await {
            warn!("状态转发任务异常结束: {e}");
        }
        result
    });

    let (exit_code, result) = match outcome {
        Ok(exit) if exit.service_specific => (ServiceExitCode::ServiceSpecific(exit.code), Ok(())),
        Ok(exit) => (ServiceExitCode::Win32(exit.code), Ok(())),
        Err(e) => (ServiceExitCode::ServiceSpecific(1), Err(e)),
    };
    status_handle
        .set_service_status(ServiceStatus {
            service_type: ServiceType::OWN_PROCESS,
            current_state: ScmState::Stopped,
            controls_accepted: ServiceControlAccept::empty(),
            exit_code,
            checkpoint: 0,
            wait_hint: Duration::default(),
            process_id: None,
        })
        .context("上报 Stopped 状态失败")?;
    info!("服务已停止: {}", ctx.name);
    result.context("控制循环异常退出")
}

/// 将状态机上报的状态逐条写回 SCM。
///
/// 写回失败时退出并丢弃接收端，使状态机的下一次上报失败。
async fn forward_status(
    handle: ServiceStatusHandle,
    mut status_rx: mpsc::Receiver<Status>,
    last_status: Arc<Mutex<Status>>,
) {
    while let Some(status) = status_rx.recv().await {
        if let Ok(mut last) = last_status.lock() {
            *last = status;
        }
        if let Err(e) = handle.set_service_status(to_scm_status(status)) {
            error!(state = ?status.state, "上报服务状态失败: {e}");
            return;
        }
    }
}

fn to_scm_status(status: Status) -> ServiceStatus {
    let current_state = match status.state {
        ServiceState::Stopped => ScmState::Stopped,
        ServiceState::StartPending => ScmState::StartPending,
        ServiceState::StopPending => ScmState::StopPending,
        ServiceState::Running => ScmState::Running,
        ServiceState::ContinuePending => ScmState::ContinuePending,
        ServiceState::PausePending => ScmState::PausePending,
        ServiceState::Paused => ScmState::Paused,
    };
    let mut controls_accepted = ServiceControlAccept::empty();
    if status.accepts.contains(Accepts::STOP) {
        controls_accepted |= ServiceControlAccept::STOP;
    }
    if status.accepts.contains(Accepts::SHUTDOWN) {
        controls_accepted |= ServiceControlAccept::SHUTDOWN;
    }
    if status.accepts.contains(Accepts::PAUSE_CONTINUE) {
        controls_accepted |= ServiceControlAccept::PAUSE_CONTINUE;
    }
    ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state,
        controls_accepted,
        exit_code: ServiceExitCode::Win32(0),
        checkpoint: 0,
        wait_hint: Duration::default(),
        process_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use initme_core::status::CMDS_ACCEPTED;

    #[test]
    fn running_status_maps_all_accepts() {
        let s = to_scm_status(Status {
            state: ServiceState::Running,
            accepts: CMDS_ACCEPTED,
        });
        assert_eq!(s.current_state, ScmState::Running);
        assert!(s.controls_accepted.contains(
            ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN | ServiceControlAccept::PAUSE_CONTINUE
        ));
    }

    #[test]
    fn pending_status_accepts_nothing() {
        let s = to_scm_status(Status::pending(ServiceState::StopPending));
        assert_eq!(s.current_state, ScmState::StopPending);
        assert!(s.controls_accepted.is_empty());
    }
}
