//! 服务控制状态机。
//!
//! 状态流转：`StartPending → Running ⇄ Paused → StopPending → 返回`。
//!
//! 行为约定：
//! - 进入即上报 StartPending，随后上报 Running 并启动后台任务（不等待其结束）
//! - 循环内只在“心跳 / 下一条控制请求”上等待；Interrogate 的两次回显之间的短暂停顿是唯一例外
//! - 运行态使用快心跳，暂停态使用慢心跳
//! - 状态上报失败直接返回错误，不做重试
//! - 退出时上报 StopPending，通知后台任务停止并在宽限期内等待其结束
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::job::{Job, ShutdownTrigger};
use crate::settings::ControllerSettings;
use crate::status::{ChangeRequest, ControlCommand, ExitOutcome, ServiceState, Status, CMDS_ACCEPTED};

/// 控制循环的致命错误。
#[derive(Debug, Error)]
pub enum ControlError {
    /// 状态通道已关闭：服务管理器将无法得知进程状态。
    #[error("状态通道已关闭，无法上报 {0:?}")]
    StatusChannelClosed(ServiceState),
}

/// 服务控制器（由服务管理器入口调用）。
#[derive(Debug, Clone, Default)]
pub struct Controller {
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(settings: ControllerSettings) -> Self {
        Self { settings }
    }

    /// 运行控制循环直到收到 Stop/Shutdown（或请求通道关闭）。
    ///
    /// 参数：
    /// - `args`：服务启动参数（仅记录日志）
    /// - `requests`：服务管理器下发的控制请求
    /// - `status`：状态上报通道
    /// - `job`：后台任务，进入 Running 后启动
    ///
    /// 返回值：
    /// - `Ok(ExitOutcome)`：正常退出；后台任务 panic 时为服务自定义错误码 1
    ///
    /// 异常处理：
    /// - 状态上报失败返回 [`ControlError::StatusChannelClosed`]；此时仍会通知后台任务停止
    pub async fn execute(
        &self,
        args: Vec<String>,
        requests: &mut mpsc::Receiver<ChangeRequest>,
        status: &mpsc::Sender<Status>,
        job: Job,
    ) -> Result<ExitOutcome, ControlError> {
        debug!(?args, "控制循环启动");
        let mut control = ControlLoop::new(&self.settings, status);

        control.report(Status::pending(ServiceState::StartPending)).await?;
        control.set_heartbeat(self.settings.fast_heartbeat());
        control.enter(ServiceState::Running).await?;

        let (trigger, signal) = ShutdownTrigger::new();
        let handle = tokio::spawn(job.start(signal));

        let looped = control.run(requests).await;
        trigger.cancel();
        let exit = finish_job(handle, self.settings.job_grace()).await;
        looped?;

        info!(heartbeats = control.beats, "控制循环结束");
        Ok(exit)
    }
}

/// 循环是否继续。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// 单次运行内的控制循环状态。
struct ControlLoop<'a> {
    settings: &'a ControllerSettings,
    status: &'a mpsc::Sender<Status>,
    state: ServiceState,
    period: Duration,
    heartbeat: Interval,
    beats: u64,
}

impl<'a> ControlLoop<'a> {
    fn new(settings: &'a ControllerSettings, status: &'a mpsc::Sender<Status>) -> Self {
        let period = settings.fast_heartbeat();
        Self {
            settings,
            status,
            state: ServiceState::StartPending,
            period,
            heartbeat: heartbeat(period),
            beats: 0,
        }
    }

    async fn report(&mut self, status: Status) -> Result<(), ControlError> {
        self.status
            .send(status)
            .await
            .map_err(|_| ControlError::StatusChannelClosed(status.state))
    }

    /// 进入新状态并上报（运行/暂停态接受同一组控制请求）。
    async fn enter(&mut self, state: ServiceState) -> Result<(), ControlError> {
        self.report(Status {
            state,
            accepts: CMDS_ACCEPTED,
        })
        .await?;
        if self.state != state {
            info!(from = ?self.state, to = ?state, "服务状态切换");
        }
        self.state = state;
        Ok(())
    }

    fn set_heartbeat(&mut self, period: Duration) {
        if self.period != period {
            self.period = period;
            self.heartbeat = heartbeat(period);
        }
    }

    async fn run(&mut self, requests: &mut mpsc::Receiver<ChangeRequest>) -> Result<(), ControlError> {
        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    self.beats += 1;
                    trace!(beats = self.beats, state = ?self.state, "heartbeat");
                }
                request = requests.recv() => match request {
                    Some(request) => {
                        if self.handle(request).await? == Flow::Exit {
                            break;
                        }
                    }
                    None => {
                        warn!("控制请求通道已关闭，按停止处理");
                        break;
                    }
                },
            }
        }
        self.report(Status::pending(ServiceState::StopPending)).await?;
        self.state = ServiceState::StopPending;
        Ok(())
    }

    async fn handle(&mut self, request: ChangeRequest) -> Result<Flow, ControlError> {
        debug!(command = ?request.command, "收到控制请求");
        match request.command {
            ControlCommand::Interrogate => {
                self.report(request.current_status).await?;
                // 部分旧版 SCM 只回显一次会死锁，需间隔后再回显一次。
                tokio::time::sleep(self.settings.interrogate_delay()).await;
                self.report(request.current_status).await?;
            }
            ControlCommand::Stop | ControlCommand::Shutdown => return Ok(Flow::Exit),
            ControlCommand::Pause => {
                self.enter(ServiceState::Paused).await?;
                self.set_heartbeat(self.settings.slow_heartbeat());
            }
            ControlCommand::Continue => {
                self.enter(ServiceState::Running).await?;
                self.set_heartbeat(self.settings.fast_heartbeat());
            }
            ControlCommand::Other(code) => {
                warn!("unexpected control request #{code}");
            }
        }
        Ok(Flow::Continue)
    }
}

fn heartbeat(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// 等待后台任务在宽限期内结束，超时则中止。
async fn finish_job(mut handle: JoinHandle<()>, grace: Duration) -> ExitOutcome {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(())) => ExitOutcome::default(),
        Ok(Err(e)) if e.is_panic() => {
            error!("后台任务异常退出: {e}");
            ExitOutcome {
                service_specific: true,
                code: 1,
            }
        }
        Ok(Err(e)) => {
            warn!("后台任务被取消: {e}");
            ExitOutcome::default()
        }
        Err(_) => {
            warn!("后台任务未在 {grace:?} 内结束，强制中止");
            handle.abort();
            ExitOutcome::default()
        }
    }
}
