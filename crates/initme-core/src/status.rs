//! 服务状态与控制请求模型（与 SCM 的概念一一对应，但不依赖 Win32 类型）。
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use bitflags::bitflags;

/// 服务生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
}

bitflags! {
    /// 当前可接受的控制请求集合。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Accepts: u32 {
        const STOP = 0b001;
        const SHUTDOWN = 0b010;
        const PAUSE_CONTINUE = 0b100;
    }
}

/// 运行/暂停状态下上报的可接受请求集合。
pub const CMDS_ACCEPTED: Accepts = Accepts::STOP
    .union(Accepts::SHUTDOWN)
    .union(Accepts::PAUSE_CONTINUE);

/// 上报给服务管理器的一条状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: ServiceState,
    pub accepts: Accepts,
}

impl Status {
    /// 不接受任何控制请求的状态（用于 pending 类状态）。
    pub fn pending(state: ServiceState) -> Self {
        Self {
            state,
            accepts: Accepts::empty(),
        }
    }
}

/// 服务管理器下发的控制码。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Interrogate,
    Stop,
    Shutdown,
    Pause,
    Continue,
    /// 未识别的控制码（保留原始值用于日志）。
    Other(u32),
}

/// 一条控制请求：控制码 + 服务管理器视角下的当前状态（Interrogate 时回显）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRequest {
    pub command: ControlCommand,
    pub current_status: Status,
}

/// 控制循环退出时返回给服务管理器的退出码。
///
/// - `service_specific = false`：`code` 为 Win32 错误码
/// - `service_specific = true`：`code` 为服务自定义错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitOutcome {
    pub service_specific: bool,
    pub code: u32,
}
