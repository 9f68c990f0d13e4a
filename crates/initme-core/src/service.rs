//! 服务能力抽象（注册/启动/停止/查询/禁用/删除/运行）。
//!
//! 具体实现按编译目标选择（见 `initme-windows::new_service`），上层只依赖本 trait。
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use anyhow::Result;

use crate::args::ValidationError;
use crate::invoker::CommandOutcome;
use crate::job::Job;

/// 一个可被服务管理器托管的服务。
pub trait Service {
    /// 向服务管理器注册服务；描述校验失败时不会执行任何外部命令。
    fn register(&self) -> Result<CommandOutcome, ValidationError>;
    fn start(&self) -> CommandOutcome;
    fn stop(&self) -> CommandOutcome;
    fn status(&self) -> CommandOutcome;
    fn disable(&self) -> CommandOutcome;
    fn delete(&self) -> CommandOutcome;
    /// 以服务身份运行（阻塞直到服务停止）。
    fn run(&self, job: Job) -> Result<()>;
}
