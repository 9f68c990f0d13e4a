//! Windows 服务管理器（SCM）对接。
//!
//! 目标：
//! - 通过 `sc.exe` 完成服务注册/启动/停止/查询/禁用/删除
//! - 通过 `windows-service` crate 对接服务调度器，将 SCM 控制请求转交给核心状态机
//! - 将 Win32 细节集中在本 crate，上层只依赖 `initme_core::service::Service`
//!
//! 权限要求：
//! - 创建/删除/配置服务通常需要管理员权限
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

#[cfg(windows)]
pub mod dispatcher;
pub mod service;
pub mod session;

pub use service::{new_service, WindowsService};
