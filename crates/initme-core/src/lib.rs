//! initme 核心库（与平台无关）。
//!
//! 功能：
//! - 定义服务描述（descriptor）与 `sc.exe create` 参数构建/校验
//! - 封装控制命令的执行（输出文本、启动错误、退出码三元组）
//! - 实现服务控制状态机（响应服务管理器的控制请求并上报状态）
//! - 定义后台任务（Job）与取消信号、配置文件模型
//!
//! 约定：
//! - 本 crate 不直接依赖 Win32；与 SCM 的对接由 `initme-windows` 完成
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

pub mod args;
pub mod controller;
pub mod descriptor;
pub mod invoker;
pub mod job;
pub mod service;
pub mod settings;
pub mod status;
