//! 基于 `sc.exe` 的服务控制实现。
//!
//! 说明：
//! - 每个操作对应一条 `sc.exe` 子命令（create/start/stop/query/config/delete）
//! - 使用命令行而非 SCM API 完成注册等操作，便于排障（日志中的命令可直接复现）
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use anyhow::Result;
use initme_core::args::{build_sc_args, ValidationError};
use initme_core::descriptor::ServiceDescriptor;
use initme_core::invoker::{CommandOutcome, ControlFacility};
use initme_core::job::Job;
use initme_core::service::Service;
use initme_core::settings::ControllerSettings;

/// 按编译目标选择服务实现。
///
/// 非 Windows 目标同样返回 [`WindowsService`]：控制命令会因 `sc.exe` 不存在而报启动错误，
/// `run` 直接返回错误。
pub fn new_service(descriptor: ServiceDescriptor, settings: ControllerSettings) -> Box<dyn Service> {
    Box::new(WindowsService::new(descriptor, settings))
}

/// Windows 服务（`sc.exe` + 服务调度器）。
#[derive(Debug, Clone)]
pub struct WindowsService {
    descriptor: ServiceDescriptor,
    settings: ControllerSettings,
    facility: ControlFacility,
}

impl WindowsService {
    pub fn new(descriptor: ServiceDescriptor, settings: ControllerSettings) -> Self {
        let facility = ControlFacility::new(&settings.sc_program);
        Self {
            descriptor,
            settings,
            facility,
        }
    }

    /// 替换控制程序（测试或非默认路径的 `sc.exe`）。
    pub fn with_facility(mut self, facility: ControlFacility) -> Self {
        self.facility = facility;
        self
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn verb(&self, verb: &str, extra: &[&str]) -> CommandOutcome {
        let mut args = vec![verb, self.descriptor.name.as_str()];
        args.extend_from_slice(extra);
        self.facility.execute(&args)
    }
}

impl Service for WindowsService {
    fn register(&self) -> Result<CommandOutcome, ValidationError> {
        let args = build_sc_args(&self.descriptor, &["create"])?;
        Ok(self.facility.execute(&args))
    }

    fn start(&self) -> CommandOutcome {
        self.verb("start", &[])
    }

    fn stop(&self) -> CommandOutcome {
        self.verb("stop", &[])
    }

    fn status(&self) -> CommandOutcome {
        self.verb("query", &[])
    }

    fn disable(&self) -> CommandOutcome {
        self.verb("config", &["start=", "disabled"])
    }

    fn delete(&self) -> CommandOutcome {
        self.verb("delete", &[])
    }

    #[cfg(windows)]
    fn run(&self, job: Job) -> Result<()> {
        crate::dispatcher::run_dispatcher(&self.descriptor.name, self.settings.clone(), job)
    }

    #[cfg(not(windows))]
    fn run(&self, job: Job) -> Result<()> {
        drop(job);
        Err(anyhow::anyhow!("当前平台不支持以服务方式运行: {}", self.descriptor.name))
    }
}
