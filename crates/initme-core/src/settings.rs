//! 配置文件模型（initme.json）。
//!
//! 结构：
//! - `service`：服务描述，见 [`ServiceDescriptor`]
//! - `controller`：控制循环参数（心跳周期等），全部可省略
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::ServiceDescriptor;
use crate::invoker::SC_PROGRAM;

/// 配置读取失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置 JSON 失败: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置文件根对象。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    pub service: ServiceDescriptor,
    #[serde(default)]
    pub controller: ControllerSettings,
}

/// 控制循环参数（毫秒）。
///
/// 默认值：
/// - 运行态心跳 500ms，暂停态心跳 2s
/// - Interrogate 两次回显之间间隔 100ms
/// - 停止时等待后台任务 5s，超时后强制中止
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub fast_heartbeat_ms: u64,
    pub slow_heartbeat_ms: u64,
    pub interrogate_delay_ms: u64,
    pub job_grace_ms: u64,
    /// 服务控制程序（默认 `sc.exe`）。
    pub sc_program: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            fast_heartbeat_ms: 500,
            slow_heartbeat_ms: 2_000,
            interrogate_delay_ms: 100,
            job_grace_ms: 5_000,
            sc_program: SC_PROGRAM.to_string(),
        }
    }
}

impl ControllerSettings {
    pub fn fast_heartbeat(&self) -> Duration {
        Duration::from_millis(self.fast_heartbeat_ms.max(1))
    }

    pub fn slow_heartbeat(&self) -> Duration {
        Duration::from_millis(self.slow_heartbeat_ms.max(1))
    }

    pub fn interrogate_delay(&self) -> Duration {
        Duration::from_millis(self.interrogate_delay_ms)
    }

    pub fn job_grace(&self) -> Duration {
        Duration::from_millis(self.job_grace_ms)
    }
}

/// 读取并解析配置文件。
///
/// 异常处理：
/// - 文件读取失败返回 [`ConfigError::Read`]
/// - JSON 解析失败返回 [`ConfigError::Parse`]
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
