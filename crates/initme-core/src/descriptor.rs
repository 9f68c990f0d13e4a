//! 服务描述模型（对应配置文件中的 `service` 节）。
//!
//! 约定：
//! - 所有字段均通过 `#[serde(default)]` 提供默认值（空字符串），以便配置向前兼容
//! - 字段“存在”当且仅当非空；空字段不会生成任何 `sc.exe` 参数
//! - 本模块仅定义数据结构，不执行任何 IO
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;

use serde::{Deserialize, Serialize};

/// 单个服务实例的声明式描述。
///
/// 字段说明（括号内为对应的 `sc.exe` 参数）：
/// - `name`：服务名，唯一标识（必填）
/// - `service_type`（`type=`）、`start_type`（`start=`）、`error_severity`（`error=`）
/// - `bin_path`（`binpath=`）：可执行文件及其参数（必填）
/// - `group`（`group=`）、`tag`（`tag=`）、`depend`（`depend=`）
/// - `obj`（`obj=`）：运行身份账号
/// - `display_name`（`DisplayName=`）
/// - `password`（`password=`）：账号凭据
///
/// 安全注意：
/// - `Debug` 输出会屏蔽 `password`，避免凭据进入日志
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDescriptor {
    pub name: String,
    pub service_type: String,
    pub start_type: String,
    pub error_severity: String,
    pub bin_path: String,
    pub group: String,
    pub tag: String,
    pub depend: String,
    pub obj: String,
    pub display_name: String,
    pub password: String,
}

impl ServiceDescriptor {
    /// 以必填字段创建描述，其余字段为空。
    pub fn new(name: impl Into<String>, bin_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bin_path: bin_path.into(),
            ..Self::default()
        }
    }
}

/// 将空字符串视为“未设置”。
pub(crate) fn present(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("service_type", &self.service_type)
            .field("start_type", &self.start_type)
            .field("error_severity", &self.error_severity)
            .field("bin_path", &self.bin_path)
            .field("group", &self.group)
            .field("tag", &self.tag)
            .field("depend", &self.depend)
            .field("obj", &self.obj)
            .field("display_name", &self.display_name)
            .field("password", &present(&self.password).map(|_| "***"))
            .finish()
    }
}
