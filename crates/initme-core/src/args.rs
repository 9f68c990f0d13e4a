//! `sc.exe` 参数构建与描述校验。
//!
//! 参数格式参考 `sc.exe` 约定：每个选项写作 `flag=` 与取值两个独立参数
//! （例如 `binpath=` `C:\svc.exe`），顺序固定。
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use thiserror::Error;

use crate::descriptor::{present, ServiceDescriptor};

/// 描述校验失败（在启动任何外部进程之前发现）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("服务名（name）为必填项")]
    MissingName,
    #[error("可执行路径（bin_path）为必填项")]
    MissingBinPath,
    /// `obj` 与 `password` 同时设置。
    #[error("obj 与 password 不能同时设置")]
    CredentialConflict,
}

/// 将描述转换为有序的 `sc.exe` 参数列表。
///
/// 参数：
/// - `descriptor`：服务描述
/// - `base`：基础命令（例如 `["create"]`），原样置于最前
///
/// 返回值：
/// - 成功：`base` + 服务名 + 各已设置字段的 `flag=` / 取值对
///
/// 异常处理：
/// - 服务名为空：[`ValidationError::MissingName`]
/// - 可执行路径为空：[`ValidationError::MissingBinPath`]
/// - `obj` 与 `password` 同时设置：[`ValidationError::CredentialConflict`]
pub fn build_sc_args(
    descriptor: &ServiceDescriptor,
    base: &[&str],
) -> Result<Vec<String>, ValidationError> {
    let name = present(&descriptor.name).ok_or(ValidationError::MissingName)?;

    let mut args: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    args.push(name.to_string());

    let mut push = |flag: &str, value: Option<&str>| {
        if let Some(v) = value {
            args.push(flag.to_string());
            args.push(v.to_string());
        }
    };

    push("type=", present(&descriptor.service_type));
    push("start=", present(&descriptor.start_type));
    push("error=", present(&descriptor.error_severity));
    let bin_path = present(&descriptor.bin_path).ok_or(ValidationError::MissingBinPath)?;
    push("binpath=", Some(bin_path));
    push("group=", present(&descriptor.group));
    push("tag=", present(&descriptor.tag));
    push("depend=", present(&descriptor.depend));

    let obj = present(&descriptor.obj);
    let password = present(&descriptor.password);
    if obj.is_some() && password.is_some() {
        return Err(ValidationError::CredentialConflict);
    }
    push("obj=", obj);
    push("password=", password);

    push("DisplayName=", present(&descriptor.display_name));

    Ok(args)
}
