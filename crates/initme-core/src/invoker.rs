//! 控制命令执行（默认基于 `sc.exe`）。
//!
//! 说明：
//! - 每次调用都是一次独立的外部进程执行，不保留任何资源
//! - 结果统一为三元组：输出文本、启动错误、退出码
//! - 退出码非 0 不视为“调用错误”，仅作为数据返回给调用方
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

/// 默认的服务控制程序。
pub const SC_PROGRAM: &str = "sc.exe";

/// 一次控制命令的执行结果。
///
/// 字段说明：
/// - `output`：stdout 与 stderr 合并后的文本（stdout 在前）
/// - `error`：仅当程序无法启动时为 `Some`（例如程序不存在）
/// - `code`：进程退出码；程序未能启动时为 `None`
#[derive(Debug)]
pub struct CommandOutcome {
    pub output: String,
    pub error: Option<io::Error>,
    pub code: Option<i32>,
}

impl CommandOutcome {
    /// 程序已启动且退出码为 0。
    pub fn success(&self) -> bool {
        self.error.is_none() && self.code == Some(0)
    }

    /// 转换为 `anyhow::Result`，失败时附带输出文本便于排障。
    pub fn into_result(self) -> Result<String> {
        if let Some(e) = self.error {
            return Err(anyhow!("控制程序启动失败: {e}"));
        }
        match self.code {
            Some(0) => Ok(self.output),
            Some(code) => Err(anyhow!("控制命令执行失败（退出码 {code}）:\n{}", self.output)),
            None => Err(anyhow!("控制命令未返回退出码:\n{}", self.output)),
        }
    }
}

/// 外部服务控制程序。
#[derive(Debug, Clone)]
pub struct ControlFacility {
    program: PathBuf,
}

impl Default for ControlFacility {
    fn default() -> Self {
        Self::new(SC_PROGRAM)
    }
}

impl ControlFacility {
    /// 使用指定程序（路径或程序名）创建。
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// 执行一次控制命令。
    ///
    /// 参数：
    /// - `args`：传给控制程序的参数（不包含程序名）
    ///
    /// 返回值：
    /// - 始终返回完整的 [`CommandOutcome`]；命令行、输出、错误与退出码均会写入日志
    pub fn execute<S: AsRef<str>>(&self, args: &[S]) -> CommandOutcome {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        info!("{}", render_command(&self.program, &args));

        let outcome = match Command::new(&self.program).args(&args).output() {
            Ok(out) => {
                let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                output.push_str(&String::from_utf8_lossy(&out.stderr));
                CommandOutcome {
                    output,
                    error: None,
                    code: Some(exit_code(out.status)),
                }
            }
            Err(e) => CommandOutcome {
                output: String::new(),
                error: Some(e),
                code: None,
            },
        };

        let logged = redact_output(&outcome.output, &args);
        match &outcome.error {
            Some(e) => warn!(output = %logged, error = %e, code = ?outcome.code, "控制程序启动失败"),
            None => info!(output = %logged, code = ?outcome.code, "控制命令完成"),
        }
        outcome
    }
}

/// 凭据参数（其后一个参数为明文密码）。
const PASSWORD_FLAG: &str = "password=";
const MASK: &str = "***";

/// 屏蔽 `password=` 之后的参数，用于日志输出。
pub fn redact_args(args: &[&str]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            redacted.push(MASK.to_string());
        } else {
            redacted.push(arg.to_string());
        }
        mask_next = arg.eq_ignore_ascii_case(PASSWORD_FLAG);
    }
    redacted
}

/// 日志中展示的命令行（凭据已屏蔽）。
pub fn render_command(program: &Path, args: &[&str]) -> String {
    format!("{} {:?}", program.display(), redact_args(args))
}

/// 屏蔽输出文本中回显的凭据。
fn redact_output(output: &str, args: &[&str]) -> String {
    let mut logged = output.to_string();
    for pair in args.windows(2) {
        if pair[0].eq_ignore_ascii_case(PASSWORD_FLAG) && !pair[1].is_empty() {
            logged = logged.replace(pair[1], MASK);
        }
    }
    logged
}

/// 从进程退出状态中提取整数结果码。
///
/// Unix 上被信号终止的进程没有退出码，按 shell 习惯映射为 `128 + 信号值`。
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_command_hides_password() {
        let args = ["create", "demo", "binpath=", "x", "obj=", ".\\svc", "password=", "hunter2"];
        let line = render_command(Path::new("sc.exe"), &args);
        assert!(!line.contains("hunter2"), "{line}");
        assert!(line.contains("\"password=\", \"***\""), "{line}");
        assert!(line.contains("\"binpath=\", \"x\""), "{line}");
    }

    #[test]
    fn echoed_password_is_masked_in_logged_output() {
        let args = ["create", "demo", "password=", "hunter2"];
        let logged = redact_output("create|demo|password=|hunter2\n", &args);
        assert_eq!(logged, "create|demo|password=|***\n");
    }

    #[test]
    fn missing_program_reports_launch_error() {
        let facility = ControlFacility::new("initme-definitely-missing-program");
        let outcome = facility.execute(&["query", "demo"]);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.code, None);
        assert!(!outcome.success());
        assert!(outcome.into_result().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_data_not_error() {
        let facility = ControlFacility::new("sh");
        let outcome = facility.execute(&["-c", "echo out; echo err 1>&2; exit 7"]);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.code, Some(7));
        assert_eq!(outcome.output, "out\nerr\n");
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let facility = ControlFacility::new("sh");
        let outcome = facility.execute(&["-c", "printf ok"]);
        assert!(outcome.success());
        assert_eq!(outcome.into_result().unwrap(), "ok");
    }

    #[cfg(unix)]
    #[test]
    fn signal_termination_maps_to_shell_code() {
        let facility = ControlFacility::new("sh");
        let outcome = facility.execute(&["-c", "kill -9 $$"]);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.code, Some(137));
    }
}
