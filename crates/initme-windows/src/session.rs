//! 运行会话检测（交互式控制台 / 服务）。
//!
//! 判定依据为进程令牌的组 SID：
//! - 含 INTERACTIVE（S-1-5-4）：交互式会话
//! - 含 SERVICE（S-1-5-6）：由服务管理器启动
//! - 按令牌中组的顺序，先命中者为准；均未命中视为非交互式
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

/// NT 授权机构（S-1-5）。
const NT_AUTHORITY: [u8; 6] = [0, 0, 0, 0, 0, 5];
const INTERACTIVE_RID: u32 = 4;
const SERVICE_RID: u32 = 6;

/// 令牌中的一个组 SID（授权机构 + 子授权序列）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSid<'a> {
    pub authority: [u8; 6],
    pub sub_authorities: &'a [u32],
}

impl GroupSid<'_> {
    fn is_well_known(&self, rid: u32) -> bool {
        self.authority == NT_AUTHORITY && self.sub_authorities == [rid]
    }
}

/// 根据令牌组判断是否为交互式会话。
pub fn classify_groups<'a>(groups: impl IntoIterator<Item = GroupSid<'a>>) -> bool {
    for group in groups {
        if group.is_well_known(INTERACTIVE_RID) {
            return true;
        }
        if group.is_well_known(SERVICE_RID) {
            return false;
        }
    }
    false
}

/// 判断当前进程是否运行在交互式会话中。
///
/// 返回值：
/// - `Ok(true)`：令牌含 INTERACTIVE 组，应以控制台模式运行
/// - `Ok(false)`：令牌含 SERVICE 组或两者皆无，应启动服务调度器
///
/// 异常处理：
/// - 打开进程令牌或读取令牌组失败时返回错误
#[cfg(windows)]
pub fn is_interactive_session() -> anyhow::Result<bool> {
    use std::ffi::c_void;

    use anyhow::Context;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{GetTokenInformation, TokenGroups, SID, TOKEN_GROUPS, TOKEN_QUERY};
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    let mut token = HANDLE::default();
    unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) }
        .context("打开进程令牌失败")?;

    let groups = (|| -> anyhow::Result<bool> {
        let mut needed = 0u32;
        // 第一次调用仅用于获取缓冲区大小，必然返回 ERROR_INSUFFICIENT_BUFFER。
        let _ = unsafe { GetTokenInformation(token, TokenGroups, None, 0, &mut needed) };
        let mut buffer = vec![0u64; (needed as usize).div_ceil(8)];
        unsafe {
            GetTokenInformation(
                token,
                TokenGroups,
                Some(buffer.as_mut_ptr() as *mut c_void),
                needed,
                &mut needed,
            )
        }
        .context("读取令牌组失败")?;

        let groups = unsafe { &*(buffer.as_ptr() as *const TOKEN_GROUPS) };
        let entries =
            unsafe { std::slice::from_raw_parts(groups.Groups.as_ptr(), groups.GroupCount as usize) };
        let sids = entries.iter().filter(|e| !e.Sid.0.is_null()).map(|e| {
            let sid = unsafe { &*(e.Sid.0 as *const SID) };
            let sub_authorities = unsafe {
                std::slice::from_raw_parts(sid.SubAuthority.as_ptr(), sid.SubAuthorityCount as usize)
            };
            GroupSid {
                authority: sid.IdentifierAuthority.Value,
                sub_authorities,
            }
        });
        Ok(classify_groups(sids))
    })();

    let _ = unsafe { CloseHandle(token) };
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nt(rids: &[u32]) -> GroupSid<'_> {
        GroupSid {
            authority: NT_AUTHORITY,
            sub_authorities: rids,
        }
    }

    #[test]
    fn interactive_group_means_console() {
        let groups = [nt(&[32, 544]), nt(&[INTERACTIVE_RID]), nt(&[11])];
        assert!(classify_groups(groups));
    }

    #[test]
    fn service_group_means_dispatcher() {
        let groups = [nt(&[18]), nt(&[SERVICE_RID])];
        assert!(!classify_groups(groups));
    }

    #[test]
    fn session_zero_console_is_still_interactive() {
        // SYSTEM 身份在会话 0 中手工启动：令牌带 INTERACTIVE 而非 SERVICE。
        let groups = [nt(&[18]), nt(&[INTERACTIVE_RID])];
        assert!(classify_groups(groups));
    }

    #[test]
    fn first_matching_group_wins() {
        assert!(!classify_groups([nt(&[SERVICE_RID]), nt(&[INTERACTIVE_RID])]));
        assert!(classify_groups([nt(&[INTERACTIVE_RID]), nt(&[SERVICE_RID])]));
    }

    #[test]
    fn unrelated_groups_are_not_interactive() {
        let world = GroupSid {
            authority: [0, 0, 0, 0, 0, 1],
            sub_authorities: &[0],
        };
        let other_authority = GroupSid {
            authority: [0, 0, 0, 0, 0, 16],
            sub_authorities: &[INTERACTIVE_RID],
        };
        assert!(!classify_groups([world, other_authority, nt(&[INTERACTIVE_RID, 1])]));
        assert!(!classify_groups(std::iter::empty()));
    }
}
