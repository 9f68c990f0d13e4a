//! 后台任务（Job）与取消信号。
//!
//! 后台任务在服务进入 Running 后启动，与控制循环并发执行；
//! 控制循环退出时通过 [`ShutdownSignal`] 通知任务结束。
//!
//! 作者：initme 项目组
//! 创建时间：2026-10-18
//! 修改时间：2026-10-18

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::watch;

/// 后台任务返回的 future。
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// 用户提供的后台任务。
pub struct Job(Box<dyn FnOnce(ShutdownSignal) -> JobFuture + Send + 'static>);

impl Job {
    /// 以异步闭包创建任务。
    ///
    /// 示例：
    /// ```
    /// use initme_core::job::Job;
    ///
    /// let job = Job::new(|mut shutdown| async move {
    ///     shutdown.cancelled().await;
    /// });
    /// # drop(job);
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(ShutdownSignal) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Box::new(move |signal| -> JobFuture { Box::pin(f(signal)) }))
    }

    /// 不做任何事的任务。
    pub fn idle() -> Self {
        Self::new(|_| async {})
    }

    pub(crate) fn start(self, signal: ShutdownSignal) -> JobFuture {
        (self.0)(signal)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Job")
    }
}

/// 取消信号（只读端），可克隆给任务内部的多个子任务。
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// 是否已请求停止。
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待停止请求。发送端被丢弃同样视为停止。
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// 取消信号的发送端（由控制器持有）。
#[derive(Debug)]
pub(crate) struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub(crate) fn new() -> (Self, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownSignal { rx })
    }

    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_observes_cancel() {
        let (trigger, mut signal) = ShutdownTrigger::new();
        assert!(!signal.is_cancelled());
        trigger.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_trigger_releases_waiters() {
        let (trigger, mut signal) = ShutdownTrigger::new();
        drop(trigger);
        signal.cancelled().await;
    }
}
