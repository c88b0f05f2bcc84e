//! ブレークポイント停止の待ち合わせ

use crate::errors::TraceError;
use crate::Result;
use stacktwin_target::{Session, ThreadId};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// 待ち合わせの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// ブレークポイントで停止した
    AtBreakpoint,
    /// スレッドが終了した
    Terminated,
}

/// 一定間隔でスレッドの状態をポーリングする待ち合わせ
///
/// 毎回キャンセルトークンを確認し、タイムアウトが設定されていれば
/// 経過時間も確認します。
#[derive(Debug, Clone)]
pub struct StopWaiter {
    interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl StopWaiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// スレッドがブレークポイントで停止するか終了するまで待つ
    pub fn wait<S: Session + ?Sized>(
        &self,
        session: &mut S,
        thread: ThreadId,
        thread_name: &str,
    ) -> Result<StopOutcome> {
        let started = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(TraceError::WaitCancelled(thread_name.to_string()).into());
            }
            if session.is_at_breakpoint(thread)? {
                trace!("{} stopped after {:?}", thread, started.elapsed());
                return Ok(StopOutcome::AtBreakpoint);
            }
            if session.is_terminated(thread)? {
                return Ok(StopOutcome::Terminated);
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(TraceError::WaitTimedOut {
                        thread: thread_name.to_string(),
                        timeout,
                    }
                    .into());
                }
            }
            std::thread::sleep(self.interval);
        }
    }
}

impl Default for StopWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(5))
    }
}
