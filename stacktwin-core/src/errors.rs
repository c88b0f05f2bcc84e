//! 実行全体を中断するエラー

use std::time::Duration;
use thiserror::Error;

/// トレース実行の致命的エラー
///
/// セッション層のエラー（`SessionError`）はそのまま伝播し、
/// ここにはオーケストレーション固有の失敗だけを置きます。
#[derive(Debug, Error)]
pub enum TraceError {
    /// トリガーメソッドに一致するメソッドが発見用セッションにない
    #[error("trigger method {0} could not be resolved, check the class and method names")]
    TriggerUnresolvable(String),

    /// ブレークポイントに到達する前にスレッドが終了した
    #[error("thread '{thread}' terminated before reaching the breakpoint at {method}")]
    BreakpointNeverReached { thread: String, method: String },

    /// 停止待ちがキャンセルされた
    #[error("wait for thread '{0}' was cancelled")]
    WaitCancelled(String),

    /// 停止待ちがタイムアウトした
    #[error("thread '{thread}' did not stop within {timeout:?}")]
    WaitTimedOut { thread: String, timeout: Duration },
}
