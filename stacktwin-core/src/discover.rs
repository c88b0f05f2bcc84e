//! コールチェーンの発見
//!
//! 発見用セッション（A）でトリガーメソッドにブレークポイントを設定し、
//! 停止した時点のスタックをメソッド列として記録します。

use crate::errors::TraceError;
use crate::wait::{StopOutcome, StopWaiter};
use crate::Result;
use serde::{Deserialize, Serialize};
use stacktwin_target::{CallChain, MethodDescriptor, Session};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// 再生時にチェーンを辿る順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayOrder {
    /// スレッドの入口から内側へ（呼び出し順に停止できる）
    #[default]
    OutermostFirst,
    /// 記録したまま内側から
    InnermostFirst,
}

impl fmt::Display for ReplayOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReplayOrder::OutermostFirst => f.write_str("outermost-first"),
            ReplayOrder::InnermostFirst => f.write_str("innermost-first"),
        }
    }
}

impl FromStr for ReplayOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "outermost-first" => Ok(ReplayOrder::OutermostFirst),
            "innermost-first" => Ok(ReplayOrder::InnermostFirst),
            other => Err(anyhow::anyhow!(
                "Invalid replay order '{}' (expected outermost-first or innermost-first)",
                other
            )),
        }
    }
}

/// 発見フェーズの結果
///
/// [`CallChainDiscoverer`] だけが作成でき、再生フェーズへムーブで渡されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    thread_name: String,
    trigger: MethodDescriptor,
    chain: CallChain,
}

impl Discovery {
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn trigger(&self) -> &MethodDescriptor {
        &self.trigger
    }

    pub fn chain(&self) -> &CallChain {
        &self.chain
    }

    /// 再生順に並べたメソッド列
    pub fn replay_sequence(&self, order: ReplayOrder) -> Vec<MethodDescriptor> {
        match order {
            ReplayOrder::InnermostFirst => self.chain.iter().cloned().collect(),
            ReplayOrder::OutermostFirst => self.chain.iter().rev().cloned().collect(),
        }
    }
}

/// コールチェーン発見器
pub struct CallChainDiscoverer<'a> {
    waiter: &'a StopWaiter,
}

impl<'a> CallChainDiscoverer<'a> {
    pub fn new(waiter: &'a StopWaiter) -> Self {
        Self { waiter }
    }

    /// トリガーに到達するまでスレッドを走らせ、その時点のスタックを記録する
    pub fn discover<S: Session + ?Sized>(
        &self,
        session: &mut S,
        thread_name: &str,
        trigger: &MethodDescriptor,
    ) -> Result<Discovery> {
        let breakpoint = session
            .install_breakpoint(trigger)?
            .ok_or_else(|| TraceError::TriggerUnresolvable(trigger.to_string()))?;
        info!("Trigger breakpoint {} set at {}", breakpoint, trigger);

        let thread = session.find_thread(thread_name)?;
        session.resume(thread)?;

        match self.waiter.wait(session, thread, thread_name)? {
            StopOutcome::AtBreakpoint => {}
            StopOutcome::Terminated => {
                return Err(TraceError::BreakpointNeverReached {
                    thread: thread_name.to_string(),
                    method: trigger.to_string(),
                }
                .into())
            }
        }

        let mut methods = Vec::new();
        for frame in session.frames(thread)? {
            methods.push(session.frame_method(&frame)?);
        }
        let chain = CallChain::from_innermost(methods);
        info!("Discovered call chain of {} method(s)", chain.len());

        Ok(Discovery {
            thread_name: thread_name.to_string(),
            trigger: trigger.clone(),
            chain,
        })
    }
}
