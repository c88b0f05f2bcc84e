//! ブレークポイントの順次設定

use crate::Result;
use stacktwin_target::{BreakpointId, MethodDescriptor, Session};
use std::collections::VecDeque;
use tracing::{info, warn};

/// 設定済みのブレークポイント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedBreakpoint {
    pub id: BreakpointId,
    pub method: MethodDescriptor,
}

/// 記述子を与えられた順に1つずつブレークポイントとして設定する
///
/// 解決できない記述子は記録してスキップし、次を試します。
#[derive(Debug, Clone)]
pub struct BreakpointSequencer {
    pending: VecDeque<MethodDescriptor>,
    skipped: Vec<MethodDescriptor>,
    installed: usize,
}

impl BreakpointSequencer {
    pub fn new(methods: impl IntoIterator<Item = MethodDescriptor>) -> Self {
        Self {
            pending: methods.into_iter().collect(),
            skipped: Vec::new(),
            installed: 0,
        }
    }

    /// 次に設定できるブレークポイントを設定する。尽きたら `None`
    pub fn advance<S: Session + ?Sized>(&mut self, session: &mut S) -> Result<Option<ArmedBreakpoint>> {
        while let Some(method) = self.pending.pop_front() {
            match session.install_breakpoint(&method)? {
                Some(id) => {
                    self.installed += 1;
                    info!("Breakpoint {} armed at {}", id, method);
                    return Ok(Some(ArmedBreakpoint { id, method }));
                }
                None => {
                    warn!("Skipping {}: not resolvable in this session", method);
                    self.skipped.push(method);
                }
            }
        }
        Ok(None)
    }

    /// まだ試していない記述子の数
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// スキップした記述子
    pub fn skipped(&self) -> &[MethodDescriptor] {
        &self.skipped
    }

    /// 設定できたブレークポイントの数
    pub fn installed(&self) -> usize {
        self.installed
    }
}
