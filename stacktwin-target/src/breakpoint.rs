//! ブレークポイント管理

use crate::method::MethodDescriptor;
use crate::session::BreakpointId;
use std::collections::HashMap;

/// 論理ブレークポイント
///
/// 記述子がオーバーロードに一致する場合、1つの論理ブレークポイントが
/// 複数のイベントリクエストを持ちます。
#[derive(Debug, Clone)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub method: MethodDescriptor,
    /// JDWP イベントリクエストID
    pub requests: Vec<i32>,
}

/// ブレークポイントマネージャ
///
/// 論理ブレークポイントとVM側のイベントリクエストの対応を管理します。
pub struct BreakpointManager {
    breakpoints: HashMap<BreakpointId, Breakpoint>,
    next_id: u32,
}

impl BreakpointManager {
    /// 新しいブレークポイントマネージャを作成する
    pub fn new() -> Self {
        Self {
            breakpoints: HashMap::new(),
            next_id: 1,
        }
    }

    /// ブレークポイントを登録する
    pub fn add(&mut self, method: MethodDescriptor, requests: Vec<i32>) -> BreakpointId {
        let id = BreakpointId(self.next_id);
        self.next_id += 1;
        self.breakpoints.insert(
            id,
            Breakpoint {
                id,
                method,
                requests,
            },
        );
        id
    }

    /// ブレークポイントを登録解除し、そのイベントリクエストを返す
    pub fn remove(&mut self, id: BreakpointId) -> Option<Breakpoint> {
        self.breakpoints.remove(&id)
    }

    /// イベントリクエストIDから論理ブレークポイントを探す
    pub fn find_by_request(&self, request: i32) -> Option<BreakpointId> {
        self.breakpoints
            .values()
            .find(|bp| bp.requests.contains(&request))
            .map(|bp| bp.id)
    }
}

impl Default for BreakpointManager {
    fn default() -> Self {
        Self::new()
    }
}
