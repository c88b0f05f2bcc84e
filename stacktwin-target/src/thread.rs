//! スレッド管理機能

use std::fmt;

/// リモートスレッドの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

/// スレッドの状態（JDWP の ThreadStatus）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// 終了済み
    Zombie,
    Running,
    Sleeping,
    Monitor,
    Wait,
}

impl ThreadStatus {
    /// JDWP の状態値から変換する
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(ThreadStatus::Zombie),
            1 => Some(ThreadStatus::Running),
            2 => Some(ThreadStatus::Sleeping),
            3 => Some(ThreadStatus::Monitor),
            4 => Some(ThreadStatus::Wait),
            _ => None,
        }
    }
}
