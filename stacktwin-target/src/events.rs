//! VMから届くイベント

use crate::packet::{IdSizes, Location, PacketReader};
use crate::protocol::event_kind;
use crate::session::{RefTypeId, Result, SessionError};
use crate::thread::ThreadId;

/// 単一のイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    VmStart {
        thread: ThreadId,
    },
    VmDeath,
    Breakpoint {
        request: i32,
        thread: ThreadId,
        location: Location,
    },
    /// ステップ・メソッド出入り（位置付きだが追跡はしない）
    Located {
        kind: u8,
        request: i32,
        thread: ThreadId,
        location: Location,
    },
    ThreadStart {
        thread: ThreadId,
    },
    ThreadDeath {
        thread: ThreadId,
    },
    ClassPrepare {
        thread: ThreadId,
        type_id: RefTypeId,
        signature: String,
    },
    ClassUnload {
        signature: String,
    },
}

/// Composite イベントパケット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSet {
    pub suspend_policy: u8,
    pub events: Vec<Event>,
}

impl EventSet {
    /// Composite コマンドの本体をパースする
    pub fn parse(data: &[u8], sizes: IdSizes) -> Result<Self> {
        let mut reader = PacketReader::new(data, sizes);
        let suspend_policy = reader.read_u8()?;
        let count = reader.read_count()?;
        let mut events = Vec::with_capacity(count);

        for _ in 0..count {
            let kind = reader.read_u8()?;
            let request = reader.read_i32()?;
            let event = match kind {
                event_kind::VM_START => Event::VmStart {
                    thread: reader.read_thread_id()?,
                },
                event_kind::VM_DEATH => Event::VmDeath,
                event_kind::BREAKPOINT => Event::Breakpoint {
                    request,
                    thread: reader.read_thread_id()?,
                    location: reader.read_location()?,
                },
                event_kind::SINGLE_STEP | event_kind::METHOD_ENTRY | event_kind::METHOD_EXIT => {
                    Event::Located {
                        kind,
                        request,
                        thread: reader.read_thread_id()?,
                        location: reader.read_location()?,
                    }
                }
                event_kind::THREAD_START => Event::ThreadStart {
                    thread: reader.read_thread_id()?,
                },
                event_kind::THREAD_DEATH => Event::ThreadDeath {
                    thread: reader.read_thread_id()?,
                },
                event_kind::CLASS_PREPARE => {
                    let thread = reader.read_thread_id()?;
                    let _type_tag = reader.read_u8()?;
                    let type_id = reader.read_ref_type_id()?;
                    let signature = reader.read_string()?;
                    let _status = reader.read_i32()?;
                    Event::ClassPrepare {
                        thread,
                        type_id,
                        signature,
                    }
                }
                event_kind::CLASS_UNLOAD => Event::ClassUnload {
                    signature: reader.read_string()?,
                },
                other => {
                    // 以降のイベントの境界が分からないため、ここで打ち切る
                    return Err(SessionError::Protocol(format!(
                        "unsupported event kind {}",
                        other
                    )));
                }
            };
            events.push(event);
        }

        Ok(Self {
            suspend_policy,
            events,
        })
    }
}
