//! stacktwin ターゲットセッション
//!
//! このクレートは、観測対象のリモートプロセス（JVM）にアタッチして制御するための
//! 低レベル機能を提供します。スレッドの検索、ブレークポイントの設定、
//! スタックフレームと値の読み取りを [`Session`] トレイトとして抽象化し、
//! JDWP による実装 [`JdwpSession`] を含みます。

pub mod breakpoint;
pub mod classify;
pub mod connection;
pub mod events;
pub mod method;
pub mod packet;
pub mod protocol;
pub mod session;
pub mod signature;
pub mod thread;
pub mod value;
pub mod vm;

pub use classify::{classify_tag, ValueKind};
pub use method::{CallChain, MethodDescriptor};
pub use session::{
    BreakpointId, FieldHandle, FrameHandle, RefTypeId, Result, Session, SessionAddress,
    SessionError,
};
pub use thread::{ThreadId, ThreadStatus};
pub use value::{ObjectId, Primitive, RuntimeValue};
pub use vm::JdwpSession;
