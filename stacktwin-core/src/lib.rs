//! stacktwin のコア機能
//!
//! このクレートは、トレーサーの中核となるロジックを提供します。
//! 1つ目のプロセスでコールチェーンを発見し、2つ目のプロセスでそのチェーンを
//! ブレークポイント列として再生しながら、各停止のスタックを深く抽出します。

pub mod discover;
pub mod driver;
pub mod errors;
pub mod extractor;
pub mod parse;
pub mod sequencer;
pub mod snapshot;
pub mod tracer;
pub mod wait;

pub use discover::{CallChainDiscoverer, Discovery, ReplayOrder};
pub use driver::{DriveState, StackWalkDriver, WalkSummary};
pub use errors::TraceError;
pub use extractor::{DepthBudget, StackExtractor};
pub use sequencer::{ArmedBreakpoint, BreakpointSequencer};
pub use snapshot::{FrameSnapshot, Readout};
pub use tracer::{TraceOptions, Tracer};
pub use wait::{StopOutcome, StopWaiter};

/// コア処理の結果型
pub type Result<T> = anyhow::Result<T>;
