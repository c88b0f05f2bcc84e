//! stacktwin トレース出力
//!
//! このクレートは、抽出した値の木を構造化された出力に書き出すロガーを提供します。
//! 階層テキスト（[`TextLogger`]）と入れ子JSON（[`JsonLogger`]）の2形式があり、
//! どちらもストリーミングで書き出します。

pub mod json;
pub mod logger;
pub mod text;

pub use json::JsonLogger;
pub use logger::{create_logger, open_output, output_path, LoggerFormat, TraceLogger, UnknownFormat};
pub use text::TextLogger;

/// トレース出力の結果型
pub type Result<T> = anyhow::Result<T>;
