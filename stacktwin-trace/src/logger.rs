//! トレース出力の抽象化
//!
//! 抽出器は値を走査しながら [`TraceLogger`] のフックを順に呼び出します。
//! フックは入れ子のスコープ（停止 > フレーム > 引数/レシーバ > 参照 > フィールド/要素）
//! を表し、開始と終了が必ず対になります。

use crate::json::JsonLogger;
use crate::text::TextLogger;
use crate::Result;
use serde::{Deserialize, Serialize};
use stacktwin_target::{MethodDescriptor, ObjectId, Primitive};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// トレース出力のシンク
pub trait TraceLogger {
    /// ブレークポイント停止の開始（`stop` は 1 始まり）
    fn stop_start(&mut self, stop: usize, thread: &str) -> Result<()>;
    fn stop_end(&mut self) -> Result<()>;

    /// フレームの開始（0 が最も内側）
    fn frame_start(&mut self, index: usize) -> Result<()>;
    fn frame_end(&mut self) -> Result<()>;

    /// フレームで実行中のメソッド
    fn method_signature(&mut self, method: &MethodDescriptor) -> Result<()>;

    fn arguments_start(&mut self) -> Result<()>;
    fn arguments_end(&mut self) -> Result<()>;
    /// 引数リスト全体が読めない（arguments_start と arguments_end の間で呼ばれる）
    fn arguments_inaccessible(&mut self) -> Result<()>;

    fn receiver_start(&mut self) -> Result<()>;
    fn receiver_end(&mut self) -> Result<()>;
    /// レシーバが読めない（receiver_start と receiver_end の間で呼ばれる）
    fn receiver_inaccessible(&mut self) -> Result<()>;

    /// 同一性を持つ値（配列・クラス・オブジェクト）の開始
    fn reference_open(&mut self, id: ObjectId, type_name: &str, depth: usize) -> Result<()>;
    fn reference_close(&mut self) -> Result<()>;

    fn fields_start(&mut self) -> Result<()>;
    fn fields_end(&mut self) -> Result<()>;
    fn field_start(&mut self, name: &str, depth: usize) -> Result<()>;
    fn field_end(&mut self) -> Result<()>;

    fn array_start(&mut self) -> Result<()>;
    fn array_end(&mut self) -> Result<()>;
    fn element_start(&mut self, index: usize, depth: usize) -> Result<()>;
    fn element_end(&mut self) -> Result<()>;

    /// 兄弟要素（引数・フィールド・配列要素）の区切り
    fn separator(&mut self) -> Result<()>;

    fn primitive(&mut self, value: &Primitive) -> Result<()>;
    fn string(&mut self, value: &str) -> Result<()>;
    fn null_value(&mut self) -> Result<()>;

    /// 深さ制限に達した
    fn depth_limit(&mut self, depth: usize) -> Result<()>;
    /// 展開済みの参照
    fn already_visited(&mut self) -> Result<()>;
    /// 読み取れなかったフィールド（field_start/field_end の代わりに呼ばれる）
    fn inaccessible_field(&mut self, name: &str, depth: usize) -> Result<()>;
    /// 値の位置で読み取れなかった値（回収済みオブジェクトなど）
    fn inaccessible_value(&mut self) -> Result<()>;
    /// 型が未準備のためフィールドを列挙できない
    fn type_not_ready(&mut self) -> Result<()>;
    fn empty_array(&mut self) -> Result<()>;

    /// 開いているスコープを閉じ、出力をフラッシュする
    fn finish(&mut self) -> Result<()>;
}

impl<L: TraceLogger + ?Sized> TraceLogger for Box<L> {
    fn stop_start(&mut self, stop: usize, thread: &str) -> Result<()> {
        (**self).stop_start(stop, thread)
    }
    fn stop_end(&mut self) -> Result<()> {
        (**self).stop_end()
    }
    fn frame_start(&mut self, index: usize) -> Result<()> {
        (**self).frame_start(index)
    }
    fn frame_end(&mut self) -> Result<()> {
        (**self).frame_end()
    }
    fn method_signature(&mut self, method: &MethodDescriptor) -> Result<()> {
        (**self).method_signature(method)
    }
    fn arguments_start(&mut self) -> Result<()> {
        (**self).arguments_start()
    }
    fn arguments_end(&mut self) -> Result<()> {
        (**self).arguments_end()
    }
    fn arguments_inaccessible(&mut self) -> Result<()> {
        (**self).arguments_inaccessible()
    }
    fn receiver_start(&mut self) -> Result<()> {
        (**self).receiver_start()
    }
    fn receiver_end(&mut self) -> Result<()> {
        (**self).receiver_end()
    }
    fn receiver_inaccessible(&mut self) -> Result<()> {
        (**self).receiver_inaccessible()
    }
    fn reference_open(&mut self, id: ObjectId, type_name: &str, depth: usize) -> Result<()> {
        (**self).reference_open(id, type_name, depth)
    }
    fn reference_close(&mut self) -> Result<()> {
        (**self).reference_close()
    }
    fn fields_start(&mut self) -> Result<()> {
        (**self).fields_start()
    }
    fn fields_end(&mut self) -> Result<()> {
        (**self).fields_end()
    }
    fn field_start(&mut self, name: &str, depth: usize) -> Result<()> {
        (**self).field_start(name, depth)
    }
    fn field_end(&mut self) -> Result<()> {
        (**self).field_end()
    }
    fn array_start(&mut self) -> Result<()> {
        (**self).array_start()
    }
    fn array_end(&mut self) -> Result<()> {
        (**self).array_end()
    }
    fn element_start(&mut self, index: usize, depth: usize) -> Result<()> {
        (**self).element_start(index, depth)
    }
    fn element_end(&mut self) -> Result<()> {
        (**self).element_end()
    }
    fn separator(&mut self) -> Result<()> {
        (**self).separator()
    }
    fn primitive(&mut self, value: &Primitive) -> Result<()> {
        (**self).primitive(value)
    }
    fn string(&mut self, value: &str) -> Result<()> {
        (**self).string(value)
    }
    fn null_value(&mut self) -> Result<()> {
        (**self).null_value()
    }
    fn depth_limit(&mut self, depth: usize) -> Result<()> {
        (**self).depth_limit(depth)
    }
    fn already_visited(&mut self) -> Result<()> {
        (**self).already_visited()
    }
    fn inaccessible_field(&mut self, name: &str, depth: usize) -> Result<()> {
        (**self).inaccessible_field(name, depth)
    }
    fn inaccessible_value(&mut self) -> Result<()> {
        (**self).inaccessible_value()
    }
    fn type_not_ready(&mut self) -> Result<()> {
        (**self).type_not_ready()
    }
    fn empty_array(&mut self) -> Result<()> {
        (**self).empty_array()
    }
    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// 未知の出力形式
#[derive(Debug, Error)]
#[error("unknown output format '{0}' (expected one of: txt, json)")]
pub struct UnknownFormat(pub String);

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    /// 階層テキスト
    #[default]
    Txt,
    /// 入れ子のJSON
    Json,
}

impl LoggerFormat {
    /// 登録済みの全形式
    pub const ALL: [LoggerFormat; 2] = [LoggerFormat::Txt, LoggerFormat::Json];

    pub fn name(&self) -> &'static str {
        match self {
            LoggerFormat::Txt => "txt",
            LoggerFormat::Json => "json",
        }
    }

    /// 既定の拡張子
    pub fn default_extension(&self) -> &'static str {
        match self {
            LoggerFormat::Txt => "txt",
            LoggerFormat::Json => "json",
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LoggerFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// 形式に応じたロガーを作成する
pub fn create_logger<W: Write + 'static>(format: LoggerFormat, writer: W) -> Box<dyn TraceLogger> {
    match format {
        LoggerFormat::Txt => Box::new(TextLogger::new(writer)),
        LoggerFormat::Json => Box::new(JsonLogger::new(writer)),
    }
}

/// 出力ファイルのパス（`<base>.<extension>`）
pub fn output_path(base: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", base, extension.trim_start_matches('.')))
}

/// 出力ファイルを作成し、そこに書き込むロガーを返す
pub fn open_output(
    format: LoggerFormat,
    base: &str,
    extension: Option<&str>,
) -> Result<(PathBuf, Box<dyn TraceLogger>)> {
    let extension = extension.unwrap_or_else(|| format.default_extension());
    let path = output_path(base, extension);
    let file = File::create(&path)
        .map_err(|e| anyhow::anyhow!("Failed to create output file {}: {}", path.display(), e))?;
    tracing::debug!("Writing {} trace to {}", format, path.display());
    Ok((path, create_logger(format, BufWriter::new(file))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("txt".parse::<LoggerFormat>().unwrap(), LoggerFormat::Txt);
        assert_eq!("JSON".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
        let err = "xml".parse::<LoggerFormat>().unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path("trace", "txt"), PathBuf::from("trace.txt"));
        assert_eq!(output_path("out/run1", ".log"), PathBuf::from("out/run1.log"));
    }
}
