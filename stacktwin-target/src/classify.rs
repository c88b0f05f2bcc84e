//! 値の分類
//!
//! リモート値の種類は閉じた集合です。ワイヤ上のタグを分類する時点で
//! 未知の種類を検出し、致命的エラーとして報告します。

use crate::protocol::tag;
use crate::session::SessionError;
use std::fmt;

/// 値の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Primitive,
    String,
    Array,
    ClassMetadata,
    Composite,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueKind::Primitive => "primitive",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::ClassMetadata => "class-metadata",
            ValueKind::Composite => "composite",
        };
        f.write_str(name)
    }
}

/// JDWPの値タグを分類する
///
/// スレッド・スレッドグループ・クラスローダーは複合オブジェクトとして扱います。
/// `void` を含む未知のタグは `UnknownValueKind` になります。
pub fn classify_tag(value_tag: u8) -> Result<ValueKind, SessionError> {
    match value_tag {
        tag::BOOLEAN | tag::BYTE | tag::CHAR | tag::SHORT | tag::INT | tag::LONG | tag::FLOAT
        | tag::DOUBLE => Ok(ValueKind::Primitive),
        tag::STRING => Ok(ValueKind::String),
        tag::ARRAY => Ok(ValueKind::Array),
        tag::CLASS_OBJECT => Ok(ValueKind::ClassMetadata),
        tag::OBJECT | tag::THREAD | tag::THREAD_GROUP | tag::CLASS_LOADER => {
            Ok(ValueKind::Composite)
        }
        other => Err(SessionError::UnknownValueKind(other as char)),
    }
}
