//! リモート値の表現

use std::fmt;

/// リモートオブジェクトの識別子
///
/// 循環検出に使う安定した同一性トークンです。値の等価性ではなく、
/// リモート側のオブジェクトIDそのものを比較します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// プリミティブ値
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Boolean(bool),
    Byte(i8),
    /// UTF-16 コードユニット
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Primitive {
    /// char をRustの文字に変換する（サロゲート単体は置換文字）
    pub fn as_char(code_unit: u16) -> char {
        char::from_u32(code_unit as u32).unwrap_or('\u{FFFD}')
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Primitive::Boolean(v) => write!(f, "{}", v),
            Primitive::Byte(v) => write!(f, "{}", v),
            Primitive::Char(c) => write!(f, "'{}'", Primitive::as_char(*c)),
            Primitive::Short(v) => write!(f, "{}", v),
            Primitive::Int(v) => write!(f, "{}", v),
            Primitive::Long(v) => write!(f, "{}", v),
            Primitive::Float(v) => write!(f, "{}", v),
            Primitive::Double(v) => write!(f, "{}", v),
        }
    }
}

/// フレームやフィールドから読み取ったリモート値
///
/// 取りうる種類はこの列挙型で閉じています。新しい種類を追加した場合、
/// すべての `match` がコンパイルエラーになるため分類漏れは起きません。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuntimeValue {
    /// null
    Null,
    /// プリミティブ値
    Primitive(Primitive),
    /// 文字列（葉として扱い、フィールド展開しない）
    String(ObjectId),
    /// 配列
    Array(ObjectId),
    /// クラスメタデータ（java.lang.Class のインスタンス）
    ClassObject(ObjectId),
    /// その他の複合オブジェクト
    Object(ObjectId),
}
