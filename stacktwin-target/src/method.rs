//! メソッド記述子とコールチェーン

use serde::{Deserialize, Serialize};
use std::fmt;

/// 呼び出し可能な単位（メソッド）の記述子
///
/// `parameter_types` が `None` の場合はメソッド名だけで照合し、
/// オーバーロードの曖昧さを許容します。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// 宣言しているクラス名（`java.lang.Runtime` 形式）
    #[serde(rename = "class")]
    pub class_name: String,
    /// メソッド名
    #[serde(rename = "method")]
    pub method_name: String,
    /// 引数の型名（宣言順）
    #[serde(rename = "parameters", default, skip_serializing_if = "Option::is_none")]
    pub parameter_types: Option<Vec<String>>,
}

impl MethodDescriptor {
    /// 引数型を指定せずに記述子を作成する
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            parameter_types: None,
        }
    }

    /// 引数型付きの記述子を作成する
    pub fn with_parameters<I, S>(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        parameters: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            parameter_types: Some(parameters.into_iter().map(Into::into).collect()),
        }
    }

    /// 具体的なメソッドがこの記述子に一致するか判定する
    pub fn matches(&self, class_name: &str, method_name: &str, parameter_types: &[String]) -> bool {
        if self.class_name != class_name || self.method_name != method_name {
            return false;
        }
        match &self.parameter_types {
            Some(expected) => expected.as_slice() == parameter_types,
            None => true,
        }
    }

    /// メソッド名と引数型だけを比較する（クラス名は呼び出し側で解決済みのとき）
    pub fn matches_method(&self, method_name: &str, parameter_types: &[String]) -> bool {
        self.matches(&self.class_name, method_name, parameter_types)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.class_name, self.method_name)?;
        if let Some(params) = &self.parameter_types {
            write!(f, "({})", params.join(", "))?;
        }
        Ok(())
    }
}

/// コールチェーン
///
/// あるブレークポイントで停止した時点でスタック上にあったメソッドの列です。
/// 先頭が最も内側（実行中）のフレーム、末尾がスレッドの入口です。
/// 一度作成したら変更できません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChain {
    methods: Vec<MethodDescriptor>,
}

impl CallChain {
    /// 内側から外側の順に並んだメソッド列からチェーンを作成する
    pub fn from_innermost(methods: Vec<MethodDescriptor>) -> Self {
        Self { methods }
    }

    /// メソッド数
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// 内側から外側の順に走査する
    pub fn iter(&self) -> std::slice::Iter<'_, MethodDescriptor> {
        self.methods.iter()
    }

    /// メソッド列をスライスで取得する
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

impl<'a> IntoIterator for &'a CallChain {
    type Item = &'a MethodDescriptor;
    type IntoIter = std::slice::Iter<'a, MethodDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.methods.iter()
    }
}
