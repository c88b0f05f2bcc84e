//! JNI型シグネチャと型名の相互変換

use crate::session::SessionError;

/// メソッドシグネチャ（`(Ljava/lang/String;I)V` 形式）を分解したもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// 引数の型シグネチャ（宣言順）
    pub parameters: Vec<String>,
    /// 戻り値の型シグネチャ
    pub return_type: String,
}

impl MethodSignature {
    /// シグネチャ文字列をパースする
    pub fn parse(signature: &str) -> Result<Self, SessionError> {
        let inner = signature
            .strip_prefix('(')
            .ok_or_else(|| malformed(signature))?;
        let close = inner.find(')').ok_or_else(|| malformed(signature))?;
        let (mut params, ret) = (&inner[..close], &inner[close + 1..]);

        let mut parameters = Vec::new();
        while !params.is_empty() {
            let (head, rest) = split_type(params).ok_or_else(|| malformed(signature))?;
            parameters.push(head.to_string());
            params = rest;
        }

        match split_type(ret) {
            Some((head, "")) => Ok(Self {
                parameters,
                return_type: head.to_string(),
            }),
            _ => Err(malformed(signature)),
        }
    }

    /// 引数の型名（`java.lang.String` 形式）を取得する
    pub fn parameter_type_names(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|s| signature_to_type_name(s))
            .collect()
    }
}

fn malformed(signature: &str) -> SessionError {
    SessionError::Protocol(format!("malformed method signature '{}'", signature))
}

/// 先頭の型シグネチャを1つ切り出す
fn split_type(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'L' => {
            let end = s[i..].find(';')? + i;
            Some((&s[..=end], &s[end + 1..]))
        }
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' => {
            Some((&s[..=i], &s[i + 1..]))
        }
        _ => None,
    }
}

/// 型シグネチャを型名に変換する
///
/// # Examples
/// ```
/// use stacktwin_target::signature::signature_to_type_name;
///
/// assert_eq!(signature_to_type_name("Ljava/lang/String;"), "java.lang.String");
/// assert_eq!(signature_to_type_name("[[I"), "int[][]");
/// ```
pub fn signature_to_type_name(signature: &str) -> String {
    let mut sig = signature;
    let mut dims = 0usize;
    while let Some(rest) = sig.strip_prefix('[') {
        dims += 1;
        sig = rest;
    }

    let base = if let Some(class) = sig.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        class.replace('/', ".")
    } else {
        match sig.as_bytes().first().copied() {
            Some(b'B') => "byte".to_string(),
            Some(b'C') => "char".to_string(),
            Some(b'D') => "double".to_string(),
            Some(b'F') => "float".to_string(),
            Some(b'I') => "int".to_string(),
            Some(b'J') => "long".to_string(),
            Some(b'S') => "short".to_string(),
            Some(b'Z') => "boolean".to_string(),
            Some(b'V') => "void".to_string(),
            _ => "<unknown>".to_string(),
        }
    };

    let mut out = base;
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

/// クラス名（`java.lang.Runtime`）をクラスシグネチャに変換する
pub fn class_name_to_signature(class_name: &str) -> String {
    let class_name = class_name.trim();
    if class_name.starts_with('L') && class_name.ends_with(';') {
        return class_name.to_string();
    }
    let internal = class_name.replace('.', "/");
    format!("L{};", internal)
}

/// 型シグネチャが占めるスロット数（long/double は2スロット）
pub fn slot_width(signature: &str) -> i32 {
    match signature.as_bytes().first() {
        Some(b'J') | Some(b'D') => 2,
        _ => 1,
    }
}
