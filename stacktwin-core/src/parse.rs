//! パース関連のユーティリティ関数

use anyhow::Result;
use regex::Regex;
use stacktwin_target::MethodDescriptor;
use std::sync::OnceLock;

fn descriptor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([\w$]+(?:\.[\w$]+)*)\.([\w$]+|<init>|<clinit>)\s*(?:\((.*)\))?$")
            .expect("method descriptor pattern is valid")
    })
}

fn type_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w$]+(?:\.[\w$]+)*(?:\[\])*$").expect("type name pattern is valid")
    })
}

/// メソッド記述子をパース
///
/// `pkg.Class.method` または `pkg.Class.method(T1, T2)` 形式をサポート。
/// 括弧を省略すると引数型を照合しません。`()` は引数なしを意味します。
///
/// # Examples
/// ```
/// use stacktwin_core::parse::parse_method_descriptor;
///
/// let m = parse_method_descriptor("java.lang.Runtime.exec(java.lang.String)").unwrap();
/// assert_eq!(m.class_name, "java.lang.Runtime");
/// assert_eq!(m.method_name, "exec");
/// assert_eq!(m.parameter_types, Some(vec!["java.lang.String".to_string()]));
/// ```
pub fn parse_method_descriptor(s: &str) -> Result<MethodDescriptor> {
    let s = s.trim();
    let caps = descriptor_regex()
        .captures(s)
        .ok_or_else(|| anyhow::anyhow!("Invalid method descriptor '{}' (expected pkg.Class.method(T1, T2))", s))?;

    let class_name = &caps[1];
    let method_name = &caps[2];

    let Some(params) = caps.get(3) else {
        return Ok(MethodDescriptor::new(class_name, method_name));
    };

    let params = params.as_str().trim();
    if params.is_empty() {
        return Ok(MethodDescriptor::with_parameters(
            class_name,
            method_name,
            Vec::<String>::new(),
        ));
    }

    let mut types = Vec::new();
    for param in params.split(',') {
        let param: String = param.split_whitespace().collect();
        if !type_name_regex().is_match(&param) {
            anyhow::bail!("Invalid parameter type '{}' in method descriptor '{}'", param, s);
        }
        types.push(param);
    }
    Ok(MethodDescriptor::with_parameters(class_name, method_name, types))
}
