//! 入れ子JSON形式のロガー
//!
//! 出力全体は `{"trace":[...]}` の1つのJSON値です。ストリーミングで書き出し、
//! [`TraceLogger::finish`] が開いているスコープをすべて閉じるため、
//! 途中で失敗しても構文的に正しいJSONが残ります。

use crate::logger::TraceLogger;
use crate::Result;
use serde_json::Value;
use stacktwin_target::{MethodDescriptor, ObjectId, Primitive};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Object,
    Array,
    /// 参照値を表すオブジェクト（マーカーはメンバーとして書く）
    Reference,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    count: usize,
}

/// JSONロガー
pub struct JsonLogger<W: Write> {
    out: W,
    scopes: Vec<Scope>,
    /// キーを書いて値がまだない
    pending_key: bool,
    started: bool,
    finished: bool,
}

impl<W: Write> JsonLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            scopes: Vec::new(),
            pending_key: false,
            started: false,
            finished: false,
        }
    }

    /// 内側のライターを取り出す
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ensure_started(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            self.open(ScopeKind::Object)?;
            self.key("trace")?;
            self.open(ScopeKind::Array)?;
        }
        Ok(())
    }

    /// 配列内なら区切りのカンマを書く（オブジェクト内ではキーが先に書かれている）
    fn begin_value(&mut self) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.kind == ScopeKind::Array {
                if scope.count > 0 {
                    self.out.write_all(b",")?;
                }
                scope.count += 1;
            }
        }
        Ok(())
    }

    fn key(&mut self, name: &str) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.count > 0 {
                self.out.write_all(b",")?;
            }
            scope.count += 1;
        }
        serde_json::to_writer(&mut self.out, name)?;
        self.out.write_all(b":")?;
        self.pending_key = true;
        Ok(())
    }

    fn open(&mut self, kind: ScopeKind) -> Result<()> {
        self.begin_value()?;
        let bracket: &[u8] = if kind == ScopeKind::Array { b"[" } else { b"{" };
        self.out.write_all(bracket)?;
        self.pending_key = false;
        self.scopes.push(Scope { kind, count: 0 });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.pending_key {
            self.out.write_all(b"null")?;
            self.pending_key = false;
        }
        if let Some(scope) = self.scopes.pop() {
            let bracket: &[u8] = if scope.kind == ScopeKind::Array { b"]" } else { b"}" };
            self.out.write_all(bracket)?;
        }
        Ok(())
    }

    fn raw(&mut self, value: &Value) -> Result<()> {
        self.begin_value()?;
        serde_json::to_writer(&mut self.out, value)?;
        self.pending_key = false;
        Ok(())
    }

    fn member(&mut self, name: &str, value: &Value) -> Result<()> {
        self.key(name)?;
        self.raw(value)
    }

    /// マーカー。参照オブジェクトの中ならメンバー、それ以外は値として書く
    fn marker(&mut self, name: &str, depth: Option<usize>) -> Result<()> {
        let in_reference = matches!(
            self.scopes.last(),
            Some(Scope {
                kind: ScopeKind::Reference,
                ..
            })
        );
        if in_reference {
            return self.member("marker", &Value::from(name));
        }
        let mut object = serde_json::Map::new();
        object.insert("marker".to_string(), Value::from(name));
        if let Some(depth) = depth {
            object.insert("depth".to_string(), Value::from(depth));
        }
        self.raw(&Value::Object(object))
    }
}

/// プリミティブ値をJSON値に変換する（非有限の浮動小数点は文字列）
fn primitive_to_json(value: &Primitive) -> Value {
    match *value {
        Primitive::Boolean(v) => Value::Bool(v),
        Primitive::Byte(v) => Value::from(v),
        Primitive::Char(c) => Value::String(Primitive::as_char(c).to_string()),
        Primitive::Short(v) => Value::from(v),
        Primitive::Int(v) => Value::from(v),
        Primitive::Long(v) => Value::from(v),
        Primitive::Float(v) => float_to_json(v as f64),
        Primitive::Double(v) => float_to_json(v),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

impl<W: Write> TraceLogger for JsonLogger<W> {
    fn stop_start(&mut self, stop: usize, thread: &str) -> Result<()> {
        self.ensure_started()?;
        self.open(ScopeKind::Object)?;
        self.member("stop", &Value::from(stop))?;
        self.member("thread", &Value::from(thread))?;
        self.key("frames")?;
        self.open(ScopeKind::Array)
    }

    fn stop_end(&mut self) -> Result<()> {
        self.close()?;
        self.close()
    }

    fn frame_start(&mut self, index: usize) -> Result<()> {
        self.open(ScopeKind::Object)?;
        self.member("frame", &Value::from(index))
    }

    fn frame_end(&mut self) -> Result<()> {
        self.close()
    }

    fn method_signature(&mut self, method: &MethodDescriptor) -> Result<()> {
        let value = serde_json::to_value(method)?;
        self.member("method", &value)
    }

    fn arguments_start(&mut self) -> Result<()> {
        self.key("arguments")?;
        self.open(ScopeKind::Array)
    }

    fn arguments_end(&mut self) -> Result<()> {
        self.close()
    }

    fn arguments_inaccessible(&mut self) -> Result<()> {
        self.marker("inaccessible", None)
    }

    fn receiver_start(&mut self) -> Result<()> {
        self.key("receiver")
    }

    fn receiver_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn receiver_inaccessible(&mut self) -> Result<()> {
        self.marker("inaccessible", None)
    }

    fn reference_open(&mut self, id: ObjectId, type_name: &str, _depth: usize) -> Result<()> {
        self.open(ScopeKind::Reference)?;
        self.member("ref", &Value::from(id.0))?;
        self.member("type", &Value::from(type_name))
    }

    fn reference_close(&mut self) -> Result<()> {
        self.close()
    }

    fn fields_start(&mut self) -> Result<()> {
        self.key("fields")?;
        self.open(ScopeKind::Object)
    }

    fn fields_end(&mut self) -> Result<()> {
        self.close()
    }

    fn field_start(&mut self, name: &str, _depth: usize) -> Result<()> {
        self.key(name)
    }

    fn field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn array_start(&mut self) -> Result<()> {
        self.key("elements")?;
        self.open(ScopeKind::Array)
    }

    fn array_end(&mut self) -> Result<()> {
        self.close()
    }

    fn element_start(&mut self, _index: usize, _depth: usize) -> Result<()> {
        Ok(())
    }

    fn element_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn separator(&mut self) -> Result<()> {
        // カンマはスコープごとの件数から書く
        Ok(())
    }

    fn primitive(&mut self, value: &Primitive) -> Result<()> {
        self.raw(&primitive_to_json(value))
    }

    fn string(&mut self, value: &str) -> Result<()> {
        self.raw(&Value::from(value))
    }

    fn null_value(&mut self) -> Result<()> {
        self.raw(&Value::Null)
    }

    fn depth_limit(&mut self, depth: usize) -> Result<()> {
        self.marker("depth_limit", Some(depth))
    }

    fn already_visited(&mut self) -> Result<()> {
        self.marker("already_visited", None)
    }

    fn inaccessible_field(&mut self, name: &str, depth: usize) -> Result<()> {
        self.key(name)?;
        let mut object = serde_json::Map::new();
        object.insert("marker".to_string(), Value::from("inaccessible"));
        object.insert("depth".to_string(), Value::from(depth));
        self.raw(&Value::Object(object))
    }

    fn inaccessible_value(&mut self) -> Result<()> {
        self.marker("inaccessible", None)
    }

    fn type_not_ready(&mut self) -> Result<()> {
        self.marker("type_not_ready", None)
    }

    fn empty_array(&mut self) -> Result<()> {
        self.marker("empty_array", None)
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.ensure_started()?;
        while !self.scopes.is_empty() {
            self.close()?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
