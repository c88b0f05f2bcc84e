//! 階層テキスト形式のロガー
//!
//! 1行1項目、入れ子1段につき2スペースでインデントします。
//!
//! ```text
//! stop 1 thread=main
//!   frame 0 app.Main.run(int)
//!     arguments
//!       42
//!     receiver
//!       app.Main @5 {
//!         a = 1,
//!         b = "x"
//!       }
//! ```

use crate::logger::TraceLogger;
use crate::Result;
use stacktwin_target::{MethodDescriptor, ObjectId, Primitive};
use std::io::Write;

const INDENT: &str = "  ";

/// テキストロガー
pub struct TextLogger<W: Write> {
    out: W,
    indent: usize,
    /// 現在行が書きかけか
    line_open: bool,
    /// `name = ` などの接頭辞を書いて値を待っている
    awaiting_value: bool,
    /// 参照のヘッダ行（`Type @id`）の直後
    in_header: bool,
    finished: bool,
}

impl<W: Write> TextLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            indent: 0,
            line_open: false,
            awaiting_value: false,
            in_header: false,
            finished: false,
        }
    }

    /// 内側のライターを取り出す
    pub fn into_inner(self) -> W {
        self.out
    }

    fn begin_line(&mut self, prefix: &str) -> Result<()> {
        if self.line_open {
            writeln!(self.out)?;
        }
        for _ in 0..self.indent {
            self.out.write_all(INDENT.as_bytes())?;
        }
        self.out.write_all(prefix.as_bytes())?;
        self.line_open = true;
        self.in_header = false;
        Ok(())
    }

    /// 値を書く。接頭辞待ちでなければ新しい行に書く
    fn value(&mut self, text: &str) -> Result<()> {
        if self.awaiting_value {
            self.out.write_all(text.as_bytes())?;
            self.awaiting_value = false;
        } else {
            self.begin_line(text)?;
        }
        Ok(())
    }

    /// マーカーを書く。参照ヘッダの直後ならヘッダ行に続ける
    fn marker(&mut self, name: &str) -> Result<()> {
        let token = format!("<{}>", name);
        if self.in_header {
            write!(self.out, " {}", token)?;
            Ok(())
        } else {
            self.value(&token)
        }
    }

    fn open_block(&mut self, bracket: &str) -> Result<()> {
        write!(self.out, " {}", bracket)?;
        self.in_header = false;
        self.indent += 1;
        Ok(())
    }

    fn close_block(&mut self, bracket: &str) -> Result<()> {
        self.indent = self.indent.saturating_sub(1);
        self.begin_line(bracket)
    }

    fn heading(&mut self, text: &str) -> Result<()> {
        self.awaiting_value = false;
        self.begin_line(text)?;
        self.indent += 1;
        Ok(())
    }

    fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.awaiting_value = false;
        self.in_header = false;
    }
}

/// 文字列をエスケープして引用符で囲む
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl<W: Write> TraceLogger for TextLogger<W> {
    fn stop_start(&mut self, stop: usize, thread: &str) -> Result<()> {
        self.indent = 0;
        self.heading(&format!("stop {} thread={}", stop, thread))
    }

    fn stop_end(&mut self) -> Result<()> {
        self.dedent();
        Ok(())
    }

    fn frame_start(&mut self, index: usize) -> Result<()> {
        self.heading(&format!("frame {}", index))
    }

    fn frame_end(&mut self) -> Result<()> {
        self.dedent();
        Ok(())
    }

    fn method_signature(&mut self, method: &MethodDescriptor) -> Result<()> {
        // フレーム行に続けて書く
        write!(self.out, " {}", method)?;
        Ok(())
    }

    fn arguments_start(&mut self) -> Result<()> {
        self.heading("arguments")
    }

    fn arguments_end(&mut self) -> Result<()> {
        self.dedent();
        Ok(())
    }

    fn arguments_inaccessible(&mut self) -> Result<()> {
        self.marker("inaccessible")
    }

    fn receiver_start(&mut self) -> Result<()> {
        self.heading("receiver")
    }

    fn receiver_end(&mut self) -> Result<()> {
        self.dedent();
        Ok(())
    }

    fn receiver_inaccessible(&mut self) -> Result<()> {
        self.marker("inaccessible")
    }

    fn reference_open(&mut self, id: ObjectId, type_name: &str, _depth: usize) -> Result<()> {
        self.value(&format!("{} {}", type_name, id))?;
        self.in_header = true;
        Ok(())
    }

    fn reference_close(&mut self) -> Result<()> {
        self.in_header = false;
        Ok(())
    }

    fn fields_start(&mut self) -> Result<()> {
        self.open_block("{")
    }

    fn fields_end(&mut self) -> Result<()> {
        self.close_block("}")
    }

    fn field_start(&mut self, name: &str, _depth: usize) -> Result<()> {
        self.begin_line(&format!("{} = ", name))?;
        self.awaiting_value = true;
        Ok(())
    }

    fn field_end(&mut self) -> Result<()> {
        self.awaiting_value = false;
        Ok(())
    }

    fn array_start(&mut self) -> Result<()> {
        self.open_block("[")
    }

    fn array_end(&mut self) -> Result<()> {
        self.close_block("]")
    }

    fn element_start(&mut self, index: usize, _depth: usize) -> Result<()> {
        self.begin_line(&format!("[{}] = ", index))?;
        self.awaiting_value = true;
        Ok(())
    }

    fn element_end(&mut self) -> Result<()> {
        self.awaiting_value = false;
        Ok(())
    }

    fn separator(&mut self) -> Result<()> {
        self.out.write_all(b",")?;
        Ok(())
    }

    fn primitive(&mut self, value: &Primitive) -> Result<()> {
        self.value(&value.to_string())
    }

    fn string(&mut self, value: &str) -> Result<()> {
        self.value(&quote(value))
    }

    fn null_value(&mut self) -> Result<()> {
        self.value("null")
    }

    fn depth_limit(&mut self, _depth: usize) -> Result<()> {
        self.marker("depth limit")
    }

    fn already_visited(&mut self) -> Result<()> {
        self.marker("already visited")
    }

    fn inaccessible_field(&mut self, name: &str, _depth: usize) -> Result<()> {
        self.begin_line(&format!("{} = <inaccessible>", name))
    }

    fn inaccessible_value(&mut self) -> Result<()> {
        self.marker("inaccessible")
    }

    fn type_not_ready(&mut self) -> Result<()> {
        self.marker("type not ready")
    }

    fn empty_array(&mut self) -> Result<()> {
        self.marker("empty")
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut TextLogger<Vec<u8>>) -> Result<()>) -> String {
        let mut logger = TextLogger::new(Vec::new());
        f(&mut logger).unwrap();
        logger.finish().unwrap();
        String::from_utf8(logger.into_inner()).unwrap()
    }

    #[test]
    fn test_object_with_fields() {
        let text = render(|l| {
            l.stop_start(1, "main")?;
            l.frame_start(0)?;
            l.method_signature(&MethodDescriptor::with_parameters("app.Main", "run", ["int"]))?;
            l.arguments_start()?;
            l.primitive(&Primitive::Int(42))?;
            l.arguments_end()?;
            l.receiver_start()?;
            l.reference_open(ObjectId(5), "app.Main", 0)?;
            l.fields_start()?;
            l.field_start("a", 1)?;
            l.primitive(&Primitive::Int(1))?;
            l.field_end()?;
            l.separator()?;
            l.field_start("b", 1)?;
            l.string("x")?;
            l.field_end()?;
            l.fields_end()?;
            l.reference_close()?;
            l.receiver_end()?;
            l.frame_end()?;
            l.stop_end()
        });

        let expected = "\
stop 1 thread=main
  frame 0 app.Main.run(int)
    arguments
      42
    receiver
      app.Main @5 {
        a = 1,
        b = \"x\"
      }
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_markers_follow_header() {
        let text = render(|l| {
            l.reference_open(ObjectId(3), "int[]", 0)?;
            l.empty_array()?;
            l.reference_close()?;
            l.reference_open(ObjectId(4), "app.Node", 0)?;
            l.already_visited()?;
            l.reference_close()
        });
        assert_eq!(text, "int[] @3 <empty>\napp.Node @4 <already visited>\n");
    }

    #[test]
    fn test_array_elements_and_inaccessible_field() {
        let text = render(|l| {
            l.reference_open(ObjectId(7), "java.lang.Object[]", 0)?;
            l.array_start()?;
            l.element_start(0, 1)?;
            l.null_value()?;
            l.element_end()?;
            l.separator()?;
            l.element_start(1, 1)?;
            l.depth_limit(1)?;
            l.element_end()?;
            l.array_end()?;
            l.reference_close()?;
            l.inaccessible_field("secret", 1)
        });
        assert_eq!(
            text,
            "java.lang.Object[] @7 [\n  [0] = null,\n  [1] = <depth limit>\n]\nsecret = <inaccessible>\n"
        );
    }

    #[test]
    fn test_inaccessible_value_in_field_and_header() {
        let text = render(|l| {
            l.reference_open(ObjectId(2), "app.Holder", 0)?;
            l.fields_start()?;
            l.field_start("a", 1)?;
            l.inaccessible_value()?;
            l.field_end()?;
            l.separator()?;
            l.field_start("b", 1)?;
            l.reference_open(ObjectId(8), "int[]", 1)?;
            l.inaccessible_value()?;
            l.reference_close()?;
            l.field_end()?;
            l.fields_end()?;
            l.reference_close()
        });
        assert_eq!(
            text,
            "app.Holder @2 {\n  a = <inaccessible>,\n  b = int[] @8 <inaccessible>\n}\n"
        );
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("a\"b\n"), "\"a\\\"b\\n\"");
    }
}
