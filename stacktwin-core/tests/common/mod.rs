//! テスト用のフェイクセッションと記録ロガー

#![allow(dead_code)]

use stacktwin_target::{
    BreakpointId, FieldHandle, FrameHandle, MethodDescriptor, ObjectId, RefTypeId, Result,
    RuntimeValue, Session, SessionError, ThreadId,
};
use stacktwin_trace::TraceLogger;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// スクリプト上の1フレーム
#[derive(Debug, Clone)]
pub struct FakeFrame {
    pub method: MethodDescriptor,
    /// `None` なら引数を読めない（ネイティブフレーム）
    pub arguments: Option<Vec<RuntimeValue>>,
    /// `None` ならレシーバを読めない
    pub receiver: Option<RuntimeValue>,
}

impl FakeFrame {
    pub fn new(method: MethodDescriptor) -> Self {
        Self {
            method,
            arguments: Some(Vec::new()),
            receiver: Some(RuntimeValue::Null),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<RuntimeValue>) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_receiver(mut self, receiver: RuntimeValue) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn native(mut self) -> Self {
        self.arguments = None;
        self
    }

    pub fn opaque_receiver(mut self) -> Self {
        self.receiver = None;
        self
    }
}

/// メソッド記述子の短縮形（引数型は空）
pub fn method(class_name: &str, method_name: &str) -> MethodDescriptor {
    MethodDescriptor::with_parameters(class_name, method_name, Vec::<String>::new())
}

enum HeapObject {
    Composite(RefTypeId),
    Array {
        ty: RefTypeId,
        elements: Vec<RuntimeValue>,
    },
    Class {
        ty: RefTypeId,
        reflected: RefTypeId,
    },
}

struct FakeType {
    name: String,
    ready: bool,
    fields: Vec<FieldHandle>,
}

/// メモリ上で完結するセッション
///
/// スレッドのプログラムは「メソッドに入った時点のスタック」の列です。
/// 再開するとプログラムを先へ進め、最も内側のメソッドがブレークポイントに
/// 一致したところで停止します。最後まで進むとスレッドは終了します。
pub struct FakeSession {
    threads: HashMap<String, ThreadId>,
    program_thread: ThreadId,
    program: Vec<Vec<FakeFrame>>,
    cursor: usize,
    current: Option<usize>,
    stopped_at: Option<BreakpointId>,
    terminated: bool,
    /// 再開しても進まない（停止もしない）
    hang: bool,
    unresolvable: HashSet<String>,
    breakpoints: HashMap<BreakpointId, MethodDescriptor>,
    next_breakpoint: u32,
    types: HashMap<RefTypeId, FakeType>,
    class_type: Option<RefTypeId>,
    objects: HashMap<ObjectId, HeapObject>,
    strings: HashMap<ObjectId, String>,
    /// 回収済みのオブジェクト
    collected: HashSet<ObjectId>,
    instance_values: HashMap<(ObjectId, u64), Option<RuntimeValue>>,
    static_values: HashMap<(RefTypeId, u64), RuntimeValue>,
    next_id: u64,
    /// 呼び出し履歴（install/remove/resume/dispose）
    pub calls: Vec<String>,
    pub dispose_count: usize,
    pub polls: usize,
}

impl FakeSession {
    pub fn new() -> Self {
        let main = ThreadId(1);
        let mut threads = HashMap::new();
        threads.insert("main".to_string(), main);
        Self {
            threads,
            program_thread: main,
            program: Vec::new(),
            cursor: 0,
            current: None,
            stopped_at: None,
            terminated: false,
            hang: false,
            unresolvable: HashSet::new(),
            breakpoints: HashMap::new(),
            next_breakpoint: 1,
            types: HashMap::new(),
            class_type: None,
            objects: HashMap::new(),
            strings: HashMap::new(),
            collected: HashSet::new(),
            instance_values: HashMap::new(),
            static_values: HashMap::new(),
            next_id: 100,
            calls: Vec::new(),
            dispose_count: 0,
            polls: 0,
        }
    }

    pub fn main_thread(&self) -> ThreadId {
        self.program_thread
    }

    /// メソッドに入った時点のスタック（内側が先頭）を追加する
    pub fn push_stack(&mut self, frames: Vec<FakeFrame>) {
        self.program.push(frames);
    }

    /// 呼び出しの入れ子からプログラムを組み立てる（外側が先頭）
    ///
    /// `[m3, m2, m1]` なら m3 に入り、m2 に入り、m1 に入る3つのスタックになります。
    pub fn push_nested_calls(&mut self, outermost_first: Vec<FakeFrame>) {
        for depth in 1..=outermost_first.len() {
            let mut stack: Vec<FakeFrame> = outermost_first[..depth].to_vec();
            stack.reverse();
            self.program.push(stack);
        }
    }

    pub fn mark_unresolvable(&mut self, class_name: &str, method_name: &str) {
        self.unresolvable
            .insert(format!("{}.{}", class_name, method_name));
    }

    pub fn hang(&mut self) {
        self.hang = true;
    }

    pub fn active_breakpoints(&self) -> usize {
        self.breakpoints.len()
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_type(&mut self, name: &str, ready: bool) -> RefTypeId {
        let ty = RefTypeId(self.fresh_id());
        self.types.insert(
            ty,
            FakeType {
                name: name.to_string(),
                ready,
                fields: Vec::new(),
            },
        );
        ty
    }

    pub fn add_field(&mut self, ty: RefTypeId, name: &str, is_static: bool) -> FieldHandle {
        let field = FieldHandle {
            id: self.fresh_id(),
            name: name.to_string(),
            signature: "Ljava/lang/Object;".to_string(),
            declaring_type: ty,
            is_static,
        };
        if let Some(t) = self.types.get_mut(&ty) {
            t.fields.push(field.clone());
        }
        field
    }

    /// `base` のフィールドを `sub` の後ろに継承させる（宣言型は `base` のまま）
    pub fn inherit_fields(&mut self, sub: RefTypeId, base: RefTypeId) {
        let inherited = match self.types.get(&base) {
            Some(t) => t.fields.clone(),
            None => return,
        };
        if let Some(t) = self.types.get_mut(&sub) {
            t.fields.extend(inherited);
        }
    }

    /// オブジェクトを回収済みにする（以後の読み取りは失敗する）
    pub fn collect(&mut self, id: ObjectId) {
        self.collected.insert(id);
    }

    fn check_live(&self, id: ObjectId) -> Result<()> {
        if self.collected.contains(&id) {
            return Err(SessionError::Inaccessible(format!("object {} was collected", id)));
        }
        Ok(())
    }

    pub fn new_object(&mut self, ty: RefTypeId) -> ObjectId {
        let id = ObjectId(self.fresh_id());
        self.objects.insert(id, HeapObject::Composite(ty));
        id
    }

    pub fn set_field(&mut self, object: ObjectId, field: &FieldHandle, value: RuntimeValue) {
        self.instance_values.insert((object, field.id), Some(value));
    }

    pub fn hide_field(&mut self, object: ObjectId, field: &FieldHandle) {
        self.instance_values.insert((object, field.id), None);
    }

    pub fn set_static(&mut self, field: &FieldHandle, value: RuntimeValue) {
        self.static_values
            .insert((field.declaring_type, field.id), value);
    }

    pub fn new_array(&mut self, type_name: &str, elements: Vec<RuntimeValue>) -> ObjectId {
        let ty = self.add_type(type_name, true);
        let id = ObjectId(self.fresh_id());
        self.objects.insert(id, HeapObject::Array { ty, elements });
        id
    }

    pub fn new_string(&mut self, text: &str) -> RuntimeValue {
        let id = ObjectId(self.fresh_id());
        self.strings.insert(id, text.to_string());
        RuntimeValue::String(id)
    }

    pub fn new_class_object(&mut self, reflected: RefTypeId) -> ObjectId {
        let ty = match self.class_type {
            Some(ty) => ty,
            None => {
                let ty = self.add_type("java.lang.Class", true);
                self.class_type = Some(ty);
                ty
            }
        };
        let id = ObjectId(self.fresh_id());
        self.objects
            .insert(id, HeapObject::Class { ty, reflected });
        id
    }

    fn object(&self, id: ObjectId) -> Result<&HeapObject> {
        self.objects
            .get(&id)
            .ok_or_else(|| SessionError::Protocol(format!("unknown object {}", id)))
    }

    fn fake_type(&self, ty: RefTypeId) -> Result<&FakeType> {
        self.types
            .get(&ty)
            .ok_or_else(|| SessionError::Protocol(format!("unknown type {}", ty.0)))
    }

    fn frame(&self, frame: &FrameHandle) -> Result<&FakeFrame> {
        let entry = (frame.id / 1000) as usize;
        self.program
            .get(entry)
            .and_then(|stack| stack.get(frame.index))
            .ok_or_else(|| SessionError::Protocol(format!("stale frame {}", frame.id)))
    }

    fn is_loaded(&self, method: &MethodDescriptor) -> bool {
        self.program.iter().flatten().any(|f| {
            let params = f.method.parameter_types.clone().unwrap_or_default();
            method.matches(&f.method.class_name, &f.method.method_name, &params)
        })
    }

    fn run_program(&mut self) {
        if self.hang {
            return;
        }
        while self.cursor < self.program.len() {
            let entry = self.cursor;
            self.cursor += 1;
            let innermost = &self.program[entry][0].method;
            let params = innermost.parameter_types.clone().unwrap_or_default();
            let hit = self
                .breakpoints
                .iter()
                .filter(|(_, bp)| bp.matches(&innermost.class_name, &innermost.method_name, &params))
                .map(|(id, _)| *id)
                .min();
            if let Some(id) = hit {
                self.stopped_at = Some(id);
                self.current = Some(entry);
                return;
            }
        }
        self.terminated = true;
    }
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for FakeSession {
    fn find_thread(&mut self, name: &str) -> Result<ThreadId> {
        self.threads
            .get(name)
            .copied()
            .ok_or_else(|| SessionError::ThreadNotFound(name.to_string()))
    }

    fn install_breakpoint(&mut self, method: &MethodDescriptor) -> Result<Option<BreakpointId>> {
        self.calls.push(format!("install {}", method));
        let key = format!("{}.{}", method.class_name, method.method_name);
        if self.unresolvable.contains(&key) || !self.is_loaded(method) {
            return Ok(None);
        }
        let id = BreakpointId(self.next_breakpoint);
        self.next_breakpoint += 1;
        self.breakpoints.insert(id, method.clone());
        Ok(Some(id))
    }

    fn remove_breakpoint(&mut self, id: BreakpointId) -> Result<()> {
        self.calls.push(format!("remove {}", id));
        self.breakpoints.remove(&id);
        Ok(())
    }

    fn resume(&mut self, thread: ThreadId) -> Result<()> {
        self.calls.push("resume".to_string());
        if thread == self.program_thread {
            self.stopped_at = None;
            self.current = None;
            self.run_program();
        }
        Ok(())
    }

    fn is_at_breakpoint(&mut self, thread: ThreadId) -> Result<bool> {
        self.polls += 1;
        Ok(thread == self.program_thread && self.stopped_at.is_some())
    }

    fn is_terminated(&mut self, thread: ThreadId) -> Result<bool> {
        Ok(thread == self.program_thread && self.terminated)
    }

    fn frames(&mut self, thread: ThreadId) -> Result<Vec<FrameHandle>> {
        let entry = match self.current {
            Some(entry) if thread == self.program_thread => entry,
            _ => return Err(SessionError::Protocol("thread is not suspended".to_string())),
        };
        Ok((0..self.program[entry].len())
            .map(|index| FrameHandle {
                thread,
                index,
                id: (entry * 1000 + index) as u64,
                declaring_type: RefTypeId(0),
                method: index as u64,
            })
            .collect())
    }

    fn frame_method(&mut self, frame: &FrameHandle) -> Result<MethodDescriptor> {
        Ok(self.frame(frame)?.method.clone())
    }

    fn arguments(&mut self, frame: &FrameHandle) -> Result<Vec<RuntimeValue>> {
        self.frame(frame)?
            .arguments
            .clone()
            .ok_or_else(|| SessionError::Inaccessible("native method".to_string()))
    }

    fn receiver(&mut self, frame: &FrameHandle) -> Result<RuntimeValue> {
        self.frame(frame)?
            .receiver
            .ok_or_else(|| SessionError::Inaccessible("opaque frame".to_string()))
    }

    fn runtime_type(&mut self, object: ObjectId) -> Result<RefTypeId> {
        self.check_live(object)?;
        Ok(match self.object(object)? {
            HeapObject::Composite(ty) => *ty,
            HeapObject::Array { ty, .. } => *ty,
            HeapObject::Class { ty, .. } => *ty,
        })
    }

    fn reflected_type(&mut self, class_object: ObjectId) -> Result<RefTypeId> {
        match self.object(class_object)? {
            HeapObject::Class { reflected, .. } => Ok(*reflected),
            _ => Err(SessionError::Protocol("not a class object".to_string())),
        }
    }

    fn type_name(&mut self, ty: RefTypeId) -> Result<String> {
        Ok(self.fake_type(ty)?.name.clone())
    }

    fn is_type_ready(&mut self, ty: RefTypeId) -> Result<bool> {
        Ok(self.fake_type(ty)?.ready)
    }

    fn fields(&mut self, ty: RefTypeId) -> Result<Vec<FieldHandle>> {
        Ok(self.fake_type(ty)?.fields.clone())
    }

    fn read_field(&mut self, holder: ObjectId, field: &FieldHandle) -> Result<RuntimeValue> {
        let value = if field.is_static {
            self.static_values
                .get(&(field.declaring_type, field.id))
                .copied()
        } else {
            self.instance_values.get(&(holder, field.id)).copied().flatten()
        };
        value.ok_or_else(|| SessionError::Inaccessible(format!("field {}", field.name)))
    }

    fn array_elements(&mut self, array: ObjectId) -> Result<Vec<RuntimeValue>> {
        self.check_live(array)?;
        match self.object(array)? {
            HeapObject::Array { elements, .. } => Ok(elements.clone()),
            _ => Err(SessionError::Protocol("not an array".to_string())),
        }
    }

    fn string_value(&mut self, string: ObjectId) -> Result<String> {
        self.check_live(string)?;
        self.strings
            .get(&string)
            .cloned()
            .ok_or_else(|| SessionError::Protocol(format!("unknown string {}", string)))
    }

    fn dispose(&mut self) -> Result<()> {
        self.calls.push("dispose".to_string());
        self.dispose_count += 1;
        Ok(())
    }
}

/// フックの呼び出しを文字列で記録するロガー
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Rc<RefCell<Vec<String>>>,
    /// `finish` を失敗させる
    fail_finish: bool,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_finish() -> Self {
        Self {
            fail_finish: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.events.borrow().last().map(String::as_str) == Some("finish")
    }

    fn push(&mut self, event: String) -> stacktwin_trace::Result<()> {
        self.events.borrow_mut().push(event);
        Ok(())
    }
}

impl TraceLogger for RecordingLogger {
    fn stop_start(&mut self, stop: usize, thread: &str) -> stacktwin_trace::Result<()> {
        self.push(format!("stop {} {}", stop, thread))
    }
    fn stop_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/stop".to_string())
    }
    fn frame_start(&mut self, index: usize) -> stacktwin_trace::Result<()> {
        self.push(format!("frame {}", index))
    }
    fn frame_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/frame".to_string())
    }
    fn method_signature(&mut self, method: &MethodDescriptor) -> stacktwin_trace::Result<()> {
        self.push(format!("method {}", method))
    }
    fn arguments_start(&mut self) -> stacktwin_trace::Result<()> {
        self.push("args".to_string())
    }
    fn arguments_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/args".to_string())
    }
    fn arguments_inaccessible(&mut self) -> stacktwin_trace::Result<()> {
        self.push("args inaccessible".to_string())
    }
    fn receiver_start(&mut self) -> stacktwin_trace::Result<()> {
        self.push("receiver".to_string())
    }
    fn receiver_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/receiver".to_string())
    }
    fn receiver_inaccessible(&mut self) -> stacktwin_trace::Result<()> {
        self.push("receiver inaccessible".to_string())
    }
    fn reference_open(&mut self, id: ObjectId, type_name: &str, depth: usize) -> stacktwin_trace::Result<()> {
        self.push(format!("ref {} {} depth={}", id, type_name, depth))
    }
    fn reference_close(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/ref".to_string())
    }
    fn fields_start(&mut self) -> stacktwin_trace::Result<()> {
        self.push("fields".to_string())
    }
    fn fields_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/fields".to_string())
    }
    fn field_start(&mut self, name: &str, depth: usize) -> stacktwin_trace::Result<()> {
        self.push(format!("field {} depth={}", name, depth))
    }
    fn field_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/field".to_string())
    }
    fn array_start(&mut self) -> stacktwin_trace::Result<()> {
        self.push("elements".to_string())
    }
    fn array_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/elements".to_string())
    }
    fn element_start(&mut self, index: usize, depth: usize) -> stacktwin_trace::Result<()> {
        self.push(format!("[{}] depth={}", index, depth))
    }
    fn element_end(&mut self) -> stacktwin_trace::Result<()> {
        self.push("/element".to_string())
    }
    fn separator(&mut self) -> stacktwin_trace::Result<()> {
        self.push(",".to_string())
    }
    fn primitive(&mut self, value: &stacktwin_target::Primitive) -> stacktwin_trace::Result<()> {
        self.push(format!("prim {}", value))
    }
    fn string(&mut self, value: &str) -> stacktwin_trace::Result<()> {
        self.push(format!("str {}", value))
    }
    fn null_value(&mut self) -> stacktwin_trace::Result<()> {
        self.push("null".to_string())
    }
    fn depth_limit(&mut self, depth: usize) -> stacktwin_trace::Result<()> {
        self.push(format!("depth_limit {}", depth))
    }
    fn already_visited(&mut self) -> stacktwin_trace::Result<()> {
        self.push("visited".to_string())
    }
    fn inaccessible_field(&mut self, name: &str, depth: usize) -> stacktwin_trace::Result<()> {
        self.push(format!("inaccessible {} depth={}", name, depth))
    }
    fn inaccessible_value(&mut self) -> stacktwin_trace::Result<()> {
        self.push("inaccessible_value".to_string())
    }
    fn type_not_ready(&mut self) -> stacktwin_trace::Result<()> {
        self.push("type_not_ready".to_string())
    }
    fn empty_array(&mut self) -> stacktwin_trace::Result<()> {
        self.push("empty_array".to_string())
    }
    fn finish(&mut self) -> stacktwin_trace::Result<()> {
        self.push("finish".to_string())?;
        if self.fail_finish {
            anyhow::bail!("output device is full");
        }
        Ok(())
    }
}
