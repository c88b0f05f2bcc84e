//! JDWP による [`Session`] の実装
//!
//! `-agentlib:jdwp=transport=dt_socket,server=y,address=...` で起動した
//! JVM にソケットでアタッチします。

use crate::breakpoint::BreakpointManager;
use crate::connection::Connection;
use crate::events::{Event, EventSet};
use crate::method::MethodDescriptor;
use crate::packet::{IdSizes, Location, PacketReader, PacketWriter};
use crate::protocol::{
    class_status, cmd, error, event_kind, modifier, modifiers, suspend_policy, tag,
};
use crate::session::{
    BreakpointId, FieldHandle, FrameHandle, RefTypeId, Result, Session, SessionAddress,
    SessionError,
};
use crate::signature::{class_name_to_signature, signature_to_type_name, slot_width, MethodSignature};
use crate::thread::{ThreadId, ThreadStatus};
use crate::value::{ObjectId, RuntimeValue};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace, warn};

/// 型に宣言されたメソッド
#[derive(Debug, Clone)]
struct MethodInfo {
    id: u64,
    name: String,
    signature: String,
    modifiers: i32,
}

impl MethodInfo {
    fn is_static(&self) -> bool {
        self.modifiers & modifiers::STATIC != 0
    }

    fn has_code(&self) -> bool {
        self.modifiers & (modifiers::NATIVE | modifiers::ABSTRACT) == 0
    }
}

/// JDWP セッション
pub struct JdwpSession {
    conn: Connection,
    breakpoints: BreakpointManager,
    /// ブレークポイントで停止中のスレッド
    stopped: HashMap<ThreadId, BreakpointId>,
    /// 最後に再開を要求したスレッド。他スレッドの停止は読み飛ばす
    awaited: Option<ThreadId>,
    dead_threads: HashSet<ThreadId>,
    vm_dead: bool,
    disposed: bool,
    type_names: HashMap<RefTypeId, String>,
    methods: HashMap<RefTypeId, Vec<MethodInfo>>,
    fields: HashMap<RefTypeId, Vec<FieldHandle>>,
}

impl JdwpSession {
    /// 指定アドレスの JVM にアタッチする
    pub fn attach(address: &SessionAddress) -> Result<Self> {
        let mut conn = Connection::open(address)?;

        let reply = conn.command("VirtualMachine.IDSizes", cmd::VM, cmd::VM_ID_SIZES, &[])?;
        let mut r = PacketReader::new(&reply, conn.sizes());
        let sizes = IdSizes {
            field: r.read_count()?,
            method: r.read_count()?,
            object: r.read_count()?,
            reference_type: r.read_count()?,
            frame: r.read_count()?,
        };
        debug!("ID sizes: {:?}", sizes);
        conn.set_sizes(sizes);

        let mut session = Self {
            conn,
            breakpoints: BreakpointManager::new(),
            stopped: HashMap::new(),
            awaited: None,
            dead_threads: HashSet::new(),
            vm_dead: false,
            disposed: false,
            type_names: HashMap::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
        };
        session.request_thread_death()?;

        info!("Attached to {}", address);
        Ok(session)
    }

    /// 接続先
    pub fn address(&self) -> &SessionAddress {
        self.conn.address()
    }

    fn writer(&self) -> PacketWriter {
        PacketWriter::new(self.conn.sizes())
    }

    fn call(
        &mut self,
        name: &'static str,
        command_set: u8,
        command: u8,
        build: impl FnOnce(&mut PacketWriter),
    ) -> Result<Vec<u8>> {
        let mut writer = self.writer();
        build(&mut writer);
        self.conn
            .command(name, command_set, command, &writer.into_bytes())
    }

    fn request_thread_death(&mut self) -> Result<()> {
        self.call("EventRequest.Set", cmd::EVENT_REQUEST, cmd::ER_SET, |w| {
            w.write_u8(event_kind::THREAD_DEATH)
                .write_u8(suspend_policy::NONE)
                .write_i32(0);
        })?;
        Ok(())
    }

    /// 届いたイベントを反映する
    fn pump_events(&mut self) -> Result<()> {
        for set in self.conn.poll_events()? {
            self.apply_events(set)?;
        }
        Ok(())
    }

    fn apply_events(&mut self, set: EventSet) -> Result<()> {
        for event in set.events {
            match event {
                Event::Breakpoint {
                    request, thread, ..
                } => match self.breakpoints.find_by_request(request) {
                    Some(id) if self.awaited.map_or(true, |awaited| awaited == thread) => {
                        debug!("{} stopped at breakpoint {}", thread, id);
                        self.stopped.insert(thread, id);
                    }
                    Some(id) => {
                        // 別スレッドのヒットで VM 全体が止まっている
                        debug!("{} hit breakpoint {} on behalf of another thread, resuming", thread, id);
                        self.resume_vm()?;
                    }
                    None => {
                        // 解除済みリクエストのイベント。停止したままにしない
                        debug!("{} hit cleared request {}, resuming", thread, request);
                        self.resume_vm()?;
                    }
                },
                Event::ThreadDeath { thread } => {
                    debug!("{} terminated", thread);
                    self.stopped.remove(&thread);
                    self.dead_threads.insert(thread);
                }
                Event::VmDeath => {
                    debug!("VM death event received");
                    self.vm_dead = true;
                }
                other => trace!("ignoring event {:?}", other),
            }
        }
        Ok(())
    }

    /// VM 全体を再開する
    ///
    /// ブレークポイントは全スレッドを止めるので、再開も VM 単位で行う。
    fn resume_vm(&mut self) -> Result<()> {
        self.stopped.clear();
        match self.call("VirtualMachine.Resume", cmd::VM, cmd::VM_RESUME, |_| {}) {
            Ok(_) => Ok(()),
            Err(SessionError::Vm {
                code: error::VM_DEAD,
                ..
            }) => {
                self.vm_dead = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn thread_name(&mut self, thread: ThreadId) -> Result<String> {
        let reply = self.call("ThreadReference.Name", cmd::THREAD_REFERENCE, cmd::TR_NAME, |w| {
            w.write_thread_id(thread);
        })?;
        PacketReader::new(&reply, self.conn.sizes()).read_string()
    }

    fn methods_of(&mut self, ty: RefTypeId) -> Result<Vec<MethodInfo>> {
        if let Some(methods) = self.methods.get(&ty) {
            return Ok(methods.clone());
        }
        let reply = self.call(
            "ReferenceType.Methods",
            cmd::REFERENCE_TYPE,
            cmd::RT_METHODS,
            |w| {
                w.write_ref_type_id(ty);
            },
        )?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let count = r.read_count()?;
        let mut methods = Vec::with_capacity(count);
        for _ in 0..count {
            methods.push(MethodInfo {
                id: r.read_method_id()?,
                name: r.read_string()?,
                signature: r.read_string()?,
                modifiers: r.read_i32()?,
            });
        }
        self.methods.insert(ty, methods.clone());
        Ok(methods)
    }

    fn method_info(&mut self, ty: RefTypeId, method: u64) -> Result<MethodInfo> {
        self.methods_of(ty)?
            .into_iter()
            .find(|m| m.id == method)
            .ok_or_else(|| {
                SessionError::Protocol(format!("method {} not declared by type {}", method, ty.0))
            })
    }

    /// メソッドの先頭コード位置（行情報がなければ 0）
    fn first_code_index(&mut self, ty: RefTypeId, method: u64) -> Result<u64> {
        let result = self.call("Method.LineTable", cmd::METHOD, cmd::M_LINE_TABLE, |w| {
            w.write_ref_type_id(ty).write_method_id(method);
        });
        match result {
            Ok(reply) => PacketReader::new(&reply, self.conn.sizes()).read_u64(),
            Err(SessionError::Vm {
                code: error::ABSENT_INFORMATION | error::NATIVE_METHOD,
                ..
            }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn classes_by_signature(&mut self, signature: &str) -> Result<Vec<(u8, RefTypeId)>> {
        let reply = self.call(
            "VirtualMachine.ClassesBySignature",
            cmd::VM,
            cmd::VM_CLASSES_BY_SIGNATURE,
            |w| {
                w.write_string(signature);
            },
        )?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let count = r.read_count()?;
        let mut classes = Vec::with_capacity(count);
        for _ in 0..count {
            let type_tag = r.read_u8()?;
            let id = r.read_ref_type_id()?;
            let _status = r.read_i32()?;
            classes.push((type_tag, id));
        }
        Ok(classes)
    }

    fn set_breakpoint_request(&mut self, location: &Location) -> Result<i32> {
        let reply = self.call("EventRequest.Set", cmd::EVENT_REQUEST, cmd::ER_SET, |w| {
            w.write_u8(event_kind::BREAKPOINT)
                .write_u8(suspend_policy::ALL)
                .write_i32(1)
                .write_u8(modifier::LOCATION_ONLY)
                .write_location(location);
        })?;
        PacketReader::new(&reply, self.conn.sizes()).read_i32()
    }

    fn read_type_ref(&mut self, reply: &[u8]) -> Result<RefTypeId> {
        let mut r = PacketReader::new(reply, self.conn.sizes());
        let _type_tag = r.read_u8()?;
        r.read_ref_type_id()
    }

    fn collect_fields(
        &mut self,
        ty: RefTypeId,
        out: &mut Vec<FieldHandle>,
        seen: &mut HashSet<RefTypeId>,
    ) -> Result<()> {
        if !seen.insert(ty) {
            return Ok(());
        }

        let reply = self.call("ReferenceType.Fields", cmd::REFERENCE_TYPE, cmd::RT_FIELDS, |w| {
            w.write_ref_type_id(ty);
        })?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let count = r.read_count()?;
        for _ in 0..count {
            let id = r.read_field_id()?;
            let name = r.read_string()?;
            let signature = r.read_string()?;
            let mod_bits = r.read_i32()?;
            out.push(FieldHandle {
                id,
                name,
                signature,
                declaring_type: ty,
                is_static: mod_bits & modifiers::STATIC != 0,
            });
        }

        let result = self.call("ClassType.Superclass", cmd::CLASS_TYPE, cmd::CT_SUPERCLASS, |w| {
            w.write_ref_type_id(ty);
        });
        let superclass = match result {
            Ok(reply) => PacketReader::new(&reply, self.conn.sizes()).read_ref_type_id()?,
            // インターフェースにはスーパークラスがない
            Err(SessionError::Vm {
                code: error::INVALID_CLASS,
                ..
            }) => RefTypeId(0),
            Err(e) => return Err(e),
        };
        if superclass.0 != 0 {
            self.collect_fields(superclass, out, seen)?;
        }

        let reply = self.call(
            "ReferenceType.Interfaces",
            cmd::REFERENCE_TYPE,
            cmd::RT_INTERFACES,
            |w| {
                w.write_ref_type_id(ty);
            },
        )?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let count = r.read_count()?;
        let mut interfaces = Vec::with_capacity(count);
        for _ in 0..count {
            interfaces.push(r.read_ref_type_id()?);
        }
        for interface in interfaces {
            self.collect_fields(interface, out, seen)?;
        }
        Ok(())
    }

    fn read_values(reply: &[u8], sizes: IdSizes) -> Result<Vec<RuntimeValue>> {
        let mut r = PacketReader::new(reply, sizes);
        let count = r.read_count()?;
        (0..count).map(|_| r.read_tagged_value()).collect()
    }

    fn single_value(values: Vec<RuntimeValue>, command: &str) -> Result<RuntimeValue> {
        values
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::Protocol(format!("{} returned no value", command)))
    }
}

/// 値を読めない状況を表すエラーコードか
fn is_inaccessible_code(code: u16) -> bool {
    matches!(
        code,
        error::OPAQUE_FRAME
            | error::INVALID_SLOT
            | error::NATIVE_METHOD
            | error::ABSENT_INFORMATION
            | error::TYPE_MISMATCH
            | error::INVALID_FIELDID
            | error::INVALID_OBJECT
            | error::ILLEGAL_ARGUMENT
    )
}

fn into_inaccessible(e: SessionError) -> SessionError {
    match e {
        SessionError::Vm { command, code } if is_inaccessible_code(code) => {
            SessionError::Inaccessible(format!("{} failed with JDWP error {}", command, code))
        }
        other => other,
    }
}

impl Session for JdwpSession {
    fn find_thread(&mut self, name: &str) -> Result<ThreadId> {
        let reply = self.call("VirtualMachine.AllThreads", cmd::VM, cmd::VM_ALL_THREADS, |_| {})?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let count = r.read_count()?;
        let mut threads = Vec::with_capacity(count);
        for _ in 0..count {
            threads.push(r.read_thread_id()?);
        }

        for thread in threads {
            match self.thread_name(thread) {
                Ok(thread_name) if thread_name == name => {
                    debug!("Thread '{}' is {}", name, thread);
                    return Ok(thread);
                }
                Ok(_) => {}
                // 列挙後に終了したスレッド
                Err(SessionError::Vm {
                    code: error::INVALID_THREAD,
                    ..
                }) => {}
                Err(e) => return Err(e),
            }
        }
        Err(SessionError::ThreadNotFound(name.to_string()))
    }

    fn install_breakpoint(&mut self, method: &MethodDescriptor) -> Result<Option<BreakpointId>> {
        let signature = class_name_to_signature(&method.class_name);
        let classes = self.classes_by_signature(&signature)?;
        if classes.is_empty() {
            debug!("Class {} is not loaded", method.class_name);
            return Ok(None);
        }

        let mut requests = Vec::new();
        for (type_tag, ty) in classes {
            for info in self.methods_of(ty)? {
                let parameters = match MethodSignature::parse(&info.signature) {
                    Ok(sig) => sig.parameter_type_names(),
                    Err(e) => {
                        warn!("Skipping {}.{}: {}", method.class_name, info.name, e);
                        continue;
                    }
                };
                if !method.matches_method(&info.name, &parameters) {
                    continue;
                }
                if !info.has_code() {
                    debug!("{}.{} has no bytecode", method.class_name, info.name);
                    continue;
                }

                let index = self.first_code_index(ty, info.id)?;
                let location = Location {
                    type_tag,
                    class: ty,
                    method: info.id,
                    index,
                };
                requests.push(self.set_breakpoint_request(&location)?);
            }
        }

        if requests.is_empty() {
            return Ok(None);
        }
        let id = self.breakpoints.add(method.clone(), requests);
        debug!("Breakpoint {} set at {}", id, method);
        Ok(Some(id))
    }

    fn remove_breakpoint(&mut self, id: BreakpointId) -> Result<()> {
        let Some(bp) = self.breakpoints.remove(id) else {
            return Ok(());
        };
        for request in bp.requests {
            let result = self.call("EventRequest.Clear", cmd::EVENT_REQUEST, cmd::ER_CLEAR, |w| {
                w.write_u8(event_kind::BREAKPOINT).write_i32(request);
            });
            match result {
                Ok(_) => {}
                Err(SessionError::Vm {
                    code: error::VM_DEAD,
                    ..
                }) => break,
                Err(e) => return Err(e),
            }
        }
        debug!("Breakpoint {} removed", id);
        Ok(())
    }

    fn resume(&mut self, thread: ThreadId) -> Result<()> {
        trace!("Resuming VM for {}", thread);
        self.awaited = Some(thread);
        self.resume_vm()
    }

    fn is_at_breakpoint(&mut self, thread: ThreadId) -> Result<bool> {
        self.pump_events()?;
        Ok(self.stopped.contains_key(&thread))
    }

    fn is_terminated(&mut self, thread: ThreadId) -> Result<bool> {
        self.pump_events()?;
        if self.vm_dead || self.conn.is_closed() || self.dead_threads.contains(&thread) {
            return Ok(true);
        }

        let result = self.call(
            "ThreadReference.Status",
            cmd::THREAD_REFERENCE,
            cmd::TR_STATUS,
            |w| {
                w.write_thread_id(thread);
            },
        );
        match result {
            Ok(reply) => {
                let status = PacketReader::new(&reply, self.conn.sizes()).read_i32()?;
                Ok(ThreadStatus::from_raw(status) == Some(ThreadStatus::Zombie))
            }
            Err(SessionError::Vm {
                code: error::INVALID_THREAD | error::VM_DEAD,
                ..
            }) => Ok(true),
            Err(SessionError::Io(e)) if self.conn.is_closed() => {
                debug!("Connection lost while polling thread status: {}", e);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    fn frames(&mut self, thread: ThreadId) -> Result<Vec<FrameHandle>> {
        let reply = self.call(
            "ThreadReference.Frames",
            cmd::THREAD_REFERENCE,
            cmd::TR_FRAMES,
            |w| {
                w.write_thread_id(thread).write_i32(0).write_i32(-1);
            },
        )?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let count = r.read_count()?;
        let mut frames = Vec::with_capacity(count);
        for index in 0..count {
            let id = r.read_frame_id()?;
            let location = r.read_location()?;
            frames.push(FrameHandle {
                thread,
                index,
                id,
                declaring_type: location.class,
                method: location.method,
            });
        }
        Ok(frames)
    }

    fn frame_method(&mut self, frame: &FrameHandle) -> Result<MethodDescriptor> {
        let class_name = self.type_name(frame.declaring_type)?;
        let info = self.method_info(frame.declaring_type, frame.method)?;
        let signature = MethodSignature::parse(&info.signature)?;
        Ok(MethodDescriptor::with_parameters(
            class_name,
            info.name,
            signature.parameter_type_names(),
        ))
    }

    fn arguments(&mut self, frame: &FrameHandle) -> Result<Vec<RuntimeValue>> {
        let info = self.method_info(frame.declaring_type, frame.method)?;
        if !info.has_code() {
            return Err(SessionError::Inaccessible(format!(
                "{} is a native method",
                info.name
            )));
        }
        let signature = MethodSignature::parse(&info.signature)?;
        if signature.parameters.is_empty() {
            return Ok(Vec::new());
        }

        let mut slot = if info.is_static() { 0 } else { 1 };
        let mut slots = Vec::with_capacity(signature.parameters.len());
        for param in &signature.parameters {
            let sig_byte = param.as_bytes().first().copied().unwrap_or(tag::OBJECT);
            slots.push((slot, sig_byte));
            slot += slot_width(param);
        }

        let reply = self
            .call(
                "StackFrame.GetValues",
                cmd::STACK_FRAME,
                cmd::SF_GET_VALUES,
                |w| {
                    w.write_thread_id(frame.thread)
                        .write_frame_id(frame.id)
                        .write_i32(slots.len() as i32);
                    for (slot, sig_byte) in &slots {
                        w.write_i32(*slot).write_u8(*sig_byte);
                    }
                },
            )
            .map_err(into_inaccessible)?;
        Self::read_values(&reply, self.conn.sizes())
    }

    fn receiver(&mut self, frame: &FrameHandle) -> Result<RuntimeValue> {
        let reply = self
            .call(
                "StackFrame.ThisObject",
                cmd::STACK_FRAME,
                cmd::SF_THIS_OBJECT,
                |w| {
                    w.write_thread_id(frame.thread).write_frame_id(frame.id);
                },
            )
            .map_err(into_inaccessible)?;
        PacketReader::new(&reply, self.conn.sizes()).read_tagged_value()
    }

    fn runtime_type(&mut self, object: ObjectId) -> Result<RefTypeId> {
        let reply = self.call(
            "ObjectReference.ReferenceType",
            cmd::OBJECT_REFERENCE,
            cmd::OR_REFERENCE_TYPE,
            |w| {
                w.write_object_id(object);
            },
        )
        .map_err(into_inaccessible)?;
        self.read_type_ref(&reply)
    }

    fn reflected_type(&mut self, class_object: ObjectId) -> Result<RefTypeId> {
        let reply = self.call(
            "ClassObjectReference.ReflectedType",
            cmd::CLASS_OBJECT_REFERENCE,
            cmd::COR_REFLECTED_TYPE,
            |w| {
                w.write_object_id(class_object);
            },
        )
        .map_err(into_inaccessible)?;
        self.read_type_ref(&reply)
    }

    fn type_name(&mut self, ty: RefTypeId) -> Result<String> {
        if let Some(name) = self.type_names.get(&ty) {
            return Ok(name.clone());
        }
        let reply = self.call(
            "ReferenceType.Signature",
            cmd::REFERENCE_TYPE,
            cmd::RT_SIGNATURE,
            |w| {
                w.write_ref_type_id(ty);
            },
        )?;
        let signature = PacketReader::new(&reply, self.conn.sizes()).read_string()?;
        let name = signature_to_type_name(&signature);
        self.type_names.insert(ty, name.clone());
        Ok(name)
    }

    fn is_type_ready(&mut self, ty: RefTypeId) -> Result<bool> {
        let reply = self.call("ReferenceType.Status", cmd::REFERENCE_TYPE, cmd::RT_STATUS, |w| {
            w.write_ref_type_id(ty);
        })?;
        let status = PacketReader::new(&reply, self.conn.sizes()).read_i32()?;
        Ok(status & class_status::PREPARED != 0 && status & class_status::ERROR == 0)
    }

    fn fields(&mut self, ty: RefTypeId) -> Result<Vec<FieldHandle>> {
        if let Some(fields) = self.fields.get(&ty) {
            return Ok(fields.clone());
        }
        let mut fields = Vec::new();
        self.collect_fields(ty, &mut fields, &mut HashSet::new())?;
        self.fields.insert(ty, fields.clone());
        Ok(fields)
    }

    fn read_field(&mut self, holder: ObjectId, field: &FieldHandle) -> Result<RuntimeValue> {
        let result = if field.is_static {
            self.call(
                "ReferenceType.GetValues",
                cmd::REFERENCE_TYPE,
                cmd::RT_GET_VALUES,
                |w| {
                    w.write_ref_type_id(field.declaring_type)
                        .write_i32(1)
                        .write_field_id(field.id);
                },
            )
        } else {
            self.call(
                "ObjectReference.GetValues",
                cmd::OBJECT_REFERENCE,
                cmd::OR_GET_VALUES,
                |w| {
                    w.write_object_id(holder)
                        .write_i32(1)
                        .write_field_id(field.id);
                },
            )
        };
        let reply = result.map_err(into_inaccessible)?;
        let values = Self::read_values(&reply, self.conn.sizes())?;
        Self::single_value(values, "GetValues")
    }

    fn array_elements(&mut self, array: ObjectId) -> Result<Vec<RuntimeValue>> {
        let reply = self.call(
            "ArrayReference.Length",
            cmd::ARRAY_REFERENCE,
            cmd::AR_LENGTH,
            |w| {
                w.write_object_id(array);
            },
        )
        .map_err(into_inaccessible)?;
        let length = PacketReader::new(&reply, self.conn.sizes()).read_i32()?;
        if length <= 0 {
            return Ok(Vec::new());
        }

        let reply = self.call(
            "ArrayReference.GetValues",
            cmd::ARRAY_REFERENCE,
            cmd::AR_GET_VALUES,
            |w| {
                w.write_object_id(array).write_i32(0).write_i32(length);
            },
        )
        .map_err(into_inaccessible)?;
        let mut r = PacketReader::new(&reply, self.conn.sizes());
        let region_tag = r.read_u8()?;
        let count = r.read_count()?;
        if tag::is_primitive(region_tag) {
            (0..count).map(|_| r.read_value(region_tag)).collect()
        } else {
            (0..count).map(|_| r.read_tagged_value()).collect()
        }
    }

    fn string_value(&mut self, string: ObjectId) -> Result<String> {
        let reply = self.call(
            "StringReference.Value",
            cmd::STRING_REFERENCE,
            cmd::SR_VALUE,
            |w| {
                w.write_object_id(string);
            },
        )
        .map_err(into_inaccessible)?;
        PacketReader::new(&reply, self.conn.sizes()).read_string()
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        if !self.conn.is_closed() && !self.vm_dead {
            if let Err(e) = self.call("VirtualMachine.Dispose", cmd::VM, cmd::VM_DISPOSE, |_| {}) {
                debug!("VirtualMachine.Dispose failed: {}", e);
            }
        }
        self.conn.close();
        info!("Detached from {}", self.conn.address());
        Ok(())
    }
}

impl Drop for JdwpSession {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}
