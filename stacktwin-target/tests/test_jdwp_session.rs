//! スクリプト化したJDWPサーバーに対するセッションのテスト

use stacktwin_target::packet::{encode_command, encode_reply, IdSizes, Packet, PacketHeader, PacketWriter};
use stacktwin_target::protocol::{cmd, error, event_kind, modifiers, suspend_policy, HANDSHAKE};
use stacktwin_target::{
    JdwpSession, MethodDescriptor, ObjectId, RefTypeId, Session, SessionAddress, SessionError,
    ThreadId,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// 受信したコマンドパケットに対して送り返すパケット列を返すハンドラ
type Handler = Box<dyn FnMut(&Packet) -> Vec<Vec<u8>> + Send>;

/// 1接続だけ受け付けるJDWPサーバーを起動する
fn spawn_server(mut handler: Handler) -> (SessionAddress, JoinHandle<Vec<(u8, u8)>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let port = listener.local_addr().unwrap().port();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept");
        let mut hello = [0u8; 14];
        stream.read_exact(&mut hello).expect("Failed to read handshake");
        assert_eq!(&hello, HANDSHAKE);
        stream.write_all(HANDSHAKE).unwrap();

        let mut seen = Vec::new();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buffer.extend_from_slice(&chunk[..n]);
            while let Some((packet, used)) = Packet::decode(&buffer).unwrap() {
                buffer.drain(..used);
                if let PacketHeader::Command { command_set, command } = packet.header {
                    seen.push((command_set, command));
                    if (command_set, command) == (cmd::VM, cmd::VM_DISPOSE) {
                        let _ = stream.write_all(&encode_reply(packet.id, 0, &[]));
                        return seen;
                    }
                }
                for out in handler(&packet) {
                    stream.write_all(&out).unwrap();
                }
            }
        }
        seen
    });

    (SessionAddress::new("127.0.0.1", port), handle)
}

fn writer() -> PacketWriter {
    PacketWriter::new(IdSizes::default())
}

fn command_of(packet: &Packet) -> (u8, u8) {
    match packet.header {
        PacketHeader::Command { command_set, command } => (command_set, command),
        PacketHeader::Reply { .. } => panic!("unexpected reply from client"),
    }
}

/// アタッチ時の共通応答（IDSizes と ThreadDeath リクエスト）
fn attach_reply(packet: &Packet) -> Option<Vec<u8>> {
    match command_of(packet) {
        (cmd::VM, cmd::VM_ID_SIZES) => {
            let mut w = writer();
            for _ in 0..5 {
                w.write_i32(8);
            }
            Some(encode_reply(packet.id, 0, &w.into_bytes()))
        }
        (cmd::EVENT_REQUEST, cmd::ER_SET) if packet.data[0] == event_kind::THREAD_DEATH => {
            let mut w = writer();
            w.write_i32(1);
            Some(encode_reply(packet.id, 0, &w.into_bytes()))
        }
        _ => None,
    }
}

fn threads_reply(packet: &Packet) -> Option<Vec<u8>> {
    match command_of(packet) {
        (cmd::VM, cmd::VM_ALL_THREADS) => {
            let mut w = writer();
            w.write_i32(2)
                .write_thread_id(ThreadId(11))
                .write_thread_id(ThreadId(12));
            Some(encode_reply(packet.id, 0, &w.into_bytes()))
        }
        (cmd::THREAD_REFERENCE, cmd::TR_NAME) => {
            let name = if packet.data.ends_with(&[11]) { "worker" } else { "main" };
            let mut w = writer();
            w.write_string(name);
            Some(encode_reply(packet.id, 0, &w.into_bytes()))
        }
        _ => None,
    }
}

#[test]
fn test_attach_and_find_thread() {
    let (address, server) = spawn_server(Box::new(|packet| {
        let reply = attach_reply(packet)
            .or_else(|| threads_reply(packet))
            .unwrap_or_else(|| encode_reply(packet.id, 99, &[]));
        vec![reply]
    }));

    let mut session = JdwpSession::attach(&address).expect("Failed to attach");
    assert_eq!(session.find_thread("main").unwrap(), ThreadId(12));
    assert_eq!(session.find_thread("worker").unwrap(), ThreadId(11));
    assert!(matches!(
        session.find_thread("missing"),
        Err(SessionError::ThreadNotFound(name)) if name == "missing"
    ));
    session.dispose().unwrap();

    let seen = server.join().unwrap();
    assert_eq!(seen.first(), Some(&(cmd::VM, cmd::VM_ID_SIZES)));
    assert_eq!(seen.last(), Some(&(cmd::VM, cmd::VM_DISPOSE)));
}

#[test]
fn test_connection_refused() {
    // 空きポートを確保してすぐ閉じる
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = JdwpSession::attach(&SessionAddress::new("127.0.0.1", port));
    assert!(matches!(result, Err(SessionError::ConnectionRefused(_))));
}

#[test]
fn test_breakpoint_install_and_hit() {
    let (address, server) = spawn_server(Box::new(|packet| {
        if let Some(reply) = attach_reply(packet) {
            return vec![reply];
        }
        match command_of(packet) {
            (cmd::VM, cmd::VM_CLASSES_BY_SIGNATURE) => {
                let mut w = writer();
                w.write_i32(1).write_u8(1).write_ref_type_id(RefTypeId(100)).write_i32(7);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::REFERENCE_TYPE, cmd::RT_METHODS) => {
                let mut w = writer();
                w.write_i32(3);
                w.write_method_id(5).write_string("run").write_string("(I)V").write_i32(1);
                w.write_method_id(6).write_string("run").write_string("()V").write_i32(0x100);
                w.write_method_id(7).write_string("stop").write_string("()V").write_i32(1);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::METHOD, cmd::M_LINE_TABLE) => {
                let mut w = writer();
                w.write_u64(0).write_u64(12).write_i32(0);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::EVENT_REQUEST, cmd::ER_SET) => {
                // ブレークポイントは VM 全体を止める
                assert_eq!(packet.data[1], suspend_policy::ALL);
                let mut w = writer();
                w.write_i32(42);
                let reply = encode_reply(packet.id, 0, &w.into_bytes());

                // 設定直後にヒットさせる
                let mut e = writer();
                e.write_u8(suspend_policy::ALL)
                    .write_i32(1)
                    .write_u8(event_kind::BREAKPOINT)
                    .write_i32(42)
                    .write_thread_id(ThreadId(12))
                    .write_u8(1)
                    .write_ref_type_id(RefTypeId(100))
                    .write_method_id(5)
                    .write_u64(0);
                let event = encode_command(1000, cmd::EVENT, cmd::E_COMPOSITE, &e.into_bytes());
                vec![reply, event]
            }
            (cmd::EVENT_REQUEST, cmd::ER_CLEAR) | (cmd::VM, cmd::VM_RESUME) => {
                vec![encode_reply(packet.id, 0, &[])]
            }
            _ => vec![encode_reply(packet.id, 99, &[])],
        }
    }));

    let mut session = JdwpSession::attach(&address).expect("Failed to attach");

    // ネイティブの run() と名前違いの stop() は対象外
    let method = MethodDescriptor::new("app.Main", "run");
    let id = session
        .install_breakpoint(&method)
        .unwrap()
        .expect("Breakpoint should resolve");

    let deadline = Instant::now() + Duration::from_secs(5);
    while !session.is_at_breakpoint(ThreadId(12)).unwrap() {
        assert!(Instant::now() < deadline, "breakpoint event was not delivered");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!session.is_at_breakpoint(ThreadId(11)).unwrap());

    session.remove_breakpoint(id).unwrap();
    session.resume(ThreadId(12)).unwrap();
    assert!(!session.is_at_breakpoint(ThreadId(12)).unwrap());
    session.dispose().unwrap();

    let seen = server.join().unwrap();
    let sets = seen
        .iter()
        .filter(|c| **c == (cmd::EVENT_REQUEST, cmd::ER_SET))
        .count();
    // ThreadDeath + run(I)V の1件
    assert_eq!(sets, 2);
    assert!(seen.contains(&(cmd::VM, cmd::VM_RESUME)));
    assert!(!seen.iter().any(|c| c.0 == cmd::THREAD_REFERENCE && c.1 != cmd::TR_NAME));
}

/// リクエスト42のブレークポイントイベント
fn breakpoint_event(thread: ThreadId) -> Vec<u8> {
    let mut e = writer();
    e.write_u8(suspend_policy::ALL)
        .write_i32(1)
        .write_u8(event_kind::BREAKPOINT)
        .write_i32(42)
        .write_thread_id(thread)
        .write_u8(1)
        .write_ref_type_id(RefTypeId(100))
        .write_method_id(5)
        .write_u64(0);
    encode_command(2000 + thread.0 as u32, cmd::EVENT, cmd::E_COMPOSITE, &e.into_bytes())
}

#[test]
fn test_breakpoint_on_other_thread_is_skipped() {
    let mut resumes = 0;
    let (address, server) = spawn_server(Box::new(move |packet| {
        if let Some(reply) = attach_reply(packet) {
            return vec![reply];
        }
        let mut w = writer();
        match command_of(packet) {
            (cmd::VM, cmd::VM_CLASSES_BY_SIGNATURE) => {
                w.write_i32(1).write_u8(1).write_ref_type_id(RefTypeId(100)).write_i32(7);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::REFERENCE_TYPE, cmd::RT_METHODS) => {
                w.write_i32(1);
                w.write_method_id(5).write_string("run").write_string("()V").write_i32(1);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::METHOD, cmd::M_LINE_TABLE) => {
                w.write_u64(0).write_u64(12).write_i32(0);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::EVENT_REQUEST, cmd::ER_SET) => {
                w.write_i32(42);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::VM, cmd::VM_RESUME) => {
                resumes += 1;
                // 1回目は worker が先に当たり、2回目で main が当たる
                let hit = if resumes == 1 { ThreadId(11) } else { ThreadId(12) };
                vec![encode_reply(packet.id, 0, &[]), breakpoint_event(hit)]
            }
            _ => vec![encode_reply(packet.id, 99, &[])],
        }
    }));

    let mut session = JdwpSession::attach(&address).expect("Failed to attach");
    session
        .install_breakpoint(&MethodDescriptor::new("app.Main", "run"))
        .unwrap()
        .expect("Breakpoint should resolve");
    session.resume(ThreadId(12)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !session.is_at_breakpoint(ThreadId(12)).unwrap() {
        assert!(Instant::now() < deadline, "main never reached the breakpoint");
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!session.is_at_breakpoint(ThreadId(11)).unwrap());
    session.dispose().unwrap();

    let seen = server.join().unwrap();
    let resumes = seen.iter().filter(|c| **c == (cmd::VM, cmd::VM_RESUME)).count();
    assert_eq!(resumes, 2);
}

#[test]
fn test_collected_objects_are_inaccessible() {
    let (address, server) = spawn_server(Box::new(|packet| {
        if let Some(reply) = attach_reply(packet) {
            return vec![reply];
        }
        match command_of(packet) {
            (cmd::OBJECT_REFERENCE, cmd::OR_REFERENCE_TYPE) if packet.data.ends_with(&[6]) => {
                vec![encode_reply(packet.id, 99, &[])]
            }
            (cmd::OBJECT_REFERENCE, cmd::OR_REFERENCE_TYPE)
            | (cmd::ARRAY_REFERENCE, cmd::AR_LENGTH)
            | (cmd::STRING_REFERENCE, cmd::SR_VALUE) => {
                vec![encode_reply(packet.id, error::INVALID_OBJECT, &[])]
            }
            _ => vec![encode_reply(packet.id, 99, &[])],
        }
    }));

    let mut session = JdwpSession::attach(&address).expect("Failed to attach");
    assert!(matches!(
        session.runtime_type(ObjectId(5)),
        Err(SessionError::Inaccessible(_))
    ));
    assert!(matches!(
        session.array_elements(ObjectId(5)),
        Err(SessionError::Inaccessible(_))
    ));
    assert!(matches!(
        session.string_value(ObjectId(5)),
        Err(SessionError::Inaccessible(_))
    ));
    // オブジェクト以外の失敗は致命的なまま
    assert!(matches!(
        session.runtime_type(ObjectId(6)),
        Err(SessionError::Vm { code: 99, .. })
    ));
    session.dispose().unwrap();
    server.join().unwrap();
}

#[test]
fn test_fields_follow_superclass_before_interfaces() {
    const DERIVED: u8 = 10;
    const BASE: u8 = 20;
    const LIMITS: u8 = 30;

    let (address, server) = spawn_server(Box::new(|packet| {
        if let Some(reply) = attach_reply(packet) {
            return vec![reply];
        }
        let ty = packet.data.get(7).copied().unwrap_or(0);
        let mut w = writer();
        match command_of(packet) {
            (cmd::REFERENCE_TYPE, cmd::RT_FIELDS) => {
                let (name, mod_bits) = match ty {
                    DERIVED => ("d", 0),
                    BASE => ("b", 0),
                    _ => ("MAX", modifiers::STATIC),
                };
                w.write_i32(1)
                    .write_field_id(ty as u64)
                    .write_string(name)
                    .write_string("I")
                    .write_i32(mod_bits);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            (cmd::CLASS_TYPE, cmd::CT_SUPERCLASS) => match ty {
                DERIVED => {
                    w.write_ref_type_id(RefTypeId(BASE as u64));
                    vec![encode_reply(packet.id, 0, &w.into_bytes())]
                }
                BASE => {
                    w.write_ref_type_id(RefTypeId(0));
                    vec![encode_reply(packet.id, 0, &w.into_bytes())]
                }
                _ => vec![encode_reply(packet.id, error::INVALID_CLASS, &[])],
            },
            (cmd::REFERENCE_TYPE, cmd::RT_INTERFACES) => {
                if ty == DERIVED {
                    w.write_i32(1).write_ref_type_id(RefTypeId(LIMITS as u64));
                } else {
                    w.write_i32(0);
                }
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            _ => vec![encode_reply(packet.id, 99, &[])],
        }
    }));

    let mut session = JdwpSession::attach(&address).expect("Failed to attach");
    let fields = session.fields(RefTypeId(DERIVED as u64)).unwrap();
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["d", "b", "MAX"]);
    assert_eq!(fields[1].declaring_type, RefTypeId(BASE as u64));
    assert!(fields[2].is_static);
    session.dispose().unwrap();
    server.join().unwrap();
}

#[test]
fn test_unresolvable_class() {
    let (address, server) = spawn_server(Box::new(|packet| {
        if let Some(reply) = attach_reply(packet) {
            return vec![reply];
        }
        match command_of(packet) {
            (cmd::VM, cmd::VM_CLASSES_BY_SIGNATURE) => {
                let mut w = writer();
                w.write_i32(0);
                vec![encode_reply(packet.id, 0, &w.into_bytes())]
            }
            _ => vec![encode_reply(packet.id, 99, &[])],
        }
    }));

    let mut session = JdwpSession::attach(&address).expect("Failed to attach");
    let method = MethodDescriptor::new("app.Missing", "run");
    assert_eq!(session.install_breakpoint(&method).unwrap(), None);
    session.dispose().unwrap();
    server.join().unwrap();
}
