//! JDWP プロトコル定数

/// ハンドシェイク文字列
pub const HANDSHAKE: &[u8] = b"JDWP-Handshake";

/// パケットヘッダ長（length + id + flags + (cmdset, cmd | error)）
pub const HEADER_LEN: usize = 11;

/// 応答パケットのフラグ
pub const FLAG_REPLY: u8 = 0x80;

/// コマンドセットとコマンド番号
pub mod cmd {
    pub const VM: u8 = 1;
    pub const VM_CLASSES_BY_SIGNATURE: u8 = 2;
    pub const VM_ALL_THREADS: u8 = 4;
    pub const VM_DISPOSE: u8 = 6;
    pub const VM_ID_SIZES: u8 = 7;
    pub const VM_RESUME: u8 = 9;

    pub const REFERENCE_TYPE: u8 = 2;
    pub const RT_SIGNATURE: u8 = 1;
    pub const RT_FIELDS: u8 = 4;
    pub const RT_METHODS: u8 = 5;
    pub const RT_GET_VALUES: u8 = 6;
    pub const RT_STATUS: u8 = 9;
    pub const RT_INTERFACES: u8 = 10;

    pub const CLASS_TYPE: u8 = 3;
    pub const CT_SUPERCLASS: u8 = 1;

    pub const METHOD: u8 = 6;
    pub const M_LINE_TABLE: u8 = 1;

    pub const OBJECT_REFERENCE: u8 = 9;
    pub const OR_REFERENCE_TYPE: u8 = 1;
    pub const OR_GET_VALUES: u8 = 2;

    pub const STRING_REFERENCE: u8 = 10;
    pub const SR_VALUE: u8 = 1;

    pub const THREAD_REFERENCE: u8 = 11;
    pub const TR_NAME: u8 = 1;
    pub const TR_STATUS: u8 = 4;
    pub const TR_FRAMES: u8 = 6;

    pub const ARRAY_REFERENCE: u8 = 13;
    pub const AR_LENGTH: u8 = 1;
    pub const AR_GET_VALUES: u8 = 2;

    pub const EVENT_REQUEST: u8 = 15;
    pub const ER_SET: u8 = 1;
    pub const ER_CLEAR: u8 = 2;

    pub const STACK_FRAME: u8 = 16;
    pub const SF_GET_VALUES: u8 = 1;
    pub const SF_THIS_OBJECT: u8 = 3;

    pub const CLASS_OBJECT_REFERENCE: u8 = 17;
    pub const COR_REFLECTED_TYPE: u8 = 1;

    pub const EVENT: u8 = 64;
    pub const E_COMPOSITE: u8 = 100;
}

/// 値タグ
pub mod tag {
    pub const ARRAY: u8 = b'[';
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const OBJECT: u8 = b'L';
    pub const FLOAT: u8 = b'F';
    pub const DOUBLE: u8 = b'D';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const VOID: u8 = b'V';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const THREAD: u8 = b't';
    pub const THREAD_GROUP: u8 = b'g';
    pub const CLASS_LOADER: u8 = b'l';
    pub const CLASS_OBJECT: u8 = b'c';

    /// プリミティブ型のタグかどうか
    pub fn is_primitive(tag: u8) -> bool {
        matches!(tag, BYTE | CHAR | FLOAT | DOUBLE | INT | LONG | SHORT | BOOLEAN)
    }
}

/// イベント種別
pub mod event_kind {
    pub const SINGLE_STEP: u8 = 1;
    pub const BREAKPOINT: u8 = 2;
    pub const FRAME_POP: u8 = 3;
    pub const THREAD_START: u8 = 6;
    pub const THREAD_DEATH: u8 = 7;
    pub const CLASS_PREPARE: u8 = 8;
    pub const CLASS_UNLOAD: u8 = 9;
    pub const METHOD_ENTRY: u8 = 40;
    pub const METHOD_EXIT: u8 = 41;
    pub const VM_START: u8 = 90;
    pub const VM_DEATH: u8 = 99;
}

/// サスペンドポリシー
pub mod suspend_policy {
    pub const NONE: u8 = 0;
    pub const EVENT_THREAD: u8 = 1;
    pub const ALL: u8 = 2;
}

/// イベントリクエストの修飾子
pub mod modifier {
    pub const LOCATION_ONLY: u8 = 7;
}

/// 型タグ
pub mod type_tag {
    pub const CLASS: u8 = 1;
    pub const INTERFACE: u8 = 2;
    pub const ARRAY: u8 = 3;
}

/// クラスの状態ビット
pub mod class_status {
    pub const VERIFIED: i32 = 1;
    pub const PREPARED: i32 = 2;
    pub const INITIALIZED: i32 = 4;
    pub const ERROR: i32 = 8;
}

/// アクセス修飾子ビット
pub mod modifiers {
    pub const STATIC: i32 = 0x0008;
    pub const NATIVE: i32 = 0x0100;
    pub const ABSTRACT: i32 = 0x0400;
}

/// エラーコード
pub mod error {
    pub const NONE: u16 = 0;
    pub const INVALID_THREAD: u16 = 10;
    pub const THREAD_NOT_SUSPENDED: u16 = 13;
    pub const INVALID_OBJECT: u16 = 20;
    pub const INVALID_CLASS: u16 = 21;
    pub const INVALID_METHODID: u16 = 23;
    pub const INVALID_FIELDID: u16 = 25;
    pub const INVALID_FRAMEID: u16 = 30;
    pub const OPAQUE_FRAME: u16 = 32;
    pub const TYPE_MISMATCH: u16 = 34;
    pub const INVALID_SLOT: u16 = 35;
    pub const ABSENT_INFORMATION: u16 = 101;
    pub const ILLEGAL_ARGUMENT: u16 = 103;
    pub const VM_DEAD: u16 = 112;
    pub const NATIVE_METHOD: u16 = 511;
}
