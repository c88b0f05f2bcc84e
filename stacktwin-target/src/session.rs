//! セッション（アタッチ済みリモートプロセス）の抽象化
//!
//! [`Session`] トレイトはリモートプロセスを制御・観測する能力を表します。
//! 具体的なトランスポート（JDWPなど）はこのトレイトを実装します。

use crate::method::MethodDescriptor;
use crate::thread::ThreadId;
use crate::value::{ObjectId, RuntimeValue};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// セッション操作のエラー
#[derive(Debug, Error)]
pub enum SessionError {
    /// 利用できるトランスポートがない
    #[error("no transport connector available for {0}")]
    TransportUnavailable(String),
    /// 接続拒否
    #[error("connection to {0} refused, check that the address matches the target")]
    ConnectionRefused(String),
    /// 指定名のスレッドが存在しない
    #[error("no thread named '{0}' was found")]
    ThreadNotFound(String),
    /// 値を読み取れない（ネイティブフレーム、アクセス不可フィールドなど）
    #[error("value is inaccessible: {0}")]
    Inaccessible(String),
    /// 分類できない値の種類（分類器とターゲットのバージョン不一致）
    #[error("unknown value kind with tag '{0}', extraction not implemented for it")]
    UnknownValueKind(char),
    /// ターゲットVMがエラーを返した
    #[error("{command} failed with JDWP error {code}")]
    Vm { command: &'static str, code: u16 },
    /// プロトコル違反
    #[error("protocol error: {0}")]
    Protocol(String),
    /// I/O エラー
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// セッション操作の結果型
pub type Result<T> = std::result::Result<T, SessionError>;

/// 参照型（クラス・インターフェース・配列型）の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefTypeId(pub u64);

/// ブレークポイントの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub u32);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// スタックフレームのハンドル
///
/// 停止中のスレッドでのみ有効です。スレッドを再開すると無効になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    /// 所属スレッド
    pub thread: ThreadId,
    /// フレーム番号（0 が最も内側）
    pub index: usize,
    /// トランスポート固有のフレームID
    pub id: u64,
    /// 実行中メソッドを宣言している型
    pub declaring_type: RefTypeId,
    /// トランスポート固有のメソッドID
    pub method: u64,
}

/// フィールドのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    /// トランスポート固有のフィールドID
    pub id: u64,
    /// フィールド名
    pub name: String,
    /// 型シグネチャ
    pub signature: String,
    /// 宣言している型
    pub declaring_type: RefTypeId,
    /// static フィールドかどうか
    pub is_static: bool,
}

/// セッションの接続先（host:port）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAddress {
    pub host: String,
    pub port: u16,
}

impl SessionAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for SessionAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for SessionAddress {
    type Err = SessionError;

    /// `host:port` または `port` だけ（host は localhost）をパースする
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, port),
            None => ("localhost", s),
        };
        let port = port
            .parse::<u16>()
            .map_err(|_| SessionError::TransportUnavailable(format!("invalid address '{}'", s)))?;
        let host = if host.is_empty() { "localhost" } else { host };
        Ok(Self::new(host, port))
    }
}

/// アタッチ済みリモートプロセスの制御・観測能力
///
/// 観測専用です。リモートの状態を書き換える操作はブレークポイントの
/// 設定・解除とスレッドの再開・停止に限られます。
pub trait Session {
    /// 名前でスレッドを検索する（見つからなければ `ThreadNotFound`）
    fn find_thread(&mut self, name: &str) -> Result<ThreadId>;

    /// メソッドの先頭にブレークポイントを設定する
    ///
    /// このセッションで解決できないメソッドなら `Ok(None)` を返します。
    fn install_breakpoint(&mut self, method: &MethodDescriptor) -> Result<Option<BreakpointId>>;

    /// ブレークポイントを解除する
    fn remove_breakpoint(&mut self, id: BreakpointId) -> Result<()>;

    /// スレッドを再開する
    ///
    /// ブレークポイントが VM 全体を止める実装では、他のスレッドもまとめて再開します。
    fn resume(&mut self, thread: ThreadId) -> Result<()>;

    /// スレッドがブレークポイントで停止しているか
    fn is_at_breakpoint(&mut self, thread: ThreadId) -> Result<bool>;

    /// スレッドが終了しているか
    fn is_terminated(&mut self, thread: ThreadId) -> Result<bool>;

    /// 現在のスタックフレームを内側から順に取得する
    fn frames(&mut self, thread: ThreadId) -> Result<Vec<FrameHandle>>;

    /// フレームで実行中のメソッドを取得する
    fn frame_method(&mut self, frame: &FrameHandle) -> Result<MethodDescriptor>;

    /// フレームの引数値を宣言順に取得する（ネイティブフレームは `Inaccessible`）
    fn arguments(&mut self, frame: &FrameHandle) -> Result<Vec<RuntimeValue>>;

    /// フレームのレシーバ（this）を取得する。static なら `Null`
    fn receiver(&mut self, frame: &FrameHandle) -> Result<RuntimeValue>;

    /// オブジェクトの実行時型を取得する
    fn runtime_type(&mut self, object: ObjectId) -> Result<RefTypeId>;

    /// クラスオブジェクトが表す型を取得する
    fn reflected_type(&mut self, class_object: ObjectId) -> Result<RefTypeId>;

    /// 型名を取得する
    fn type_name(&mut self, ty: RefTypeId) -> Result<String>;

    /// 型が準備済み（static フィールドが確保済み）か
    fn is_type_ready(&mut self, ty: RefTypeId) -> Result<bool>;

    /// 継承分を含むすべてのフィールドを取得する
    fn fields(&mut self, ty: RefTypeId) -> Result<Vec<FieldHandle>>;

    /// フィールドを読み取る（読めなければ `Inaccessible`）
    ///
    /// static フィールドは宣言型から読み取るため `holder` は参照されません。
    fn read_field(&mut self, holder: ObjectId, field: &FieldHandle) -> Result<RuntimeValue>;

    /// 配列の全要素を取得する
    fn array_elements(&mut self, array: ObjectId) -> Result<Vec<RuntimeValue>>;

    /// 文字列の内容を取得する
    fn string_value(&mut self, string: ObjectId) -> Result<String>;

    /// 接続を切断する
    fn dispose(&mut self) -> Result<()>;
}
