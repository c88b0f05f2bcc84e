//! JDWP パケットのエンコード・デコード
//!
//! JDWP はビッグエンディアンです。ID類のサイズは接続ごとに
//! `VirtualMachine.IDSizes` で決まるため、リーダー・ライターは [`IdSizes`] を保持します。

use crate::classify::{classify_tag, ValueKind};
use crate::protocol::{tag, FLAG_REPLY, HEADER_LEN};
use crate::session::{RefTypeId, Result, SessionError};
use crate::thread::ThreadId;
use crate::value::{ObjectId, Primitive, RuntimeValue};

/// ワイヤから読み書き可能な固定長の型
pub trait WireReadable: Sized {
    /// ビッグエンディアンのバイト列から値を構築
    fn from_be_bytes(bytes: &[u8]) -> Result<Self>;

    /// ビッグエンディアンのバイト列に変換
    fn to_be_bytes(&self) -> Vec<u8>;

    /// 型のサイズ（バイト数）
    fn size() -> usize;
}

macro_rules! impl_wire_readable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl WireReadable for $ty {
                fn from_be_bytes(bytes: &[u8]) -> Result<Self> {
                    let array: [u8; std::mem::size_of::<$ty>()] = bytes.try_into().map_err(|_| {
                        SessionError::Protocol(format!(
                            "failed to convert {} bytes to {} (expected {} bytes)",
                            bytes.len(),
                            stringify!($ty),
                            std::mem::size_of::<$ty>()
                        ))
                    })?;
                    Ok(<$ty>::from_be_bytes(array))
                }

                fn to_be_bytes(&self) -> Vec<u8> {
                    (*self).to_be_bytes().to_vec()
                }

                fn size() -> usize {
                    std::mem::size_of::<$ty>()
                }
            }
        )+
    };
}

impl_wire_readable!(u8, i8, u16, i16, u32, i32, u64, i64);

/// 接続ごとのIDサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSizes {
    pub field: usize,
    pub method: usize,
    pub object: usize,
    pub reference_type: usize,
    pub frame: usize,
}

impl Default for IdSizes {
    fn default() -> Self {
        Self {
            field: 8,
            method: 8,
            object: 8,
            reference_type: 8,
            frame: 8,
        }
    }
}

/// コード上の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub type_tag: u8,
    pub class: RefTypeId,
    pub method: u64,
    pub index: u64,
}

/// パケットヘッダ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    /// コマンド（デバッガ発行、またはVMからのイベント）
    Command { command_set: u8, command: u8 },
    /// 応答
    Reply { error_code: u16 },
}

/// デコード済みパケット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: u32,
    pub header: PacketHeader,
    pub data: Vec<u8>,
}

impl Packet {
    /// バッファ先頭から1パケットをデコードする
    ///
    /// データが足りなければ `Ok(None)`、揃っていればパケットと消費バイト数を返します。
    pub fn decode(buf: &[u8]) -> Result<Option<(Packet, usize)>> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if length < HEADER_LEN {
            return Err(SessionError::Protocol(format!(
                "packet length {} is shorter than the header",
                length
            )));
        }
        if buf.len() < length {
            return Ok(None);
        }

        let id = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let flags = buf[8];
        let header = if flags & FLAG_REPLY != 0 {
            PacketHeader::Reply {
                error_code: u16::from_be_bytes([buf[9], buf[10]]),
            }
        } else {
            PacketHeader::Command {
                command_set: buf[9],
                command: buf[10],
            }
        };

        let packet = Packet {
            id,
            header,
            data: buf[HEADER_LEN..length].to_vec(),
        };
        Ok(Some((packet, length)))
    }
}

/// コマンドパケットをエンコードする
pub fn encode_command(id: u32, command_set: u8, command: u8, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len());
    out.extend_from_slice(&((HEADER_LEN + data.len()) as u32).to_be_bytes());
    out.extend_from_slice(&id.to_be_bytes());
    out.push(0);
    out.push(command_set);
    out.push(command);
    out.extend_from_slice(data);
    out
}

/// 応答パケットをエンコードする
pub fn encode_reply(id: u32, error_code: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len());
    out.extend_from_slice(&((HEADER_LEN + data.len()) as u32).to_be_bytes());
    out.extend_from_slice(&id.to_be_bytes());
    out.push(FLAG_REPLY);
    out.extend_from_slice(&error_code.to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// パケット本体のライター
pub struct PacketWriter {
    buf: Vec<u8>,
    sizes: IdSizes,
}

impl PacketWriter {
    pub fn new(sizes: IdSizes) -> Self {
        Self {
            buf: Vec::new(),
            sizes,
        }
    }

    /// 型付き値を書き込む
    pub fn write_typed<T: WireReadable>(&mut self, value: T) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.write_typed(value)
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_typed(value)
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_typed(value)
    }

    /// 可変長IDを書き込む（下位 `size` バイト）
    pub fn write_id(&mut self, value: u64, size: usize) -> &mut Self {
        let bytes = value.to_be_bytes();
        let size = size.min(8);
        self.buf.extend_from_slice(&bytes[8 - size..]);
        self
    }

    pub fn write_object_id(&mut self, id: ObjectId) -> &mut Self {
        self.write_id(id.0, self.sizes.object)
    }

    pub fn write_thread_id(&mut self, id: ThreadId) -> &mut Self {
        self.write_id(id.0, self.sizes.object)
    }

    pub fn write_ref_type_id(&mut self, id: RefTypeId) -> &mut Self {
        self.write_id(id.0, self.sizes.reference_type)
    }

    pub fn write_method_id(&mut self, id: u64) -> &mut Self {
        self.write_id(id, self.sizes.method)
    }

    pub fn write_field_id(&mut self, id: u64) -> &mut Self {
        self.write_id(id, self.sizes.field)
    }

    pub fn write_frame_id(&mut self, id: u64) -> &mut Self {
        self.write_id(id, self.sizes.frame)
    }

    /// 文字列を書き込む（長さ + 修正UTF-8）
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        let bytes = encode_modified_utf8(value);
        self.write_i32(bytes.len() as i32);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn write_location(&mut self, location: &Location) -> &mut Self {
        self.write_u8(location.type_tag)
            .write_ref_type_id(location.class)
            .write_method_id(location.method)
            .write_u64(location.index)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// パケット本体のリーダー
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
    sizes: IdSizes,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8], sizes: IdSizes) -> Self {
        Self { data, pos: 0, sizes }
    }

    /// 残りバイト数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        if self.remaining() < size {
            return Err(SessionError::Protocol(format!(
                "unexpected end of packet: need {} bytes at offset {}, have {}",
                size,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + size];
        self.pos += size;
        Ok(slice)
    }

    /// 型付き値を読み取る
    pub fn read_typed<T: WireReadable>(&mut self) -> Result<T> {
        let bytes = self.take(T::size())?;
        T::from_be_bytes(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_typed()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_typed()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_typed()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_typed()
    }

    /// 件数を読み取る（負数はプロトコル違反）
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| SessionError::Protocol(format!("negative count {}", count)))
    }

    /// 可変長IDを読み取る
    pub fn read_id(&mut self, size: usize) -> Result<u64> {
        if size > 8 {
            return Err(SessionError::Protocol(format!("unsupported id size {}", size)));
        }
        let bytes = self.take(size)?;
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    pub fn read_object_id(&mut self) -> Result<ObjectId> {
        Ok(ObjectId(self.read_id(self.sizes.object)?))
    }

    pub fn read_thread_id(&mut self) -> Result<ThreadId> {
        Ok(ThreadId(self.read_id(self.sizes.object)?))
    }

    pub fn read_ref_type_id(&mut self) -> Result<RefTypeId> {
        Ok(RefTypeId(self.read_id(self.sizes.reference_type)?))
    }

    pub fn read_method_id(&mut self) -> Result<u64> {
        self.read_id(self.sizes.method)
    }

    pub fn read_field_id(&mut self) -> Result<u64> {
        self.read_id(self.sizes.field)
    }

    pub fn read_frame_id(&mut self) -> Result<u64> {
        self.read_id(self.sizes.frame)
    }

    /// 文字列を読み取る（修正UTF-8、不正なバイトは置換文字）
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_count()?;
        let bytes = self.take(len)?;
        Ok(decode_modified_utf8(bytes))
    }

    pub fn read_location(&mut self) -> Result<Location> {
        Ok(Location {
            type_tag: self.read_u8()?,
            class: self.read_ref_type_id()?,
            method: self.read_method_id()?,
            index: self.read_u64()?,
        })
    }

    /// タグ付きの値を読み取る
    pub fn read_tagged_value(&mut self) -> Result<RuntimeValue> {
        let value_tag = self.read_u8()?;
        self.read_value(value_tag)
    }

    /// タグが既知の値を読み取る
    pub fn read_value(&mut self, value_tag: u8) -> Result<RuntimeValue> {
        let kind = classify_tag(value_tag)?;
        if kind == ValueKind::Primitive {
            return self.read_primitive(value_tag).map(RuntimeValue::Primitive);
        }

        let id = self.read_object_id()?;
        if id.0 == 0 {
            return Ok(RuntimeValue::Null);
        }
        Ok(match kind {
            ValueKind::String => RuntimeValue::String(id),
            ValueKind::Array => RuntimeValue::Array(id),
            ValueKind::ClassMetadata => RuntimeValue::ClassObject(id),
            ValueKind::Composite => RuntimeValue::Object(id),
            ValueKind::Primitive => {
                return Err(SessionError::Protocol(format!(
                    "tag '{}' classified as {}",
                    value_tag as char, kind
                )))
            }
        })
    }

    fn read_primitive(&mut self, value_tag: u8) -> Result<Primitive> {
        Ok(match value_tag {
            tag::BOOLEAN => Primitive::Boolean(self.read_u8()? != 0),
            tag::BYTE => Primitive::Byte(self.read_typed::<i8>()?),
            tag::CHAR => Primitive::Char(self.read_typed::<u16>()?),
            tag::SHORT => Primitive::Short(self.read_typed::<i16>()?),
            tag::INT => Primitive::Int(self.read_i32()?),
            tag::LONG => Primitive::Long(self.read_i64()?),
            tag::FLOAT => Primitive::Float(f32::from_bits(self.read_typed::<u32>()?)),
            tag::DOUBLE => Primitive::Double(f64::from_bits(self.read_u64()?)),
            other => return Err(SessionError::UnknownValueKind(other as char)),
        })
    }
}

/// JVM の修正UTF-8を書く
///
/// UTF-16 のコード単位ごとに符号化するため、補助文字はサロゲートペアの
/// 6バイトになり、NUL は `C0 80` になる。
fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// JVM の修正UTF-8を読む
///
/// UTF-16 のコード単位へ戻してから結合する。標準UTF-8の4バイト列も受け付ける。
fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        let rest = &bytes[i + 1..];
        match b0 {
            0x00..=0x7F => {
                units.push(b0 as u16);
                i += 1;
            }
            0xC0..=0xDF if !rest.is_empty() && is_continuation(rest[0]) => {
                units.push(((b0 & 0x1F) as u16) << 6 | (rest[0] & 0x3F) as u16);
                i += 2;
            }
            0xE0..=0xEF if rest.len() >= 2 && rest[..2].iter().all(|b| is_continuation(*b)) => {
                units.push(
                    ((b0 & 0x0F) as u16) << 12
                        | ((rest[0] & 0x3F) as u16) << 6
                        | (rest[1] & 0x3F) as u16,
                );
                i += 3;
            }
            0xF0..=0xF4 if rest.len() >= 3 && rest[..3].iter().all(|b| is_continuation(*b)) => {
                let code = ((b0 & 0x07) as u32) << 18
                    | ((rest[0] & 0x3F) as u32) << 12
                    | ((rest[1] & 0x3F) as u32) << 6
                    | (rest[2] & 0x3F) as u32;
                let c = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0u16; 2];
                units.extend_from_slice(c.encode_utf16(&mut buf));
                i += 4;
            }
            _ => {
                units.push(char::REPLACEMENT_CHARACTER as u16);
                i += 1;
            }
        }
    }
    String::from_utf16_lossy(&units)
}
