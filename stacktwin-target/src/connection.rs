//! JDWP 接続（TCP）
//!
//! コマンドの送信と応答の待ち合わせを行います。応答を待つ間に届いた
//! イベントパケットはキューに積み、[`Connection::poll_events`] で取り出します。

use crate::events::EventSet;
use crate::packet::{encode_command, IdSizes, Packet, PacketHeader};
use crate::protocol::{cmd, error, HANDSHAKE};
use crate::session::{Result, SessionAddress, SessionError};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use tracing::{debug, trace};

const READ_CHUNK: usize = 4096;

/// JDWP 接続
pub struct Connection {
    stream: TcpStream,
    address: SessionAddress,
    next_id: u32,
    sizes: IdSizes,
    buffer: Vec<u8>,
    pending: VecDeque<EventSet>,
    closed: bool,
}

impl Connection {
    /// 接続してハンドシェイクを行う
    pub fn open(address: &SessionAddress) -> Result<Self> {
        let stream = TcpStream::connect((address.host.as_str(), address.port)).map_err(|e| {
            if e.kind() == ErrorKind::ConnectionRefused {
                SessionError::ConnectionRefused(address.to_string())
            } else {
                SessionError::TransportUnavailable(format!("{}: {}", address, e))
            }
        })?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream,
            address: address.clone(),
            next_id: 1,
            sizes: IdSizes::default(),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            closed: false,
        };
        conn.handshake().map_err(|e| {
            SessionError::TransportUnavailable(format!("{}: handshake failed: {}", address, e))
        })?;
        debug!("JDWP handshake with {} completed", address);
        Ok(conn)
    }

    fn handshake(&mut self) -> std::io::Result<()> {
        self.stream.write_all(HANDSHAKE)?;
        let mut reply = [0u8; HANDSHAKE.len()];
        self.stream.read_exact(&mut reply)?;
        if reply != HANDSHAKE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                "unexpected handshake reply",
            ));
        }
        Ok(())
    }

    /// 接続先
    pub fn address(&self) -> &SessionAddress {
        &self.address
    }

    /// IDサイズ
    pub fn sizes(&self) -> IdSizes {
        self.sizes
    }

    pub fn set_sizes(&mut self, sizes: IdSizes) {
        self.sizes = sizes;
    }

    /// 相手が切断したか
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// コマンドを送信して応答本体を返す
    ///
    /// 応答のエラーコードが 0 以外なら `SessionError::Vm` を返します。
    pub fn command(
        &mut self,
        name: &'static str,
        command_set: u8,
        command: u8,
        body: &[u8],
    ) -> Result<Vec<u8>> {
        if self.closed {
            return Err(SessionError::Vm {
                command: name,
                code: error::VM_DEAD,
            });
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        trace!("-> {} (id={}, {} bytes)", name, id, body.len());
        self.stream
            .write_all(&encode_command(id, command_set, command, body))?;

        loop {
            let packet = self.read_packet()?;
            match packet.header {
                PacketHeader::Reply { error_code } if packet.id == id => {
                    trace!("<- {} (id={}, error={})", name, id, error_code);
                    if error_code != error::NONE {
                        return Err(SessionError::Vm {
                            command: name,
                            code: error_code,
                        });
                    }
                    return Ok(packet.data);
                }
                PacketHeader::Reply { .. } => {
                    debug!("dropping reply to stale request {}", packet.id);
                }
                PacketHeader::Command { .. } => self.queue_event(packet)?,
            }
        }
    }

    /// 届いているイベントを取り出す（ブロックしない）
    pub fn poll_events(&mut self) -> Result<Vec<EventSet>> {
        if !self.closed {
            self.fill_nonblocking()?;
            while let Some((packet, used)) = Packet::decode(&self.buffer)? {
                self.buffer.drain(..used);
                match packet.header {
                    PacketHeader::Command { .. } => self.queue_event(packet)?,
                    PacketHeader::Reply { .. } => {
                        debug!("dropping unsolicited reply {}", packet.id);
                    }
                }
            }
        }
        Ok(self.pending.drain(..).collect())
    }

    /// 接続を閉じる
    pub fn close(&mut self) {
        if !self.closed {
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            self.closed = true;
        }
    }

    fn queue_event(&mut self, packet: Packet) -> Result<()> {
        match packet.header {
            PacketHeader::Command {
                command_set: cmd::EVENT,
                command: cmd::E_COMPOSITE,
            } => {
                let set = EventSet::parse(&packet.data, self.sizes)?;
                trace!("queued {} event(s)", set.events.len());
                self.pending.push_back(set);
            }
            header => debug!("ignoring command packet from target: {:?}", header),
        }
        Ok(())
    }

    /// 1パケット読み取るまでブロックする
    fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some((packet, used)) = Packet::decode(&self.buffer)? {
                self.buffer.drain(..used);
                return Ok(packet);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                self.closed = true;
                return Err(SessionError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("connection to {} closed by target", self.address),
                )));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn fill_nonblocking(&mut self) -> Result<()> {
        self.stream.set_nonblocking(true)?;
        let result = self.drain_socket();
        self.stream.set_nonblocking(false)?;
        result
    }

    fn drain_socket(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("connection to {} closed by target", self.address);
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
