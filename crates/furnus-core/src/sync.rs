//! Progress records pushed from a device to its observers.
//!
//! The wire frame is a bool byte, five big-endian `i32`s (x, y, z, fuel,
//! max fuel), then the progress map as a VarInt-length-prefixed UTF-8 JSON
//! object with stringified slot keys. Frames travel to the presentation side
//! over a crossbeam channel; see [`sync_channel`].

use crate::client::ClientWorld;
use crate::id::BlockPos;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Longest VarInt accepted on decode.
const MAX_VARINT_BYTES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("frame truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("length prefix longer than 5 bytes")]
    VarIntTooLong,
    #[error("negative length prefix {0}")]
    NegativeLength(i32),
    #[error("progress map is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("progress map is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// Progress message
// ---------------------------------------------------------------------------

/// Observable device state, addressed by block position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMessage {
    pub burning: bool,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub fuel: i32,
    pub max_fuel: i32,
    pub progress: BTreeMap<usize, u32>,
}

impl ProgressMessage {
    pub fn pos(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        let json = serde_json::to_string(&self.progress)?;
        let mut out = Vec::with_capacity(1 + 5 * 4 + MAX_VARINT_BYTES + json.len());
        out.push(u8::from(self.burning));
        for value in [self.x, self.y, self.z, self.fuel, self.max_fuel] {
            out.extend_from_slice(&value.to_be_bytes());
        }
        write_varint(&mut out, json.len() as i32);
        out.extend_from_slice(json.as_bytes());
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        let mut reader = Reader { bytes, offset: 0 };
        let burning = reader.take(1)?[0] != 0;
        let x = reader.read_i32()?;
        let y = reader.read_i32()?;
        let z = reader.read_i32()?;
        let fuel = reader.read_i32()?;
        let max_fuel = reader.read_i32()?;
        let len = reader.read_varint()?;
        let len = usize::try_from(len).map_err(|_| SyncError::NegativeLength(len))?;
        let text = std::str::from_utf8(reader.take(len)?)?;
        let progress = serde_json::from_str(text)?;
        if reader.remaining() > 0 {
            return Err(SyncError::TrailingBytes(reader.remaining()));
        }
        Ok(Self {
            burning,
            x,
            y,
            z,
            fuel,
            max_fuel,
            progress,
        })
    }
}

fn write_varint(out: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SyncError> {
        if self.remaining() < n {
            return Err(SyncError::Truncated {
                offset: self.offset,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, SyncError> {
        let raw = self.take(4)?;
        Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_varint(&mut self) -> Result<i32, SyncError> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.take(1)?[0];
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(SyncError::VarIntTooLong)
    }
}

// ---------------------------------------------------------------------------
// Delivery channel
// ---------------------------------------------------------------------------

/// Create a connected sender/receiver pair for encoded progress frames.
pub fn sync_channel() -> (SyncSender, SyncReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (SyncSender { tx }, SyncReceiver { rx })
}

/// Server-side end. Cloneable; sending never blocks.
#[derive(Debug, Clone)]
pub struct SyncSender {
    tx: Sender<Vec<u8>>,
}

impl SyncSender {
    /// Encode and enqueue `message`. Returns `false` if it was dropped.
    pub fn send(&self, message: &ProgressMessage) -> bool {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("dropping progress for {:?}: {e}", message.pos());
                return false;
            }
        };
        if self.tx.send(frame).is_err() {
            debug!("sync receiver gone, progress for {:?} dropped", message.pos());
            return false;
        }
        true
    }
}

/// Presentation-side end.
#[derive(Debug)]
pub struct SyncReceiver {
    rx: Receiver<Vec<u8>>,
}

impl SyncReceiver {
    /// Apply every queued frame to `client`, oldest first. Malformed frames
    /// are logged and skipped. Returns the number of frames applied.
    pub fn drain_into(&self, client: &mut ClientWorld) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => match ProgressMessage::decode(&frame) {
                    Ok(message) => {
                        client.apply(&message);
                        applied += 1;
                    }
                    Err(e) => warn!("skipping malformed progress frame: {e}"),
                },
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return applied,
            }
        }
    }

    /// Block until one frame arrives and decode it. `None` once every
    /// sender is gone.
    pub fn recv(&self) -> Option<Result<ProgressMessage, SyncError>> {
        self.rx.recv().ok().map(|frame| ProgressMessage::decode(&frame))
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
