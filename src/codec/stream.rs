use crate::communication::ModbusSocket;

use std::io::{self, SeekFrom};
use thiserror::Error;

/// Upper bound of a single `fill_from` read.
pub const READ_CHUNK_SIZE: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Nothing left between the read and the write cursor.
    #[error("end of data")]
    EndOfData,
    /// Some bytes are available, but fewer than requested. More may still arrive.
    #[error("insufficient data")]
    InsufficientData,
    #[error("invalid seek position {0}")]
    InvalidSeek(i64),
}

/// Growable byte buffer with independent read and write cursors.
///
/// `read_pos <= write_pos <= buffer.len()` always holds. Bytes in
/// `read_pos..write_pos` are the unconsumed data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModbusStream {
    buffer: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl ModbusStream {
    pub fn new() -> Self {
        ModbusStream::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ModbusStream {
            buffer: Vec::with_capacity(capacity),
            read_pos: 0,
            write_pos: 0,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let write_pos = bytes.len();
        ModbusStream {
            buffer: bytes,
            read_pos: 0,
            write_pos,
        }
    }

    pub fn len(&self) -> usize {
        self.write_pos - self.read_pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The unconsumed bytes, without moving any cursor.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[self.read_pos..self.write_pos]
    }

    fn grow(&mut self, additional: usize) {
        let required = self.write_pos + additional;
        if self.buffer.len() < required {
            self.buffer.resize(required, 0);
        }
    }

    pub fn write(&mut self, data: &[u8]) -> usize {
        self.grow(data.len());
        self.buffer[self.write_pos..self.write_pos + data.len()].copy_from_slice(data);
        self.write_pos += data.len();
        data.len()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.write(&[value]);
    }

    /// Fills `out` completely or not at all.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, StreamError> {
        let available = self.len();
        if available == 0 {
            return Err(StreamError::EndOfData);
        }
        if out.len() > available {
            return Err(StreamError::InsufficientData);
        }

        out.copy_from_slice(&self.buffer[self.read_pos..self.read_pos + out.len()]);
        self.read_pos += out.len();
        Ok(out.len())
    }

    pub fn read_byte(&mut self) -> Result<u8, StreamError> {
        let mut raw = [0u8; 1];
        self.read(&mut raw)?;
        Ok(raw[0])
    }

    /// Moves the read cursor. The target must lie within `0..=write position`.
    pub fn seek(&mut self, position: SeekFrom) -> Result<u64, StreamError> {
        let target = match position {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(offset) => self.read_pos as i64 + offset,
            SeekFrom::End(offset) => self.write_pos as i64 + offset,
        };

        if target < 0 || target > self.write_pos as i64 {
            return Err(StreamError::InvalidSeek(target));
        }

        self.read_pos = target as usize;
        Ok(target as u64)
    }

    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }

    /// Hands the unconsumed bytes to `sink` in one write and consumes what it accepted.
    pub async fn drain_to<S>(&mut self, sink: &mut S) -> io::Result<usize>
    where
        S: ModbusSocket + ?Sized,
    {
        if self.is_empty() {
            return Ok(0);
        }

        let written = sink.write(self.bytes()).await?;
        self.read_pos += written.min(self.len());
        Ok(written)
    }

    /// One read attempt of up to `READ_CHUNK_SIZE` bytes. Zero bytes just means nothing
    /// was available.
    pub async fn fill_from<S>(&mut self, source: &mut S) -> io::Result<usize>
    where
        S: ModbusSocket + ?Sized,
    {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let received = source.read(&mut chunk).await?;
        if received > 0 {
            self.write(&chunk[..received]);
        }
        Ok(received)
    }
}
