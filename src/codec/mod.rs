pub mod crc;
pub mod rtu;
pub mod stream;
pub mod utils;

use crate::error::ModbusError;
use crate::messages::ModbusPdu;
use stream::{ModbusStream, StreamError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is cut short; retry once more bytes have arrived.
    #[error("incomplete frame")]
    Incomplete,
    #[error(transparent)]
    Fatal(#[from] ModbusError),
}

impl From<StreamError> for DecodeError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::EndOfData | StreamError::InsufficientData => DecodeError::Incomplete,
            StreamError::InvalidSeek(_) => {
                DecodeError::Fatal(ModbusError::UnexpectedResponse(err.to_string()))
            }
        }
    }
}

/// Turns PDUs into wire frames and back. The transaction engine only talks to this
/// trait, so another framing can be plugged in without touching it.
pub trait ModbusCodec {
    fn encode(&mut self, pdu: &ModbusPdu) -> ModbusStream;

    /// Decodes one response frame starting at the stream's read cursor.
    fn decode(&mut self, stream: &mut ModbusStream) -> Result<ModbusPdu, DecodeError>;
}
