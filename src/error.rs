use crate::messages::ExceptionCode;

use std::time::Duration;
use thiserror::Error;

pub type ModbusResult<T> = Result<T, ModbusError>;

#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("quantity {quantity} must be between {min} and {max}")]
    InvalidQuantity { quantity: usize, min: u16, max: u16 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("exception {code}, function 0x{function:02X}")]
    Exception {
        slave_id: u8,
        function: u8,
        code: ExceptionCode,
    },

    #[error("response crc 0x{actual:04X} does not match expected 0x{expected:04X}")]
    Crc { expected: u16, actual: u16 },

    #[error("unknown function code 0x{0:02X}")]
    UnknownFunction(u8),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("no complete response within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ModbusError {
    /// Exception code of a device exception response, if this is one.
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            ModbusError::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ModbusError::Timeout(_))
    }
}
