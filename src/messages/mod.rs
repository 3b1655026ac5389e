use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// High bit of the function byte, set by a device answering with an exception.
pub const EXCEPTION_FLAG: u8 = 0x80;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = 0x01,
    ReadDiscreteInputs = 0x02,
    ReadMultipleHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
    WriteSingleCoil = 0x05,
    WriteSingleHoldingRegister = 0x06,
    WriteMultipleCoils = 0x0F,
    WriteMultipleHoldingRegisters = 0x10,
}

impl FunctionCode {
    /// Read responses carry a byte count followed by that many data bytes.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadMultipleHoldingRegisters
                | FunctionCode::ReadInputRegisters
        )
    }

    /// Write responses echo exactly four bytes (address plus value or quantity).
    pub fn is_write(self) -> bool {
        !self.is_read()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    Acknowledge = 0x05,
    ServerDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetDeviceFailedToRespond = 0x0B,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl ExceptionCode {
    pub fn name(&self) -> &'static str {
        match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::ServerDeviceBusy => "server device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                "gateway target device failed to respond"
            }
            ExceptionCode::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", u8::from(*self), self.name())
    }
}

/// Function code, unit address and payload of one request or response,
/// independent of the wire framing.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ModbusPdu {
    pub slave_id: u8,
    pub function_code: FunctionCode,
    pub payload: Vec<u8>,
}

impl ModbusPdu {
    pub fn new(slave_id: u8, function_code: FunctionCode, payload: Vec<u8>) -> Self {
        ModbusPdu {
            slave_id,
            function_code,
            payload,
        }
    }
}
