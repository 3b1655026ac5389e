//! Modbus RTU master: frames requests, sends them over any byte stream and
//! waits for a checksum verified response.

mod codec;
mod common;
mod communication;
mod error;
mod master;
mod messages;

pub use master::transaction::execute;
pub use master::{
    ModbusMaster, ModbusMasterConnection, ModbusMasterConnectionParams,
    MAX_MODBUS_RESPONSE_TIME, POLL_INTERVAL,
};

pub use codec::crc::{crc16, Crc16};
pub use codec::rtu::{RtuCodec, MAX_FRAME_LEN};
pub use codec::stream::{ModbusStream, StreamError, READ_CHUNK_SIZE};
pub use codec::{DecodeError, ModbusCodec};

pub use common::{ModbusDataType, ModbusTable, MAX_BIT_QUANTITY, MAX_REGISTER_QUANTITY};
pub use communication::ModbusSocket;
pub use error::{ModbusError, ModbusResult};
pub use messages::{ExceptionCode, FunctionCode, ModbusPdu};
