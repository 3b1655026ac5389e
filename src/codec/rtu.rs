//! Modbus RTU framing: `[slave][function][payload][crc lo][crc hi]`

use super::crc::Crc16;
use super::stream::ModbusStream;
use super::{DecodeError, ModbusCodec};
use crate::error::ModbusError;
use crate::messages::{ExceptionCode, FunctionCode, ModbusPdu, EXCEPTION_FLAG};

// "The maximum size of a MODBUS RTU frame is 256 bytes."
pub const MAX_FRAME_LEN: usize = 256;

/// Payload size of every write response (address + value, or address + quantity).
const WRITE_RESPONSE_LEN: usize = 4;

#[derive(Clone, Debug, Default)]
pub struct RtuCodec {
    crc: Crc16,
}

impl RtuCodec {
    pub fn new() -> Self {
        RtuCodec::default()
    }

    fn read_byte(&mut self, stream: &mut ModbusStream) -> Result<u8, DecodeError> {
        let value = stream.read_byte()?;
        self.crc.push(&[value]);
        Ok(value)
    }

    fn read_bytes(
        &mut self,
        stream: &mut ModbusStream,
        len: usize,
        into: &mut Vec<u8>,
    ) -> Result<(), DecodeError> {
        let start = into.len();
        into.resize(start + len, 0);
        if len > 0 {
            stream.read(&mut into[start..])?;
        }
        self.crc.push(&into[start..]);
        Ok(())
    }

    fn check_crc(&mut self, stream: &mut ModbusStream) -> Result<(), DecodeError> {
        let lo = stream.read_byte()?;
        let hi = stream.read_byte()?;
        let received = u16::from_le_bytes([lo, hi]);
        let expected = self.crc.value();

        if received != expected {
            log::warn!(
                "Dropping RTU frame: crc 0x{:04X} does not match expected 0x{:04X}",
                received,
                expected
            );
            return Err(ModbusError::Crc {
                expected,
                actual: received,
            }
            .into());
        }
        Ok(())
    }
}

impl ModbusCodec for RtuCodec {
    fn encode(&mut self, pdu: &ModbusPdu) -> ModbusStream {
        let mut stream = ModbusStream::with_capacity(pdu.payload.len() + 4);
        stream.write_byte(pdu.slave_id);
        stream.write_byte(pdu.function_code.into());
        stream.write(&pdu.payload);

        let checksum = self.crc.reset().push(stream.bytes()).value();
        stream.write(&checksum.to_le_bytes());
        stream
    }

    /// The decoded payload is everything between the function byte and the crc,
    /// so read responses keep their leading byte count.
    fn decode(&mut self, stream: &mut ModbusStream) -> Result<ModbusPdu, DecodeError> {
        self.crc.reset();

        let slave_id = self.read_byte(stream)?;
        let raw_function_code = self.read_byte(stream)?;

        if raw_function_code & EXCEPTION_FLAG == EXCEPTION_FLAG {
            let exception_code = self.read_byte(stream)?;
            self.check_crc(stream)?;
            return Err(ModbusError::Exception {
                slave_id,
                function: raw_function_code & !EXCEPTION_FLAG,
                code: ExceptionCode::from(exception_code),
            }
            .into());
        }

        let function_code = FunctionCode::try_from(raw_function_code)
            .map_err(|_| ModbusError::UnknownFunction(raw_function_code))?;

        let mut payload = Vec::new();
        if function_code.is_read() {
            let byte_count = self.read_byte(stream)?;
            payload.push(byte_count);
            self.read_bytes(stream, byte_count as usize, &mut payload)?;
        } else {
            self.read_bytes(stream, WRITE_RESPONSE_LEN, &mut payload)?;
        }

        self.check_crc(stream)?;

        Ok(ModbusPdu {
            slave_id,
            function_code,
            payload,
        })
    }
}
