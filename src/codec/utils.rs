use crate::common::ModbusDataType;
use crate::error::{ModbusError, ModbusResult};

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use std::mem::discriminant;

/// Packs 16 bit fields back to back, big endian.
pub fn serialize_u16s(values: &[u16]) -> Vec<u8> {
    let mut result = Vec::with_capacity(values.len() * 2);
    for value in values {
        result.extend_from_slice(&value.to_be_bytes());
    }
    result
}

/// Byte count followed by the packed values: coils LSB first, registers big endian.
pub fn serialize_values(values: &[ModbusDataType]) -> ModbusResult<Vec<u8>> {
    if !check_same_data_type_variant(values) {
        return Err(ModbusError::InvalidArgument(
            "All values in a query must have the same type".to_string(),
        ));
    }

    let first_value = values.first().ok_or_else(|| {
        ModbusError::InvalidArgument("At least one value must be sent".to_string())
    })?;

    let mut result = Vec::new();

    match first_value {
        ModbusDataType::Coil(_) => {
            let length = values.len().div_ceil(8);
            result.push(length as u8);
            result.resize(1 + length, 0);

            for (index, value) in values.iter().enumerate() {
                if let ModbusDataType::Coil(true) = value {
                    result[1 + index / 8] |= 1u8 << (index % 8);
                }
            }
        }
        ModbusDataType::Register(_) => {
            result.push((values.len() * 2) as u8);

            for value in values {
                if let ModbusDataType::Register(value) = value {
                    result.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
    }
    Ok(result)
}

/// Splits a read response payload into its byte count and data, checking they agree.
fn split_byte_count(payload: &[u8]) -> ModbusResult<&[u8]> {
    let (byte_count, data) = payload.split_first().ok_or_else(|| {
        ModbusError::UnexpectedResponse("Read response without byte count".to_string())
    })?;

    if *byte_count as usize != data.len() {
        return Err(ModbusError::UnexpectedResponse(format!(
            "Byte count {} doesn't match {} data bytes",
            byte_count,
            data.len()
        )));
    }
    Ok(data)
}

/// Unpacks a coil/discrete input read response, LSB first, truncated to `ammount` bits.
pub fn deserialize_bits(payload: &[u8], ammount: u16) -> ModbusResult<Vec<bool>> {
    let data = split_byte_count(payload)?;
    let ammount = ammount as usize;

    if data.len() * 8 < ammount {
        return Err(ModbusError::UnexpectedResponse(format!(
            "Expected {} bits, got {} bytes",
            ammount,
            data.len()
        )));
    }

    let mut values = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for bit in 0..8 {
            values.push((byte >> bit) & 0b1 == 0b1);
        }
    }
    values.truncate(ammount);

    Ok(values)
}

/// Unpacks a register read response, two bytes big endian per register.
pub fn deserialize_registers(payload: &[u8], ammount: u16) -> ModbusResult<Vec<u16>> {
    let data = split_byte_count(payload)?;

    if data.len() % 2 != 0 || data.len() / 2 < ammount as usize {
        return Err(ModbusError::UnexpectedResponse(format!(
            "Expected {} registers, got {} bytes",
            ammount,
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    let mut values = Vec::with_capacity(ammount as usize);
    for _ in 0..ammount {
        let value = cursor
            .read_u16::<BigEndian>()
            .map_err(|err| ModbusError::UnexpectedResponse(err.to_string()))?;
        values.push(value);
    }

    Ok(values)
}

/// Reads the two big endian fields of a write response echo.
pub fn deserialize_write_echo(payload: &[u8]) -> ModbusResult<(u16, u16)> {
    let mut cursor = Cursor::new(payload);
    let mut next = || {
        cursor
            .read_u16::<BigEndian>()
            .map_err(|_| ModbusError::UnexpectedResponse("Write response too short".to_string()))
    };
    let address = next()?;
    let value = next()?;
    Ok((address, value))
}

fn check_same_data_type_variant(values: &[ModbusDataType]) -> bool {
    if let Some((first, others)) = values.split_first() {
        let ref_discriminant = discriminant(first);
        others.iter().all(|e| discriminant(e) == ref_discriminant)
    } else {
        true
    }
}
