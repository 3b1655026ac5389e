use crate::error::{ModbusError, ModbusResult};
use crate::messages::FunctionCode;

/// Raw coil value meaning "on" in single coil writes.
pub const COIL_ON: u16 = 0xFF00;
pub const COIL_OFF: u16 = 0x0000;

pub const MIN_QUANTITY: u16 = 1;
pub const MAX_BIT_QUANTITY: u16 = 2000;
pub const MAX_REGISTER_QUANTITY: u16 = 125;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ModbusDataType {
    Coil(bool),
    Register(u16),
}

impl ModbusDataType {
    pub fn get_representation(&self) -> u16 {
        match self {
            ModbusDataType::Coil(value) => {
                if *value {
                    COIL_ON
                } else {
                    COIL_OFF
                }
            }
            ModbusDataType::Register(value) => *value,
        }
    }

    pub fn coil_from_representation(raw_value: u16) -> ModbusResult<Self> {
        match raw_value {
            COIL_ON => Ok(ModbusDataType::Coil(true)),
            COIL_OFF => Ok(ModbusDataType::Coil(false)),
            _ => Err(ModbusError::UnexpectedResponse(format!(
                "0x{:04X} can't be decoded to a coil, only valid values are 0xFF00 and 0x0000",
                raw_value
            ))),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash)]
pub enum ModbusTable {
    DiscreteInput,
    Coils,
    InputRegisters,
    HoldingRegisters,
}

impl ModbusTable {
    pub fn get_table_from_function_code(function_code: FunctionCode) -> ModbusTable {
        match function_code {
            FunctionCode::ReadCoils
            | FunctionCode::WriteSingleCoil
            | FunctionCode::WriteMultipleCoils => ModbusTable::Coils,
            FunctionCode::ReadMultipleHoldingRegisters
            | FunctionCode::WriteSingleHoldingRegister
            | FunctionCode::WriteMultipleHoldingRegisters => ModbusTable::HoldingRegisters,
            FunctionCode::ReadInputRegisters => ModbusTable::InputRegisters,
            FunctionCode::ReadDiscreteInputs => ModbusTable::DiscreteInput,
        }
    }

    pub fn is_bit_table(self) -> bool {
        matches!(self, ModbusTable::Coils | ModbusTable::DiscreteInput)
    }

    /// Largest quantity a single request may address in this table.
    pub fn max_quantity(self) -> u16 {
        if self.is_bit_table() {
            MAX_BIT_QUANTITY
        } else {
            MAX_REGISTER_QUANTITY
        }
    }

    pub fn check_quantity(self, quantity: usize) -> ModbusResult<u16> {
        let max = self.max_quantity();
        if quantity < MIN_QUANTITY as usize || quantity > max as usize {
            return Err(ModbusError::InvalidQuantity {
                quantity,
                min: MIN_QUANTITY,
                max,
            });
        }
        Ok(quantity as u16)
    }
}
