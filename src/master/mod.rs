use crate::codec::rtu::RtuCodec;
use crate::codec::utils::{
    deserialize_bits, deserialize_registers, deserialize_write_echo, serialize_u16s,
    serialize_values,
};
use crate::codec::ModbusCodec;
use crate::common::{ModbusDataType, ModbusTable};
use crate::communication::ModbusSocket;
use crate::error::{ModbusError, ModbusResult};
use crate::messages::{FunctionCode, ModbusPdu};

use async_trait::async_trait;
use tokio::time::Duration;

pub mod transaction;

pub const MAX_MODBUS_RESPONSE_TIME: Duration = Duration::from_millis(5000);
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModbusMasterConnectionParams {
    /// Time a whole transaction may take, from the first byte written to the
    /// last byte of the response.
    pub max_response_time: Duration,
    /// Pause between read attempts while the response is still incomplete.
    pub poll_interval: Duration,
}

impl Default for ModbusMasterConnectionParams {
    fn default() -> Self {
        ModbusMasterConnectionParams {
            max_response_time: MAX_MODBUS_RESPONSE_TIME,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Typed Modbus client operations.
///
/// Quantities are checked before anything is sent: bit reads and writes take
/// 1 to 2000 values, register reads and writes 1 to 125.
#[async_trait]
pub trait ModbusMaster {
    async fn read_coils(&mut self, slave_id: u8, address: u16, ammount: u16)
        -> ModbusResult<Vec<bool>>;

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<bool>>;

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<u16>>;

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<u16>>;

    /// Returns whether the device reports the coil as on.
    async fn write_coil(&mut self, slave_id: u8, address: u16, value: bool) -> ModbusResult<bool>;

    /// Returns the value echoed by the device.
    async fn write_register(&mut self, slave_id: u8, address: u16, value: u16)
        -> ModbusResult<u16>;

    /// Returns the quantity of coils the device confirms.
    async fn write_coils(&mut self, slave_id: u8, address: u16, values: &[bool])
        -> ModbusResult<u16>;

    /// Returns the quantity of registers the device confirms.
    async fn write_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<u16>;
}

/// A Modbus master talking over an exclusively owned socket, one transaction at a time.
pub struct ModbusMasterConnection<S, C = RtuCodec> {
    comm: S,
    codec: C,
    params: ModbusMasterConnectionParams,
}

impl<S> ModbusMasterConnection<S, RtuCodec>
where
    S: ModbusSocket,
{
    pub fn new_rtu(comm: S) -> Self {
        Self::with_params(comm, ModbusMasterConnectionParams::default())
    }

    pub fn with_params(comm: S, params: ModbusMasterConnectionParams) -> Self {
        Self::with_codec(comm, RtuCodec::new(), params)
    }
}

impl<S, C> ModbusMasterConnection<S, C>
where
    S: ModbusSocket,
    C: ModbusCodec + Send,
{
    pub fn with_codec(comm: S, codec: C, params: ModbusMasterConnectionParams) -> Self {
        ModbusMasterConnection {
            comm,
            codec,
            params,
        }
    }

    pub fn params(&self) -> &ModbusMasterConnectionParams {
        &self.params
    }

    pub fn set_params(&mut self, params: ModbusMasterConnectionParams) {
        self.params = params;
    }

    pub fn into_inner(self) -> S {
        self.comm
    }

    async fn query(&mut self, request: ModbusPdu) -> ModbusResult<ModbusPdu> {
        transaction::execute(&mut self.comm, &mut self.codec, &request, &self.params).await
    }

    async fn read_query(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
        function_code: FunctionCode,
    ) -> ModbusResult<ModbusPdu> {
        let table = ModbusTable::get_table_from_function_code(function_code);
        table.check_quantity(ammount as usize)?;

        let payload = serialize_u16s(&[address, ammount]);
        self.query(ModbusPdu::new(slave_id, function_code, payload))
            .await
    }

    async fn single_write_query(
        &mut self,
        slave_id: u8,
        address: u16,
        value: ModbusDataType,
        function_code: FunctionCode,
    ) -> ModbusResult<(u16, u16)> {
        let payload = serialize_u16s(&[address, value.get_representation()]);
        let response = self
            .query(ModbusPdu::new(slave_id, function_code, payload))
            .await?;

        let (echoed_address, echoed_value) = deserialize_write_echo(&response.payload)?;
        check_echoed_address(address, echoed_address)?;
        Ok((echoed_address, echoed_value))
    }

    async fn multiple_write_query(
        &mut self,
        slave_id: u8,
        address: u16,
        values: Vec<ModbusDataType>,
        function_code: FunctionCode,
    ) -> ModbusResult<u16> {
        let table = ModbusTable::get_table_from_function_code(function_code);
        let ammount = table.check_quantity(values.len())?;

        let mut payload = serialize_u16s(&[address, ammount]);
        payload.extend_from_slice(&serialize_values(&values)?);

        let response = self
            .query(ModbusPdu::new(slave_id, function_code, payload))
            .await?;

        let (echoed_address, echoed_ammount) = deserialize_write_echo(&response.payload)?;
        check_echoed_address(address, echoed_address)?;
        Ok(echoed_ammount)
    }
}

fn check_echoed_address(sent: u16, echoed: u16) -> ModbusResult<()> {
    if sent != echoed {
        return Err(ModbusError::UnexpectedResponse(format!(
            "wrote address {} but device confirmed {}",
            sent, echoed
        )));
    }
    Ok(())
}

#[async_trait]
impl<S, C> ModbusMaster for ModbusMasterConnection<S, C>
where
    S: ModbusSocket,
    C: ModbusCodec + Send,
{
    async fn read_coils(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<bool>> {
        let response = self
            .read_query(slave_id, address, ammount, FunctionCode::ReadCoils)
            .await?;
        deserialize_bits(&response.payload, ammount)
    }

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<bool>> {
        let response = self
            .read_query(slave_id, address, ammount, FunctionCode::ReadDiscreteInputs)
            .await?;
        deserialize_bits(&response.payload, ammount)
    }

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<u16>> {
        let response = self
            .read_query(
                slave_id,
                address,
                ammount,
                FunctionCode::ReadMultipleHoldingRegisters,
            )
            .await?;
        deserialize_registers(&response.payload, ammount)
    }

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        ammount: u16,
    ) -> ModbusResult<Vec<u16>> {
        let response = self
            .read_query(slave_id, address, ammount, FunctionCode::ReadInputRegisters)
            .await?;
        deserialize_registers(&response.payload, ammount)
    }

    async fn write_coil(&mut self, slave_id: u8, address: u16, value: bool) -> ModbusResult<bool> {
        let (_, raw_value) = self
            .single_write_query(
                slave_id,
                address,
                ModbusDataType::Coil(value),
                FunctionCode::WriteSingleCoil,
            )
            .await?;

        let echoed = ModbusDataType::coil_from_representation(raw_value)?;
        Ok(echoed == ModbusDataType::Coil(true))
    }

    async fn write_register(
        &mut self,
        slave_id: u8,
        address: u16,
        value: u16,
    ) -> ModbusResult<u16> {
        let (_, echoed_value) = self
            .single_write_query(
                slave_id,
                address,
                ModbusDataType::Register(value),
                FunctionCode::WriteSingleHoldingRegister,
            )
            .await?;
        Ok(echoed_value)
    }

    async fn write_coils(
        &mut self,
        slave_id: u8,
        address: u16,
        values: &[bool],
    ) -> ModbusResult<u16> {
        let values = values.iter().copied().map(ModbusDataType::Coil).collect();
        self.multiple_write_query(slave_id, address, values, FunctionCode::WriteMultipleCoils)
            .await
    }

    async fn write_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<u16> {
        let values = values.iter().copied().map(ModbusDataType::Register).collect();
        self.multiple_write_query(
            slave_id,
            address,
            values,
            FunctionCode::WriteMultipleHoldingRegisters,
        )
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::crc::crc16;
    use crate::messages::ExceptionCode;

    use std::io;

    /// Answers the first request written to it with a canned frame.
    struct FakeDevice {
        response: Vec<u8>,
        written: Vec<u8>,
        answered: bool,
    }

    #[async_trait]
    impl ModbusSocket for FakeDevice {
        async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            if self.written.is_empty() || self.answered {
                return Ok(0);
            }
            self.answered = true;
            buffer[..self.response.len()].copy_from_slice(&self.response);
            Ok(self.response.len())
        }

        async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(data);
            Ok(data.len())
        }
    }

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&crc16(body).to_le_bytes());
        frame
    }

    fn connection(response: Vec<u8>) -> ModbusMasterConnection<FakeDevice> {
        let device = FakeDevice {
            response,
            written: vec![],
            answered: false,
        };
        let params = ModbusMasterConnectionParams {
            max_response_time: Duration::from_millis(500),
            ..Default::default()
        };
        ModbusMasterConnection::with_params(device, params)
    }

    #[test]
    fn test_default_params() {
        let params = ModbusMasterConnectionParams::default();
        assert_eq!(params.max_response_time, Duration::from_secs(5));
        assert_eq!(params.poll_interval, Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_read_coils_quantity_limits() {
        for ammount in [0u16, 2001] {
            let mut master = connection(vec![]);
            let err = master.read_coils(0x11, 0, ammount).await.unwrap_err();
            assert!(matches!(err, ModbusError::InvalidQuantity { .. }), "{:?}", err);
            assert!(master.into_inner().written.is_empty());
        }

        let mut master = connection(frame(&[0x11, 0x01, 0x01, 0x01]));
        assert_eq!(master.read_coils(0x11, 0, 1).await.unwrap(), vec![true]);

        let mut body = vec![0x11, 0x01, 250];
        body.extend_from_slice(&[0xAA; 250]);
        let mut master = connection(frame(&body));
        let coils = master.read_coils(0x11, 0, 2000).await.unwrap();
        assert_eq!(coils.len(), 2000);
        assert!(!coils[0]);
        assert!(coils[1]);
    }

    #[tokio::test]
    async fn test_read_holding_registers_quantity_limits() {
        let mut master = connection(vec![]);
        let err = master.read_holding_registers(0x11, 0, 126).await.unwrap_err();
        assert!(matches!(
            err,
            ModbusError::InvalidQuantity {
                quantity: 126,
                min: 1,
                max: 125
            }
        ));
        assert!(master.into_inner().written.is_empty());

        let mut body = vec![0x11, 0x03, 250];
        body.extend_from_slice(&[0x00; 250]);
        let mut master = connection(frame(&body));
        let registers = master.read_holding_registers(0x11, 0, 125).await.unwrap();
        assert_eq!(registers, vec![0u16; 125]);
    }

    #[tokio::test]
    async fn test_read_coils() {
        let mut master = connection(frame(&[0x11, 0x01, 0x02, 0xCD, 0x01]));
        let coils = master.read_coils(0x11, 0x0013, 10).await.unwrap();

        assert_eq!(
            coils,
            vec![true, false, true, true, false, false, true, true, true, false]
        );
        assert_eq!(
            master.into_inner().written,
            vec![0x11, 0x01, 0x00, 0x13, 0x00, 0x0A, 0x4F, 0x58]
        );
    }

    #[tokio::test]
    async fn test_read_discrete_inputs() {
        let mut master = connection(frame(&[0x11, 0x02, 0x01, 0x05]));
        let inputs = master.read_discrete_inputs(0x11, 0x00C4, 3).await.unwrap();
        assert_eq!(inputs, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_read_registers() {
        let mut master = connection(frame(&[0x11, 0x03, 0x04, 0x00, 0x2A, 0x01, 0x00]));
        assert_eq!(
            master.read_holding_registers(0x11, 0x006B, 2).await.unwrap(),
            vec![0x002A, 0x0100]
        );

        let mut master = connection(frame(&[0x11, 0x04, 0x02, 0x00, 0x0A]));
        assert_eq!(
            master.read_input_registers(0x11, 0x0008, 1).await.unwrap(),
            vec![0x000A]
        );
    }

    #[tokio::test]
    async fn test_short_read_response_is_rejected() {
        let mut master = connection(frame(&[0x11, 0x03, 0x02, 0x00, 0x2A]));
        let err = master.read_holding_registers(0x11, 0, 2).await.unwrap_err();
        assert!(matches!(err, ModbusError::UnexpectedResponse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_write_coil() {
        let mut master = connection(frame(&[0x11, 0x05, 0x00, 0x10, 0xFF, 0x00]));
        assert!(master.write_coil(0x11, 0x0010, true).await.unwrap());
        assert_eq!(
            master.into_inner().written,
            vec![0x11, 0x05, 0x00, 0x10, 0xFF, 0x00, 0x8F, 0x6F]
        );

        let mut master = connection(frame(&[0x11, 0x05, 0x00, 0x10, 0x00, 0x00]));
        assert!(!master.write_coil(0x11, 0x0010, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_coil_with_invalid_echo() {
        let mut master = connection(frame(&[0x11, 0x05, 0x00, 0x10, 0x12, 0x34]));
        let err = master.write_coil(0x11, 0x0010, true).await.unwrap_err();
        assert!(matches!(err, ModbusError::UnexpectedResponse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_write_register() {
        let mut master = connection(frame(&[0x11, 0x06, 0x00, 0x01, 0x00, 0x03]));
        assert_eq!(master.write_register(0x11, 0x0001, 0x0003).await.unwrap(), 0x0003);
        assert_eq!(
            master.into_inner().written,
            frame(&[0x11, 0x06, 0x00, 0x01, 0x00, 0x03])
        );
    }

    #[tokio::test]
    async fn test_write_coils() {
        let mut master = connection(frame(&[0x11, 0x0F, 0x00, 0x13, 0x00, 0x0A]));
        let values = [true, false, true, true, false, false, true, true, true, false];

        assert_eq!(master.write_coils(0x11, 0x0013, &values).await.unwrap(), 10);
        assert_eq!(
            master.into_inner().written,
            vec![0x11, 0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01, 0xBF, 0x0B]
        );
    }

    #[tokio::test]
    async fn test_write_registers_uses_write_multiple_function() {
        let mut master = connection(frame(&[0x11, 0x10, 0x00, 0x01, 0x00, 0x02]));

        assert_eq!(
            master.write_registers(0x11, 0x0001, &[0x000A, 0x0102]).await.unwrap(),
            2
        );
        assert_eq!(
            master.into_inner().written,
            vec![0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02, 0xC6, 0xF0]
        );
    }

    #[tokio::test]
    async fn test_write_multiple_quantity_limits() {
        let mut master = connection(vec![]);
        assert!(master.write_coils(0x11, 0, &[]).await.is_err());
        assert!(master.write_coils(0x11, 0, &[false; 2001]).await.is_err());
        assert!(master.write_registers(0x11, 0, &[0; 126]).await.is_err());
        assert!(master.into_inner().written.is_empty());
    }

    #[tokio::test]
    async fn test_write_echo_with_wrong_address() {
        let mut master = connection(frame(&[0x11, 0x06, 0x00, 0x02, 0x00, 0x03]));
        let err = master.write_register(0x11, 0x0001, 0x0003).await.unwrap_err();
        assert!(matches!(err, ModbusError::UnexpectedResponse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_exception_reaches_caller() {
        let mut master = connection(frame(&[0x11, 0x81, 0x02]));
        let err = master.read_coils(0x11, 0xFFFF, 8).await.unwrap_err();

        assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataAddress));
        assert_eq!(
            err.to_string(),
            "exception 0x02 (illegal data address), function 0x01"
        );
    }

    #[tokio::test]
    async fn test_no_answer_times_out() {
        let mut master = connection(vec![]);
        master.set_params(ModbusMasterConnectionParams {
            max_response_time: Duration::from_millis(30),
            poll_interval: Duration::from_millis(5),
        });

        let err = master.read_input_registers(0x11, 0, 1).await.unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);
        assert_eq!(master.params().max_response_time, Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let mut master: Box<dyn ModbusMaster + Send> =
            Box::new(connection(frame(&[0x11, 0x06, 0x00, 0x01, 0x00, 0x03])));
        assert_eq!(master.write_register(0x11, 1, 3).await.unwrap(), 3);
    }
}
