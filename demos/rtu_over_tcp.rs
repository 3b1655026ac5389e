//! Talks to slave 1 behind a serial-to-TCP gateway that forwards raw RTU frames.
//!
//! `cargo run --example rtu_over_tcp -- 192.168.1.50:4001`

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tweakable_modbus_rtu::{
    ExceptionCode, ModbusError, ModbusMaster, ModbusMasterConnection,
    ModbusMasterConnectionParams,
};

const SLAVE_ID: u8 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4001".to_string());

    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("Couldn't open connection to {}", address))?;

    let params = ModbusMasterConnectionParams {
        max_response_time: Duration::from_secs(1),
        ..Default::default()
    };
    let mut master = ModbusMasterConnection::with_params(stream, params);

    let registers = master.read_holding_registers(SLAVE_ID, 0, 10).await?;
    println!("Holding registers 0..10: {:?}", registers);

    let coils = master.read_coils(SLAVE_ID, 0, 16).await?;
    println!("Coils 0..16: {:?}", coils);

    match master.write_coil(SLAVE_ID, 0x0010, true).await {
        Ok(state) => println!("Coil 0x0010 is now {}", state),
        Err(ModbusError::Exception {
            code: ExceptionCode::IllegalDataAddress,
            ..
        }) => println!("Slave {} has no coil 0x0010", SLAVE_ID),
        Err(err) => return Err(err.into()),
    }

    let confirmed = master
        .write_registers(SLAVE_ID, 100, &[0x1234, 0x5678])
        .await?;
    println!("Wrote {} registers", confirmed);

    Ok(())
}
