use super::ModbusMasterConnectionParams;
use crate::codec::rtu::MAX_FRAME_LEN;
use crate::codec::stream::ModbusStream;
use crate::codec::{DecodeError, ModbusCodec};
use crate::communication::ModbusSocket;
use crate::error::{ModbusError, ModbusResult};
use crate::messages::ModbusPdu;

use std::io;
use tokio::time::error::Elapsed;
use tokio::time::{sleep, timeout_at, Instant};

/// Sends `request` and waits for the matching response frame.
///
/// The whole exchange (writing included) must finish within
/// `params.max_response_time`. Bytes may trickle in over any number of reads;
/// the response buffer is re-decoded from its start after every read until it
/// holds a complete frame. Only an incomplete frame is retried: crc errors,
/// unknown function codes, exception responses and transport errors end the
/// transaction at once. An exception counts only when it names the request's
/// slave and function; any other frame is an `UnexpectedResponse`.
pub async fn execute<S, C>(
    socket: &mut S,
    codec: &mut C,
    request: &ModbusPdu,
    params: &ModbusMasterConnectionParams,
) -> ModbusResult<ModbusPdu>
where
    S: ModbusSocket + ?Sized,
    C: ModbusCodec + Send + ?Sized,
{
    let deadline = Instant::now() + params.max_response_time;
    let timed_out = |_: Elapsed| ModbusError::Timeout(params.max_response_time);

    let mut request_stream = codec.encode(request);
    log::debug!(
        "Sending to slave {}: {:02X?}",
        request.slave_id,
        request_stream.bytes()
    );

    while !request_stream.is_empty() {
        let written = timeout_at(deadline, request_stream.drain_to(socket))
            .await
            .map_err(timed_out)??;
        if written == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
    }
    timeout_at(deadline, socket.flush())
        .await
        .map_err(timed_out)??;

    let mut response = ModbusStream::with_capacity(MAX_FRAME_LEN);

    loop {
        if Instant::now() >= deadline {
            response.rewind();
            log::warn!(
                "Slave {} didn't answer within {:?}, got {:02X?}",
                request.slave_id,
                params.max_response_time,
                response.bytes()
            );
            return Err(ModbusError::Timeout(params.max_response_time));
        }

        timeout_at(deadline, response.fill_from(socket))
            .await
            .map_err(timed_out)??;

        response.rewind();
        match codec.decode(&mut response) {
            Ok(pdu) => {
                log::debug!("Received from slave {}: {:02X?}", pdu.slave_id, pdu.payload);
                check_response(request, &pdu)?;
                return Ok(pdu);
            }
            Err(DecodeError::Incomplete) => {
                log::trace!("Incomplete response ({} bytes), waiting", response.len());
                let remaining = deadline.saturating_duration_since(Instant::now());
                sleep(params.poll_interval.min(remaining)).await;
            }
            Err(DecodeError::Fatal(err)) => {
                if let ModbusError::Exception {
                    slave_id, function, ..
                } = err
                {
                    check_exception(request, slave_id, function)?;
                }
                log::debug!("Transaction with slave {} failed: {}", request.slave_id, err);
                return Err(err);
            }
        }
    }
}

fn check_response(request: &ModbusPdu, response: &ModbusPdu) -> ModbusResult<()> {
    if response.slave_id != request.slave_id {
        return Err(ModbusError::UnexpectedResponse(format!(
            "answer from slave {} to a request for slave {}",
            response.slave_id, request.slave_id
        )));
    }
    if response.function_code != request.function_code {
        return Err(ModbusError::UnexpectedResponse(format!(
            "function {:?} answered with {:?}",
            request.function_code, response.function_code
        )));
    }
    Ok(())
}

fn check_exception(request: &ModbusPdu, slave_id: u8, function: u8) -> ModbusResult<()> {
    if slave_id != request.slave_id || function != u8::from(request.function_code) {
        return Err(ModbusError::UnexpectedResponse(format!(
            "exception for function 0x{:02X} from slave {} to a request for function {:?} on slave {}",
            function, slave_id, request.function_code, request.slave_id
        )));
    }
    Ok(())
}
