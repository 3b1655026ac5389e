use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

//This trait abstracts whatever carries the RTU bytes (serial port, RTU over TCP gateway...)
//A read returning 0 bytes means "nothing available right now", not a failure
#[async_trait]
pub trait ModbusSocket: Send {
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    async fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T> ModbusSocket for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buffer).await
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        AsyncWriteExt::write(self, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(self).await
    }
}
