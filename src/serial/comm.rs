// Serial port abstraction
// The radio speaks 9600 8N1 raw with no flow control; every receive is a
// blocking read with a bounded timeout.

use std::io;
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("cannot open port: {0}")]
    Open(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("radio not responding (timeout after {0:?})")]
    Timeout(Duration),

    #[error("EOF reading from device (radio disconnected?)")]
    Eof,
}

pub type Result<T> = std::result::Result<T, LinkError>;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const PORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Duplex byte stream to the radio. Reads block until the requested byte
/// count arrives or the link's timeout expires.
pub trait ByteLink {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// Physical serial link, fixed at 9600 8N1.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    timeout: Duration,
}

impl SerialLink {
    pub fn open(path: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!("opening port {}", path);
        let port = serialport::new(path, 9600)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| LinkError::Open(format!("{}: {}", path, e)))?;
        Ok(Self { port, timeout })
    }
}

impl ByteLink for SerialLink {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < buf.len() {
            match self.port.read(&mut buf[done..]) {
                Ok(0) => {
                    if done > 0 {
                        tracing::debug!("<< (partial) {:02x?}", &buf[..done]);
                    }
                    return Err(LinkError::Eof);
                }
                Ok(n) => done += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                    if done > 0 {
                        tracing::debug!("<< (partial) {:02x?}", &buf[..done]);
                    }
                    return Err(LinkError::Timeout(self.timeout));
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::trace!("<< {:02x?}", buf);
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        // The radio drops bytes when data follows too quickly after the
        // previous exchange; a short pause avoids spurious timeouts.
        thread::sleep(Duration::from_millis(5));
        tracing::trace!(">> {:02x?}", buf);
        self.port.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush()?;
        Ok(())
    }
}
