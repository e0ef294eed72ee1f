// Wire-level session protocol
//
// Every exchange follows the same pattern: the programmer sends a request,
// the radio echoes it back byte for byte, then sends its reply. A wrong
// echo almost always means a cable or level-converter problem, so those
// errors carry their own diagnostic category and are never retried.

use super::comm::{ByteLink, LinkError};
use crate::util::{printable, sum8};
use thiserror::Error;

/// Acknowledgment byte terminating most radio replies.
pub const ACK: u8 = 0x06;

/// Transfer unit for block reads and writes. Total transfer sizes must be
/// an exact multiple of this.
pub const BLOCK_SIZE: usize = 0x40;

/// Longest model identifier the handshake will accept.
pub const MAX_MODEL_LEN: usize = 16;

const CMD_PROGRAM: &[u8] = b"PROGRAM";
const CMD_END: &[u8] = b"END";
const CMD_IDENT: u8 = 0x02;
const HANDSHAKE_REPLY: [u8; 3] = [b'Q', b'X', ACK];

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("echo did not match sent data, check cable")]
    EchoMismatch,

    #[error("radio returned unrecognized handshake data: {0:02x?}")]
    BadHandshake([u8; 3]),

    #[error("model identifier longer than {MAX_MODEL_LEN} bytes")]
    ModelTooLong,

    #[error("invalid response header from radio to read packet")]
    BadBlockHeader,

    #[error("checksum error in read packet (calculated {calculated:#04x}, received {received:#04x})")]
    ChecksumMismatch { calculated: u8, received: u8 },

    #[error("radio did not acknowledge {0}")]
    MissingAck(&'static str),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// An established programming session. Constructing one performs the
/// handshake, so a `Session` is always ready for block transfers; `finish`
/// or `abort` consume it and terminate the session on the radio side.
#[derive(Debug)]
pub struct Session<L: ByteLink> {
    link: L,
    model: Vec<u8>,
}

impl<L: ByteLink> Session<L> {
    /// Perform the handshake and return a ready session.
    pub fn open(link: L) -> Result<Self> {
        let mut session = Session {
            link,
            model: Vec::new(),
        };
        session.handshake()?;
        Ok(session)
    }

    /// Model identifier reported by the radio. May contain NULs.
    pub fn model(&self) -> &[u8] {
        &self.model
    }

    fn handshake(&mut self) -> Result<()> {
        self.exchange(CMD_PROGRAM)?;

        let mut reply = [0u8; 3];
        self.link.read_exact(&mut reply)?;
        if reply != HANDSHAKE_REPLY {
            return Err(ProtocolError::BadHandshake(reply));
        }

        self.exchange(&[CMD_IDENT])?;

        // The model length is not announced; read until ACK, capped.
        loop {
            let mut byte = [0u8; 1];
            self.link.read_exact(&mut byte)?;
            if byte[0] == ACK {
                break;
            }
            if self.model.len() >= MAX_MODEL_LEN {
                return Err(ProtocolError::ModelTooLong);
            }
            self.model.push(byte[0]);
        }

        tracing::debug!("handshake complete, model: {}", printable(&self.model));
        Ok(())
    }

    /// Read `size` bytes of radio memory starting at `offset`.
    pub fn read_block(&mut self, offset: u16, size: u8) -> Result<Vec<u8>> {
        let req = [b'R', (offset >> 8) as u8, (offset & 0xff) as u8, size];
        self.exchange(&req)?;

        let mut rsp = vec![0u8; size as usize + 6];
        self.link.read_exact(&mut rsp)?;

        let last = rsp.len() - 1;
        if rsp[0] != b'W'
            || rsp[1] != req[1]
            || rsp[2] != req[2]
            || rsp[3] != req[3]
            || rsp[last] != ACK
        {
            return Err(ProtocolError::BadBlockHeader);
        }

        // Checksum covers offset, size and payload; not the command byte.
        let calculated = sum8(&rsp[1..last - 1]);
        let received = rsp[last - 1];
        if calculated != received {
            return Err(ProtocolError::ChecksumMismatch {
                calculated,
                received,
            });
        }

        Ok(rsp[4..4 + size as usize].to_vec())
    }

    /// Write a block of radio memory at `offset`. `data` must be 1..=255
    /// bytes long.
    pub fn write_block(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        debug_assert!(!data.is_empty() && data.len() <= u8::MAX as usize);

        let mut req = Vec::with_capacity(data.len() + 6);
        req.push(b'W');
        req.push((offset >> 8) as u8);
        req.push((offset & 0xff) as u8);
        req.push(data.len() as u8);
        req.extend_from_slice(data);
        req.push(sum8(&req[1..]));
        req.push(ACK);

        self.exchange(&req)?;
        self.expect_ack("write packet")
    }

    /// Terminate the session. The radio stays in programming mode until it
    /// sees this.
    pub fn finish(mut self) -> Result<()> {
        self.end()
    }

    /// Best-effort termination on an error path. Its own failure is logged
    /// and swallowed so the original error stays visible.
    pub fn abort(mut self) {
        if let Err(e) = self.end() {
            tracing::warn!("additional error while trying to terminate session: {}", e);
        }
    }

    fn end(&mut self) -> Result<()> {
        self.exchange(CMD_END)?;
        self.expect_ack("termination")
    }

    /// Send `data` and verify the radio's echo of it.
    fn exchange(&mut self, data: &[u8]) -> Result<()> {
        debug_assert!(!data.is_empty());
        self.link.write_all(data)?;
        self.link.flush()?;

        let mut echo = vec![0u8; data.len()];
        self.link.read_exact(&mut echo)?;
        if echo != data {
            return Err(ProtocolError::EchoMismatch);
        }
        Ok(())
    }

    fn expect_ack(&mut self, what: &'static str) -> Result<()> {
        let mut ack = [0u8; 1];
        self.link.read_exact(&mut ack)?;
        if ack[0] != ACK {
            return Err(ProtocolError::MissingAck(what));
        }
        Ok(())
    }
}
