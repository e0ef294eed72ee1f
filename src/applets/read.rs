// Read applet: capture the radio memory into an .omi file

use crate::codec::image::FULL_IMAGE_SIZE;
use crate::formats::omi::OmiFile;
use crate::serial::{ByteLink, SerialLink, Session, BLOCK_SIZE, PORT_TIMEOUT};
use crate::util::printable;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run(port: &str, output: &Path) -> Result<()> {
    let link = SerialLink::open(port, PORT_TIMEOUT)?;
    let omi = capture(link)?;
    omi.save(output)
        .with_context(|| format!("saving {}", output.display()))?;
    tracing::info!("saved {} bytes to {}", omi.data.len(), output.display());
    Ok(())
}

/// Run a full capture session over an established link.
pub fn capture<L: ByteLink>(link: L) -> Result<OmiFile> {
    let mut session = Session::open(link).context("establishing programming session")?;
    tracing::info!("connected, radio model: {}", printable(session.model()));
    let model = session.model().to_vec();

    let mut data = Vec::with_capacity(FULL_IMAGE_SIZE);
    for offset in (0..FULL_IMAGE_SIZE).step_by(BLOCK_SIZE) {
        match session.read_block(offset as u16, BLOCK_SIZE as u8) {
            Ok(block) => data.extend_from_slice(&block),
            Err(e) => {
                session.abort();
                return Err(e).with_context(|| format!("reading block at {:#06x}", offset));
            }
        }
        tracing::debug!("read {:#06x}/{:#06x}", offset + BLOCK_SIZE, FULL_IMAGE_SIZE);
    }

    session.finish().context("terminating session")?;
    Ok(OmiFile::new(0, model, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::mock::MockLink;
    use crate::serial::ACK;
    use crate::util::sum8;

    fn queue_session(link: &mut MockLink, model: &[u8], fill: u8, fail_at: Option<usize>) {
        link.queue(b"PROGRAM");
        link.queue(&[b'Q', b'X', ACK]);
        link.queue(&[0x02]);
        link.queue(model);
        link.queue(&[ACK]);

        for (i, offset) in (0..FULL_IMAGE_SIZE).step_by(BLOCK_SIZE).enumerate() {
            let req = [
                b'R',
                (offset >> 8) as u8,
                (offset & 0xff) as u8,
                BLOCK_SIZE as u8,
            ];
            link.queue(&req); // echo
            if fail_at == Some(i) {
                // Silence: the read times out. Queue the END echo the
                // abort path will consume.
                link.queue(b"END");
                link.queue(&[ACK]);
                return;
            }
            let mut rsp = vec![b'W', req[1], req[2], req[3]];
            rsp.extend(std::iter::repeat(fill).take(BLOCK_SIZE));
            rsp.push(sum8(&rsp[1..]));
            rsp.push(ACK);
            link.queue(&rsp);
        }

        link.queue(b"END");
        link.queue(&[ACK]);
    }

    #[test]
    fn test_capture() {
        let mut link = MockLink::new();
        queue_session(&mut link, b"AT778UV", 0x5a, None);

        let omi = capture(link).unwrap();
        assert_eq!(omi.offset, 0);
        assert_eq!(omi.model, b"AT778UV");
        assert_eq!(omi.data.len(), FULL_IMAGE_SIZE);
        assert!(omi.data.iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn test_capture_aborts_on_read_error() {
        let mut link = MockLink::new();
        queue_session(&mut link, b"AT778UV", 0x00, Some(3));

        assert!(capture(link.clone()).is_err());
        // The abort path still sent the termination command.
        let written = link.written();
        assert!(written.ends_with(b"END"));
    }
}
