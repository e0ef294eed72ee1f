// Scripted mock link for testing the protocol without hardware

use super::comm::{ByteLink, LinkError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock byte link. Reads are served from a scripted queue; writes are
/// captured for inspection. Clones share the same buffers, so a test can
/// keep a handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    reads: Arc<Mutex<VecDeque<u8>>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the "radio" will send, in order.
    pub fn queue(&mut self, data: &[u8]) {
        self.reads.lock().unwrap().extend(data.iter().copied());
    }

    /// Everything written to the link so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn clear_written(&mut self) {
        self.written.lock().unwrap().clear();
    }
}

impl ByteLink for MockLink {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut reads = self.reads.lock().unwrap();
        // An exhausted script behaves like a silent radio.
        if reads.len() < buf.len() {
            return Err(LinkError::Timeout(Duration::from_secs(0)));
        }
        for slot in buf.iter_mut() {
            *slot = reads.pop_front().unwrap();
        }
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_roundtrip() {
        let mut link = MockLink::new();
        link.queue(b"hello");

        let mut buf = [0u8; 5];
        link.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        link.write_all(b"world").unwrap();
        assert_eq!(link.written(), b"world");
    }

    #[test]
    fn test_mock_underrun_times_out() {
        let mut link = MockLink::new();
        link.queue(b"ab");
        let mut buf = [0u8; 3];
        assert!(matches!(
            link.read_exact(&mut buf),
            Err(LinkError::Timeout(_))
        ));
    }
}
