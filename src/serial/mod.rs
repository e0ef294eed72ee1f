// Serial communication: byte link abstraction and the session protocol
pub mod comm;
pub mod protocol;

#[cfg(test)]
pub mod mock;

pub use comm::{ByteLink, LinkError, SerialLink, DEFAULT_PORT, PORT_TIMEOUT};
pub use protocol::{ProtocolError, Session, ACK, BLOCK_SIZE, MAX_MODEL_LEN};
