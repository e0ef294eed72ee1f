// Memory image codec
//
// Pure, stateless translation between raw memory bytes and the human
// field vocabulary. Decoding is total: structurally impossible bytes
// render as an empty field with a warning, out-of-range enumerations
// fall back to a safe default with a warning. Encoding is strict: any
// invalid human value fails the whole record.

pub mod channel;
pub mod freq;
pub mod image;
pub mod keys;
pub mod tone;

pub use channel::Channel;
pub use image::{Image, ImageKind};
pub use tone::ToneSel;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid BCD nibble {0:#x}")]
    BadBcdNibble(u8),

    #[error("cannot convert empty frequency")]
    EmptyFrequency,

    #[error("decimal part of frequency {0} too long")]
    IntegerPartTooLong(String),

    #[error("fractional part of frequency {0} too long")]
    FractionTooLong(String),

    #[error("invalid character in frequency {0}")]
    BadFrequencyDigit(String),

    #[error("both + and - found in frequency field ({0})")]
    AmbiguousShift(String),

    #[error("string '{0}' too long, must be {1} chars max")]
    StringTooLong(String, usize),

    #[error("invalid character '{0}' in string '{1}'; only uppercase letters, digits, dashes and spaces are allowed")]
    BadStringChar(char, String),

    #[error("could not find CTCSS {0} in CTCSS map")]
    UnknownCtcss(String),

    #[error("invalid {field} setting ({value})")]
    BadField {
        field: &'static str,
        value: String,
    },

    #[error("channel number {} non-numeric or out of range (1-{})", .0, image::NUM_CHANNELS)]
    BadChannelNumber(String),

    #[error("invalid field count")]
    BadFieldCount,

    #[error("invalid key name ({0})")]
    BadKeyName(String),

    #[error("invalid key value ({0})")]
    BadKeyValue(String),

    #[error("cannot import {0} key for microphone")]
    MicKeyForbidden(String),

    #[error("image size {0:#x} is not a known memory layout")]
    BadImageSize(usize),

    #[error("image offset {0:#x} not zero (not supported)")]
    BadImageOffset(u16),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Collects non-fatal decode diagnostics so callers decide how to
/// surface them.
#[derive(Debug, Default)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}
