// BCD frequency fields
//
// 4 bytes, two BCD nibbles each, digits DDDFFFFF: 3 integer digits and
// 5 fractional digits of MHz. `043.93500` is 43.935 MHz.

use super::{CodecError, Result};

const INT_DIGITS: usize = 3;
const FRAC_DIGITS: usize = 5;

/// Decode 4 BCD bytes to a frequency string. Plain form is always
/// `DDD.FFFFF`; condensed form strips up to two leading zeros and all
/// trailing fraction zeros, dropping the point when the fraction is gone.
pub fn decode(bytes: &[u8; 4], condensed: bool) -> Result<String> {
    let mut digits = [0u8; INT_DIGITS + FRAC_DIGITS];
    for (i, byte) in bytes.iter().enumerate() {
        for (j, nibble) in [byte >> 4, byte & 0x0f].into_iter().enumerate() {
            if nibble > 9 {
                return Err(CodecError::BadBcdNibble(nibble));
            }
            digits[i * 2 + j] = b'0' + nibble;
        }
    }

    let mut int_part = std::str::from_utf8(&digits[..INT_DIGITS]).unwrap();
    let mut frac_part = std::str::from_utf8(&digits[INT_DIGITS..]).unwrap();

    if condensed {
        let strip = int_part
            .bytes()
            .take(INT_DIGITS - 1)
            .take_while(|&b| b == b'0')
            .count();
        int_part = &int_part[strip..];
        frac_part = frac_part.trim_end_matches('0');
    }

    if frac_part.is_empty() {
        Ok(int_part.to_string())
    } else {
        Ok(format!("{}.{}", int_part, frac_part))
    }
}

/// Encode a frequency string into 4 BCD bytes. Accepts both the plain
/// and the condensed form.
pub fn encode(text: &str) -> Result<[u8; 4]> {
    if text.is_empty() {
        return Err(CodecError::EmptyFrequency);
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };

    if int_part.len() > INT_DIGITS {
        return Err(CodecError::IntegerPartTooLong(text.to_string()));
    }
    if frac_part.len() > FRAC_DIGITS {
        return Err(CodecError::FractionTooLong(text.to_string()));
    }
    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(CodecError::BadFrequencyDigit(text.to_string()));
    }

    let mut digits = [b'0'; INT_DIGITS + FRAC_DIGITS];
    digits[INT_DIGITS - int_part.len()..INT_DIGITS].copy_from_slice(int_part.as_bytes());
    digits[INT_DIGITS..INT_DIGITS + frac_part.len()].copy_from_slice(frac_part.as_bytes());

    let mut bytes = [0u8; 4];
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        bytes[i] = ((pair[0] - b'0') << 4) | (pair[1] - b'0');
    }
    Ok(bytes)
}
