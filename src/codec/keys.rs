// Programmable key assignments
//
// Twelve panel keys and four microphone keys, one byte each, indexing a
// shared function table. Two functions are panel-only; the microphone
// cannot carry them.

use super::{CodecError, Result, Warnings};

pub const FUNC_KEY_NAMES: [&str; 12] = [
    "P1", "P2", "P3", "P4", "P5", "P6", "p1", "p2", "p3", "p4", "p5", "p6",
];

pub const MIC_KEY_NAMES: [&str; 4] = ["PA", "PB", "PC", "PD"];

/// Function table, value 0 first.
pub const KEY_FUNCTIONS: [&str; 17] = [
    "OFF", "A/B", "V/M", "SQL", "VOL", "POW", "CDT", "REV", "SCN", "CAL", "TALK", "BND", "SFT",
    "MON", "DIR", "TRF", "RDW",
];

fn mic_forbidden(function: &str) -> bool {
    function == "A/B" || function == "V/M"
}

/// Render a stored key value. Values outside the function table come out
/// as a `0xNN` literal so nothing is lost on a later import.
pub fn decode_key(value: u8, key_name: &str, is_mic: bool, warnings: &mut Warnings) -> String {
    match KEY_FUNCTIONS.get(value as usize) {
        Some(&function) if is_mic && mic_forbidden(function) => {
            warnings.push(format!(
                "microphone key {} holds panel-only function {}, rendering OFF",
                key_name, function
            ));
            KEY_FUNCTIONS[0].to_string()
        }
        Some(&function) => function.to_string(),
        None => {
            warnings.push(format!(
                "key {} holds unknown value {:#04x}, rendering as hex literal",
                key_name, value
            ));
            format!("{:#04x}", value)
        }
    }
}

/// Parse a key value for storage. A `0xNN` literal is an explicit escape
/// hatch around the function table.
pub fn encode_key(value: &str, is_mic: bool, warnings: &mut Warnings) -> Result<u8> {
    if let Some(hex) = value.strip_prefix("0x") {
        if hex.len() == 2 {
            if let Ok(raw) = u8::from_str_radix(hex, 16) {
                warnings.push(format!("importing key as hex literal ({})", value));
                return Ok(raw);
            }
        }
        return Err(CodecError::BadKeyValue(value.to_string()));
    }

    match KEY_FUNCTIONS.iter().position(|&f| f == value) {
        Some(_) if is_mic && mic_forbidden(value) => {
            Err(CodecError::MicKeyForbidden(value.to_string()))
        }
        Some(index) => Ok(index as u8),
        None => Err(CodecError::BadKeyValue(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_function() {
        let mut w = Warnings::new();
        assert_eq!(decode_key(0, "P1", false, &mut w), "OFF");
        assert_eq!(decode_key(1, "P1", false, &mut w), "A/B");
        assert_eq!(decode_key(16, "P6", false, &mut w), "RDW");
        assert!(w.is_empty());
    }

    #[test]
    fn test_decode_out_of_range_renders_hex() {
        let mut w = Warnings::new();
        assert_eq!(decode_key(0x2a, "p3", false, &mut w), "0x2a");
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_decode_mic_forbidden_renders_off() {
        let mut w = Warnings::new();
        assert_eq!(decode_key(1, "PA", true, &mut w), "OFF");
        assert_eq!(decode_key(2, "PB", true, &mut w), "OFF");
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_encode_named_function() {
        let mut w = Warnings::new();
        assert_eq!(encode_key("OFF", false, &mut w).unwrap(), 0);
        assert_eq!(encode_key("SQL", true, &mut w).unwrap(), 3);
        assert!(w.is_empty());
    }

    #[test]
    fn test_encode_hex_literal_warns() {
        let mut w = Warnings::new();
        assert_eq!(encode_key("0x2a", false, &mut w).unwrap(), 0x2a);
        assert_eq!(w.len(), 1);
        assert!(encode_key("0x2a2", false, &mut w).is_err());
        assert!(encode_key("0xzz", false, &mut w).is_err());
    }

    #[test]
    fn test_encode_mic_forbidden_fails() {
        let mut w = Warnings::new();
        let err = encode_key("A/B", true, &mut w).unwrap_err();
        assert_eq!(err.to_string(), "cannot import A/B key for microphone");
        assert!(matches!(
            encode_key("V/M", true, &mut w).unwrap_err(),
            CodecError::MicKeyForbidden(_)
        ));
        // Same functions are fine on panel keys.
        assert_eq!(encode_key("A/B", false, &mut w).unwrap(), 1);
    }

    #[test]
    fn test_encode_unknown_value() {
        let mut w = Warnings::new();
        assert!(matches!(
            encode_key("XYZ", false, &mut w).unwrap_err(),
            CodecError::BadKeyValue(_)
        ));
    }
}
