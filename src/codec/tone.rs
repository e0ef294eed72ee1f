// CTCSS / DCS tone selectors and the per-channel default tone

use super::{CodecError, Result, Warnings};
use std::fmt;

/// CTCSS tone table as the radio indexes it. The last entry, index 0x33,
/// is the "inherit channel default" marker.
pub const CTCSS_TONES: [&str; 52] = [
    "62.5", "67.0", "69.3", "71.9", "74.4", "77.0", "79.7", "82.5", // 0x00
    "85.4", "88.5", "91.5", "94.8", "97.4", "100.0", "103.5", "107.2", // 0x08
    "110.9", "114.8", "118.8", "123.0", "127.3", "131.8", "136.5", "141.3", // 0x10
    "146.2", "151.4", "156.7", "159.8", "162.2", "165.5", "167.9", "171.3", // 0x18
    "173.8", "177.3", "179.9", "183.5", "186.2", "189.9", "192.8", "196.6", // 0x20
    "199.5", "203.5", "206.5", "210.7", "218.1", "225.7", "229.1", "233.6", // 0x28
    "241.8", "250.3", "254.1", // 0x30
    "def", // 0x33
];

/// One tone squelch selector, used independently for the RX decoder and
/// the TX encoder side of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneSel {
    None,
    /// Index into [`CTCSS_TONES`].
    Ctcss(u8),
    /// 9-bit DCS code, rendered in octal.
    Dcs { code: u16, invert: bool },
}

impl ToneSel {
    /// Decode one selector side from its flag bits and value bytes.
    /// `what` names the side for warnings ("RX Decoder" / "TX Encoder").
    pub fn decode(
        cts_flag: bool,
        dcs_flag: bool,
        cts_index: u8,
        dcs_low: u8,
        dcs_flags: u8,
        what: &str,
        warnings: &mut Warnings,
    ) -> ToneSel {
        match (cts_flag, dcs_flag) {
            (true, true) => {
                warnings.push(format!(
                    "{} selects both CTCSS and DCS, using none",
                    what
                ));
                ToneSel::None
            }
            (true, false) => {
                if (cts_index as usize) < CTCSS_TONES.len() {
                    ToneSel::Ctcss(cts_index)
                } else {
                    warnings.push(format!(
                        "{} CTCSS index {:#04x} outside tone table, using none",
                        what, cts_index
                    ));
                    ToneSel::None
                }
            }
            (false, true) => ToneSel::Dcs {
                code: dcs_low as u16 | (((dcs_flags & 0x01) as u16) << 8),
                invert: dcs_flags & 0x02 != 0,
            },
            (false, false) => ToneSel::None,
        }
    }

    /// Parse the human rendering back. `field` names the side for the
    /// diagnostic.
    pub fn parse(text: &str, field: &'static str) -> Result<ToneSel> {
        if text == "none" {
            return Ok(ToneSel::None);
        }

        if let Some(tone) = text.strip_prefix("CTCSS:") {
            return match CTCSS_TONES.iter().position(|&t| t == tone) {
                Some(index) => Ok(ToneSel::Ctcss(index as u8)),
                None => Err(CodecError::UnknownCtcss(tone.to_string())),
            };
        }

        if let Some(code) = text.strip_prefix("DCS:") {
            let (invert, digits) = match code.strip_prefix('i') {
                Some(rest) => (true, rest),
                None => (false, code),
            };
            if digits.is_empty()
                || digits.len() > 3
                || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b))
            {
                return Err(CodecError::BadField {
                    field,
                    value: text.to_string(),
                });
            }
            let code = u16::from_str_radix(digits, 8).unwrap();
            return Ok(ToneSel::Dcs { code, invert });
        }

        Err(CodecError::BadField {
            field,
            value: text.to_string(),
        })
    }
}

impl fmt::Display for ToneSel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ToneSel::None => f.write_str("none"),
            ToneSel::Ctcss(index) => write!(f, "CTCSS:{}", CTCSS_TONES[index as usize]),
            ToneSel::Dcs { code, invert } => {
                write!(f, "DCS:{}{:03o}", if invert { "i" } else { "" }, code)
            }
        }
    }
}

/// Default tone: u16 little-endian, tenths of Hz, independent of the
/// CTCSS table.
pub fn decode_default(bytes: [u8; 2]) -> String {
    let value = u16::from_le_bytes(bytes);
    format!("{}.{}", value / 10, value % 10)
}

pub fn encode_default(text: &str) -> Result<[u8; 2]> {
    let bad = || CodecError::BadField {
        field: "Def. CTCSS",
        value: text.to_string(),
    };

    let (int_part, frac_part) = text.split_once('.').ok_or_else(bad)?;
    if int_part.is_empty()
        || frac_part.len() != 1
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(bad());
    }

    let value = int_part
        .parse::<u32>()
        .ok()
        .and_then(|v| v.checked_mul(10))
        .map(|v| v + frac_part.parse::<u32>().unwrap())
        .filter(|&v| v <= u16::MAX as u32)
        .ok_or_else(bad)?;

    Ok((value as u16).to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ctcss() {
        let mut w = Warnings::new();
        let sel = ToneSel::decode(true, false, 0x09, 0, 0, "RX Decoder", &mut w);
        assert_eq!(sel, ToneSel::Ctcss(0x09));
        assert_eq!(sel.to_string(), "CTCSS:88.5");
        assert!(w.is_empty());
    }

    #[test]
    fn test_decode_ctcss_default_marker() {
        let mut w = Warnings::new();
        let sel = ToneSel::decode(true, false, 0x33, 0, 0, "RX Decoder", &mut w);
        assert_eq!(sel.to_string(), "CTCSS:def");
    }

    #[test]
    fn test_decode_ctcss_out_of_range_falls_back() {
        let mut w = Warnings::new();
        let sel = ToneSel::decode(true, false, 0x34, 0, 0, "RX Decoder", &mut w);
        assert_eq!(sel, ToneSel::None);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_decode_both_flags_falls_back() {
        let mut w = Warnings::new();
        let sel = ToneSel::decode(true, true, 0, 0x13, 0, "TX Encoder", &mut w);
        assert_eq!(sel, ToneSel::None);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_decode_dcs_ninth_bit_and_invert() {
        let mut w = Warnings::new();
        let sel = ToneSel::decode(false, true, 0, 0x13, 0x03, "RX Decoder", &mut w);
        assert_eq!(
            sel,
            ToneSel::Dcs {
                code: 0x113,
                invert: true
            }
        );
        assert_eq!(sel.to_string(), "DCS:i423");
        assert!(w.is_empty());
    }

    #[test]
    fn test_display_dcs_pads_octal() {
        let sel = ToneSel::Dcs {
            code: 0o023,
            invert: false,
        };
        assert_eq!(sel.to_string(), "DCS:023");
    }

    #[test]
    fn test_parse() {
        assert_eq!(ToneSel::parse("none", "RX Decoder").unwrap(), ToneSel::None);
        assert_eq!(
            ToneSel::parse("CTCSS:88.5", "RX Decoder").unwrap(),
            ToneSel::Ctcss(0x09)
        );
        assert_eq!(
            ToneSel::parse("CTCSS:def", "RX Decoder").unwrap(),
            ToneSel::Ctcss(0x33)
        );
        assert_eq!(
            ToneSel::parse("DCS:i423", "RX Decoder").unwrap(),
            ToneSel::Dcs {
                code: 0o423,
                invert: true
            }
        );
        assert_eq!(
            ToneSel::parse("DCS:23", "RX Decoder").unwrap(),
            ToneSel::Dcs {
                code: 0o023,
                invert: false
            }
        );
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            ToneSel::parse("CTCSS:63.0", "RX Decoder").unwrap_err(),
            CodecError::UnknownCtcss(_)
        ));
        assert!(ToneSel::parse("DCS:8", "RX Decoder").is_err());
        assert!(ToneSel::parse("DCS:", "RX Decoder").is_err());
        assert!(ToneSel::parse("DCS:1234", "RX Decoder").is_err());
        assert!(ToneSel::parse("whatever", "RX Decoder").is_err());
    }

    #[test]
    fn test_default_tone() {
        assert_eq!(decode_default([0x75, 0x03]), "88.5");
        assert_eq!(encode_default("88.5").unwrap(), [0x75, 0x03]);
        assert_eq!(decode_default([0x00, 0x00]), "0.0");
        assert!(encode_default("88").is_err());
        assert!(encode_default("88.55").is_err());
        assert!(encode_default(".5").is_err());
        assert!(encode_default("7000.0").is_err());
    }
}
