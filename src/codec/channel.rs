// Channel record codec
//
// Each channel occupies a 32-byte slot. The layout is addressed through
// offset constants and bit masks only, never through struct casts:
//
//   0..4    rx frequency, BCD
//   4..8    tx shift, BCD
//   8       unknown, preserved
//   9       flags1: bits0-1 shift dir, bits2-3 tx power, bit7 talkaround
//   10      flags2: bit0 tx-off, bit1 reverse, bits2-3 bandwidth
//   11      flags3: bit0 tx-CTCSS, bit1 tx-DCS, bit2 rx-CTCSS, bit3 rx-DCS,
//                   bits4-7 optional-signaling parameter
//   12/13   rx/tx CTCSS index
//   14/15   rx DCS low byte / flags (bit0 = 9th bit, bit1 = invert)
//   16/17   tx DCS low byte / flags
//   18      busy-channel lockout
//   19      PTT id
//   20      squelch mode
//   21      optional signaling type
//   22..25  unknown, preserved
//   25..30  name, space padded
//   30..32  default tone, u16 LE tenths of Hz

use super::image::NUM_CHANNELS;
use super::tone::ToneSel;
use super::{freq, tone, CodecError, Result, Warnings};

pub const CHANNEL_SIZE: usize = 32;

const RXFREQ: usize = 0;
const TXSHIFT: usize = 4;
const FLAGS1: usize = 9;
const FLAGS2: usize = 10;
const FLAGS3: usize = 11;
const RXCTS: usize = 12;
const TXCTS: usize = 13;
const RXDCS: usize = 14;
const RXDCSFL: usize = 15;
const TXDCS: usize = 16;
const TXDCSFL: usize = 17;
const BCL: usize = 18;
const PTTID: usize = 19;
const SQL: usize = 20;
const OPTSIG: usize = 21;
const NAME: usize = 25;
pub const NAME_SIZE: usize = 5;
const DEFCTS: usize = 30;

/// Fields per channel row after the tag and number cells.
pub const CHANNEL_FIELDS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shift {
    Off,
    Up(String),
    Down(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    /// Transmitter disabled outright; carried in its own flag bit.
    Off,
    Low,
    Medium,
    High,
}

impl Power {
    fn as_str(self) -> &'static str {
        match self {
            Power::Off => "off",
            Power::Low => "low",
            Power::Medium => "medium",
            Power::High => "high",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "off" => Ok(Power::Off),
            "low" => Ok(Power::Low),
            "medium" => Ok(Power::Medium),
            "high" => Ok(Power::High),
            _ => Err(bad("TX power", text)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bandwidth {
    Narrow, // 12.5 kHz
    Mid,    // 20.0 kHz
    Wide,   // 25.0 kHz
}

impl Bandwidth {
    fn as_str(self) -> &'static str {
        match self {
            Bandwidth::Narrow => "12.5",
            Bandwidth::Mid => "20.0",
            Bandwidth::Wide => "25.0",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "12.5" => Ok(Bandwidth::Narrow),
            "20.0" => Ok(Bandwidth::Mid),
            "25.0" => Ok(Bandwidth::Wide),
            _ => Err(bad("Bandwidth", text)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Squelch {
    Carrier,
    CtsDcs,
    OptSig,
}

impl Squelch {
    fn as_str(self) -> &'static str {
        match self {
            Squelch::Carrier => "carrier",
            Squelch::CtsDcs => "ctsdcs",
            Squelch::OptSig => "optsig",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "carrier" => Ok(Squelch::Carrier),
            "ctsdcs" => Ok(Squelch::CtsDcs),
            "optsig" => Ok(Squelch::OptSig),
            _ => Err(bad("squelch", text)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bcl {
    Off,
    Rpt,
    Busy,
}

impl Bcl {
    fn as_str(self) -> &'static str {
        match self {
            Bcl::Off => "off",
            Bcl::Rpt => "rpt",
            Bcl::Busy => "busy",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "off" => Ok(Bcl::Off),
            "rpt" => Ok(Bcl::Rpt),
            "busy" => Ok(Bcl::Busy),
            _ => Err(bad("Busy Channel Lockout", text)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttPos {
    Begin,
    End,
    Both,
}

impl PttPos {
    fn as_str(self) -> &'static str {
        match self {
            PttPos::Begin => "begin",
            PttPos::End => "end",
            PttPos::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttId {
    Off,
    Dtmf(PttPos),
    FiveTone(PttPos),
}

impl PttId {
    fn render(self) -> String {
        match self {
            PttId::Off => "off".to_string(),
            PttId::Dtmf(pos) => format!("dtmf:{}", pos.as_str()),
            PttId::FiveTone(pos) => format!("5tone:{}", pos.as_str()),
        }
    }

    fn parse(text: &str) -> Result<Self> {
        if text == "off" {
            return Ok(PttId::Off);
        }
        let (category, position) = text.split_once(':').ok_or_else(|| bad("PTT ID", text))?;
        let pos = match position {
            "begin" => PttPos::Begin,
            "end" => PttPos::End,
            "both" => PttPos::Both,
            _ => return Err(bad("PTT ID", text)),
        };
        match category {
            "dtmf" => Ok(PttId::Dtmf(pos)),
            "5tone" => Ok(PttId::FiveTone(pos)),
            _ => Err(bad("PTT ID", text)),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            PttId::Off => 0,
            PttId::Dtmf(pos) => pos as u8 + 1,
            PttId::FiveTone(pos) => (pos as u8 + 1) << 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptSig {
    Off,
    /// DTMF message M1..M16.
    Dtmf(u8),
    /// 5-tone call 0..15.
    FiveTone(u8),
}

impl OptSig {
    fn render(self) -> String {
        match self {
            OptSig::Off => "off".to_string(),
            OptSig::Dtmf(m) => format!("dtmf:M{}", m),
            OptSig::FiveTone(p) => format!("5tone:{}", p),
        }
    }

    fn parse(text: &str) -> Result<Self> {
        if text == "off" {
            return Ok(OptSig::Off);
        }
        if let Some(m) = text.strip_prefix("dtmf:M") {
            return m
                .parse::<u8>()
                .ok()
                .filter(|&m| (1..=16).contains(&m))
                .map(OptSig::Dtmf)
                .ok_or_else(|| bad("Optional Signaling", text));
        }
        if let Some(p) = text.strip_prefix("5tone:") {
            return p
                .parse::<u8>()
                .ok()
                .filter(|&p| p <= 15)
                .map(OptSig::FiveTone)
                .ok_or_else(|| bad("Optional Signaling", text));
        }
        Err(bad("Optional Signaling", text))
    }
}

fn bad(field: &'static str, value: &str) -> CodecError {
    CodecError::BadField {
        field,
        value: value.to_string(),
    }
}

/// One decoded channel. Frequencies stay in their condensed string form;
/// the codec validates them only on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// 1-based channel number.
    pub number: usize,
    pub name: String,
    pub rx_freq: String,
    pub shift: Shift,
    pub rx_sel: ToneSel,
    pub tx_sel: ToneSel,
    pub squelch: Squelch,
    pub power: Power,
    pub bandwidth: Bandwidth,
    pub bcl: Bcl,
    pub ptt_id: PttId,
    pub opt_sig: OptSig,
    pub scan: bool,
    pub talkaround: bool,
    pub reverse: bool,
    pub default_tone: String,
}

impl Channel {
    /// Decode a slot. Never fails: undecodable frequencies render empty,
    /// out-of-range enumerations fall back to a safe value, and each such
    /// substitution leaves a warning behind.
    pub fn decode(
        slot: &[u8; CHANNEL_SIZE],
        number: usize,
        scan: bool,
        warnings: &mut Warnings,
    ) -> Channel {
        let rx_freq = decode_freq_lossy(&slot[RXFREQ..RXFREQ + 4], number, "RX frequency", warnings);

        let flags1 = slot[FLAGS1];
        let flags2 = slot[FLAGS2];
        let flags3 = slot[FLAGS3];

        let shift = match flags1 & 0x03 {
            0 => Shift::Off,
            dir @ (1 | 2) => {
                let value =
                    decode_freq_lossy(&slot[TXSHIFT..TXSHIFT + 4], number, "TX shift", warnings);
                if dir == 1 {
                    Shift::Up(value)
                } else {
                    Shift::Down(value)
                }
            }
            other => {
                warnings.push(format!(
                    "channel {}: unknown shift direction {}, using off",
                    number, other
                ));
                Shift::Off
            }
        };

        let power = if flags2 & 0x01 != 0 {
            Power::Off
        } else {
            match (flags1 >> 2) & 0x03 {
                0 => Power::Low,
                1 => Power::Medium,
                2 => Power::High,
                other => {
                    warnings.push(format!(
                        "channel {}: unknown TX power {}, using low",
                        number, other
                    ));
                    Power::Low
                }
            }
        };

        let bandwidth = match (flags2 >> 2) & 0x03 {
            0 => Bandwidth::Narrow,
            1 => Bandwidth::Mid,
            2 => Bandwidth::Wide,
            other => {
                warnings.push(format!(
                    "channel {}: unknown bandwidth {}, using 12.5",
                    number, other
                ));
                Bandwidth::Narrow
            }
        };

        let rx_sel = ToneSel::decode(
            flags3 & 0x04 != 0,
            flags3 & 0x08 != 0,
            slot[RXCTS],
            slot[RXDCS],
            slot[RXDCSFL],
            &format!("channel {} RX Decoder", number),
            warnings,
        );
        let tx_sel = ToneSel::decode(
            flags3 & 0x01 != 0,
            flags3 & 0x02 != 0,
            slot[TXCTS],
            slot[TXDCS],
            slot[TXDCSFL],
            &format!("channel {} TX Encoder", number),
            warnings,
        );

        let bcl = match slot[BCL] {
            0 => Bcl::Off,
            1 => Bcl::Rpt,
            2 => Bcl::Busy,
            other => {
                warnings.push(format!(
                    "channel {}: unknown lockout mode {:#04x}, using off",
                    number, other
                ));
                Bcl::Off
            }
        };

        let ptt_id = match slot[PTTID] {
            0x00 => PttId::Off,
            0x01 => PttId::Dtmf(PttPos::Begin),
            0x02 => PttId::Dtmf(PttPos::End),
            0x03 => PttId::Dtmf(PttPos::Both),
            0x10 => PttId::FiveTone(PttPos::Begin),
            0x20 => PttId::FiveTone(PttPos::End),
            0x30 => PttId::FiveTone(PttPos::Both),
            other => {
                warnings.push(format!(
                    "channel {}: unknown PTT id {:#04x}, using off",
                    number, other
                ));
                PttId::Off
            }
        };

        let squelch = match slot[SQL] {
            0 => Squelch::Carrier,
            1 => Squelch::CtsDcs,
            2 => Squelch::OptSig,
            other => {
                warnings.push(format!(
                    "channel {}: unknown squelch mode {:#04x}, using carrier",
                    number, other
                ));
                Squelch::Carrier
            }
        };

        let param = flags3 >> 4;
        let opt_sig = match slot[OPTSIG] {
            0 => OptSig::Off,
            1 => OptSig::Dtmf(param + 1),
            3 => OptSig::FiveTone(param),
            other => {
                warnings.push(format!(
                    "channel {}: unknown optional signaling {:#04x}, using off",
                    number, other
                ));
                OptSig::Off
            }
        };

        let mut name = String::with_capacity(NAME_SIZE);
        for &byte in &slot[NAME..NAME + NAME_SIZE] {
            if name_byte_valid(byte) {
                name.push(byte as char);
            } else {
                warnings.push(format!(
                    "channel {}: invalid name byte {:#04x}, rendering as space",
                    number, byte
                ));
                name.push(' ');
            }
        }
        let name = name.trim_end().to_string();

        let default_tone = tone::decode_default([slot[DEFCTS], slot[DEFCTS + 1]]);

        Channel {
            number,
            name,
            rx_freq,
            shift,
            rx_sel,
            tx_sel,
            squelch,
            power,
            bandwidth,
            bcl,
            ptt_id,
            opt_sig,
            scan,
            talkaround: flags1 & 0x80 != 0,
            reverse: flags2 & 0x02 != 0,
            default_tone,
        }
    }

    /// Write every known field into `slot`, leaving the unknown bytes and
    /// bits untouched so a decoded channel applies back byte-identically.
    pub fn apply(&self, slot: &mut [u8; CHANNEL_SIZE]) -> Result<()> {
        let name = encode_name(&self.name, NAME_SIZE)?;
        slot[NAME..NAME + NAME_SIZE].copy_from_slice(&name);

        slot[RXFREQ..RXFREQ + 4].copy_from_slice(&freq::encode(&self.rx_freq)?);

        let shiftdir = match &self.shift {
            Shift::Off => {
                slot[TXSHIFT..TXSHIFT + 4].fill(0);
                0
            }
            Shift::Up(value) | Shift::Down(value) => {
                let bytes = freq::encode(value)?;
                slot[TXSHIFT..TXSHIFT + 4].copy_from_slice(&bytes);
                if bytes == [0; 4] {
                    // Zero shift collapses to shift-off.
                    0
                } else if matches!(self.shift, Shift::Up(_)) {
                    1
                } else {
                    2
                }
            }
        };

        let txpwr = match self.power {
            Power::Off | Power::Low => 0,
            Power::Medium => 1,
            Power::High => 2,
        };
        let mut flags1 = slot[FLAGS1] & 0x70;
        flags1 |= shiftdir | (txpwr << 2);
        if self.talkaround {
            flags1 |= 0x80;
        }
        slot[FLAGS1] = flags1;

        let mut flags2 = slot[FLAGS2] & 0xf0;
        if self.power == Power::Off {
            flags2 |= 0x01;
        }
        if self.reverse {
            flags2 |= 0x02;
        }
        flags2 |= match self.bandwidth {
            Bandwidth::Narrow => 0,
            Bandwidth::Mid => 1,
            Bandwidth::Wide => 2,
        } << 2;
        slot[FLAGS2] = flags2;

        let (param, optsig_byte) = match self.opt_sig {
            // Off leaves the parameter bits alone.
            OptSig::Off => (slot[FLAGS3] >> 4, 0u8),
            OptSig::Dtmf(m) => (m - 1, 1),
            OptSig::FiveTone(p) => (p, 3),
        };
        let mut flags3 = param << 4;
        flags3 |= apply_tone(self.tx_sel, slot, TXCTS, TXDCS, TXDCSFL);
        flags3 |= apply_tone(self.rx_sel, slot, RXCTS, RXDCS, RXDCSFL) << 2;
        slot[FLAGS3] = flags3;
        slot[OPTSIG] = optsig_byte;

        slot[BCL] = self.bcl as u8;
        slot[PTTID] = self.ptt_id.to_byte();
        slot[SQL] = self.squelch as u8;

        let defcts = tone::encode_default(&self.default_tone)?;
        slot[DEFCTS..DEFCTS + 2].copy_from_slice(&defcts);

        Ok(())
    }

    /// Render the channel row cells after the tag and number.
    pub fn to_fields(&self) -> Vec<String> {
        let combined = match &self.shift {
            Shift::Off => self.rx_freq.clone(),
            Shift::Up(value) => format!("{}+{}", self.rx_freq, value),
            Shift::Down(value) => format!("{}-{}", self.rx_freq, value),
        };

        vec![
            self.name.clone(),
            combined,
            self.rx_sel.to_string(),
            self.tx_sel.to_string(),
            self.squelch.as_str().to_string(),
            self.power.as_str().to_string(),
            self.bandwidth.as_str().to_string(),
            self.bcl.as_str().to_string(),
            self.ptt_id.render(),
            self.opt_sig.render(),
            yes_no(self.scan),
            yes_no(self.talkaround),
            yes_no(self.reverse),
            self.default_tone.clone(),
        ]
    }

    /// Parse the row cells after the tag and number. Strict: the first
    /// invalid field fails the record.
    pub fn from_fields(number: usize, fields: &[String]) -> Result<Channel> {
        if !(1..=NUM_CHANNELS).contains(&number) {
            return Err(CodecError::BadChannelNumber(number.to_string()));
        }
        if fields.len() < CHANNEL_FIELDS {
            return Err(CodecError::BadFieldCount);
        }

        let (rx_freq, shift) = parse_combined_freq(&fields[1])?;

        Ok(Channel {
            number,
            name: fields[0].clone(),
            rx_freq,
            shift,
            rx_sel: ToneSel::parse(&fields[2], "RX Decoder")?,
            tx_sel: ToneSel::parse(&fields[3], "TX Encoder")?,
            squelch: Squelch::parse(&fields[4])?,
            power: Power::parse(&fields[5])?,
            bandwidth: Bandwidth::parse(&fields[6])?,
            bcl: Bcl::parse(&fields[7])?,
            ptt_id: PttId::parse(&fields[8])?,
            opt_sig: OptSig::parse(&fields[9])?,
            scan: parse_yes_no(&fields[10], "Scanning")?,
            talkaround: parse_yes_no(&fields[11], "Talkaround")?,
            reverse: parse_yes_no(&fields[12], "Reverse")?,
            default_tone: fields[13].clone(),
        })
    }
}

fn apply_tone(sel: ToneSel, slot: &mut [u8; CHANNEL_SIZE], cts: usize, dcs: usize, dcsfl: usize) -> u8 {
    match sel {
        ToneSel::None => 0b00,
        ToneSel::Ctcss(index) => {
            slot[cts] = index;
            0b01
        }
        ToneSel::Dcs { code, invert } => {
            slot[dcs] = (code & 0xff) as u8;
            slot[dcsfl] = ((code >> 8) & 0x01) as u8 | if invert { 0x02 } else { 0x00 };
            0b10
        }
    }
}

fn decode_freq_lossy(bytes: &[u8], number: usize, what: &str, warnings: &mut Warnings) -> String {
    match freq::decode(bytes.try_into().unwrap(), true) {
        Ok(value) => value,
        Err(e) => {
            warnings.push(format!("channel {}: undecodable {}: {}", number, what, e));
            String::new()
        }
    }
}

/// Split a combined `146.52`, `439.7-7.6` or `145.6+0.6` field.
pub fn parse_combined_freq(field: &str) -> Result<(String, Shift)> {
    let plus = field.find('+');
    let minus = field.find('-');
    match (plus, minus) {
        (Some(_), Some(_)) => Err(CodecError::AmbiguousShift(field.to_string())),
        (Some(pos), None) => Ok((
            field[..pos].to_string(),
            Shift::Up(field[pos + 1..].to_string()),
        )),
        (None, Some(pos)) => Ok((
            field[..pos].to_string(),
            Shift::Down(field[pos + 1..].to_string()),
        )),
        (None, None) => Ok((field.to_string(), Shift::Off)),
    }
}

fn name_byte_valid(byte: u8) -> bool {
    byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b' ' || byte == b'-'
}

/// Validate and space-pad a display string (channel name, welcome
/// message). Too long is an error, never a truncation.
pub(crate) fn encode_name(text: &str, size: usize) -> Result<Vec<u8>> {
    if text.len() > size {
        return Err(CodecError::StringTooLong(text.to_string(), size));
    }
    for ch in text.chars() {
        if !ch.is_ascii() || !name_byte_valid(ch as u8) {
            return Err(CodecError::BadStringChar(ch, text.to_string()));
        }
    }
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(size, b' ');
    Ok(bytes)
}

fn yes_no(value: bool) -> String {
    (if value { "yes" } else { "no" }).to_string()
}

fn parse_yes_no(text: &str, field: &'static str) -> Result<bool> {
    match text {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(bad(field, text)),
    }
}
