// Memory image interpretation
//
// Two capture sizes exist in the wild. Old dumps cover only the channel
// table; everything else (bitmaps, welcome message, settings, keys) needs
// a full capture.

use super::channel::{encode_name, Channel, CHANNEL_SIZE, NAME_SIZE};
use super::{CodecError, Result, Warnings};

pub const NUM_CHANNELS: usize = 200;

pub const CHAN_EN_OFFSET: usize = 0x1940;
pub const SCAN_EN_OFFSET: usize = 0x1960;
pub const WELCOME_OFFSET: usize = 0x1980;
pub const WELCOME_SIZE: usize = 7;

pub const APO_OFFSET: usize = 0x3200;
pub const KEY_BEEP_OFFSET: usize = 0x3201;
pub const KEY_LOCK_OFFSET: usize = 0x3202;
pub const KEY_AUTOLOCK_OFFSET: usize = 0x3203;
pub const MIC_KEYS_OFFSET: usize = 0x3214;
pub const FUNC_KEYS_OFFSET: usize = 0x3250;

/// Channel table only, no bitmaps.
pub const LEGACY_IMAGE_SIZE: usize = 0x1900;
/// Everything the radio exposes.
pub const FULL_IMAGE_SIZE: usize = 0x3400;

/// Scalar yes/no settings, name to byte offset.
pub const SETTINGS: [(&str, usize); 4] = [
    ("apo", APO_OFFSET),
    ("keybeep", KEY_BEEP_OFFSET),
    ("keylock", KEY_LOCK_OFFSET),
    ("autolock", KEY_AUTOLOCK_OFFSET),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Legacy,
    Full,
}

/// A memory image of one of the two known sizes, captured at offset zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    kind: ImageKind,
}

impl Image {
    pub fn from_payload(offset: u16, data: Vec<u8>) -> Result<Image> {
        if offset != 0 {
            return Err(CodecError::BadImageOffset(offset));
        }
        let kind = match data.len() {
            LEGACY_IMAGE_SIZE => ImageKind::Legacy,
            FULL_IMAGE_SIZE => ImageKind::Full,
            other => return Err(CodecError::BadImageSize(other)),
        };
        Ok(Image { data, kind })
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn slot(&self, number: usize) -> &[u8; CHANNEL_SIZE] {
        debug_assert!((1..=NUM_CHANNELS).contains(&number));
        let start = (number - 1) * CHANNEL_SIZE;
        self.data[start..start + CHANNEL_SIZE].try_into().unwrap()
    }

    pub fn slot_mut(&mut self, number: usize) -> &mut [u8; CHANNEL_SIZE] {
        debug_assert!((1..=NUM_CHANNELS).contains(&number));
        let start = (number - 1) * CHANNEL_SIZE;
        (&mut self.data[start..start + CHANNEL_SIZE])
            .try_into()
            .unwrap()
    }

    /// Legacy images have no bitmap; a slot counts as empty when it is
    /// wiped or its name field is unused.
    pub fn channel_enabled(&self, number: usize) -> bool {
        match self.kind {
            ImageKind::Full => get_flag(&self.data[CHAN_EN_OFFSET..], number - 1),
            ImageKind::Legacy => {
                let slot = self.slot(number);
                if slot.iter().all(|&b| b == 0xff) {
                    return false;
                }
                let name = &slot[25..25 + NAME_SIZE];
                !(name.iter().all(|&b| b == b' ') || name.iter().all(|&b| b == 0xff))
            }
        }
    }

    pub fn scan_enabled(&self, number: usize) -> bool {
        match self.kind {
            ImageKind::Full => get_flag(&self.data[SCAN_EN_OFFSET..], number - 1),
            ImageKind::Legacy => false,
        }
    }

    pub fn set_channel_enabled(&mut self, number: usize, enabled: bool) {
        debug_assert_eq!(self.kind, ImageKind::Full);
        set_flag(&mut self.data[CHAN_EN_OFFSET..], number - 1, enabled);
    }

    pub fn set_scan_enabled(&mut self, number: usize, enabled: bool) {
        debug_assert_eq!(self.kind, ImageKind::Full);
        set_flag(&mut self.data[SCAN_EN_OFFSET..], number - 1, enabled);
    }

    /// Decode channel `number`, or `None` when it is disabled.
    pub fn channel(&self, number: usize, warnings: &mut Warnings) -> Option<Channel> {
        if !self.channel_enabled(number) {
            return None;
        }
        let scan = self.scan_enabled(number);
        Some(Channel::decode(self.slot(number), number, scan, warnings))
    }

    /// Wipe a channel slot and clear its bitmap bits.
    pub fn remove_channel(&mut self, number: usize) {
        self.slot_mut(number).fill(0xff);
        if self.kind == ImageKind::Full {
            self.set_channel_enabled(number, false);
            self.set_scan_enabled(number, false);
        }
    }

    pub fn welcome(&self, warnings: &mut Warnings) -> String {
        debug_assert_eq!(self.kind, ImageKind::Full);
        let mut text = String::with_capacity(WELCOME_SIZE);
        for &byte in &self.data[WELCOME_OFFSET..WELCOME_OFFSET + WELCOME_SIZE] {
            if byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b' ' || byte == b'-' {
                text.push(byte as char);
            } else {
                warnings.push(format!(
                    "invalid welcome message byte {:#04x}, rendering as space",
                    byte
                ));
                text.push(' ');
            }
        }
        text.trim_end().to_string()
    }

    pub fn set_welcome(&mut self, text: &str) -> Result<()> {
        debug_assert_eq!(self.kind, ImageKind::Full);
        let bytes = encode_name(text, WELCOME_SIZE)?;
        self.data[WELCOME_OFFSET..WELCOME_OFFSET + WELCOME_SIZE].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn setting(&self, name: &str) -> Option<bool> {
        debug_assert_eq!(self.kind, ImageKind::Full);
        SETTINGS
            .iter()
            .find(|&&(n, _)| n == name)
            .map(|&(_, offset)| self.data[offset] != 0)
    }

    pub fn set_setting(&mut self, name: &str, value: bool) -> Result<()> {
        debug_assert_eq!(self.kind, ImageKind::Full);
        let &(_, offset) = SETTINGS
            .iter()
            .find(|&&(n, _)| n == name)
            .ok_or_else(|| CodecError::BadField {
                field: "setting",
                value: name.to_string(),
            })?;
        self.data[offset] = value as u8;
        Ok(())
    }

    pub fn func_key(&self, index: usize) -> u8 {
        debug_assert_eq!(self.kind, ImageKind::Full);
        self.data[FUNC_KEYS_OFFSET + index]
    }

    pub fn mic_key(&self, index: usize) -> u8 {
        debug_assert_eq!(self.kind, ImageKind::Full);
        self.data[MIC_KEYS_OFFSET + index]
    }

    pub fn set_func_key(&mut self, index: usize, value: u8) {
        debug_assert_eq!(self.kind, ImageKind::Full);
        self.data[FUNC_KEYS_OFFSET + index] = value;
    }

    pub fn set_mic_key(&mut self, index: usize, value: u8) {
        debug_assert_eq!(self.kind, ImageKind::Full);
        self.data[MIC_KEYS_OFFSET + index] = value;
    }
}

fn get_flag(memory: &[u8], position: usize) -> bool {
    memory[position / 8] & (1 << (position % 8)) != 0
}

fn set_flag(memory: &mut [u8], position: usize, value: bool) {
    if value {
        memory[position / 8] |= 1 << (position % 8);
    } else {
        memory[position / 8] &= !(1 << (position % 8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_image() -> Image {
        Image::from_payload(0, vec![0u8; FULL_IMAGE_SIZE]).unwrap()
    }

    fn legacy_image() -> Image {
        Image::from_payload(0, vec![0xffu8; LEGACY_IMAGE_SIZE]).unwrap()
    }

    #[test]
    fn test_from_payload() {
        assert_eq!(full_image().kind(), ImageKind::Full);
        assert_eq!(legacy_image().kind(), ImageKind::Legacy);
        assert!(matches!(
            Image::from_payload(0, vec![0u8; 100]).unwrap_err(),
            CodecError::BadImageSize(100)
        ));
        assert!(matches!(
            Image::from_payload(0x40, vec![0u8; FULL_IMAGE_SIZE]).unwrap_err(),
            CodecError::BadImageOffset(0x40)
        ));
    }

    #[test]
    fn test_full_image_trusts_bitmap() {
        let mut image = full_image();
        assert!(!image.channel_enabled(1));

        image.set_channel_enabled(1, true);
        image.set_channel_enabled(200, true);
        assert!(image.channel_enabled(1));
        assert!(image.channel_enabled(200));
        assert!(!image.channel_enabled(2));

        // The slot content does not matter for a full image.
        image.slot_mut(2).fill(0x55);
        assert!(!image.channel_enabled(2));
    }

    #[test]
    fn test_legacy_empty_slot_conventions() {
        let mut image = legacy_image();
        // All 0xFF.
        assert!(!image.channel_enabled(1));

        // Content, but name field all spaces.
        image.slot_mut(2).fill(0x00);
        image.slot_mut(2)[25..30].fill(b' ');
        assert!(!image.channel_enabled(2));

        // Content with name all 0xFF.
        image.slot_mut(3).fill(0x00);
        image.slot_mut(3)[25..30].fill(0xff);
        assert!(!image.channel_enabled(3));

        // Real name: enabled, scanning always decodes false.
        image.slot_mut(4).fill(0x00);
        image.slot_mut(4)[25..30].copy_from_slice(b"CALL ");
        assert!(image.channel_enabled(4));
        assert!(!image.scan_enabled(4));
    }

    #[test]
    fn test_remove_channel() {
        let mut image = full_image();
        image.set_channel_enabled(5, true);
        image.set_scan_enabled(5, true);
        image.slot_mut(5).fill(0x12);

        image.remove_channel(5);
        assert!(image.slot(5).iter().all(|&b| b == 0xff));
        assert!(!image.channel_enabled(5));
        assert!(!image.scan_enabled(5));
    }

    #[test]
    fn test_disabled_channel_decodes_to_none() {
        let image = full_image();
        let mut w = Warnings::new();
        assert!(image.channel(1, &mut w).is_none());
    }

    #[test]
    fn test_welcome_roundtrip() {
        let mut image = full_image();
        image.set_welcome("HELLO").unwrap();
        let mut w = Warnings::new();
        assert_eq!(image.welcome(&mut w), "HELLO");
        assert!(w.is_empty());

        assert!(image.set_welcome("TOOLONGX").is_err());
        assert!(image.set_welcome("hello").is_err());
    }

    #[test]
    fn test_welcome_invalid_byte_warns() {
        let mut image = full_image();
        image.set_welcome("HELLO").unwrap();
        let mut w = Warnings::new();
        assert_eq!(image.welcome(&mut w), "HELLO");

        // Corrupt one byte directly.
        let mut data = image.into_data();
        data[WELCOME_OFFSET + 1] = 0x01;
        let image = Image::from_payload(0, data).unwrap();
        let mut w = Warnings::new();
        assert_eq!(image.welcome(&mut w), "H LLO");
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_settings() {
        let mut image = full_image();
        assert_eq!(image.setting("apo"), Some(false));
        image.set_setting("apo", true).unwrap();
        assert_eq!(image.setting("apo"), Some(true));
        assert_eq!(image.data()[APO_OFFSET], 1);

        assert!(image.set_setting("bogus", true).is_err());
        assert_eq!(image.setting("bogus"), None);
    }

    #[test]
    fn test_keys() {
        let mut image = full_image();
        image.set_func_key(0, 3);
        image.set_mic_key(3, 5);
        assert_eq!(image.func_key(0), 3);
        assert_eq!(image.mic_key(3), 5);
        assert_eq!(image.data()[FUNC_KEYS_OFFSET], 3);
        assert_eq!(image.data()[MIC_KEYS_OFFSET + 3], 5);
    }

    #[test]
    fn test_flag_helpers() {
        let mut memory = [0u8; 25];
        for pos in [0, 7, 8, 199] {
            assert!(!get_flag(&memory, pos));
            set_flag(&mut memory, pos, true);
            assert!(get_flag(&memory, pos));
            set_flag(&mut memory, pos, false);
            assert!(!get_flag(&memory, pos));
        }
    }
}
