// Shared primitives: checksums and byte formatting helpers

/// CRC-32 (IEEE 802.3, reflected polynomial 0xEDB88320), incremental.
/// Pass the previous return value as `crc` to continue a running checksum;
/// start with 0.
pub fn crc32(crc: u32, data: &[u8]) -> u32 {
    let mut crc = !crc;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

/// 8-bit truncated sum, as used by the wire protocol's block checksum.
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Render arbitrary bytes for log output. The radio's model identifier
/// routinely contains NUL and other control bytes.
pub fn printable(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if (0x20..=0x7e).contains(&b) {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
