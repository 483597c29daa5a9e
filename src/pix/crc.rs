//! CRC-16/CCITT-FALSE as required by the BR Code checksum field.

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL, |crc, byte| {
        let mut crc = crc ^ ((*byte as u16) << 8);
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Four uppercase hex digits, zero padded.
pub fn checksum_hex(data: &[u8]) -> String {
    format!("{:04X}", crc16_ccitt_false(data))
}
