//! CRC-16 (Modbus variant) used to seal every frame on the wire.

/// Starting value of the CRC register.
const CRC_INIT: u16 = 0xFFFF;
/// Reflected form of the `0x8005` polynomial.
const CRC_POLY: u16 = 0xA001;

/// Compute the checksum over `bytes`.
///
/// Returns `(low, high)`, which is also the order the two bytes are sent in.
pub fn compute_checksum(bytes: &[u8]) -> (u8, u8) {
    let mut register = CRC_INIT;

    for &byte in bytes {
        register ^= byte as u16;
        for _ in 0..8 {
            if register & 0x0001 != 0 {
                register = (register >> 1) ^ CRC_POLY;
            } else {
                register >>= 1;
            }
        }
    }

    ((register & 0xFF) as u8, (register >> 8) as u8)
}

/// Check that the trailing two bytes of `frame` are the checksum of everything before them.
pub fn checksum_matches(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let (body, crc) = frame.split_at(frame.len() - 2);
    let (low, high) = compute_checksum(body);
    crc == [low, high]
}
