//! ZFM packet checksum
//!
//! From the module datasheet:
//! 1. Take the packet identifier byte, both length bytes and every payload byte
//! 2. Add them as unsigned values
//! 3. Drop the overflowing bits, keeping the low 16 bits
//!
//! The start marker and the address are not covered.

use tracing::trace;

/// Calculate packet checksum
///
/// # Algorithm
///
/// ```text
/// sum = pid + length_hi + length_lo + payload[0] + ... + payload[n-1]   (mod 2^16)
/// ```
///
/// `length` is the value of the length field, i.e. payload length + 2.
///
/// # Examples
///
/// ```
/// use zfm_core::checksum;
///
/// // VfyPwd command with the default password
/// let sum = checksum::calculate(0x01, 0x0007, &[0x13, 0x00, 0x00, 0x00, 0x00]);
/// assert_eq!(sum, 0x001B);
/// ```
pub fn calculate(packet_type: u8, length: u16, payload: &[u8]) -> u16 {
    let [length_hi, length_lo] = length.to_be_bytes();

    let header = u16::from(packet_type)
        .wrapping_add(u16::from(length_hi))
        .wrapping_add(u16::from(length_lo));

    let checksum = payload
        .iter()
        .fold(header, |sum, byte| sum.wrapping_add(u16::from(*byte)));

    trace!(
        packet_type = packet_type,
        length = length,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(packet_type: u8, length: u16, payload: &[u8], expected: u16) -> bool {
    calculate(packet_type, length, payload) == expected
}
