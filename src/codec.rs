//! The meter exposes every measurement as two consecutive 16-bit registers
//! holding an IEEE-754 binary32 pattern, high word first.

/// Reinterpret a register pair as a float. This is a bit reinterpretation,
/// not an arithmetic reconstruction: sign bit 31, exponent bits 30..23,
/// mantissa bits 22..0.
pub fn decode(word0: u16, word1: u16) -> f32 {
    f32::from_bits((u32::from(word0) << 16) | u32::from(word1))
}

/// Split a float into the register pair the meter would report for it.
pub fn encode(value: f32) -> (u16, u16) {
    let bits = value.to_bits();
    ((bits >> 16) as u16, (bits & 0xFFFF) as u16)
}
