/// Decodes an IEEE-754 single-precision float from two registers, high word first.
///
/// Total over all inputs: any bit pattern yields a float, NaN and infinities included.
pub fn decode_f32(hi: u16, lo: u16) -> f32 {
    let [b0, b1] = hi.to_be_bytes();
    let [b2, b3] = lo.to_be_bytes();
    f32::from_be_bytes([b0, b1, b2, b3])
}

/// Decodes the first two words of a register payload, or `None` if it is too short.
pub fn decode_words(words: &[u16]) -> Option<f32> {
    match words {
        [hi, lo, ..] => Some(decode_f32(*hi, *lo)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_known_values() {
        assert_eq!(decode_f32(0x3F80, 0x0000), 1.0);
        assert_eq!(decode_f32(0x0000, 0x0000), 0.0);
        assert_eq!(decode_f32(0xBF80, 0x0000), -1.0);
        assert_eq!(decode_f32(0x4366, 0x0000), 230.0);
        assert_eq!(decode_f32(0x4248, 0x0000), 50.0);
    }

    #[test]
    fn test_low_word_carries_mantissa() {
        // 0x40490FDB is the f32 nearest to pi
        assert_eq!(decode_f32(0x4049, 0x0FDB), std::f32::consts::PI);
    }

    #[test]
    fn test_non_finite_patterns_decode() {
        assert_eq!(decode_f32(0x7F80, 0x0000), f32::INFINITY);
        assert!(decode_f32(0x7FC0, 0x0000).is_nan());
        assert!(decode_f32(0x8000, 0x0000).is_sign_negative());
    }

    #[test]
    fn test_matches_big_endian_reinterpretation() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let hi: u16 = rng.gen();
            let lo: u16 = rng.gen();
            let expected = f32::from_bits((u32::from(hi) << 16) | u32::from(lo));
            assert_eq!(decode_f32(hi, lo).to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn test_decode_words() {
        assert_eq!(decode_words(&[0x3F80, 0x0000]), Some(1.0));
        assert_eq!(decode_words(&[0x3F80, 0x0000, 0xFFFF]), Some(1.0));
        assert_eq!(decode_words(&[0x3F80]), None);
        assert_eq!(decode_words(&[]), None);
    }
}
