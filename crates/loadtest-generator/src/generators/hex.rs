//! Hex identifier generator.

use rand::Rng;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Generate a random lowercase hex string of `len` characters.
pub fn generate_hex<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| HEX_CHARS[rng.gen_range(0..HEX_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_hex_length_and_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let value = generate_hex(&mut rng, 32);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hex_deterministic() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        assert_eq!(generate_hex(&mut rng1, 16), generate_hex(&mut rng2, 16));
    }
}
