//! UUID generator for workload ids.

use rand::Rng;
use uuid::Uuid;

/// Generate a random UUID v4 using the provided RNG.
pub fn generate_uuid_v4<R: Rng>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);

    // Set version (4) and variant (RFC 4122) bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Workload id in its hyphenated string form.
pub fn generate_workload_id<R: Rng>(rng: &mut R) -> String {
    generate_uuid_v4(rng).hyphenated().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uuid_version() {
        let mut rng = StdRng::seed_from_u64(42);
        let uuid = generate_uuid_v4(&mut rng);
        assert_eq!(uuid.get_version_num(), 4);
        assert_ne!(uuid, generate_uuid_v4(&mut rng));
    }

    #[test]
    fn test_workload_id_deterministic() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        let id = generate_workload_id(&mut rng1);
        assert_eq!(id.len(), 36);
        assert_eq!(id, generate_workload_id(&mut rng2));
    }
}
