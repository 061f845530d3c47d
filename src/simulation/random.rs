//! Random test data
//!
//! Generators for account owners, amounts and currencies used when
//! provisioning simulated accounts. Every function takes the RNG explicitly
//! so callers can pass a seeded generator for reproducible runs.

use rand::seq::SliceRandom;
use rand::Rng;

pub const USD: &str = "USD";
pub const EUR: &str = "EUR";
pub const CAD: &str = "CAD";

/// Currencies handed out to simulated accounts
pub const CURRENCIES: [&str; 3] = [EUR, USD, CAD];

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Random integer in `min..=max`
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    rng.gen_range(min..=max)
}

/// Random lowercase string of length `n`
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
    (0..n)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Random six-letter owner name
pub fn random_owner<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_string(rng, 6)
}

pub fn random_currency<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    CURRENCIES.choose(rng).copied().unwrap_or(USD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_int_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let value = random_int(&mut rng, -5, 5);
            assert!((-5..=5).contains(&value));
        }
    }

    #[test]
    fn test_random_owner_is_six_lowercase_letters() {
        let mut rng = StdRng::seed_from_u64(7);

        let owner = random_owner(&mut rng);

        assert_eq!(owner.len(), 6);
        assert!(owner.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_random_int_and_currency() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            assert!((1..=25).contains(&random_int(&mut rng, 1, 25)));
            assert!(CURRENCIES.contains(&random_currency(&mut rng)));
        }
    }

    #[test]
    fn test_seeded_generators_are_reproducible() {
        let mut first = StdRng::seed_from_u64(99);
        let mut second = StdRng::seed_from_u64(99);

        assert_eq!(random_string(&mut first, 12), random_string(&mut second, 12));
    }
}
