use rand::Rng;

const CODE_MIN: u16 = 1000;
const CODE_MAX: u16 = 9999;

/// Four-digit pickup/handoff code in `1000..=9999`.
///
/// Minting is not idempotent on its own; callers only invoke this for an
/// empty code slot.
pub fn generate_security_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Fills `slot` when it is empty and leaves an existing code untouched.
/// Returns whether a code was minted.
pub fn mint_if_absent<R: Rng + ?Sized>(slot: &mut Option<String>, rng: &mut R) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(generate_security_code(rng));
    true
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{generate_security_code, mint_if_absent};

    #[test]
    fn codes_are_four_digits_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let code = generate_security_code(&mut rng);
            assert_eq!(code.len(), 4);
            let value: u16 = code.parse().unwrap();
            assert!((1000..=9999).contains(&value));
        }
    }

    #[test]
    fn existing_code_is_never_replaced() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut slot = Some("4321".to_string());

        assert!(!mint_if_absent(&mut slot, &mut rng));
        assert!(!mint_if_absent(&mut slot, &mut rng));
        assert_eq!(slot.as_deref(), Some("4321"));
    }

    #[test]
    fn empty_slot_is_filled_once() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut slot = None;

        assert!(mint_if_absent(&mut slot, &mut rng));
        let first = slot.clone();
        assert!(!mint_if_absent(&mut slot, &mut rng));
        assert_eq!(slot, first);
    }
}
