//! Single-player opponent strategy

use rand::Rng;

use crate::ws::protocol::Move;

/// Both armed: shoot appears twice on purpose, the CPU leans aggressive.
const ARMED_STANDOFF: [Move; 5] = [Move::Shoot, Move::Stab, Move::Block, Move::Shoot, Move::Reload];

/// Pick the CPU's move for this resolve beat from the two bullet counts.
///
/// Stateless: nothing carries over between calls except what the RNG does.
pub fn choose_move<R: Rng + ?Sized>(rng: &mut R, own_bullets: u32, opponent_bullets: u32) -> Move {
    let choice = match (own_bullets > 0, opponent_bullets > 0) {
        // Opponent can only defend or reload, press the advantage
        (true, false) => weighted(rng, Move::Shoot, Move::Stab, Move::Reload),
        (true, true) => ARMED_STANDOFF[rng.gen_range(0..ARMED_STANDOFF.len())],
        // Opponent is armed and we are not
        (false, true) => weighted(rng, Move::Block, Move::CounterStab, Move::Reload),
        (false, false) => Move::Reload,
    };

    if choice.is_attack() && own_bullets == 0 {
        Move::Reload
    } else {
        choice
    }
}

/// 40% `first`, 40% `second`, 20% `rest`
fn weighted<R: Rng + ?Sized>(rng: &mut R, first: Move, second: Move, rest: Move) -> Move {
    let roll: f64 = rng.gen();
    if roll < 0.4 {
        first
    } else if roll < 0.8 {
        second
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    const TRIALS: usize = 20_000;

    fn distribution(seed: u64, own: u32, opponent: u32) -> HashMap<Move, f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut counts: HashMap<Move, usize> = HashMap::new();
        for _ in 0..TRIALS {
            *counts.entry(choose_move(&mut rng, own, opponent)).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(mv, n)| (mv, n as f64 / TRIALS as f64))
            .collect()
    }

    fn assert_close(dist: &HashMap<Move, f64>, mv: Move, expected: f64) {
        let observed = dist.get(&mv).copied().unwrap_or(0.0);
        assert!(
            (observed - expected).abs() < 0.02,
            "{mv}: observed {observed:.3}, expected {expected:.3}"
        );
    }

    #[test]
    fn unarmed_against_armed_defends() {
        let dist = distribution(7, 0, 3);
        assert_close(&dist, Move::Block, 0.4);
        assert_close(&dist, Move::CounterStab, 0.4);
        assert_close(&dist, Move::Reload, 0.2);
        assert_eq!(dist.len(), 3);
    }

    #[test]
    fn armed_against_unarmed_attacks() {
        let dist = distribution(11, 2, 0);
        assert_close(&dist, Move::Shoot, 0.4);
        assert_close(&dist, Move::Stab, 0.4);
        assert_close(&dist, Move::Reload, 0.2);
    }

    #[test]
    fn armed_standoff_favours_shooting() {
        let dist = distribution(13, 1, 1);
        assert_close(&dist, Move::Shoot, 0.4);
        assert_close(&dist, Move::Stab, 0.2);
        assert_close(&dist, Move::Block, 0.2);
        assert_close(&dist, Move::Reload, 0.2);
        assert!(!dist.contains_key(&Move::CounterStab));
    }

    #[test]
    fn both_empty_always_reloads() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..500 {
            assert_eq!(choose_move(&mut rng, 0, 0), Move::Reload);
        }
    }

    #[test]
    fn never_attacks_without_bullets() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for opponent in 0..4 {
            for _ in 0..1_000 {
                assert!(!choose_move(&mut rng, 0, opponent).is_attack());
            }
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let left: Vec<Move> = (0..64).map(|_| choose_move(&mut a, 1, 2)).collect();
        let right: Vec<Move> = (0..64).map(|_| choose_move(&mut b, 1, 2)).collect();
        assert_eq!(left, right);
    }
}
