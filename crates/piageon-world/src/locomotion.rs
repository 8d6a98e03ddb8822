//! Idle / walk / turn locomotion state machine.
//!
//! Each agent cycles through short dwell periods so the flock does not move
//! in lockstep. Transitions happen when the dwell timer runs out; the dwell
//! length of the next period depends on the mode being left.

use glam::Vec3;
use piageon_core::MotionMode;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// (probability of the first successor, first successor, second successor, dwell range)
struct Transition {
    first_chance: f32,
    first: MotionMode,
    second: MotionMode,
    dwell: (f32, f32),
}

const INITIAL_DWELL: (f32, f32) = (0.4, 1.0);

fn transition_from(mode: MotionMode) -> Transition {
    match mode {
        MotionMode::Idle => Transition {
            first_chance: 0.7,
            first: MotionMode::Walk,
            second: MotionMode::Turn,
            dwell: (1.0, 2.2),
        },
        MotionMode::Walk => Transition {
            first_chance: 0.5,
            first: MotionMode::Idle,
            second: MotionMode::Turn,
            dwell: (0.5, 1.3),
        },
        MotionMode::Turn => Transition {
            first_chance: 0.6,
            first: MotionMode::Walk,
            second: MotionMode::Idle,
            dwell: (0.7, 1.6),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    pub mode: MotionMode,
    /// Seconds left in the current mode
    pub timer: f32,
    /// Unit heading on the ground plane, biased toward while turning
    pub heading: Vec3,
}

impl Locomotion {
    pub fn new(rng: &mut ChaCha8Rng) -> Self {
        Self {
            mode: MotionMode::Idle,
            timer: rng.gen_range(INITIAL_DWELL.0..INITIAL_DWELL.1),
            heading: random_flat(rng),
        }
    }

    /// Count down the dwell timer and switch modes when it expires
    pub fn advance(&mut self, dt: f32, rng: &mut ChaCha8Rng) -> MotionMode {
        self.timer -= dt;
        if self.timer <= 0.0 {
            let transition = transition_from(self.mode);
            self.mode = if rng.gen::<f32>() < transition.first_chance {
                transition.first
            } else {
                transition.second
            };
            self.timer = rng.gen_range(transition.dwell.0..transition.dwell.1);
            self.heading = random_flat(rng);
        }
        self.mode
    }
}

/// Random unit vector on the ground plane
pub fn random_flat(rng: &mut ChaCha8Rng) -> Vec3 {
    let v = Vec3::new(rng.gen::<f32>() - 0.5, 0.0, rng.gen::<f32>() - 0.5);
    if v.length_squared() == 0.0 {
        Vec3::X
    } else {
        v.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_starts_idle_with_short_dwell() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let motion = Locomotion::new(&mut rng);
        assert_eq!(motion.mode, MotionMode::Idle);
        assert!((0.4..1.0).contains(&motion.timer));
        assert!((motion.heading.length() - 1.0).abs() < 1e-5);
        assert_eq!(motion.heading.y, 0.0);
    }

    #[test]
    fn test_no_transition_before_timer_expires() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut motion = Locomotion::new(&mut rng);
        let heading = motion.heading;
        assert_eq!(motion.advance(0.1, &mut rng), MotionMode::Idle);
        assert_eq!(motion.heading, heading);
    }

    #[test]
    fn test_idle_leaves_to_walk_or_turn() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let mut motion = Locomotion::new(&mut rng);
            let next = motion.advance(5.0, &mut rng);
            assert_ne!(next, MotionMode::Idle);
            assert!((1.0..2.2).contains(&motion.timer));
        }
    }

    #[test]
    fn test_turn_never_repeats() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            let mut motion = Locomotion {
                mode: MotionMode::Turn,
                timer: 0.0,
                heading: Vec3::X,
            };
            assert_ne!(motion.advance(0.016, &mut rng), MotionMode::Turn);
        }
    }

    #[test]
    fn test_idle_mostly_walks() {
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let walks = (0..2000)
            .filter(|_| {
                let mut motion = Locomotion {
                    mode: MotionMode::Idle,
                    timer: 0.0,
                    heading: Vec3::X,
                };
                motion.advance(0.016, &mut rng) == MotionMode::Walk
            })
            .count();
        assert!((1250..1550).contains(&walks), "walks = {}", walks);
    }
}
