use rand::seq::SliceRandom;
use rand::Rng;

/// Messages shown after a completed focus session.
pub const MOTIVATIONAL_MESSAGES: [&str; 6] = [
    "Take a deep breath. You've earned this break.",
    "Rest is not idleness. Recharge your mind.",
    "Your eyes will thank you for this break.",
    "Hydrate and stretch. Your body needs care too.",
    "Great work! A break makes you more productive.",
    "Step away from the screen. Clarity awaits.",
];

pub fn pick_motivation<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MOTIVATIONAL_MESSAGES
        .choose(rng)
        .copied()
        .unwrap_or(MOTIVATIONAL_MESSAGES[0])
}
