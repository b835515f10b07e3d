mod engine;
mod motivation;
mod settings;

pub use engine::{FocusSession, FocusSessionMachine, FocusStatus, SessionState};
pub use motivation::{pick_motivation, MOTIVATIONAL_MESSAGES};
pub use settings::{FocusSettings, SessionType};
