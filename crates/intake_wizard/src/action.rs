use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display, Deserialize)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Quit,
    Error(String),
    /// State changed; redraw on the next render tick.
    Update,
    Submit,
    /// The spawned dispatch call completed; the session holds the outcome.
    SubmissionFinished,
}
