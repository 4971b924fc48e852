use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

/// Lifecycle of one call
///
/// `Ringing → Answered → Greeting → Listening ⇄ Processing ⇄ Responding`,
/// ending in `Terminated`, or `Failed` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Ringing,
    Answered,
    Greeting,
    Listening,
    Processing,
    Responding,
    Terminated,
    Failed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Terminated | CallState::Failed)
    }

    pub fn can_transition_to(&self, next: CallState) -> bool {
        use CallState::*;

        if self.is_terminal() {
            return false;
        }

        matches!(
            (*self, next),
            (_, Terminated)
                | (_, Failed)
                | (Ringing, Answered)
                | (Answered, Greeting)
                | (Greeting, Listening)
                | (Listening, Processing)
                | (Processing, Responding)
                | (Processing, Listening)
                | (Responding, Listening)
        )
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Ringing => "ringing",
            CallState::Answered => "answered",
            CallState::Greeting => "greeting",
            CallState::Listening => "listening",
            CallState::Processing => "processing",
            CallState::Responding => "responding",
            CallState::Terminated => "terminated",
            CallState::Failed => "failed",
        };
        f.write_str(name)
    }
}
