use std::fmt;
use std::str::FromStr;

use layered_context::ConfigError;
use serde::{Deserialize, Serialize};

/// Which side of its match a modifier reaches, or a special role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Scope runs from the end of the match to the end of the sentence
    Forward,
    /// Scope runs from the start of the sentence to the start of the match
    Backward,
    #[default]
    Bidirectional,
    /// Never modifies targets; cuts off the scope of other modifiers
    Terminate,
    /// Never modifies targets; shadows shorter modifiers it contains
    Pseudo,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Bidirectional,
        Direction::Terminate,
        Direction::Pseudo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Backward => "BACKWARD",
            Direction::Bidirectional => "BIDIRECTIONAL",
            Direction::Terminate => "TERMINATE",
            Direction::Pseudo => "PSEUDO",
        }
    }

    /// Whether later modifiers can cut this one's scope end.
    pub fn looks_forward(&self) -> bool {
        matches!(self, Direction::Forward | Direction::Bidirectional)
    }

    /// Whether earlier modifiers can cut this one's scope start.
    pub fn looks_backward(&self) -> bool {
        matches!(self, Direction::Backward | Direction::Bidirectional)
    }

    /// False for TERMINATE and PSEUDO.
    pub fn modifies_targets(&self) -> bool {
        !matches!(self, Direction::Terminate | Direction::Pseudo)
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Direction::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == upper)
            .ok_or_else(|| ConfigError::InvalidDirection {
                direction: s.to_string(),
            })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
