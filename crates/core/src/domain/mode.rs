use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Pipeline variant. Chosen once when an agent is built and never changed for
/// the lifetime of that agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Silly,
    Serious,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Silly, Mode::Serious];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silly => "silly",
            Self::Serious => "serious",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silly" => Ok(Self::Silly),
            "serious" => Ok(Self::Serious),
            other => Err(DomainError::UnsupportedMode(other.to_string())),
        }
    }
}
