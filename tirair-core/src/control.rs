//! Actuator command vocabulary
//!
//! The presentation layer maps each operator action to exactly one of four
//! command strings published on the control channel. Commands are
//! fire-and-forget: no acknowledgment, no retry, and no ordering relative to
//! sensor ingestion. The core never reacts to them; this type only pins the
//! vocabulary that publishers and field controllers agree on.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// One actuator command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Start irrigation
    OpenSprinklers,
    /// Stop irrigation
    CloseSprinklers,
    /// Open the rain-collection tank lid
    OpenLid,
    /// Close the rain-collection tank lid
    CloseLid,
}

impl ControlCommand {
    /// Every command, in dashboard order
    pub const ALL: [ControlCommand; 4] = [
        Self::OpenSprinklers,
        Self::CloseSprinklers,
        Self::OpenLid,
        Self::CloseLid,
    ];

    /// Wire spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenSprinklers => "open_sprinklers",
            Self::CloseSprinklers => "close_sprinklers",
            Self::OpenLid => "open_lid",
            Self::CloseLid => "close_lid",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown command string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown control command `{0}` (expected one of open_sprinklers, close_sprinklers, open_lid, close_lid)")]
pub struct UnknownCommand(pub String);

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_is_fixed() {
        let wire: Vec<_> = ControlCommand::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(wire, ["open_sprinklers", "close_sprinklers", "open_lid", "close_lid"]);
    }

    #[test]
    fn parse_matches_display() {
        for cmd in ControlCommand::ALL {
            assert_eq!(cmd.to_string().parse::<ControlCommand>().unwrap(), cmd);
        }
        assert!("OPEN_LID".parse::<ControlCommand>().is_err());
        assert!("water".parse::<ControlCommand>().is_err());
    }

    #[test]
    fn serde_uses_wire_spelling() {
        let json = serde_json::to_string(&ControlCommand::CloseSprinklers).unwrap();
        assert_eq!(json, "\"close_sprinklers\"");
    }
}
