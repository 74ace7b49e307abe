//! Group: a named, caller-managed set of device ids for bulk actions.
//!
//! Groups have a one-line text form meant to be edited by hand:
//!
//! ```text
//! GROUP <id> "<name>" <member-id> <member-id> ...
//! ```
//!
//! Parsing tolerates any run of whitespace between tokens; [`Display`]
//! always writes single spaces and quotes the name, so parsing a normalised
//! line and writing it back is byte-identical.
//!
//! [`Display`]: std::fmt::Display

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, GroupId};

const KEYWORD: &str = "GROUP";

/// A named collection of device ids.
///
/// Member order is preserved for round-tripping but carries no meaning for
/// fan-out. Members may reference devices that no longer exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    #[serde(rename = "ID")]
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceId>,
}

/// Why a `GROUP` line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupParseError {
    #[error("group name must be enclosed in a single pair of double quotes")]
    UnquotedName,

    #[error("group id is missing")]
    MissingId,

    #[error("not a group configuration, expected GROUP got '{0}'")]
    NotAGroup(String),

    #[error("invalid group id '{0}'")]
    InvalidGroupId(String),

    #[error("invalid device id '{0}'")]
    InvalidDeviceId(String),

    #[error("group name {0:?} cannot contain double quotes or line breaks")]
    UnwritableName(String),
}

impl Group {
    /// Check that the group can be written as a single line and read back.
    ///
    /// # Errors
    ///
    /// Returns [`GroupParseError::UnwritableName`] when the name contains a
    /// double quote or a line break.
    pub fn check_name(&self) -> Result<(), GroupParseError> {
        if self.name.contains(['"', '\n', '\r']) {
            return Err(GroupParseError::UnwritableName(self.name.clone()));
        }
        Ok(())
    }
}

impl FromStr for Group {
    type Err = GroupParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let sections: Vec<&str> = line.split('"').collect();
        let [head, name, tail] = sections.as_slice() else {
            return Err(GroupParseError::UnquotedName);
        };

        let words: Vec<&str> = head.split_whitespace().collect();
        let [keyword, id] = words.as_slice() else {
            return Err(GroupParseError::MissingId);
        };
        if *keyword != KEYWORD {
            return Err(GroupParseError::NotAGroup((*keyword).to_string()));
        }
        let id = id
            .parse::<GroupId>()
            .map_err(|_| GroupParseError::InvalidGroupId((*id).to_string()))?;

        let devices = tail
            .split_whitespace()
            .map(|word| {
                word.parse::<DeviceId>()
                    .map_err(|_| GroupParseError::InvalidDeviceId(word.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            name: (*name).to_string(),
            devices,
        })
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KEYWORD} {} \"{}\"", self.id, self.name)?;
        for device in &self.devices {
            write!(f, " {device}")?;
        }
        Ok(())
    }
}
