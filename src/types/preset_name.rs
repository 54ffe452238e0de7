// ABOUTME: Validated preset name type.
// ABOUTME: Preset names double as container names, so they follow DNS label rules.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PresetNameError {
    #[error("preset name cannot be empty")]
    Empty,

    #[error("preset name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("preset name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("preset name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("preset name must be lowercase")]
    NotLowercase,

    #[error("invalid character in preset name: '{0}'")]
    InvalidChar(char),
}

/// Name of a deployment preset. Doubles as the name of the workload
/// container on the remote instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresetName(String);

impl PresetName {
    pub fn new(value: &str) -> Result<Self, PresetNameError> {
        if value.is_empty() {
            return Err(PresetNameError::Empty);
        }

        if value.len() > 63 {
            return Err(PresetNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(PresetNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(PresetNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(PresetNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(PresetNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for PresetName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for PresetName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PresetName::new(&s).map_err(serde::de::Error::custom)
    }
}
