use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of a post's caption.
///
/// Hinglish is Hindi written together with English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Hinglish,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::English => write!(f, "English"),
            Self::Hinglish => write!(f, "Hinglish"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "English" => Ok(Self::English),
            "Hinglish" => Ok(Self::Hinglish),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}
