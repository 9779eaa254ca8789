//! Strand orientation for genomic features.

use std::fmt;

use crate::error::Error;

/// Strand orientation of a genomic feature relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Strand {
    Sense = 0,
    Antisense = 1,
}

impl Strand {
    #[must_use]
    pub fn is_antisense(self) -> bool {
        self == Self::Antisense
    }

    #[must_use]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Strand {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sense),
            1 => Ok(Self::Antisense),
            _ => Err(Error::Parse(format!("invalid strand byte: {value}"))),
        }
    }
}

impl std::str::FromStr for Strand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Sense),
            "-" => Ok(Self::Antisense),
            _ => Err(Error::Parse(format!("invalid strand symbol: '{s}'"))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sense => write!(f, "+"),
            Self::Antisense => write!(f, "-"),
        }
    }
}
