use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Belt ranks tracked by the dojo, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BeltRank {
    #[serde(rename = "brown")]
    Brown,
    #[serde(rename = "sr_brown")]
    SrBrown,
    #[serde(rename = "red")]
    Red,
    #[serde(rename = "sr_red")]
    SrRed,
    #[serde(rename = "black_1")]
    Black1,
    #[serde(rename = "black_2")]
    Black2,
    #[serde(rename = "black_3")]
    Black3,
    #[serde(rename = "black_4")]
    Black4,
    #[serde(rename = "black_5")]
    Black5,
}

#[derive(Debug, Error)]
#[error("unknown belt rank: {0}")]
pub struct UnknownRank(pub String);

impl BeltRank {
    pub const ALL: [BeltRank; 9] = [
        Self::Brown,
        Self::SrBrown,
        Self::Red,
        Self::SrRed,
        Self::Black1,
        Self::Black2,
        Self::Black3,
        Self::Black4,
        Self::Black5,
    ];

    /// Storage key, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brown => "brown",
            Self::SrBrown => "sr_brown",
            Self::Red => "red",
            Self::SrRed => "sr_red",
            Self::Black1 => "black_1",
            Self::Black2 => "black_2",
            Self::Black3 => "black_3",
            Self::Black4 => "black_4",
            Self::Black5 => "black_5",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Brown => "Brown",
            Self::SrBrown => "Sr. Brown",
            Self::Red => "Red",
            Self::SrRed => "Sr. Red",
            Self::Black1 => "1st Dan Black Belt",
            Self::Black2 => "2nd Dan Black Belt",
            Self::Black3 => "3rd Dan Black Belt",
            Self::Black4 => "4th Dan Black Belt",
            Self::Black5 => "5th Dan Black Belt",
        }
    }
}

impl FromStr for BeltRank {
    type Err = UnknownRank;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rank| rank.as_str() == s)
            .ok_or_else(|| UnknownRank(s.to_string()))
    }
}

impl fmt::Display for BeltRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
