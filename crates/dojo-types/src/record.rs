use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_LABEL_LEN: usize = 200;

/// Largest hours or score value a record may carry.
pub const MAX_AMOUNT: i64 = i32::MAX as i64;

/// The kinds of dated progress facts kept per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Attendance,
    Tournament,
    LeadershipHours,
    ServiceHours,
    TeachingHours,
    PracticalScore,
}

/// Whether a record field may, must, or must not be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Forbidden,
    Optional,
    Required,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordFieldError {
    #[error("{kind} records require {field}")]
    Missing { kind: RecordKind, field: &'static str },
    #[error("{kind} records do not take {field}")]
    Unexpected { kind: RecordKind, field: &'static str },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: i64 },
}

#[derive(Debug, Error)]
#[error("unknown record kind: {0}")]
pub struct UnknownKind(pub String);

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        Self::Attendance,
        Self::Tournament,
        Self::LeadershipHours,
        Self::ServiceHours,
        Self::TeachingHours,
        Self::PracticalScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Tournament => "tournament",
            Self::LeadershipHours => "leadership_hours",
            Self::ServiceHours => "service_hours",
            Self::TeachingHours => "teaching_hours",
            Self::PracticalScore => "practical_score",
        }
    }

    /// URL segment used by the record collection routes.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Attendance => "attendances",
            Self::Tournament => "tournaments",
            Self::LeadershipHours => "leadership-hours",
            Self::ServiceHours => "service-hours",
            Self::TeachingHours => "teaching-hours",
            Self::PracticalScore => "practical-scores",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    pub fn label_rule(&self) -> FieldRule {
        match self {
            Self::Tournament | Self::ServiceHours => FieldRule::Required,
            Self::LeadershipHours => FieldRule::Optional,
            Self::Attendance | Self::TeachingHours | Self::PracticalScore => FieldRule::Forbidden,
        }
    }

    pub fn amount_rule(&self) -> FieldRule {
        match self {
            Self::Attendance | Self::Tournament => FieldRule::Forbidden,
            _ => FieldRule::Required,
        }
    }

    fn label_name(&self) -> &'static str {
        match self {
            Self::Tournament => "a tournament name",
            _ => "an event",
        }
    }

    fn amount_name(&self) -> &'static str {
        match self {
            Self::PracticalScore => "a score",
            _ => "hours",
        }
    }

    /// Check the optional fields of a record against this kind's rules.
    pub fn validate(&self, label: Option<&str>, amount: Option<i64>) -> Result<(), RecordFieldError> {
        let label = label.map(str::trim).filter(|l| !l.is_empty());

        match (self.label_rule(), label) {
            (FieldRule::Required, None) => {
                return Err(RecordFieldError::Missing { kind: *self, field: self.label_name() });
            }
            (FieldRule::Forbidden, Some(_)) => {
                return Err(RecordFieldError::Unexpected { kind: *self, field: self.label_name() });
            }
            (_, Some(l)) if l.chars().count() > MAX_LABEL_LEN => {
                return Err(RecordFieldError::TooLong { field: "label", max: MAX_LABEL_LEN });
            }
            _ => {}
        }

        match (self.amount_rule(), amount) {
            (FieldRule::Required, None) => {
                Err(RecordFieldError::Missing { kind: *self, field: self.amount_name() })
            }
            (FieldRule::Forbidden, Some(_)) => {
                Err(RecordFieldError::Unexpected { kind: *self, field: self.amount_name() })
            }
            (_, Some(a)) if a < 0 => Err(RecordFieldError::Negative { field: self.amount_name() }),
            (_, Some(a)) if a > MAX_AMOUNT => {
                Err(RecordFieldError::TooLarge { field: self.amount_name(), max: MAX_AMOUNT })
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for RecordKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
