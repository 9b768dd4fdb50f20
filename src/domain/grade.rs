use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::srs::SchedulerError;

/// Learner response to a presented item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
  Again = 0,
  Hard = 2,
  Good = 3,
  Easy = 4,
}

impl Grade {
  pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

  /// Display/sorting weight. Scheduling dispatches on the variant, never on this.
  pub fn weight(&self) -> u8 {
    *self as u8
  }

  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::Again),
      2 => Some(Self::Hard),
      3 => Some(Self::Good),
      4 => Some(Self::Easy),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }
}

impl FromStr for Grade {
  type Err = SchedulerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "again" => Ok(Self::Again),
      "hard" => Ok(Self::Hard),
      "good" => Ok(Self::Good),
      "easy" => Ok(Self::Easy),
      other => Err(SchedulerError::InvalidGrade(other.to_string())),
    }
  }
}

/// Grade as it arrives from a caller: either the name or the numeric weight.
///
/// Any other JSON value still deserializes (as `Other`) so that it is
/// rejected as an invalid grade rather than as a malformed body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GradeInput {
  Weight(i64),
  Name(String),
  Other(serde_json::Value),
}

impl Default for GradeInput {
  fn default() -> Self {
    GradeInput::Other(serde_json::Value::Null)
  }
}

impl TryFrom<GradeInput> for Grade {
  type Error = SchedulerError;

  fn try_from(input: GradeInput) -> Result<Self, Self::Error> {
    match input {
      GradeInput::Weight(w) => u8::try_from(w)
        .ok()
        .and_then(Grade::from_u8)
        .ok_or_else(|| SchedulerError::InvalidGrade(w.to_string())),
      GradeInput::Name(name) => name.to_lowercase().parse(),
      GradeInput::Other(value) => Err(SchedulerError::InvalidGrade(value.to_string())),
    }
  }
}
