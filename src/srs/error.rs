/// Errors raised by the scheduling core.
///
/// All of them indicate a bug upstream (bad input, corrupted data, bad
/// deployment config); none is worth retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
  InvalidGrade(String),
  InvalidState(String),
  ConfigurationError(String),
}

impl std::fmt::Display for SchedulerError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SchedulerError::InvalidGrade(grade) => write!(f, "Invalid grade: {}", grade),
      SchedulerError::InvalidState(reason) => write!(f, "Invalid item state: {}", reason),
      SchedulerError::ConfigurationError(reason) => {
        write!(f, "Scheduler configuration error: {}", reason)
      }
    }
  }
}

impl std::error::Error for SchedulerError {}
