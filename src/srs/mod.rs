pub mod daily_limit;
pub mod error;
pub mod queue;
pub mod state_machine;

pub use daily_limit::{new_cards_introduced_today, start_of_day};
pub use error::SchedulerError;
pub use queue::{build_queue, QueueStats};
pub use state_machine::apply_grade;
