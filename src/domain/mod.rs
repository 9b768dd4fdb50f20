pub mod grade;
pub mod item;
pub mod review_log;

pub use grade::{Grade, GradeInput};
pub use item::{Direction, ItemState, ReviewItem};
pub use review_log::ReviewLog;
