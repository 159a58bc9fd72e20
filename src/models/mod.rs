pub mod filter;
pub mod task;

pub use filter::{PriorityFilter, StatusFilter};
pub use task::{Priority, Task, TaskDraft, TaskPatch};
