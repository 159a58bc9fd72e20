use std::cmp::Reverse;

use crate::models::{PriorityFilter, StatusFilter, Task};

/// Tasks matching both filters, incomplete first, then by descending priority.
/// Ties keep store order.
pub fn visible_tasks(tasks: &[Task], status: StatusFilter, priority: PriorityFilter) -> Vec<Task> {
    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| status.matches(task) && priority.matches(task))
        .cloned()
        .collect();

    // sort_by_key is stable
    visible.sort_by_key(|task| (task.is_completed, Reverse(task.priority.rank())));
    visible
}
