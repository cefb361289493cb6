//! Kanban board view logic.
//!
//! The board is display state only; the server stays authoritative. This
//! module groups tasks into the fixed status columns and translates a
//! finished drag gesture into the status change it implies (if any).

pub mod client;
pub mod poll;

use crate::task::{Status, Task};

/// Column order on the board.
pub const COLUMNS: [Status; 4] = [
    Status::Todo,
    Status::InProgress,
    Status::Blocked,
    Status::Done,
];

/// One rendered column: a status and the tasks in it, in server order.
#[derive(Debug, Clone)]
pub struct Column {
    pub status: Status,
    pub tasks: Vec<Task>,
}

/// Group tasks into the four columns. Archived tasks never appear on the
/// board; within a column the server's ordering is preserved.
pub fn group_tasks(tasks: &[Task]) -> Vec<Column> {
    COLUMNS
        .iter()
        .map(|&status| Column {
            status,
            tasks: tasks
                .iter()
                .filter(|t| t.status == status && !t.archived)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Where a drag gesture started or ended: a column and a position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub column: Status,
    pub index: usize,
}

/// Translate a finished drag gesture into the status to request, if any.
///
/// `None` destination means the card was dropped outside the board. Dropping
/// back on the same position, or elsewhere within the task's own column, is
/// a display-only move and needs no server call.
pub fn drop_status(task: &Task, origin: DropTarget, destination: Option<DropTarget>) -> Option<Status> {
    let dest = destination?;
    if dest == origin {
        return None;
    }
    if dest.column == task.status {
        return None;
    }
    Some(dest.column)
}
