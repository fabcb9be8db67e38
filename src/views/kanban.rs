use crate::models::{ApartmentRecord, Status};
use serde::Serialize;

/// The four status columns, each in collection order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KanbanBoard {
    pub active: Vec<ApartmentRecord>,
    pub contacted: Vec<ApartmentRecord>,
    pub visited: Vec<ApartmentRecord>,
    pub irrelevant: Vec<ApartmentRecord>,
}

impl KanbanBoard {
    pub fn column(&self, status: Status) -> &[ApartmentRecord] {
        match status {
            Status::Active => self.active.as_slice(),
            Status::Contacted => self.contacted.as_slice(),
            Status::Visited => self.visited.as_slice(),
            Status::Irrelevant => self.irrelevant.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        Status::ALL.iter().map(|s| self.column(*s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition records by status. Unrecognized statuses are already read as
/// `active`, so every record lands in exactly one column.
pub fn group_by_status(records: &[ApartmentRecord]) -> KanbanBoard {
    let mut board = KanbanBoard::default();
    for record in records {
        let column = match record.status {
            Status::Active => &mut board.active,
            Status::Contacted => &mut board.contacted,
            Status::Visited => &mut board.visited,
            Status::Irrelevant => &mut board.irrelevant,
        };
        column.push(record.clone());
    }
    board
}
