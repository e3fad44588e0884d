//! Dense integer ids for task ids.
//!
//! The schedule passes index plain vectors by `TaskIdInt` instead of hashing
//! strings. Ids are handed out in first-seen order, so interning a graph's
//! tasks in insertion order keeps that order in the integer space.

use rustc_hash::FxHashMap;

use crate::models::TaskId;

/// Interned task id (u32 for compact storage).
pub type TaskIdInt = u32;

/// Two-way mapping between task ids and `0..len`.
#[derive(Debug, Clone, Default)]
pub struct TaskIdInterner {
    to_int: FxHashMap<TaskId, TaskIdInt>,
    from_int: Vec<TaskId>,
}

impl TaskIdInterner {
    /// Intern every id of an iterator, in order. Repeats keep their first id.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a TaskId>) -> Self {
        let ids = ids.into_iter();
        let capacity = ids.size_hint().0;
        let mut interner = Self {
            to_int: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_int: Vec::with_capacity(capacity),
        };
        for id in ids {
            interner.intern(id);
        }
        interner
    }

    /// Integer id of `task_id`, assigning the next free one if unseen.
    pub fn intern(&mut self, task_id: &str) -> TaskIdInt {
        if let Some(&id) = self.to_int.get(task_id) {
            return id;
        }
        let id = self.from_int.len() as TaskIdInt;
        self.from_int.push(task_id.to_string());
        self.to_int.insert(task_id.to_string(), id);
        id
    }

    #[inline]
    pub fn get(&self, task_id: &str) -> Option<TaskIdInt> {
        self.to_int.get(task_id).copied()
    }

    #[inline]
    pub fn resolve(&self, id: TaskIdInt) -> Option<&str> {
        self.from_int.get(id as usize).map(String::as_str)
    }

    /// Task ids in integer order.
    pub fn ids(&self) -> &[TaskId] {
        &self.from_int
    }

    pub fn len(&self) -> usize {
        self.from_int.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_int.is_empty()
    }
}
