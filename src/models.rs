use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Rejected date/due-date combinations when building a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimeIntervalError {
    #[error("The date cannot be after the due date.")]
    DateAfterDueDate,
    #[error("The due date cannot be before the date.")]
    DueDateBeforeDate,
}

/// A single task. Immutable once built; an update replaces the stored value.
///
/// Identity is the `(name, date)` pair: two tasks with the same name but
/// different dates (including no date at all) are distinct. Equality and
/// hashing follow identity, not the full field set.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Task {
    /// The name of the task.
    pub name: String,
    /// Execution date; tasks without one live in the inbox.
    pub date: Option<NaiveDate>,
    /// Optional deadline, never before `date`.
    pub due_date: Option<NaiveDate>,
    /// Free-form description.
    pub description: Option<String>,
}

impl Task {
    pub fn builder(name: impl Into<String>) -> TaskBuilder {
        TaskBuilder {
            name: name.into(),
            date: None,
            due_date: None,
            description: None,
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.date == other.date
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.date.hash(state);
    }
}

impl fmt::Display for Task {
    /// The fixed multi-line block sent over the wire; absent fields print as
    /// `null` and dates print ISO (`YYYY-MM-DD`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.name)?;
        writeln!(f, "    date: {}", display_opt(&self.date))?;
        writeln!(f, "    due-date: {}", display_opt(&self.due_date))?;
        writeln!(f, "    description: {}", display_opt(&self.description))
    }
}

fn display_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    }
}

/// Builder for [`Task`]. The date setters validate the interval in either
/// order of application.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    name: String,
    date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    description: Option<String>,
}

impl TaskBuilder {
    pub fn date(mut self, date: NaiveDate) -> Result<Self, TimeIntervalError> {
        if matches!(self.due_date, Some(due) if due < date) {
            return Err(TimeIntervalError::DateAfterDueDate);
        }
        self.date = Some(date);
        Ok(self)
    }

    pub fn due_date(mut self, due_date: NaiveDate) -> Result<Self, TimeIntervalError> {
        if matches!(self.date, Some(date) if due_date < date) {
            return Err(TimeIntervalError::DueDateBeforeDate);
        }
        self.due_date = Some(due_date);
        Ok(self)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Task {
        Task {
            name: self.name,
            date: self.date,
            due_date: self.due_date,
            description: self.description,
        }
    }
}

/// A named group owned by one user: a member set plus the tasks assigned to
/// each member.
///
/// Assigned tasks are the same `Rc<Task>` values held by the owner's inbox or
/// calendar, so the collaboration observes whatever value was indexed at
/// assignment time. Equality is by name only; the contents mutate.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Collaboration {
    name: String,
    users: HashSet<String>,
    tasks: HashMap<String, HashSet<Rc<Task>>>,
}

impl Collaboration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: HashSet::new(),
            tasks: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Usernames of every member, in no particular order.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(String::as_str)
    }

    /// Union of the tasks assigned to every member.
    pub fn tasks(&self) -> Vec<Rc<Task>> {
        self.tasks.values().flatten().cloned().collect()
    }

    pub fn add_user(&mut self, username: &str) -> Result<(), StoreError> {
        if !self.users.insert(username.to_owned()) {
            return Err(StoreError::AlreadyMember(username.to_owned()));
        }
        Ok(())
    }

    pub fn assign_task(&mut self, username: &str, task: Rc<Task>) -> Result<(), StoreError> {
        if !self.users.contains(username) {
            return Err(StoreError::NotAMember(username.to_owned()));
        }

        let assigned = self.tasks.entry(username.to_owned()).or_default();
        if assigned.contains(&task) {
            return Err(StoreError::AlreadyAssigned {
                task: task.name.clone(),
                user: username.to_owned(),
            });
        }
        assigned.insert(task);
        Ok(())
    }
}

impl PartialEq for Collaboration {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Collaboration {}
