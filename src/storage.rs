use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::models::{Collaboration, Task};

/// The in-memory store behind every command.
///
/// Tasks without a date live in the per-user `inbox`, keyed by name; dated
/// tasks live in the per-user `calendar`, keyed by date and then name. The
/// split keeps "all tasks on date X" a direct lookup instead of a scan.
///
/// Tasks are shared `Rc` values: assigning a task into a collaboration stores
/// the same allocation the owner's index holds, and deleting the
/// collaboration removes those tasks from the owner's index again. An update
/// allocates a fresh `Rc`, so collaborations keep observing the value they
/// captured at assignment time.
///
/// A member's view of a collaboration is recorded as the owner's username and
/// resolved through `created_collaborations`, so members always read the live
/// collaboration and nothing dangles after a delete.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InMemoryStore {
    users: HashMap<String, String>,
    inbox: HashMap<String, HashMap<String, Rc<Task>>>,
    calendar: HashMap<String, HashMap<NaiveDate, HashMap<String, Rc<Task>>>>,
    completed: HashMap<String, HashSet<Rc<Task>>>,
    created_collaborations: HashMap<String, HashMap<String, Collaboration>>,
    /// member -> collaboration name -> owner username
    assigned_collaborations: HashMap<String, HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and creates their empty indexes.
    pub fn add_user(&mut self, username: &str, password: &str) -> Result<(), StoreError> {
        validate(username, "username")?;
        validate(password, "password")?;

        if self.users.contains_key(username) {
            return Err(StoreError::UserAlreadyExists(username.to_owned()));
        }

        self.users.insert(username.to_owned(), password.to_owned());
        self.inbox.insert(username.to_owned(), HashMap::new());
        self.calendar.insert(username.to_owned(), HashMap::new());
        self.completed.insert(username.to_owned(), HashSet::new());
        self.created_collaborations.insert(username.to_owned(), HashMap::new());
        self.assigned_collaborations.insert(username.to_owned(), HashMap::new());
        Ok(())
    }

    /// An unknown user and a wrong password are distinct failures.
    pub fn check_password(&self, username: &str, password: &str) -> Result<(), StoreError> {
        validate(username, "username")?;
        validate(password, "password")?;

        match self.users.get(username) {
            None => Err(StoreError::UserNotFound(username.to_owned())),
            Some(stored) if stored != password => Err(StoreError::WrongPassword),
            Some(_) => Ok(()),
        }
    }

    pub fn add_task(&mut self, username: &str, task: Task) -> Result<(), StoreError> {
        self.check_user_exists(username)?;

        match task.date {
            None => {
                let inbox = self.inbox.entry(username.to_owned()).or_default();
                if inbox.contains_key(&task.name) {
                    return Err(StoreError::TaskExistsInInbox(task.name));
                }
                inbox.insert(task.name.clone(), Rc::new(task));
            }
            Some(date) => {
                let slot = self
                    .calendar
                    .entry(username.to_owned())
                    .or_default()
                    .entry(date)
                    .or_default();
                if slot.contains_key(&task.name) {
                    return Err(StoreError::TaskExistsOnDate(task.name, date));
                }
                slot.insert(task.name.clone(), Rc::new(task));
            }
        }
        Ok(())
    }

    /// Replaces the stored value at the task's `(name, date)` identity. The
    /// previous allocation stays alive wherever a collaboration captured it.
    pub fn update_task(&mut self, username: &str, task: Task) -> Result<(), StoreError> {
        self.check_user_exists(username)?;

        match task.date {
            None => {
                let inbox = self.inbox.entry(username.to_owned()).or_default();
                if !inbox.contains_key(&task.name) {
                    return Err(StoreError::TaskNotFoundInInbox(task.name));
                }
                inbox.insert(task.name.clone(), Rc::new(task));
            }
            Some(date) => {
                let slot = self
                    .calendar
                    .get_mut(username)
                    .and_then(|calendar| calendar.get_mut(&date));
                match slot {
                    Some(slot) if slot.contains_key(&task.name) => {
                        slot.insert(task.name.clone(), Rc::new(task));
                    }
                    _ => return Err(StoreError::TaskNotFoundOnDate(task.name, date)),
                }
            }
        }
        Ok(())
    }

    /// Removes and returns the stored task. A dated delete leaves the date
    /// slot in place even when it becomes empty; `list_tasks_for_date`
    /// distinguishes a missing slot from an empty one.
    pub fn delete_task(
        &mut self,
        username: &str,
        name: &str,
        date: Option<NaiveDate>,
    ) -> Result<Rc<Task>, StoreError> {
        validate(name, "name")?;
        self.check_user_exists(username)?;

        match date {
            None => self
                .inbox
                .get_mut(username)
                .and_then(|inbox| inbox.remove(name))
                .ok_or_else(|| StoreError::TaskNotFoundInInbox(name.to_owned())),
            Some(date) => self
                .calendar
                .get_mut(username)
                .and_then(|calendar| calendar.get_mut(&date))
                .and_then(|slot| slot.remove(name))
                .ok_or_else(|| StoreError::TaskNotFoundOnDate(name.to_owned(), date)),
        }
    }

    pub fn get_task(
        &self,
        username: &str,
        name: &str,
        date: Option<NaiveDate>,
    ) -> Result<Rc<Task>, StoreError> {
        validate(name, "name")?;
        self.check_user_exists(username)?;

        match date {
            None => self
                .inbox
                .get(username)
                .and_then(|inbox| inbox.get(name))
                .cloned()
                .ok_or_else(|| StoreError::TaskNotFoundInInbox(name.to_owned())),
            Some(date) => self
                .calendar
                .get(username)
                .and_then(|calendar| calendar.get(&date))
                .and_then(|slot| slot.get(name))
                .cloned()
                .ok_or_else(|| StoreError::TaskNotFoundOnDate(name.to_owned(), date)),
        }
    }

    /// Every active task of the user: calendar entries first, then the inbox.
    pub fn list_tasks(&self, username: &str) -> Result<Vec<Rc<Task>>, StoreError> {
        self.check_user_exists(username)?;

        let mut tasks = Vec::new();
        if let Some(calendar) = self.calendar.get(username) {
            for slot in calendar.values() {
                tasks.extend(slot.values().cloned());
            }
        }
        if let Some(inbox) = self.inbox.get(username) {
            tasks.extend(inbox.values().cloned());
        }
        Ok(tasks)
    }

    /// Fails when the date was never indexed for this user; a slot emptied by
    /// deletion yields an empty list instead.
    pub fn list_tasks_for_date(
        &self,
        username: &str,
        date: NaiveDate,
    ) -> Result<Vec<Rc<Task>>, StoreError> {
        self.check_user_exists(username)?;

        self.calendar
            .get(username)
            .and_then(|calendar| calendar.get(&date))
            .map(|slot| slot.values().cloned().collect())
            .ok_or(StoreError::NoTasksForDate(date))
    }

    /// Union of the tasks assigned to every member of the named
    /// collaboration. The name is resolved among the user's created
    /// collaborations first, then the ones they were added to.
    pub fn list_tasks_for_collaboration(
        &self,
        username: &str,
        collaboration: &str,
    ) -> Result<Vec<Rc<Task>>, StoreError> {
        validate(collaboration, "collaboration")?;
        self.check_user_exists(username)?;

        self.find_collaboration(username, collaboration)
            .map(Collaboration::tasks)
            .ok_or_else(|| StoreError::CollaborationNotFound(collaboration.to_owned()))
    }

    pub fn list_completed_tasks(&self, username: &str) -> Result<Vec<Rc<Task>>, StoreError> {
        self.check_user_exists(username)?;

        Ok(self
            .completed
            .get(username)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Today's calendar slot.
    pub fn list_dashboard(&self, username: &str) -> Result<Vec<Rc<Task>>, StoreError> {
        self.list_tasks_for_date(username, Local::now().date_naive())
    }

    /// Moves a task from the inbox into the completed set. Only the inbox is
    /// consulted: a dated task cannot be finished through this path.
    pub fn finish_task(&mut self, username: &str, name: &str) -> Result<(), StoreError> {
        validate(name, "name")?;
        self.check_user_exists(username)?;

        let task = self.delete_task(username, name, None)?;
        self.completed.entry(username.to_owned()).or_default().insert(task);
        Ok(())
    }

    pub fn add_collaboration(&mut self, username: &str, name: &str) -> Result<(), StoreError> {
        validate(name, "collaboration")?;
        self.check_user_exists(username)?;

        let created = self.created_collaborations.entry(username.to_owned()).or_default();
        if created.contains_key(name) {
            return Err(StoreError::CollaborationAlreadyExists(name.to_owned()));
        }
        created.insert(name.to_owned(), Collaboration::new(name));
        Ok(())
    }

    /// Deletes a collaboration the user created. Every member loses their
    /// view of it, and every task assigned through it is deleted from the
    /// creator's inbox or calendar (the tasks are shared, not copied).
    pub fn delete_collaboration(&mut self, username: &str, name: &str) -> Result<(), StoreError> {
        validate(name, "collaboration")?;
        self.check_user_exists(username)?;

        let collaboration = match self
            .created_collaborations
            .get_mut(username)
            .and_then(|created| created.remove(name))
        {
            Some(collaboration) => collaboration,
            None => return Err(StoreError::CollaborationNotFound(name.to_owned())),
        };

        for member in collaboration.users() {
            if let Some(assigned) = self.assigned_collaborations.get_mut(member) {
                assigned.remove(name);
            }
        }

        for task in collaboration.tasks() {
            match task.date {
                None => {
                    if let Some(inbox) = self.inbox.get_mut(username) {
                        inbox.remove(&task.name);
                    }
                }
                Some(date) => {
                    if let Some(slot) = self
                        .calendar
                        .get_mut(username)
                        .and_then(|calendar| calendar.get_mut(&date))
                    {
                        slot.remove(&task.name);
                    }
                }
            }
        }

        Ok(())
    }

    /// Collaborations the user created plus the ones they were added to.
    pub fn collaborations(&self, username: &str) -> Result<Vec<&Collaboration>, StoreError> {
        self.check_user_exists(username)?;

        let mut found: Vec<&Collaboration> = Vec::new();
        if let Some(created) = self.created_collaborations.get(username) {
            found.extend(created.values());
        }
        if let Some(assigned) = self.assigned_collaborations.get(username) {
            found.extend(assigned.iter().filter_map(|(name, owner)| {
                self.created_collaborations
                    .get(owner)
                    .and_then(|created| created.get(name))
            }));
        }
        Ok(found)
    }

    /// Adds a registered user to a collaboration the caller created and
    /// records the collaboration in the new member's assigned view.
    pub fn add_user_to_collaboration(
        &mut self,
        username: &str,
        collaboration: &str,
        member: &str,
    ) -> Result<(), StoreError> {
        validate(collaboration, "collaboration")?;
        validate(member, "user")?;
        self.check_user_exists(username)?;

        if !self.owns_collaboration(username, collaboration) {
            return Err(StoreError::CollaborationNotFound(collaboration.to_owned()));
        }
        if !self.users.contains_key(member) {
            return Err(StoreError::UserNotFound(member.to_owned()));
        }

        if let Some(found) = self
            .created_collaborations
            .get_mut(username)
            .and_then(|created| created.get_mut(collaboration))
        {
            found.add_user(member)?;
        }

        // A same-named collaboration from another owner overwrites the view.
        self.assigned_collaborations
            .entry(member.to_owned())
            .or_default()
            .insert(collaboration.to_owned(), username.to_owned());
        Ok(())
    }

    /// Assigns one of the caller's own tasks to a member of a collaboration
    /// the caller created. The collaboration stores the same `Rc` the
    /// caller's index holds.
    pub fn assign_task(
        &mut self,
        username: &str,
        collaboration: &str,
        member: &str,
        task_name: &str,
        date: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        validate(collaboration, "collaboration")?;
        validate(member, "user")?;
        validate(task_name, "task")?;
        self.check_user_exists(username)?;

        if !self.owns_collaboration(username, collaboration) {
            return Err(StoreError::CollaborationNotFound(collaboration.to_owned()));
        }
        if !self.users.contains_key(member) {
            return Err(StoreError::UserNotFound(member.to_owned()));
        }

        let task = self.get_task(username, task_name, date)?;

        match self
            .created_collaborations
            .get_mut(username)
            .and_then(|created| created.get_mut(collaboration))
        {
            Some(found) => found.assign_task(member, task),
            None => Err(StoreError::CollaborationNotFound(collaboration.to_owned())),
        }
    }

    /// Members of the named collaboration, resolved like
    /// [`Self::list_tasks_for_collaboration`].
    pub fn list_users_in_collaboration(
        &self,
        username: &str,
        collaboration: &str,
    ) -> Result<Vec<String>, StoreError> {
        validate(collaboration, "collaboration")?;
        self.check_user_exists(username)?;

        self.find_collaboration(username, collaboration)
            .map(|found| found.users().map(str::to_owned).collect())
            .ok_or_else(|| StoreError::CollaborationNotFound(collaboration.to_owned()))
    }

    fn find_collaboration(&self, username: &str, name: &str) -> Option<&Collaboration> {
        if let Some(found) = self
            .created_collaborations
            .get(username)
            .and_then(|created| created.get(name))
        {
            return Some(found);
        }

        self.assigned_collaborations
            .get(username)
            .and_then(|assigned| assigned.get(name))
            .and_then(|owner| self.created_collaborations.get(owner))
            .and_then(|created| created.get(name))
    }

    fn owns_collaboration(&self, username: &str, name: &str) -> bool {
        self.created_collaborations
            .get(username)
            .is_some_and(|created| created.contains_key(name))
    }

    fn check_user_exists(&self, username: &str) -> Result<(), StoreError> {
        validate(username, "username")?;
        if !self.users.contains_key(username) {
            return Err(StoreError::UserNotFound(username.to_owned()));
        }
        Ok(())
    }
}

fn validate(value: &str, parameter: &'static str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::BlankParameter(parameter));
    }
    Ok(())
}

/// Returns the default path of the snapshot file (`store.json`).
///
/// The path is determined in the following order:
/// 1. `TASKHUB_DB` environment variable.
/// 2. `~/.local/share/taskhub/store.json` (on Linux).
/// 3. `./store.json` (fallback).
pub fn default_store_path() -> PathBuf {
    std::env::var("TASKHUB_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("taskhub");
        if !p.exists() {
            let _ = fs::create_dir_all(&p);
        }
        p.push("store.json");
        p
    })
}

/// Loads the snapshot written at the previous shutdown.
///
/// A missing, unreadable or corrupt file starts an empty store; the server
/// never refuses to come up over a bad snapshot.
pub fn load_store(path: &Path) -> InMemoryStore {
    if !path.exists() {
        return InMemoryStore::new();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("could not read snapshot {}: {err}", path.display());
            return InMemoryStore::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(store) => store,
        Err(err) => {
            warn!("snapshot {} is not valid JSON, starting empty: {err}", path.display());
            InMemoryStore::new()
        }
    }
}

/// Writes the whole store as pretty-printed JSON, overwriting the file.
///
/// Shared tasks serialize as independent copies; after a reload the cascade
/// on collaboration delete still works because it removes tasks by their
/// `(name, date)` identity, not by pointer.
pub fn save_store(path: &Path, store: &InMemoryStore) -> io::Result<()> {
    let contents = serde_json::to_string_pretty(store).map_err(io::Error::other)?;
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    f.write_all(contents.as_bytes())?;
    Ok(())
}
