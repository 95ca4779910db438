use std::collections::HashMap;
use std::rc::Rc;

use chrono::NaiveDate;

use crate::models::{Task, TimeIntervalError};
use crate::protocol::{param, Command, CommandType, DATE_FORMAT};
use crate::storage::InMemoryStore;

/// Identifier of one client connection, assigned sequentially on accept.
pub type SessionId = u64;

const REGISTER_ARGUMENTS: usize = 2;
const LOGIN_ARGUMENTS: usize = 2;
const ADD_USER_ARGUMENTS: usize = 2;
const ASSIGN_TASK_ARGUMENTS: usize = 3;
const MIN_ARGUMENTS: usize = 1;

const SECTION_SEPARATOR: &str = "##################################################";
const INVALID_FORMAT_PREFIX: &str = "Invalid command format. ";
const UNKNOWN_COMMAND_MESSAGE: &str = "Unknown command. Please enter valid command!";
const DISCONNECT_MESSAGE: &str = "Disconnected from server.";
const NO_LOGGED_USER_MESSAGE: &str = "There is no logged user.";

const HELP_MESSAGE: &str = "\
Possible commands:
    << register --username=<username> --password=<password>
    << login --username=<username> --password=<password>
    << logout
    << add-task --name=<task name> --date=<date*> --due-date=<due-date*> --description=<description>
    << update-task --name=<task name> --date=<date*> --due-date=<due-date*> --description=<description>
    << delete-task --name=<task name>
    << delete-task --name=<task name> --date=<date*>
    << get-task --name=<task name>
    << get-task --name=<task name> --date=<date*>
    << list-tasks
    << list-tasks --completed=true
    << list-tasks --date=<date*>
    << list-tasks --collaboration=<collaboration name>
    << list-dashboard
    << finish-task --name=<name>
    << add-collaboration --name=<collaboration name>
    << delete-collaboration --collaboration=<collaboration name>
    << list-collaborations
    << add-user --collaboration=<collaboration name> --user=<username>
    << assign-task --collaboration=<collaboration name> --user=<username> --task=<name>
    << assign-task --collaboration=<collaboration name> --user=<username> --task=<name> --date=<date*>
    << list-users --collaboration=<collaboration name>
    *date format: dd.MM.yyyy
";

/// Argument-level failures, detected before storage is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum FormatError {
    #[error("Command expected in \"key=value\" format.")]
    NotKeyValue,
    #[error("\"{0}\" parameter not found.")]
    MissingParameter(&'static str),
    #[error("Unknown date format for the date provided.")]
    UnknownDateFormat,
    #[error(transparent)]
    Interval(#[from] TimeIntervalError),
}

/// Validates and dispatches parsed commands against the store.
///
/// Also owns the per-connection login state: one entry per live session id,
/// threaded through the server loop rather than kept in any global. Every
/// outcome, success or failure, is reply text; nothing in here closes a
/// connection.
pub struct CommandExecutor {
    store: InMemoryStore,
    logged_users: HashMap<SessionId, String>,
}

impl CommandExecutor {
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            logged_users: HashMap::new(),
        }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn execute(&mut self, session: SessionId, command: &Command) -> String {
        let args = command.arguments.as_slice();
        match command.kind {
            CommandType::Register => self.register(args),
            CommandType::Login => self.login(session, args),
            CommandType::Logout => self.logout(session),
            CommandType::AddTask => self.add_task(session, args),
            CommandType::UpdateTask => self.update_task(session, args),
            CommandType::DeleteTask => self.delete_task(session, args),
            CommandType::GetTask => self.get_task(session, args),
            CommandType::ListTasks => self.list_tasks(session, args),
            CommandType::ListDashboard => self.list_dashboard(session),
            CommandType::FinishTask => self.finish_task(session, args),
            CommandType::AddCollaboration => self.add_collaboration(session, args),
            CommandType::DeleteCollaboration => self.delete_collaboration(session, args),
            CommandType::ListCollaborations => self.list_collaborations(session),
            CommandType::AddUser => self.add_user(session, args),
            CommandType::AssignTask => self.assign_task(session, args),
            CommandType::ListUsers => self.list_users(session, args),
            CommandType::Help => HELP_MESSAGE.to_string(),
            CommandType::Disconnect => self.disconnect(session),
            CommandType::Unknown => UNKNOWN_COMMAND_MESSAGE.to_string(),
        }
    }

    /// Forgets a session's login state. Called on disconnect and when the
    /// server drops a connection on EOF or an I/O error.
    pub fn drop_session(&mut self, session: SessionId) {
        self.logged_users.remove(&session);
    }

    fn current_user(&self, session: SessionId) -> Option<String> {
        self.logged_users.get(&session).cloned()
    }

    fn register(&mut self, args: &[String]) -> String {
        if args.len() != REGISTER_ARGUMENTS {
            return invalid_args_count("register", "2");
        }

        let username = match required(param::USERNAME, args) {
            Ok(username) => username,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let password = match required(param::PASSWORD, args) {
            Ok(password) => password,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };

        match self.store.add_user(&username, &password) {
            Ok(()) => format!("User \"{username}\" added successfully!"),
            Err(err) => format!("User cannot be added. {err}"),
        }
    }

    fn login(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() != LOGIN_ARGUMENTS {
            return invalid_args_count("login", "2");
        }

        let username = match required(param::USERNAME, args) {
            Ok(username) => username,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let password = match required(param::PASSWORD, args) {
            Ok(password) => password,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };

        if self.logged_users.contains_key(&session) {
            return "There is already another logged user. Please log out first.".to_string();
        }

        match self.store.check_password(&username, &password) {
            Ok(()) => {
                self.logged_users.insert(session, username.clone());
                format!("User \"{username}\" logged successfully!")
            }
            Err(err) => format!("Cannot log in. {err}"),
        }
    }

    fn logout(&mut self, session: SessionId) -> String {
        match self.logged_users.remove(&session) {
            Some(username) => format!("User \"{username}\" successfully logged out."),
            None => format!("User cannot be logged out. {NO_LOGGED_USER_MESSAGE}"),
        }
    }

    /// Logs the session out if it was authenticated; the acknowledgement is
    /// sent either way.
    fn disconnect(&mut self, session: SessionId) -> String {
        self.drop_session(session);
        DISCONNECT_MESSAGE.to_string()
    }

    fn add_task(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() < MIN_ARGUMENTS {
            return invalid_args_count("add-task", "at least 1");
        }

        let task = match parse_task(args) {
            Ok(task) => task,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Task cannot be added. {NO_LOGGED_USER_MESSAGE}");
        };

        let name = task.name.clone();
        match self.store.add_task(&user, task) {
            Ok(()) => format!("Task \"{name}\" successfully added!"),
            Err(err) => format!("Task cannot be added. {err}"),
        }
    }

    fn update_task(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() < MIN_ARGUMENTS {
            return invalid_args_count("update-task", "at least 1");
        }

        let task = match parse_task(args) {
            Ok(task) => task,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Task cannot be updated. {NO_LOGGED_USER_MESSAGE}");
        };

        let name = task.name.clone();
        match self.store.update_task(&user, task) {
            Ok(()) => format!("Task \"{name}\" successfully updated!"),
            Err(err) => format!("Task cannot be updated. {err}"),
        }
    }

    fn delete_task(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() < MIN_ARGUMENTS {
            return invalid_args_count("delete-task", "at least 1");
        }

        let (name, date) = match parse_name_and_date(args) {
            Ok(parsed) => parsed,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Task cannot be deleted. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.delete_task(&user, &name, date) {
            Ok(_) => format!("Task \"{name}\" deleted successfully!"),
            Err(err) => format!("Task cannot be deleted. {err}"),
        }
    }

    fn get_task(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() < MIN_ARGUMENTS {
            return invalid_args_count("get-task", "at least 1");
        }

        let (name, date) = match parse_name_and_date(args) {
            Ok(parsed) => parsed,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Task cannot be shown. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.get_task(&user, &name, date) {
            Ok(task) => task.to_string(),
            Err(err) => format!("Task cannot be shown. {err}"),
        }
    }

    fn list_tasks(&mut self, session: SessionId, args: &[String]) -> String {
        let completed = match parse_argument(param::COMPLETED, args) {
            Ok(value) => value.is_some_and(|v| v.eq_ignore_ascii_case("true")),
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let date = match parse_date(param::DATE, args) {
            Ok(date) => date,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let collaboration = match parse_argument(param::COLLABORATION, args) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };

        let Some(user) = self.current_user(session) else {
            return format!("Tasks cannot be listed. {NO_LOGGED_USER_MESSAGE}");
        };

        let tasks = match (completed, date, &collaboration) {
            (false, None, None) => self.store.list_tasks(&user),
            (true, None, None) => self.store.list_completed_tasks(&user),
            (false, Some(date), None) => self.store.list_tasks_for_date(&user, date),
            (false, None, Some(collaboration)) => {
                self.store.list_tasks_for_collaboration(&user, collaboration)
            }
            _ => {
                return format!("{INVALID_FORMAT_PREFIX}There are more than one set properties.");
            }
        };

        match tasks {
            Ok(tasks) if tasks.is_empty() => "No tasks found!".to_string(),
            Ok(tasks) => render_tasks(&tasks),
            Err(err) => format!("Tasks cannot be listed. {err}"),
        }
    }

    fn list_dashboard(&mut self, session: SessionId) -> String {
        let Some(user) = self.current_user(session) else {
            return format!("No tasks found. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.list_dashboard(&user) {
            Ok(tasks) => render_tasks(&tasks),
            Err(err) => format!("No tasks found. {err}"),
        }
    }

    fn finish_task(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() != MIN_ARGUMENTS {
            return invalid_args_count("finish-task", "1");
        }

        let name = match required(param::NAME, args) {
            Ok(name) => name,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Task cannot be finished. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.finish_task(&user, &name) {
            Ok(()) => format!("Task \"{name}\" finished successfully!"),
            Err(err) => format!("Task cannot be finished. {err}"),
        }
    }

    fn add_collaboration(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() != MIN_ARGUMENTS {
            return invalid_args_count("add-collaboration", "1");
        }

        let name = match required(param::NAME, args) {
            Ok(name) => name,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Collaboration cannot be created. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.add_collaboration(&user, &name) {
            Ok(()) => format!("Collaboration \"{name}\" added successfully"),
            Err(err) => format!("Collaboration cannot be created. {err}"),
        }
    }

    fn delete_collaboration(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() != MIN_ARGUMENTS {
            return invalid_args_count("delete-collaboration", "1");
        }

        let name = match required(param::COLLABORATION, args) {
            Ok(name) => name,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Collaboration cannot be deleted. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.delete_collaboration(&user, &name) {
            Ok(()) => format!("Collaboration \"{name}\" deleted successfully"),
            Err(err) => format!("Collaboration cannot be deleted. {err}"),
        }
    }

    fn list_collaborations(&mut self, session: SessionId) -> String {
        let Some(user) = self.current_user(session) else {
            return format!("Cannot list collaborations. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.collaborations(&user) {
            Ok(collaborations) if collaborations.is_empty() => {
                "No collaborations found!".to_string()
            }
            Ok(collaborations) => render_lines(collaborations.iter().map(|c| c.name())),
            Err(err) => format!("Cannot list collaborations. {err}"),
        }
    }

    fn add_user(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() != ADD_USER_ARGUMENTS {
            return invalid_args_count("add-user", "2");
        }

        let collaboration = match required(param::COLLABORATION, args) {
            Ok(collaboration) => collaboration,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let member = match required(param::USER, args) {
            Ok(member) => member,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Cannot add user to collaboration. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.add_user_to_collaboration(&user, &collaboration, &member) {
            Ok(()) => format!(
                "User \"{member}\" successfully added in collaboration \"{collaboration}\"."
            ),
            Err(err) => format!("Cannot add user to collaboration. {err}"),
        }
    }

    fn assign_task(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() < ASSIGN_TASK_ARGUMENTS {
            return invalid_args_count("assign-task", "at least 3");
        }

        let collaboration = match required(param::COLLABORATION, args) {
            Ok(collaboration) => collaboration,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let member = match required(param::USER, args) {
            Ok(member) => member,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let task = match required(param::TASK, args) {
            Ok(task) => task,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let date = match parse_date(param::DATE, args) {
            Ok(date) => date,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Cannot assign task. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.assign_task(&user, &collaboration, &member, &task, date) {
            Ok(()) => format!("Task \"{task}\" successfully assigned with user \"{member}\"."),
            Err(err) => format!("Cannot assign task. {err}"),
        }
    }

    fn list_users(&mut self, session: SessionId, args: &[String]) -> String {
        if args.len() != MIN_ARGUMENTS {
            return invalid_args_count("list-users", "1");
        }

        let collaboration = match required(param::COLLABORATION, args) {
            Ok(collaboration) => collaboration,
            Err(err) => return format!("{INVALID_FORMAT_PREFIX}{err}"),
        };
        let Some(user) = self.current_user(session) else {
            return format!("Cannot list users in this collaboration. {NO_LOGGED_USER_MESSAGE}");
        };

        match self.store.list_users_in_collaboration(&user, &collaboration) {
            Ok(users) if users.is_empty() => "No users found in this collaboration.".to_string(),
            Ok(users) => render_lines(users.iter().map(String::as_str)),
            Err(err) => format!("Cannot list users in this collaboration. {err}"),
        }
    }
}

fn invalid_args_count(command: &str, expected: &str) -> String {
    format!("Invalid count of arguments: command \"{command}\" expects {expected} arguments.")
}

/// Scans the raw tokens for `key`, case-insensitively. Every token must split
/// into exactly one key and one value; the last occurrence of a key wins.
fn parse_argument(key: &str, args: &[String]) -> Result<Option<String>, FormatError> {
    let mut value = None;

    for arg in args {
        let tokens: Vec<&str> = arg.trim().split('=').collect();
        if tokens.len() != 2 {
            return Err(FormatError::NotKeyValue);
        }
        if tokens[0].eq_ignore_ascii_case(key) {
            value = Some(tokens[1].to_owned());
        }
    }

    Ok(value)
}

fn required(key: &'static str, args: &[String]) -> Result<String, FormatError> {
    parse_argument(key, args)?
        .filter(|value| !value.trim().is_empty())
        .ok_or(FormatError::MissingParameter(key))
}

fn parse_date(key: &str, args: &[String]) -> Result<Option<NaiveDate>, FormatError> {
    match parse_argument(key, args)? {
        Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| FormatError::UnknownDateFormat),
        None => Ok(None),
    }
}

/// Builds a task from `name`, `date`, `due-date` and `description` tokens.
/// Date parse failures surface before the missing-name check, mirroring the
/// scan order of the arguments.
fn parse_task(args: &[String]) -> Result<Task, FormatError> {
    let name = parse_argument(param::NAME, args)?;
    let date = parse_date(param::DATE, args)?;
    let due_date = parse_date(param::DUE_DATE, args)?;
    let description = parse_argument(param::DESCRIPTION, args)?;

    let name = name
        .filter(|n| !n.trim().is_empty())
        .ok_or(FormatError::MissingParameter(param::NAME))?;

    let mut builder = Task::builder(name);
    if let Some(date) = date {
        builder = builder.date(date)?;
    }
    if let Some(due_date) = due_date {
        builder = builder.due_date(due_date)?;
    }
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        builder = builder.description(description);
    }

    Ok(builder.build())
}

fn parse_name_and_date(args: &[String]) -> Result<(String, Option<NaiveDate>), FormatError> {
    let name = parse_argument(param::NAME, args)?;
    let date = parse_date(param::DATE, args)?;

    let name = name
        .filter(|n| !n.trim().is_empty())
        .ok_or(FormatError::MissingParameter(param::NAME))?;

    Ok((name, date))
}

fn render_tasks(tasks: &[Rc<Task>]) -> String {
    let mut out = String::new();
    out.push_str(SECTION_SEPARATOR);
    out.push('\n');
    for task in tasks {
        out.push_str(&task.to_string());
    }
    out.push_str(SECTION_SEPARATOR);
    out.push('\n');
    out
}

fn render_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    out.push_str(SECTION_SEPARATOR);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(SECTION_SEPARATOR);
    out.push('\n');
    out
}
