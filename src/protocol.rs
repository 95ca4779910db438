//! The line-oriented command grammar: `<verb>( --key=value)*`.
//!
//! The delimiter between the verb and each argument, and between arguments,
//! is the literal `" --"`, so values may contain spaces but not the delimiter
//! sequence itself. Splitting a token into key and value happens later, in
//! the executor, because only it knows which keys a command accepts.

/// Delimiter separating the verb from the arguments and the arguments from
/// each other.
pub const ARGUMENT_DELIMITER: &str = " --";

/// The one accepted date pattern, `dd.MM.yyyy`.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Parameter keys recognized by the protocol. Matching is case-insensitive.
pub mod param {
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const NAME: &str = "name";
    pub const DATE: &str = "date";
    pub const DUE_DATE: &str = "due-date";
    pub const DESCRIPTION: &str = "description";
    pub const COMPLETED: &str = "completed";
    pub const COLLABORATION: &str = "collaboration";
    pub const USER: &str = "user";
    pub const TASK: &str = "task";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Register,
    Login,
    Logout,
    AddTask,
    UpdateTask,
    DeleteTask,
    GetTask,
    ListTasks,
    ListDashboard,
    FinishTask,
    AddCollaboration,
    DeleteCollaboration,
    ListCollaborations,
    AddUser,
    AssignTask,
    ListUsers,
    Help,
    Disconnect,
    Unknown,
}

impl CommandType {
    /// Maps a verb to its command type, case-insensitively. Anything
    /// unrecognized is [`CommandType::Unknown`]; this never fails.
    pub fn from_verb(verb: &str) -> Self {
        match verb.to_ascii_lowercase().as_str() {
            "register" => Self::Register,
            "login" => Self::Login,
            "logout" => Self::Logout,
            "add-task" => Self::AddTask,
            "update-task" => Self::UpdateTask,
            "delete-task" => Self::DeleteTask,
            "get-task" => Self::GetTask,
            "list-tasks" => Self::ListTasks,
            "list-dashboard" => Self::ListDashboard,
            "finish-task" => Self::FinishTask,
            "add-collaboration" => Self::AddCollaboration,
            "delete-collaboration" => Self::DeleteCollaboration,
            "list-collaborations" => Self::ListCollaborations,
            "add-user" => Self::AddUser,
            "assign-task" => Self::AssignTask,
            "list-users" => Self::ListUsers,
            "help" => Self::Help,
            "disconnect" => Self::Disconnect,
            _ => Self::Unknown,
        }
    }
}

/// A parsed command: the verb's type plus the raw `key=value` argument
/// tokens, in the order they appeared. Callers look arguments up by key,
/// never by position.
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandType,
    pub arguments: Vec<String>,
}

/// Splits one raw input line into a [`Command`].
///
/// The caller is expected to have rejected blank input already; an
/// unrecognized verb still parses, as [`CommandType::Unknown`] with no
/// arguments.
pub fn parse_command(input: &str) -> Command {
    let mut tokens = input.trim().split(ARGUMENT_DELIMITER);

    let kind = match tokens.next() {
        Some(verb) => CommandType::from_verb(verb.trim()),
        None => CommandType::Unknown,
    };

    let arguments = match kind {
        CommandType::Unknown => Vec::new(),
        _ => tokens.map(str::to_owned).collect(),
    };

    Command { kind, arguments }
}
