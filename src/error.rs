use chrono::NaiveDate;

/// Error kinds returned by the storage engine.
///
/// Every failure is a plain value matched by the command executor and turned
/// into reply text; nothing here ever aborts a connection. `BlankParameter`
/// is a validation failure and is raised before any lookup happens, so it is
/// a distinct class from the not-found and already-exists conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Parameter \"{0}\" cannot be empty or blank.")]
    BlankParameter(&'static str),

    #[error("User with username \"{0}\" already exists.")]
    UserAlreadyExists(String),

    #[error("User \"{0}\" does not exist.")]
    UserNotFound(String),

    #[error("Wrong password.")]
    WrongPassword,

    #[error("Task with name \"{0}\" already exists in the inbox.")]
    TaskExistsInInbox(String),

    #[error("Task with name \"{0}\" and execution date {1} already exists.")]
    TaskExistsOnDate(String, NaiveDate),

    #[error("Task with name \"{0}\" does not exist in the inbox.")]
    TaskNotFoundInInbox(String),

    #[error("Task with name \"{0}\" and execution date {1} does not exist.")]
    TaskNotFoundOnDate(String, NaiveDate),

    #[error("No tasks with execution date {0} found.")]
    NoTasksForDate(NaiveDate),

    #[error("Collaboration \"{0}\" already exists.")]
    CollaborationAlreadyExists(String),

    #[error("Collaboration \"{0}\" not found for the logged user.")]
    CollaborationNotFound(String),

    #[error("User \"{0}\" is already a member of this collaboration.")]
    AlreadyMember(String),

    #[error("User \"{0}\" is not a member of this collaboration.")]
    NotAMember(String),

    #[error("Task \"{task}\" is already assigned to user \"{user}\".")]
    AlreadyAssigned { task: String, user: String },
}
