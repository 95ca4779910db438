use taskhub::protocol::{parse_command, CommandType};

#[test]
fn test_parse_simple_command() {
    let cmd = parse_command("login --username=alice --password=secret");
    assert_eq!(cmd.kind, CommandType::Login);
    assert_eq!(cmd.arguments, vec!["username=alice", "password=secret"]);
}

#[test]
fn test_parse_bare_verb() {
    let cmd = parse_command("logout");
    assert_eq!(cmd.kind, CommandType::Logout);
    assert!(cmd.arguments.is_empty());
}

#[test]
fn test_parse_verb_is_case_insensitive() {
    assert_eq!(parse_command("LOGIN --username=a --password=b").kind, CommandType::Login);
    assert_eq!(parse_command("List-Tasks").kind, CommandType::ListTasks);
}

#[test]
fn test_parse_values_may_contain_spaces() {
    let cmd = parse_command("add-task --name=buy milk --description=from the corner store");
    assert_eq!(cmd.kind, CommandType::AddTask);
    assert_eq!(cmd.arguments, vec!["name=buy milk", "description=from the corner store"]);
}

#[test]
fn test_parse_trims_surrounding_whitespace() {
    let cmd = parse_command("  get-task --name=foo  ");
    assert_eq!(cmd.kind, CommandType::GetTask);
    assert_eq!(cmd.arguments, vec!["name=foo"]);
}

#[test]
fn test_parse_unknown_verb_has_no_arguments() {
    let cmd = parse_command("frobnicate --a=b --c=d");
    assert_eq!(cmd.kind, CommandType::Unknown);
    assert!(cmd.arguments.is_empty());
}

#[test]
fn test_parse_every_known_verb() {
    let verbs = [
        ("register", CommandType::Register),
        ("login", CommandType::Login),
        ("logout", CommandType::Logout),
        ("add-task", CommandType::AddTask),
        ("update-task", CommandType::UpdateTask),
        ("delete-task", CommandType::DeleteTask),
        ("get-task", CommandType::GetTask),
        ("list-tasks", CommandType::ListTasks),
        ("list-dashboard", CommandType::ListDashboard),
        ("finish-task", CommandType::FinishTask),
        ("add-collaboration", CommandType::AddCollaboration),
        ("delete-collaboration", CommandType::DeleteCollaboration),
        ("list-collaborations", CommandType::ListCollaborations),
        ("add-user", CommandType::AddUser),
        ("assign-task", CommandType::AssignTask),
        ("list-users", CommandType::ListUsers),
        ("help", CommandType::Help),
        ("disconnect", CommandType::Disconnect),
    ];
    for (verb, expected) in verbs {
        assert_eq!(CommandType::from_verb(verb), expected, "verb {verb}");
    }
}
