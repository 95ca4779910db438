use taskhub::executor::{CommandExecutor, SessionId};
use taskhub::protocol::parse_command;
use taskhub::storage::InMemoryStore;

fn executor() -> CommandExecutor {
    CommandExecutor::new(InMemoryStore::new())
}

fn exec(executor: &mut CommandExecutor, session: SessionId, line: &str) -> String {
    executor.execute(session, &parse_command(line))
}

/// Registers and logs in a user on the given session.
fn login(executor: &mut CommandExecutor, session: SessionId, user: &str, pass: &str) {
    exec(executor, session, &format!("register --username={user} --password={pass}"));
    let reply = exec(executor, session, &format!("login --username={user} --password={pass}"));
    assert!(reply.contains("logged successfully"), "unexpected login reply: {reply}");
}

#[test]
fn test_unknown_command() {
    let mut ex = executor();
    assert_eq!(exec(&mut ex, 0, "command"), "Unknown command. Please enter valid command!");
}

#[test]
fn test_help_is_static_text() {
    let mut ex = executor();
    let reply = exec(&mut ex, 0, "help");
    assert!(reply.starts_with("Possible commands:"));
    assert!(reply.contains("*date format: dd.MM.yyyy"));
}

#[test]
fn test_register_argument_count() {
    let mut ex = executor();
    let expected = "Invalid count of arguments: command \"register\" expects 2 arguments.";
    assert_eq!(exec(&mut ex, 0, "register --username=alice"), expected);
    assert_eq!(exec(&mut ex, 0, "register --a=1 --b=2 --c=3"), expected);
}

#[test]
fn test_register_key_value_format() {
    let mut ex = executor();
    assert_eq!(
        exec(&mut ex, 0, "register --username: alice --password-pw"),
        "Invalid command format. Command expected in \"key=value\" format."
    );
}

#[test]
fn test_register_missing_parameter() {
    let mut ex = executor();
    assert_eq!(
        exec(&mut ex, 0, "register --username=alice --other=value"),
        "Invalid command format. \"password\" parameter not found."
    );
}

#[test]
fn test_register_does_not_log_in() {
    let mut ex = executor();
    assert_eq!(
        exec(&mut ex, 0, "register --username=alice --password=pw"),
        "User \"alice\" added successfully!"
    );
    let reply = exec(&mut ex, 0, "list-tasks");
    assert_eq!(reply, "Tasks cannot be listed. There is no logged user.");
}

#[test]
fn test_register_duplicate_user() {
    let mut ex = executor();
    exec(&mut ex, 0, "register --username=alice --password=pw");
    assert_eq!(
        exec(&mut ex, 0, "register --username=alice --password=pw"),
        "User cannot be added. User with username \"alice\" already exists."
    );
}

#[test]
fn test_login_failures() {
    let mut ex = executor();
    exec(&mut ex, 0, "register --username=alice --password=pw");

    assert_eq!(
        exec(&mut ex, 0, "login --username=ghost --password=pw"),
        "Cannot log in. User \"ghost\" does not exist."
    );
    assert_eq!(
        exec(&mut ex, 0, "login --username=alice --password=wrong"),
        "Cannot log in. Wrong password."
    );
}

#[test]
fn test_second_login_does_not_replace_the_session() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw1");
    exec(&mut ex, 0, "register --username=bob --password=pw2");

    assert_eq!(
        exec(&mut ex, 0, "login --username=bob --password=pw2"),
        "There is already another logged user. Please log out first."
    );

    // Still alice: her tasks are the ones being listed.
    exec(&mut ex, 0, "add-task --name=mine");
    let reply = exec(&mut ex, 0, "get-task --name=mine");
    assert!(reply.starts_with("# mine"));
}

#[test]
fn test_logout_when_not_logged() {
    let mut ex = executor();
    assert_eq!(
        exec(&mut ex, 0, "logout"),
        "User cannot be logged out. There is no logged user."
    );
}

#[test]
fn test_disconnect_always_acknowledges() {
    let mut ex = executor();
    assert_eq!(exec(&mut ex, 0, "disconnect"), "Disconnected from server.");

    login(&mut ex, 0, "alice", "pw");
    assert_eq!(exec(&mut ex, 0, "disconnect"), "Disconnected from server.");

    // The session needs a fresh login afterwards.
    assert_eq!(
        exec(&mut ex, 0, "add-task --name=x"),
        "Task cannot be added. There is no logged user."
    );
}

#[test]
fn test_sessions_are_independent() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw1");

    // A different session is anonymous.
    assert_eq!(
        exec(&mut ex, 1, "add-task --name=x"),
        "Task cannot be added. There is no logged user."
    );
}

#[test]
fn test_add_task_invalid_date_is_distinct_from_missing_name() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");

    assert_eq!(
        exec(&mut ex, 0, "add-task --name=x --date=2099-01-01"),
        "Invalid command format. Unknown date format for the date provided."
    );
    assert_eq!(
        exec(&mut ex, 0, "add-task --description=no name here"),
        "Invalid command format. \"name\" parameter not found."
    );
}

#[test]
fn test_add_task_rejects_date_after_due_date() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    assert_eq!(
        exec(&mut ex, 0, "add-task --name=x --date=02.06.2099 --due-date=01.01.2099"),
        "Invalid command format. The due date cannot be before the date."
    );
}

#[test]
fn test_list_tasks_filters_are_mutually_exclusive() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");

    let expected = "Invalid command format. There are more than one set properties.";
    assert_eq!(exec(&mut ex, 0, "list-tasks --completed=true --date=01.01.2099"), expected);
    assert_eq!(exec(&mut ex, 0, "list-tasks --completed=true --collaboration=team"), expected);
    assert_eq!(exec(&mut ex, 0, "list-tasks --date=01.01.2099 --collaboration=team"), expected);
    assert_eq!(
        exec(&mut ex, 0, "list-tasks --completed=true --date=01.01.2099 --collaboration=team"),
        expected
    );
}

#[test]
fn test_list_tasks_completed_false_counts_as_unset() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    exec(&mut ex, 0, "add-task --name=x --date=01.01.2099");

    // completed=false plus a date is not "more than one set property".
    let reply = exec(&mut ex, 0, "list-tasks --completed=false --date=01.01.2099");
    assert!(reply.contains("# x"), "unexpected reply: {reply}");
}

#[test]
fn test_list_tasks_empty_store() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    assert_eq!(exec(&mut ex, 0, "list-tasks"), "No tasks found!");
}

#[test]
fn test_scenario_register_login_task_lifecycle() {
    let mut ex = executor();
    assert_eq!(
        exec(&mut ex, 0, "register --username=alice --password=pw1"),
        "User \"alice\" added successfully!"
    );
    let reply = exec(&mut ex, 0, "login --username=alice --password=pw1");
    assert!(reply.contains("alice"), "unexpected reply: {reply}");

    assert_eq!(exec(&mut ex, 0, "add-task --name=foo"), "Task \"foo\" successfully added!");
    assert_eq!(
        exec(&mut ex, 0, "get-task --name=foo"),
        "# foo\n    date: null\n    due-date: null\n    description: null\n"
    );

    assert_eq!(exec(&mut ex, 0, "finish-task --name=foo"), "Task \"foo\" finished successfully!");
    assert_eq!(
        exec(&mut ex, 0, "get-task --name=foo"),
        "Task cannot be shown. Task with name \"foo\" does not exist in the inbox."
    );

    let reply = exec(&mut ex, 0, "list-tasks --completed=true");
    assert!(reply.contains("# foo"), "unexpected reply: {reply}");
}

#[test]
fn test_scenario_collaboration_sharing() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw1");

    assert_eq!(
        exec(&mut ex, 0, "add-collaboration --name=team"),
        "Collaboration \"team\" added successfully"
    );
    exec(&mut ex, 0, "register --username=bob --password=pw2");
    assert_eq!(
        exec(&mut ex, 0, "add-user --collaboration=team --user=bob"),
        "User \"bob\" successfully added in collaboration \"team\"."
    );
    exec(&mut ex, 0, "add-task --name=chore");
    assert_eq!(
        exec(&mut ex, 0, "assign-task --collaboration=team --user=bob --task=chore"),
        "Task \"chore\" successfully assigned with user \"bob\"."
    );

    // As bob, on his own session.
    let reply = exec(&mut ex, 1, "login --username=bob --password=pw2");
    assert!(reply.contains("bob"), "unexpected reply: {reply}");

    let reply = exec(&mut ex, 1, "list-users --collaboration=team");
    let members: Vec<&str> = reply
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect();
    assert_eq!(members, vec!["bob"]);

    let reply = exec(&mut ex, 1, "list-tasks --collaboration=team");
    assert!(reply.contains("# chore"), "unexpected reply: {reply}");
}

#[test]
fn test_scenario_dated_task_identity() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");

    assert_eq!(
        exec(&mut ex, 0, "add-task --name=x --date=01.01.2099"),
        "Task \"x\" successfully added!"
    );
    assert_eq!(
        exec(&mut ex, 0, "add-task --name=x --date=01.01.2099"),
        "Task cannot be added. Task with name \"x\" and execution date 2099-01-01 already exists."
    );

    // No date is a different identity.
    assert_eq!(exec(&mut ex, 0, "add-task --name=x"), "Task \"x\" successfully added!");
}

#[test]
fn test_delete_collaboration_severs_members_and_tasks() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw1");
    exec(&mut ex, 0, "register --username=bob --password=pw2");
    exec(&mut ex, 0, "add-collaboration --name=team");
    exec(&mut ex, 0, "add-user --collaboration=team --user=bob");
    exec(&mut ex, 0, "add-task --name=chore");
    exec(&mut ex, 0, "assign-task --collaboration=team --user=bob --task=chore");

    assert_eq!(
        exec(&mut ex, 0, "delete-collaboration --collaboration=team"),
        "Collaboration \"team\" deleted successfully"
    );

    // The shared task is gone from the creator's store as well.
    assert_eq!(exec(&mut ex, 0, "list-tasks"), "No tasks found!");

    let reply = exec(&mut ex, 1, "login --username=bob --password=pw2");
    assert!(reply.contains("bob"));
    assert_eq!(exec(&mut ex, 1, "list-collaborations"), "No collaborations found!");
}

#[test]
fn test_list_collaborations_shows_created_and_assigned() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw1");
    exec(&mut ex, 0, "register --username=bob --password=pw2");
    exec(&mut ex, 0, "add-collaboration --name=team");
    exec(&mut ex, 0, "add-user --collaboration=team --user=bob");

    login(&mut ex, 1, "carol", "pw3");
    exec(&mut ex, 1, "add-collaboration --name=band");
    exec(&mut ex, 1, "add-user --collaboration=band --user=bob");

    let reply = exec(&mut ex, 2, "login --username=bob --password=pw2");
    assert!(reply.contains("bob"));
    let reply = exec(&mut ex, 2, "list-collaborations");
    assert!(reply.contains("team"), "unexpected reply: {reply}");
    assert!(reply.contains("band"), "unexpected reply: {reply}");
}

#[test]
fn test_repeated_key_last_occurrence_wins() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    exec(&mut ex, 0, "add-task --name=first --name=second");

    let reply = exec(&mut ex, 0, "get-task --name=second");
    assert!(reply.starts_with("# second"), "unexpected reply: {reply}");
    assert!(exec(&mut ex, 0, "get-task --name=first").starts_with("Task cannot be shown."));
}

#[test]
fn test_keys_are_case_insensitive() {
    let mut ex = executor();
    exec(&mut ex, 0, "register --USERNAME=alice --Password=pw");
    assert_eq!(
        exec(&mut ex, 0, "login --username=alice --password=pw"),
        "User \"alice\" logged successfully!"
    );
}

#[test]
fn test_update_task_requires_existing_identity() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    assert_eq!(
        exec(&mut ex, 0, "update-task --name=x"),
        "Task cannot be updated. Task with name \"x\" does not exist in the inbox."
    );

    exec(&mut ex, 0, "add-task --name=x");
    assert_eq!(
        exec(&mut ex, 0, "update-task --name=x --description=new words"),
        "Task \"x\" successfully updated!"
    );
    let reply = exec(&mut ex, 0, "get-task --name=x");
    assert!(reply.contains("description: new words"), "unexpected reply: {reply}");
}

#[test]
fn test_list_dashboard_shows_todays_slot() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");

    let today = chrono::Local::now().date_naive().format("%d.%m.%Y").to_string();
    exec(&mut ex, 0, &format!("add-task --name=today-task --date={today}"));

    let reply = exec(&mut ex, 0, "list-dashboard");
    assert!(reply.contains("# today-task"), "unexpected reply: {reply}");
}

#[test]
fn test_list_dashboard_without_todays_slot() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    let reply = exec(&mut ex, 0, "list-dashboard");
    assert!(reply.starts_with("No tasks found."), "unexpected reply: {reply}");
}

#[test]
fn test_finish_task_exact_argument_count() {
    let mut ex = executor();
    login(&mut ex, 0, "alice", "pw");
    assert_eq!(
        exec(&mut ex, 0, "finish-task --name=x --date=01.01.2099"),
        "Invalid count of arguments: command \"finish-task\" expects 1 arguments."
    );
}
