//! # Taskhub
//!
//! A networked, multi-user task manager. Taskhub runs a single-threaded TCP
//! server that speaks a line-oriented text protocol: clients register, log
//! in, manage a personal inbox and calendar of tasks, and share tasks with
//! other users through named collaborations.
//!
//! ## Protocol
//!
//! One read is one command, one write is one reply. Commands look like
//!
//! ```text
//! register --username=alice --password=secret
//! login --username=alice --password=secret
//! add-task --name=groceries --date=24.12.2026 --description=milk and eggs
//! list-tasks --date=24.12.2026
//! finish-task --name=groceries
//! ```
//!
//! The delimiter between the verb and each argument is the literal `" --"`,
//! so values may contain spaces. Dates use the `dd.MM.yyyy` pattern. Send
//! `help` for the full command list.
//!
//! ## Tasks
//!
//! A task is identified by its name and optional execution date. Undated
//! tasks live in the user's *inbox*, dated tasks in their *calendar*;
//! `list-dashboard` shows today's calendar slot. Tasks assigned into a
//! collaboration are shared with its members, and deleting the collaboration
//! also removes those tasks from the owner's store.
//!
//! ## Data Storage
//!
//! The whole store is kept in memory and written as a JSON snapshot on
//! shutdown, by default to your local data directory (override with the
//! `TASKHUB_DB` environment variable or `--data-file`). Typing `stop` on the
//! server console shuts the process down cleanly.

pub mod error;
pub mod executor;
pub mod models;
pub mod protocol;
pub mod server;
pub mod storage;
