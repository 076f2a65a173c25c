//! # Roadmap
//!
//! Kanban view over a project's feedback.
//!
//!
//!
//! ## Stages
//!
//! | Id | Label | Raw statuses |
//! |---|---|---|
//! | `pending` | Pending | empty, `pending`, `backlog`, anything unrecognised |
//! | `under_review` | Under Review | `under review`, `under_review`, `reviewing` |
//! | `planned` | Planned | `planned` |
//! | `in_progress` | In Progress | `in progress`, `in_progress`, `inprogress` |
//! | `completed` | Completed | `completed`, `done` |
//!
//! Matching is case-insensitive and ignores surrounding whitespace.
//!
//!
//!
//! ## Status updates
//! 1. Resolve the target stage's label
//! 2. `PATCH /api/v1/projects/{slug}/feedback/{id}` with the label
//! 3. Confirmed? Replace the item's status locally, no refetch
//! 4. Failed? Surface the message, local state stays as it was
//!
//! Updates are not serialized. Two quick moves of the same item settle in
//! whatever order the server answers, the last one wins.
pub mod board;
pub mod client;
pub mod stage;

pub use board::{Board, Column, Columns, FeedbackItem, Notice, StatusChange, Tag, group};
pub use client::{FeedbackApi, HttpFeedbackApi, UpdateError, UpdatedStatus};
pub use stage::Stage;
