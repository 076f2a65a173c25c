//! Kanban projection of a project's feedback.
//!
//! Items are grouped into [`Stage`] columns by their raw status string. Status
//! changes follow a confirm-then-mutate protocol: the new label is sent to the
//! [`FeedbackApi`] first and the local item only changes once the server
//! accepts it, so a failed update leaves nothing to roll back.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    client::{FeedbackApi, UpdateError, UpdatedStatus},
    stage::Stage,
};

pub const STATUS_UPDATED: &str = "Status updated";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl FeedbackItem {
    pub fn stage(&self) -> Stage {
        Stage::classify(self.status.as_deref().unwrap_or_default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column<'a> {
    pub stage: Stage,
    pub items: Vec<&'a FeedbackItem>,
}

/// One column per stage, always in [`Stage::ALL`] order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Columns<'a>(Vec<Column<'a>>);

impl<'a> Columns<'a> {
    pub fn get(&self, stage: Stage) -> &[&'a FeedbackItem] {
        self.0
            .iter()
            .find(|column| column.stage == stage)
            .map(|column| column.items.as_slice())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<'a>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn group(items: &[FeedbackItem]) -> Columns<'_> {
    let mut columns: Vec<Column> = Stage::ALL
        .into_iter()
        .map(|stage| Column {
            stage,
            items: Vec::new(),
        })
        .collect();

    for item in items {
        // Stage::ALL is indexed by discriminant.
        columns[item.stage() as usize].items.push(item);
    }

    Columns(columns)
}

/// A pending request to move one item into a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub id: String,
    pub label: String,
}

/// User-facing outcome of a status change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

#[derive(Clone, Debug, Default)]
pub struct Board {
    items: Vec<FeedbackItem>,
    dragged: Option<String>,
}

impl Board {
    pub fn new(items: Vec<FeedbackItem>) -> Self {
        Self {
            items,
            dragged: None,
        }
    }

    pub fn items(&self) -> &[FeedbackItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&FeedbackItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn columns(&self) -> Columns<'_> {
        group(&self.items)
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragged.as_deref()
    }

    pub fn begin_drag(&mut self, id: &str) {
        self.dragged = Some(id.to_string());
    }

    pub fn status_change(&self, id: &str, stage: Stage) -> StatusChange {
        StatusChange {
            id: id.to_string(),
            label: stage.label().to_string(),
        }
    }

    /// Settles a status change. Only a confirmed update touches local state,
    /// and changes settle in completion order, so the last one wins.
    pub fn apply(
        &mut self,
        change: &StatusChange,
        outcome: Result<UpdatedStatus, UpdateError>,
    ) -> Notice {
        match outcome {
            Ok(_) => {
                if let Some(item) = self.items.iter_mut().find(|item| item.id == change.id) {
                    item.status = Some(change.label.clone());
                }
                Notice::Success(STATUS_UPDATED.to_string())
            }
            Err(e) => {
                if let UpdateError::Network(reason) = &e {
                    warn!("Status update for {} failed: {reason}", change.id);
                }
                Notice::Failure(e.to_string())
            }
        }
    }

    pub async fn change_status(
        &mut self,
        api: &dyn FeedbackApi,
        slug: &str,
        id: &str,
        stage: Stage,
    ) -> Notice {
        let change = self.status_change(id, stage);
        debug!("Moving {id} to {}", change.label);

        let outcome = api.update_status(slug, &change.id, &change.label).await;
        self.apply(&change, outcome)
    }

    /// Drops the dragged item on a column. `None` when nothing was dragged.
    pub async fn drop_on(
        &mut self,
        api: &dyn FeedbackApi,
        slug: &str,
        stage: Stage,
    ) -> Option<Notice> {
        let id = self.dragged.take()?;

        Some(self.change_status(api, slug, &id, stage).await)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use async_trait::async_trait;

    use super::*;

    /// Replays canned replies in order and records every request.
    #[derive(Default)]
    struct ScriptedApi {
        replies: Mutex<VecDeque<Result<(), UpdateError>>>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedApi {
        fn replying(replies: impl IntoIterator<Item = Result<(), UpdateError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl FeedbackApi for ScriptedApi {
        async fn update_status(
            &self,
            slug: &str,
            id: &str,
            status: &str,
        ) -> Result<UpdatedStatus, UpdateError> {
            self.calls
                .lock()
                .expect("lock")
                .push((slug.to_string(), id.to_string(), status.to_string()));

            let reply = self.replies.lock().expect("lock").pop_front().unwrap_or(Ok(()));
            reply.map(|()| UpdatedStatus {
                id: id.to_string(),
                status: status.to_string(),
            })
        }
    }

    fn item(id: &str, status: Option<&str>) -> FeedbackItem {
        FeedbackItem {
            id: id.to_string(),
            title: format!("Feedback {id}"),
            description: String::new(),
            status: status.map(ToString::to_string),
            upvotes: 0,
            tags: Vec::new(),
        }
    }

    fn sample() -> Vec<FeedbackItem> {
        vec![
            item("1", Some("Done ")),
            item("2", None),
            item("3", Some("In Progress")),
            item("4", Some("weird-status")),
            item("5", Some("reviewing")),
            item("6", Some("planned")),
        ]
    }

    fn ids(columns: &Columns, stage: Stage) -> Vec<String> {
        columns.get(stage).iter().map(|item| item.id.clone()).collect()
    }

    #[test]
    fn test_grouping_partitions_items() {
        let items = sample();
        let columns = group(&items);

        assert_eq!(columns.len(), Stage::ALL.len());
        assert_eq!(ids(&columns, Stage::Pending), ["2", "4"]);
        assert_eq!(ids(&columns, Stage::UnderReview), ["5"]);
        assert_eq!(ids(&columns, Stage::Planned), ["6"]);
        assert_eq!(ids(&columns, Stage::InProgress), ["3"]);
        assert_eq!(ids(&columns, Stage::Completed), ["1"]);

        let total: usize = columns.iter().map(|column| column.items.len()).sum();
        assert_eq!(total, items.len());
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let items = sample();
        assert_eq!(group(&items), group(&items));

        let stages: Vec<Stage> = columns_order(&group(&items));
        assert_eq!(stages, Stage::ALL);
    }

    fn columns_order(columns: &Columns) -> Vec<Stage> {
        columns.iter().map(|column| column.stage).collect()
    }

    #[test]
    fn test_empty_board_still_has_every_column() {
        let board = Board::default();
        let columns = board.columns();

        assert_eq!(columns_order(&columns), Stage::ALL);
        assert!(columns.iter().all(|column| column.items.is_empty()));
    }

    #[test]
    fn test_feedback_item_deserializes_with_defaults() {
        let item: FeedbackItem = serde_json::from_value(serde_json::json!({
            "id": "f-1",
            "title": "Dark mode",
            "tags": [{ "name": "UI", "color": "blue" }]
        }))
        .expect("item");

        assert_eq!(item.status, None);
        assert_eq!(item.stage(), Stage::Pending);
        assert_eq!(item.tags[0].name, "UI");
    }

    #[tokio::test]
    async fn test_confirmed_change_updates_status() {
        let api = ScriptedApi::default();
        let mut board = Board::new(sample());

        let notice = board.change_status(&api, "acme", "2", Stage::InProgress).await;

        assert_eq!(notice, Notice::Success(STATUS_UPDATED.to_string()));
        assert_eq!(api.calls(), [("acme".to_string(), "2".to_string(), "In Progress".to_string())]);
        assert_eq!(board.item("2").and_then(|i| i.status.as_deref()), Some("In Progress"));
        assert_eq!(ids(&board.columns(), Stage::InProgress), ["2", "3"]);
    }

    #[tokio::test]
    async fn test_failed_change_leaves_status_unchanged() {
        let api = ScriptedApi::replying([
            Err(UpdateError::Rejected {
                message: "Feedback not found".to_string(),
                status: 404,
            }),
            Err(UpdateError::Network("connection reset".to_string())),
        ]);
        let mut board = Board::new(sample());
        let before = board.items().to_vec();

        let rejected = board.change_status(&api, "acme", "1", Stage::Pending).await;
        assert_eq!(rejected, Notice::Failure("Feedback not found".to_string()));

        let offline = board.change_status(&api, "acme", "1", Stage::Pending).await;
        assert_eq!(offline, Notice::Failure("Failed to update status".to_string()));

        assert_eq!(board.items(), before.as_slice());
    }

    #[tokio::test]
    async fn test_drop_clears_dragged_item_regardless_of_outcome() {
        let api = ScriptedApi::replying([Err(UpdateError::Network("timeout".to_string()))]);
        let mut board = Board::new(sample());

        board.begin_drag("6");
        assert_eq!(board.dragged(), Some("6"));

        let notice = board.drop_on(&api, "acme", Stage::Completed).await;
        assert!(matches!(notice, Some(Notice::Failure(_))));
        assert_eq!(board.dragged(), None);
        assert_eq!(board.item("6").and_then(|i| i.status.as_deref()), Some("planned"));

        board.begin_drag("6");
        let notice = board.drop_on(&api, "acme", Stage::Completed).await;
        assert_eq!(notice, Some(Notice::Success(STATUS_UPDATED.to_string())));
        assert_eq!(board.dragged(), None);
        assert_eq!(board.item("6").map(FeedbackItem::stage), Some(Stage::Completed));
    }

    #[tokio::test]
    async fn test_drop_without_drag_is_ignored() {
        let api = ScriptedApi::default();
        let mut board = Board::new(sample());

        assert_eq!(board.drop_on(&api, "acme", Stage::Planned).await, None);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_overlapping_changes_resolve_last_writer_wins() {
        let mut board = Board::new(sample());
        let planned = board.status_change("4", Stage::Planned);
        let completed = board.status_change("4", Stage::Completed);

        let confirm = |change: &StatusChange| {
            Ok(UpdatedStatus {
                id: change.id.clone(),
                status: change.label.clone(),
            })
        };

        // The second request completes first.
        board.apply(&completed, confirm(&completed));
        board.apply(&planned, confirm(&planned));

        assert_eq!(board.item("4").map(FeedbackItem::stage), Some(Stage::Planned));
    }
}
