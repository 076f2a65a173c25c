use std::fmt;

/// Fixed, ordered pipeline a feedback item moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Pending,
    UnderReview,
    Planned,
    InProgress,
    Completed,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Pending,
        Stage::UnderReview,
        Stage::Planned,
        Stage::InProgress,
        Stage::Completed,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::UnderReview => "under_review",
            Stage::Planned => "planned",
            Stage::InProgress => "in_progress",
            Stage::Completed => "completed",
        }
    }

    /// Status string stored on a feedback item once it lands in this stage.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Pending => "Pending",
            Stage::UnderReview => "Under Review",
            Stage::Planned => "Planned",
            Stage::InProgress => "In Progress",
            Stage::Completed => "Completed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Stage::Pending => "⏳",
            Stage::UnderReview => "👀",
            Stage::Planned => "📅",
            Stage::InProgress => "⚙️",
            Stage::Completed => "✅",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Stage::Pending => "yellow",
            Stage::UnderReview => "orange",
            Stage::Planned => "blue",
            Stage::InProgress => "purple",
            Stage::Completed => "green",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.id() == id)
    }

    /// Maps any raw status onto a stage. Total: unknown statuses are pending.
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "under review" | "under_review" | "reviewing" => Stage::UnderReview,
            "planned" => Stage::Planned,
            "in progress" | "in_progress" | "inprogress" => Stage::InProgress,
            "completed" | "done" => Stage::Completed,
            _ => Stage::Pending,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
