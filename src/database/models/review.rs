use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// Approval state shared by income and expenditure records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub status: ReviewStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
}

impl Default for Review {
    fn default() -> Self {
        Self {
            status: ReviewStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewDecision {
    pub note: Option<String>,
}

impl Review {
    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Settle a pending review. Fails with the current status when already decided.
    pub fn decide(
        &mut self,
        status: ReviewStatus,
        reviewer: Uuid,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ReviewStatus> {
        if !self.is_pending() {
            return Err(self.status);
        }
        self.status = status;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        self.review_note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(())
    }
}

/// Records carrying a `Review`
pub trait Reviewable {
    fn review(&self) -> &Review;
    fn review_mut(&mut self) -> &mut Review;
    fn touch(&mut self, now: DateTime<Utc>);
}
