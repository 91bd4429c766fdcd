use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::agents::UNKNOWN_AGENT;
use crate::id::ObjectId;
use crate::validation::{ValidationErrors, Validator};

/// A comment on a lead. Owned by the lead: deleting the lead deletes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: ObjectId,
    pub lead: ObjectId,
    pub comment_text: String,
    pub author: ObjectId,
    pub created_at: DateTime<Utc>,
}

/// A comment with the author's display name resolved, if it still resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedComment {
    pub comment: Comment,
    pub author_name: Option<String>,
}

/// Request to add a comment to a lead
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[schema(example = "Followed up by phone, waiting on budget approval.")]
    pub comment_text: Option<String>,
    /// Authoring agent ID (24 hex characters)
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub lead: ObjectId,
    pub comment_text: String,
    pub author: ObjectId,
}

impl CreateCommentRequest {
    /// Validate the body together with the lead id taken from the path.
    pub fn validate(&self, lead_id: &str) -> Result<NewComment, ValidationErrors> {
        let mut v = Validator::new();
        let lead = lead_id.parse::<ObjectId>().ok();
        if lead.is_none() {
            v.summarize("Invalid lead ID.");
            v.reject(
                "id",
                "Invalid lead ID.",
                Some(serde_json::Value::String(lead_id.to_string())),
            );
        }
        let comment_text = v.required_str("commentText", self.comment_text.as_deref());
        let author = v.object_id("author", self.author.as_deref());

        match (lead, comment_text, author) {
            (Some(lead), Some(comment_text), Some(author)) if v.is_clean() => Ok(NewComment {
                lead,
                comment_text,
                author,
            }),
            _ => Err(v.into_errors()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: ObjectId,
    pub comment_text: String,
    /// Author display name, or "Unknown"
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<ExpandedComment> for CommentResponse {
    fn from(expanded: ExpandedComment) -> Self {
        Self {
            id: expanded.comment.id,
            comment_text: expanded.comment.comment_text,
            author: expanded
                .author_name
                .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
            created_at: expanded.comment.created_at,
        }
    }
}
