//! Persistence boundary.
//!
//! Handlers only see the [`Store`] trait; `AppState` carries an
//! `Arc<dyn Store>`. Reference expansion (lead → agent, comment → author)
//! happens inside the store, and a reference that no longer resolves comes
//! back as `None` rather than an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use anvaya_core::agents::{NewAgent, SalesAgent};
use anvaya_core::comments::{ExpandedComment, NewComment};
use anvaya_core::id::ObjectId;
use anvaya_core::leads::{ExpandedLead, LeadFields, LeadFilter, LeadSort};
use anvaya_core::tags::{NewTag, Tag};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("duplicate value violates unique constraint '{constraint}'")]
    Duplicate { constraint: String },
    /// A stored row could not be mapped back into domain types.
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// All agents, oldest first.
    async fn list_agents(&self) -> Result<Vec<SalesAgent>, StoreError>;
    async fn get_agent(&self, id: ObjectId) -> Result<Option<SalesAgent>, StoreError>;
    async fn insert_agent(
        &self,
        agent: NewAgent,
        now: DateTime<Utc>,
    ) -> Result<SalesAgent, StoreError>;

    async fn find_leads(
        &self,
        filter: &LeadFilter,
        sort: LeadSort,
    ) -> Result<Vec<ExpandedLead>, StoreError>;
    async fn get_lead(&self, id: ObjectId) -> Result<Option<ExpandedLead>, StoreError>;
    /// Insert with `createdAt = updatedAt = now`; `closedAt` follows
    /// [`LeadFields::closed_at_stamp`].
    async fn insert_lead(
        &self,
        fields: LeadFields,
        now: DateTime<Utc>,
    ) -> Result<ExpandedLead, StoreError>;
    /// Replace every writable field. A `None` closed-at stamp keeps the
    /// stored `closedAt`. Returns `None` when the lead does not exist.
    async fn replace_lead(
        &self,
        id: ObjectId,
        fields: LeadFields,
        now: DateTime<Utc>,
    ) -> Result<Option<ExpandedLead>, StoreError>;
    /// Returns whether a lead was removed. Does not touch comments.
    async fn delete_lead(&self, id: ObjectId) -> Result<bool, StoreError>;

    /// Comments on a lead, newest first.
    async fn find_comments(&self, lead: ObjectId) -> Result<Vec<ExpandedComment>, StoreError>;
    async fn insert_comment(
        &self,
        comment: NewComment,
        now: DateTime<Utc>,
    ) -> Result<ExpandedComment, StoreError>;
    /// Returns the number of comments removed.
    async fn delete_comments_for_lead(&self, lead: ObjectId) -> Result<u64, StoreError>;

    /// All tags, oldest first.
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the name is taken.
    async fn insert_tag(&self, tag: NewTag, now: DateTime<Utc>) -> Result<Tag, StoreError>;
}
