//! In-process store used by the router tests. Mirrors `PgStore` semantics,
//! including the absence of foreign keys and the unique tag name.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use anvaya_core::agents::{AgentRef, NewAgent, SalesAgent};
use anvaya_core::comments::{Comment, ExpandedComment, NewComment};
use anvaya_core::id::ObjectId;
use anvaya_core::leads::{ExpandedLead, Lead, LeadFields, LeadFilter, LeadSort};
use anvaya_core::tags::{NewTag, Tag};

use super::{Store, StoreError};

#[derive(Default)]
struct Collections {
    agents: Vec<SalesAgent>,
    leads: Vec<Lead>,
    comments: Vec<Comment>,
    tags: Vec<Tag>,
}

impl Collections {
    fn agent_ref(&self, id: ObjectId) -> Option<AgentRef> {
        self.agents.iter().find(|a| a.id == id).map(AgentRef::from)
    }

    fn expand_lead(&self, lead: &Lead) -> ExpandedLead {
        ExpandedLead {
            lead: lead.clone(),
            agent: self.agent_ref(lead.sales_agent),
        }
    }

    fn expand_comment(&self, comment: &Comment) -> ExpandedComment {
        ExpandedComment {
            comment: comment.clone(),
            author_name: self.agent_ref(comment.author).map(|a| a.name),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an agent directly, leaving dangling references behind.
    pub fn remove_agent(&self, id: ObjectId) {
        self.inner.write().unwrap().agents.retain(|a| a.id != id);
    }

    /// Number of `Store` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Comments still stored for `lead`, bypassing the lead lookup.
    pub fn comment_count(&self, lead: ObjectId) -> usize {
        self.inner
            .read()
            .unwrap()
            .comments
            .iter()
            .filter(|c| c.lead == lead)
            .count()
    }
}

/// Newest first; among equal timestamps, later inserts first.
fn newest_first<T>(items: &mut Vec<T>, key: impl Fn(&T) -> Option<DateTime<Utc>>) {
    items.reverse();
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.touch();
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<SalesAgent>, StoreError> {
        self.touch();
        Ok(self.inner.read().unwrap().agents.clone())
    }

    async fn get_agent(&self, id: ObjectId) -> Result<Option<SalesAgent>, StoreError> {
        self.touch();
        let data = self.inner.read().unwrap();
        Ok(data.agents.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_agent(
        &self,
        agent: NewAgent,
        now: DateTime<Utc>,
    ) -> Result<SalesAgent, StoreError> {
        self.touch();
        let agent = SalesAgent {
            id: ObjectId::new(),
            name: agent.name,
            email: agent.email,
            created_at: now,
        };
        self.inner.write().unwrap().agents.push(agent.clone());
        Ok(agent)
    }

    async fn find_leads(
        &self,
        filter: &LeadFilter,
        sort: LeadSort,
    ) -> Result<Vec<ExpandedLead>, StoreError> {
        self.touch();
        let data = self.inner.read().unwrap();
        let mut found: Vec<ExpandedLead> = data
            .leads
            .iter()
            .filter(|l| filter.matches(l))
            .map(|l| data.expand_lead(l))
            .collect();
        match sort {
            LeadSort::NewestFirst => newest_first(&mut found, |e| Some(e.lead.created_at)),
            LeadSort::RecentlyClosedFirst => newest_first(&mut found, |e| e.lead.closed_at),
        }
        Ok(found)
    }

    async fn get_lead(&self, id: ObjectId) -> Result<Option<ExpandedLead>, StoreError> {
        self.touch();
        let data = self.inner.read().unwrap();
        Ok(data
            .leads
            .iter()
            .find(|l| l.id == id)
            .map(|l| data.expand_lead(l)))
    }

    async fn insert_lead(
        &self,
        fields: LeadFields,
        now: DateTime<Utc>,
    ) -> Result<ExpandedLead, StoreError> {
        self.touch();
        let closed_at = fields.closed_at_stamp(now);
        let lead = Lead {
            id: ObjectId::new(),
            name: fields.name,
            source: fields.source,
            sales_agent: fields.sales_agent,
            status: fields.status,
            tags: fields.tags,
            time_to_close: fields.time_to_close,
            priority: fields.priority,
            created_at: now,
            updated_at: now,
            closed_at,
        };
        let mut data = self.inner.write().unwrap();
        data.leads.push(lead.clone());
        Ok(data.expand_lead(&lead))
    }

    async fn replace_lead(
        &self,
        id: ObjectId,
        fields: LeadFields,
        now: DateTime<Utc>,
    ) -> Result<Option<ExpandedLead>, StoreError> {
        self.touch();
        let mut data = self.inner.write().unwrap();
        let Some(lead) = data.leads.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        lead.closed_at = fields.closed_at_stamp(now).or(lead.closed_at);
        lead.name = fields.name;
        lead.source = fields.source;
        lead.sales_agent = fields.sales_agent;
        lead.status = fields.status;
        lead.tags = fields.tags;
        lead.time_to_close = fields.time_to_close;
        lead.priority = fields.priority;
        lead.updated_at = now;
        let lead = lead.clone();
        Ok(Some(data.expand_lead(&lead)))
    }

    async fn delete_lead(&self, id: ObjectId) -> Result<bool, StoreError> {
        self.touch();
        let mut data = self.inner.write().unwrap();
        let before = data.leads.len();
        data.leads.retain(|l| l.id != id);
        Ok(data.leads.len() < before)
    }

    async fn find_comments(&self, lead: ObjectId) -> Result<Vec<ExpandedComment>, StoreError> {
        self.touch();
        let data = self.inner.read().unwrap();
        let mut found: Vec<ExpandedComment> = data
            .comments
            .iter()
            .filter(|c| c.lead == lead)
            .map(|c| data.expand_comment(c))
            .collect();
        newest_first(&mut found, |e| Some(e.comment.created_at));
        Ok(found)
    }

    async fn insert_comment(
        &self,
        comment: NewComment,
        now: DateTime<Utc>,
    ) -> Result<ExpandedComment, StoreError> {
        self.touch();
        let comment = Comment {
            id: ObjectId::new(),
            lead: comment.lead,
            comment_text: comment.comment_text,
            author: comment.author,
            created_at: now,
        };
        let mut data = self.inner.write().unwrap();
        data.comments.push(comment.clone());
        Ok(data.expand_comment(&comment))
    }

    async fn delete_comments_for_lead(&self, lead: ObjectId) -> Result<u64, StoreError> {
        self.touch();
        let mut data = self.inner.write().unwrap();
        let before = data.comments.len();
        data.comments.retain(|c| c.lead != lead);
        Ok((before - data.comments.len()) as u64)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.touch();
        Ok(self.inner.read().unwrap().tags.clone())
    }

    async fn insert_tag(&self, tag: NewTag, now: DateTime<Utc>) -> Result<Tag, StoreError> {
        self.touch();
        let mut data = self.inner.write().unwrap();
        if data.tags.iter().any(|t| t.name == tag.name) {
            return Err(StoreError::Duplicate {
                constraint: "tags_name_key".to_string(),
            });
        }
        let tag = Tag {
            id: ObjectId::new(),
            name: tag.name,
            created_at: now,
        };
        data.tags.push(tag.clone());
        Ok(tag)
    }
}
