use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use anvaya_core::agents::{AgentRef, NewAgent, SalesAgent};
use anvaya_core::comments::{Comment, ExpandedComment, NewComment};
use anvaya_core::id::ObjectId;
use anvaya_core::leads::{ExpandedLead, Lead, LeadFields, LeadFilter, LeadSort, StatusFilter};
use anvaya_core::tags::{NewTag, Tag};
use anvaya_core::validation::Enumerated;

use super::{Store, StoreError};

/// PostgreSQL-backed store. Cloning shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lead columns plus the expanded agent name. Expects the lead relation
/// aliased `l` and `sales_agents` aliased `a`.
const LEAD_COLUMNS: &str = "l.id, l.name, l.source, l.sales_agent, l.status, l.tags, \
     l.time_to_close, l.priority, l.created_at, l.updated_at, l.closed_at, \
     a.name AS agent_name";

const COMMENT_COLUMNS: &str =
    "c.id, c.lead, c.comment_text, c.author, c.created_at, a.name AS author_name";

fn parse_id(raw: &str, column: &str) -> Result<ObjectId, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} '{raw}' is not a valid id")))
}

fn parse_enum<E: Enumerated>(raw: &str, column: &str) -> Result<E, StoreError> {
    E::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("{column} has unknown value '{raw}'")))
}

/// Unique violations become [`StoreError::Duplicate`].
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Duplicate {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::Database(err)
}

fn order_by(sort: LeadSort) -> &'static str {
    match sort {
        LeadSort::NewestFirst => "l.created_at DESC, l.id DESC",
        LeadSort::RecentlyClosedFirst => "l.closed_at DESC NULLS LAST, l.id DESC",
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl AgentRow {
    fn into_agent(self) -> Result<SalesAgent, StoreError> {
        Ok(SalesAgent {
            id: parse_id(&self.id, "sales_agents.id")?,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: String,
    name: String,
    source: String,
    sales_agent: String,
    status: String,
    tags: Vec<String>,
    time_to_close: i64,
    priority: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    agent_name: Option<String>,
}

impl LeadRow {
    fn into_expanded(self) -> Result<ExpandedLead, StoreError> {
        let sales_agent = parse_id(&self.sales_agent, "leads.sales_agent")?;
        let lead = Lead {
            id: parse_id(&self.id, "leads.id")?,
            name: self.name,
            source: parse_enum(&self.source, "leads.source")?,
            sales_agent,
            status: parse_enum(&self.status, "leads.status")?,
            tags: self.tags,
            time_to_close: self.time_to_close,
            priority: parse_enum(&self.priority, "leads.priority")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
        };
        let agent = self.agent_name.map(|name| AgentRef {
            id: sales_agent,
            name,
        });
        Ok(ExpandedLead { lead, agent })
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    lead: String,
    comment_text: String,
    author: String,
    created_at: DateTime<Utc>,
    author_name: Option<String>,
}

impl CommentRow {
    fn into_expanded(self) -> Result<ExpandedComment, StoreError> {
        Ok(ExpandedComment {
            comment: Comment {
                id: parse_id(&self.id, "comments.id")?,
                lead: parse_id(&self.lead, "comments.lead")?,
                comment_text: self.comment_text,
                author: parse_id(&self.author, "comments.author")?,
                created_at: self.created_at,
            },
            author_name: self.author_name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl TagRow {
    fn into_tag(self) -> Result<Tag, StoreError> {
        Ok(Tag {
            id: parse_id(&self.id, "tags.id")?,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<SalesAgent>, StoreError> {
        let rows = sqlx::query_as::<_, AgentRow>(
            "SELECT id, name, email, created_at FROM sales_agents ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AgentRow::into_agent).collect()
    }

    async fn get_agent(&self, id: ObjectId) -> Result<Option<SalesAgent>, StoreError> {
        let row = sqlx::query_as::<_, AgentRow>(
            "SELECT id, name, email, created_at FROM sales_agents WHERE id = $1",
        )
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;
        row.map(AgentRow::into_agent).transpose()
    }

    async fn insert_agent(
        &self,
        agent: NewAgent,
        now: DateTime<Utc>,
    ) -> Result<SalesAgent, StoreError> {
        let row = sqlx::query_as::<_, AgentRow>(
            r#"
            INSERT INTO sales_agents (id, name, email, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(ObjectId::new().to_hex())
        .bind(&agent.name)
        .bind(&agent.email)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.into_agent()
    }

    async fn find_leads(
        &self,
        filter: &LeadFilter,
        sort: LeadSort,
    ) -> Result<Vec<ExpandedLead>, StoreError> {
        let (status_is, status_not) = match filter.status {
            Some(StatusFilter::Is(s)) => (Some(s.as_str()), None),
            Some(StatusFilter::IsNot(s)) => (None, Some(s.as_str())),
            None => (None, None),
        };

        let sql = format!(
            r#"
            SELECT {LEAD_COLUMNS}
            FROM leads l
            LEFT JOIN sales_agents a ON a.id = l.sales_agent
            WHERE ($1::text IS NULL OR l.sales_agent = $1)
              AND ($2::text IS NULL OR l.status = $2)
              AND ($3::text IS NULL OR l.status <> $3)
              AND ($4::text IS NULL OR l.source = $4)
              AND (cardinality($5::text[]) = 0 OR l.tags && $5)
              AND ($6::timestamptz IS NULL OR l.closed_at >= $6)
            ORDER BY {}
            "#,
            order_by(sort)
        );

        let rows = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(filter.sales_agent.map(|id| id.to_hex()))
            .bind(status_is)
            .bind(status_not)
            .bind(filter.source.map(|s| s.as_str()))
            .bind(filter.tags_any.as_slice())
            .bind(filter.closed_since)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LeadRow::into_expanded).collect()
    }

    async fn get_lead(&self, id: ObjectId) -> Result<Option<ExpandedLead>, StoreError> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads l \
             LEFT JOIN sales_agents a ON a.id = l.sales_agent \
             WHERE l.id = $1"
        );
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id.to_hex())
            .fetch_optional(&self.pool)
            .await?;
        row.map(LeadRow::into_expanded).transpose()
    }

    async fn insert_lead(
        &self,
        fields: LeadFields,
        now: DateTime<Utc>,
    ) -> Result<ExpandedLead, StoreError> {
        let sql = format!(
            r#"
            WITH l AS (
                INSERT INTO leads
                    (id, name, source, sales_agent, status, tags, time_to_close, priority,
                     created_at, updated_at, closed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10)
                RETURNING *
            )
            SELECT {LEAD_COLUMNS}
            FROM l
            LEFT JOIN sales_agents a ON a.id = l.sales_agent
            "#
        );
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(ObjectId::new().to_hex())
            .bind(&fields.name)
            .bind(fields.source.as_str())
            .bind(fields.sales_agent.to_hex())
            .bind(fields.status.as_str())
            .bind(fields.tags.as_slice())
            .bind(fields.time_to_close)
            .bind(fields.priority.as_str())
            .bind(now)
            .bind(fields.closed_at_stamp(now))
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.into_expanded()
    }

    async fn replace_lead(
        &self,
        id: ObjectId,
        fields: LeadFields,
        now: DateTime<Utc>,
    ) -> Result<Option<ExpandedLead>, StoreError> {
        let sql = format!(
            r#"
            WITH l AS (
                UPDATE leads
                SET name = $2,
                    source = $3,
                    sales_agent = $4,
                    status = $5,
                    tags = $6,
                    time_to_close = $7,
                    priority = $8,
                    updated_at = $9,
                    closed_at = COALESCE($10, closed_at)
                WHERE id = $1
                RETURNING *
            )
            SELECT {LEAD_COLUMNS}
            FROM l
            LEFT JOIN sales_agents a ON a.id = l.sales_agent
            "#
        );
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id.to_hex())
            .bind(&fields.name)
            .bind(fields.source.as_str())
            .bind(fields.sales_agent.to_hex())
            .bind(fields.status.as_str())
            .bind(fields.tags.as_slice())
            .bind(fields.time_to_close)
            .bind(fields.priority.as_str())
            .bind(now)
            .bind(fields.closed_at_stamp(now))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.map(LeadRow::into_expanded).transpose()
    }

    async fn delete_lead(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_comments(&self, lead: ObjectId) -> Result<Vec<ExpandedComment>, StoreError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c \
             LEFT JOIN sales_agents a ON a.id = c.author \
             WHERE c.lead = $1 \
             ORDER BY c.created_at DESC, c.id DESC"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(lead.to_hex())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(CommentRow::into_expanded).collect()
    }

    async fn insert_comment(
        &self,
        comment: NewComment,
        now: DateTime<Utc>,
    ) -> Result<ExpandedComment, StoreError> {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (id, lead, comment_text, author, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM c
            LEFT JOIN sales_agents a ON a.id = c.author
            "#
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(ObjectId::new().to_hex())
            .bind(comment.lead.to_hex())
            .bind(&comment.comment_text)
            .bind(comment.author.to_hex())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.into_expanded()
    }

    async fn delete_comments_for_lead(&self, lead: ObjectId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE lead = $1")
            .bind(lead.to_hex())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, created_at FROM tags ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TagRow::into_tag).collect()
    }

    async fn insert_tag(&self, tag: NewTag, now: DateTime<Utc>) -> Result<Tag, StoreError> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (id, name, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, name, created_at
            "#,
        )
        .bind(ObjectId::new().to_hex())
        .bind(&tag.name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.into_tag()
    }
}
