use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::agents::AgentRef;
use crate::id::ObjectId;
use crate::validation::{Enumerated, ValidationErrors, Validator};

/// Where a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
pub enum LeadSource {
    Website,
    Referral,
    #[serde(rename = "Cold Call")]
    ColdCall,
    Advertisement,
    Email,
    Other,
}

impl Enumerated for LeadSource {
    const ALL: &'static [Self] = &[
        LeadSource::Website,
        LeadSource::Referral,
        LeadSource::ColdCall,
        LeadSource::Advertisement,
        LeadSource::Email,
        LeadSource::Other,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Website => "Website",
            LeadSource::Referral => "Referral",
            LeadSource::ColdCall => "Cold Call",
            LeadSource::Advertisement => "Advertisement",
            LeadSource::Email => "Email",
            LeadSource::Other => "Other",
        }
    }
}

/// Position of a lead in the sales pipeline. Declaration order is pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    Closed,
}

impl Enumerated for LeadStatus {
    const ALL: &'static [Self] = &[
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::ProposalSent,
        LeadStatus::Closed,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::ProposalSent => "Proposal Sent",
            LeadStatus::Closed => "Closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Enumerated for Priority {
    const ALL: &'static [Self] = &[Priority::High, Priority::Medium, Priority::Low];

    fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(LeadSource, LeadStatus, Priority);

/// A stored lead.
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub id: ObjectId,
    pub name: String,
    pub source: LeadSource,
    pub sales_agent: ObjectId,
    pub status: LeadStatus,
    pub tags: Vec<String>,
    pub time_to_close: i64,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last time the lead was saved as Closed. Never cleared.
    pub closed_at: Option<DateTime<Utc>>,
}

/// A lead with its agent reference resolved. `agent` is `None` when the
/// referenced agent no longer resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedLead {
    pub lead: Lead,
    pub agent: Option<AgentRef>,
}

/// Every client-writable field of a lead, validated and with defaults applied.
/// Used for both create and full-replace updates.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadFields {
    pub name: String,
    pub source: LeadSource,
    pub sales_agent: ObjectId,
    pub status: LeadStatus,
    pub tags: Vec<String>,
    pub time_to_close: i64,
    pub priority: Priority,
}

impl LeadFields {
    /// `closedAt` to write when these fields are saved at `now`.
    ///
    /// Every save with status Closed stamps a fresh time, including re-saves
    /// of a lead that was already Closed. `None` means "leave the stored value
    /// alone": leaving Closed does not clear an earlier stamp.
    pub fn closed_at_stamp(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.status == LeadStatus::Closed).then_some(now)
    }
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if !trimmed.is_empty() && !out.iter().any(|t| t == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Request to create a lead. Omitted status, tags and priority default to
/// New, no tags and Medium.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    #[schema(example = "Acme Corp")]
    pub name: Option<String>,
    #[schema(example = "Referral")]
    pub source: Option<String>,
    /// Agent ID (24 hex characters)
    pub sales_agent: Option<String>,
    #[schema(example = "New")]
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Expected days to close, >= 1
    #[schema(example = 30)]
    pub time_to_close: Option<i64>,
    #[schema(example = "High")]
    pub priority: Option<String>,
}

impl CreateLeadRequest {
    pub fn validate(&self) -> Result<LeadFields, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required_str("name", self.name.as_deref());
        let source = v.required_enum::<LeadSource>("source", self.source.as_deref());
        let sales_agent = v.object_id("salesAgent", self.sales_agent.as_deref());
        let status = v.optional_enum::<LeadStatus>("status", self.status.as_deref());
        let time_to_close = v.positive_int("timeToClose", self.time_to_close);
        let priority = v.optional_enum::<Priority>("priority", self.priority.as_deref());

        match (name, source, sales_agent, time_to_close) {
            (Some(name), Some(source), Some(sales_agent), Some(time_to_close)) if v.is_clean() => {
                Ok(LeadFields {
                    name,
                    source,
                    sales_agent,
                    status: status.unwrap_or(LeadStatus::New),
                    tags: normalize_tags(self.tags.as_deref().unwrap_or_default()),
                    time_to_close,
                    priority: priority.unwrap_or(Priority::Medium),
                })
            }
            _ => Err(v.into_errors()),
        }
    }
}

/// Message returned when a full-replace update leaves out a required field.
pub const UPDATE_REQUIRES_ALL_FIELDS: &str = "All fields are required when updating a lead.";

/// Full-replace update of a lead. Every field except `tags` is required;
/// omitted tags replace the stored tags with an empty list.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadRequest {
    pub name: Option<String>,
    pub source: Option<String>,
    pub sales_agent: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub time_to_close: Option<i64>,
    pub priority: Option<String>,
}

impl UpdateLeadRequest {
    fn missing_fields(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|v| v.trim().is_empty());
        blank(&self.name)
            || blank(&self.source)
            || blank(&self.sales_agent)
            || blank(&self.status)
            || blank(&self.priority)
            || self.time_to_close.is_none()
    }

    pub fn validate(&self) -> Result<LeadFields, ValidationErrors> {
        let mut v = Validator::new();
        if self.missing_fields() {
            v.summarize(UPDATE_REQUIRES_ALL_FIELDS);
        }
        let name = v.required_str("name", self.name.as_deref());
        let source = v.required_enum::<LeadSource>("source", self.source.as_deref());
        let sales_agent = v.object_id("salesAgent", self.sales_agent.as_deref());
        let status = v.required_enum::<LeadStatus>("status", self.status.as_deref());
        let time_to_close = v.positive_int("timeToClose", self.time_to_close);
        let priority = v.required_enum::<Priority>("priority", self.priority.as_deref());

        match (name, source, sales_agent, status, time_to_close, priority) {
            (
                Some(name),
                Some(source),
                Some(sales_agent),
                Some(status),
                Some(time_to_close),
                Some(priority),
            ) if v.is_clean() => Ok(LeadFields {
                name,
                source,
                sales_agent,
                status,
                tags: normalize_tags(self.tags.as_deref().unwrap_or_default()),
                time_to_close,
                priority,
            }),
            _ => Err(v.into_errors()),
        }
    }
}

/// Lead as returned by every lead endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: ObjectId,
    pub name: String,
    pub source: LeadSource,
    /// `null` when the assigned agent cannot be resolved
    pub sales_agent: Option<AgentRef>,
    pub status: LeadStatus,
    pub tags: Vec<String>,
    pub time_to_close: i64,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<ExpandedLead> for LeadResponse {
    fn from(expanded: ExpandedLead) -> Self {
        let ExpandedLead { lead, agent } = expanded;
        Self {
            id: lead.id,
            name: lead.name,
            source: lead.source,
            sales_agent: agent,
            status: lead.status,
            tags: lead.tags,
            time_to_close: lead.time_to_close,
            priority: lead.priority,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
            closed_at: lead.closed_at,
        }
    }
}

/// Response for DELETE /leads/{id}
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadDeletedResponse {
    pub message: String,
    pub comments_deleted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Is(LeadStatus),
    IsNot(LeadStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: LeadStatus) -> bool {
        match *self {
            StatusFilter::Is(s) => status == s,
            StatusFilter::IsNot(s) => status != s,
        }
    }
}

/// Conjunction of optional lead predicates. An empty filter matches every lead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub sales_agent: Option<ObjectId>,
    pub status: Option<StatusFilter>,
    pub source: Option<LeadSource>,
    /// Matches leads carrying any of these tags. Empty means no tag constraint.
    pub tags_any: Vec<String>,
    /// Only leads whose `closedAt` is at or after this instant.
    pub closed_since: Option<DateTime<Utc>>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.sales_agent.is_none_or(|id| lead.sales_agent == id)
            && self.status.is_none_or(|f| f.matches(lead.status))
            && self.source.is_none_or(|s| lead.source == s)
            && (self.tags_any.is_empty() || lead.tags.iter().any(|t| self.tags_any.contains(t)))
            && self
                .closed_since
                .is_none_or(|since| lead.closed_at.is_some_and(|at| at >= since))
    }
}

/// Result ordering for lead queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadSort {
    /// createdAt descending
    NewestFirst,
    /// closedAt descending, leads without closedAt last
    RecentlyClosedFirst,
}

/// Raw query parameters of GET /leads.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListLeadsQuery {
    pub sales_agent: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<String>,
}

impl ListLeadsQuery {
    /// Collect from decoded `key=value` pairs. `tags` may repeat; for the
    /// other keys the last occurrence wins. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "salesAgent" => query.sales_agent = Some(value.into()),
                "status" => query.status = Some(value.into()),
                "source" => query.source = Some(value.into()),
                "tags" => query.tags.push(value.into()),
                _ => {}
            }
        }
        query
    }

    pub fn validate(&self) -> Result<LeadFilter, ValidationErrors> {
        let mut v = Validator::new();
        let sales_agent = v.optional_object_id("salesAgent", self.sales_agent.as_deref());
        let status = v.optional_enum::<LeadStatus>("status", self.status.as_deref());
        let source = v.optional_enum::<LeadSource>("source", self.source.as_deref());
        v.finish()?;

        Ok(LeadFilter {
            sales_agent,
            status: status.map(StatusFilter::Is),
            source,
            tags_any: normalize_tags(&self.tags),
            closed_since: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const AGENT: &str = "6650f1c2a4b8e93d7c1f0a12";

    fn create_request() -> CreateLeadRequest {
        CreateLeadRequest {
            name: Some("Acme Corp".to_string()),
            source: Some("Cold Call".to_string()),
            sales_agent: Some(AGENT.to_string()),
            time_to_close: Some(30),
            ..Default::default()
        }
    }

    fn update_request() -> UpdateLeadRequest {
        UpdateLeadRequest {
            name: Some("Acme Corp".to_string()),
            source: Some("Website".to_string()),
            sales_agent: Some(AGENT.to_string()),
            status: Some("Qualified".to_string()),
            tags: None,
            time_to_close: Some(10),
            priority: Some("Low".to_string()),
        }
    }

    fn lead(status: LeadStatus, tags: &[&str]) -> Lead {
        let now = Utc::now();
        Lead {
            id: ObjectId::new(),
            name: "Lead".to_string(),
            source: LeadSource::Website,
            sales_agent: AGENT.parse().unwrap(),
            status,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            time_to_close: 5,
            priority: Priority::Medium,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    #[test]
    fn create_applies_defaults() {
        let fields = create_request().validate().unwrap();
        assert_eq!(fields.status, LeadStatus::New);
        assert_eq!(fields.priority, Priority::Medium);
        assert!(fields.tags.is_empty());
        assert_eq!(fields.source, LeadSource::ColdCall);
    }

    #[test]
    fn create_collects_every_violation() {
        let req = CreateLeadRequest {
            name: None,
            source: Some("Billboard".to_string()),
            sales_agent: Some("not-an-id".to_string()),
            status: Some("closed".to_string()),
            tags: None,
            time_to_close: Some(0),
            priority: Some("Urgent".to_string()),
        };
        let errors = req.validate().expect_err("invalid request must fail");
        let fields: Vec<&str> = errors.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["name", "source", "salesAgent", "status", "timeToClose", "priority"]
        );
        assert_eq!(errors.message(), "Invalid input: 'name' is required.");
    }

    #[test]
    fn status_message_lists_permitted_values() {
        let req = CreateLeadRequest {
            status: Some("Won".to_string()),
            ..create_request()
        };
        let errors = req.validate().expect_err("unknown status must fail");
        assert_eq!(
            errors.message(),
            "Invalid input: 'status' must be one of ['New', 'Contacted', 'Qualified', 'Proposal Sent', 'Closed']."
        );
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let req = CreateLeadRequest {
            tags: Some(vec![
                " High Value ".to_string(),
                "".to_string(),
                "High Value".to_string(),
                "Follow-up".to_string(),
            ]),
            ..create_request()
        };
        let fields = req.validate().unwrap();
        assert_eq!(fields.tags, vec!["High Value".to_string(), "Follow-up".to_string()]);
    }

    #[test]
    fn update_requires_all_fields() {
        let req = UpdateLeadRequest {
            priority: None,
            ..update_request()
        };
        let errors = req.validate().expect_err("partial update must fail");
        assert_eq!(errors.message(), UPDATE_REQUIRES_ALL_FIELDS);
        assert!(errors.has_field("priority"));
    }

    #[test]
    fn update_with_bad_enum_reports_field_message() {
        let req = UpdateLeadRequest {
            priority: Some("Urgent".to_string()),
            ..update_request()
        };
        let errors = req.validate().expect_err("bad priority must fail");
        assert_eq!(
            errors.message(),
            "Invalid input: 'priority' must be one of ['High', 'Medium', 'Low']."
        );
    }

    #[test]
    fn update_defaults_missing_tags_to_empty() {
        let fields = update_request().validate().unwrap();
        assert!(fields.tags.is_empty());
        assert_eq!(fields.status, LeadStatus::Qualified);
    }

    #[test]
    fn closed_at_is_stamped_only_for_closed() {
        let now = Utc::now();
        let mut fields = create_request().validate().unwrap();
        assert_eq!(fields.closed_at_stamp(now), None);
        fields.status = LeadStatus::Closed;
        assert_eq!(fields.closed_at_stamp(now), Some(now));
    }

    #[test]
    fn list_query_collects_repeated_tags() {
        let query = ListLeadsQuery::from_pairs([
            ("tags", "Hot"),
            ("status", "New"),
            ("tags", "Enterprise"),
            ("page", "2"),
        ]);
        assert_eq!(query.tags, vec!["Hot".to_string(), "Enterprise".to_string()]);
        let filter = query.validate().unwrap();
        assert_eq!(filter.status, Some(StatusFilter::Is(LeadStatus::New)));
        assert_eq!(filter.tags_any.len(), 2);
    }

    #[test]
    fn list_query_rejects_each_bad_filter() {
        let query = ListLeadsQuery::from_pairs([
            ("salesAgent", "abc"),
            ("status", "Open"),
            ("source", "Fax"),
        ]);
        let errors = query.validate().expect_err("bad filters must fail");
        assert_eq!(errors.violations().len(), 3);
    }

    #[test]
    fn padded_filter_values_are_not_normalized() {
        let query = ListLeadsQuery::from_pairs([
            ("status", " Closed "),
            ("salesAgent", " 6650f1c2a4b8e93d7c1f0a12"),
        ]);
        let errors = query.validate().expect_err("padded filters must fail");
        let fields: Vec<&str> = errors.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["salesAgent", "status"]);
    }

    #[test]
    fn padded_enum_in_body_is_rejected() {
        let req = CreateLeadRequest {
            source: Some("Website ".to_string()),
            status: Some(" Closed".to_string()),
            ..create_request()
        };
        let errors = req.validate().expect_err("padded enums must fail");
        assert!(errors.has_field("source"));
        assert!(errors.has_field("status"));
    }

    #[test]
    fn filter_matches_conjunction() {
        let mut closed = lead(LeadStatus::Closed, &["Hot"]);
        closed.closed_at = Some(Utc::now() - Duration::days(2));

        let filter = LeadFilter {
            status: Some(StatusFilter::Is(LeadStatus::Closed)),
            tags_any: vec!["Cold".to_string(), "Hot".to_string()],
            closed_since: Some(Utc::now() - Duration::days(7)),
            ..Default::default()
        };
        assert!(filter.matches(&closed));
        assert!(!filter.matches(&lead(LeadStatus::Closed, &["Hot"])));
        assert!(!filter.matches(&lead(LeadStatus::New, &["Hot"])));

        let open = LeadFilter {
            status: Some(StatusFilter::IsNot(LeadStatus::Closed)),
            ..Default::default()
        };
        assert!(open.matches(&lead(LeadStatus::Contacted, &[])));
        assert!(!open.matches(&closed));
        assert!(LeadFilter::default().matches(&closed));
    }

    #[test]
    fn enums_serialize_with_display_names() {
        assert_eq!(
            serde_json::to_value(LeadStatus::ProposalSent).unwrap(),
            serde_json::json!("Proposal Sent")
        );
        assert_eq!(LeadSource::ColdCall.to_string(), "Cold Call");
        assert_eq!(LeadStatus::parse("Proposal Sent"), Some(LeadStatus::ProposalSent));
        assert_eq!(LeadStatus::parse("proposal sent"), None);
    }
}
