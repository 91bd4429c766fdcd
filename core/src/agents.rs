use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::id::ObjectId;
use crate::validation::{ValidationErrors, Validator};

/// Name shown in place of an agent reference that no longer resolves.
pub const UNKNOWN_AGENT: &str = "Unknown";

/// A sales agent. Leads are assigned to agents and comments are authored by them.
/// Agents are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesAgent {
    pub id: ObjectId,
    #[schema(example = "Priya Sharma")]
    pub name: String,
    #[schema(example = "priya@anvaya.io")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// The `{id, name}` projection of an agent embedded in lead responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AgentRef {
    pub id: ObjectId,
    pub name: String,
}

impl From<&SalesAgent> for AgentRef {
    fn from(agent: &SalesAgent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
        }
    }
}

/// Request to create a sales agent
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateAgentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Validated agent, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
}

impl CreateAgentRequest {
    pub fn validate(&self) -> Result<NewAgent, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required_str("name", self.name.as_deref());
        let email = v.email("email", self.email.as_deref());

        match (name, email) {
            (Some(name), Some(email)) if v.is_clean() => Ok(NewAgent { name, email }),
            _ => Err(v.into_errors()),
        }
    }
}
