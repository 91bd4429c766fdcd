use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::id::ObjectId;
use crate::validation::{ValidationErrors, Validator};

/// A named tag. Names are unique. Lead tags are free-form strings and are
/// not checked against this collection.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: ObjectId,
    #[schema(example = "High Value")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
}

impl CreateTagRequest {
    pub fn validate(&self) -> Result<NewTag, ValidationErrors> {
        let mut v = Validator::new();
        match v.required_str("name", self.name.as_deref()) {
            Some(name) => Ok(NewTag { name }),
            None => Err(v.into_errors()),
        }
    }
}
