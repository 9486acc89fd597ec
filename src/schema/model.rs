use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::taxonomy::{Category, Status};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub comments_count: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
}

/// Self-asserted identity captured from a viewer. Nothing here is verified.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct Viewer {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub dni: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub incident_id: u64,
    pub author: String,
    // contact details are only used for verification and never shown back
    #[serde(skip_serializing)]
    pub phone: String,
    #[serde(skip_serializing)]
    pub dni: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
