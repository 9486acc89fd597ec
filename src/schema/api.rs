use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    comments::NewComment,
    schema::model::Viewer,
    taxonomy::{Category, Status},
    votes::{Tally, VoteDirection, VoteReceipt, VoteState},
};

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportsQuery {
    /// Comma separated categories, e.g. `road,lighting`
    pub category: Option<String>,
    /// Comma separated statuses, e.g. `active,resolved`
    pub status: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVote {
    pub incident_id: u64,
    #[serde(rename = "type")]
    pub direction: VoteDirection,
    pub viewer: Viewer,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct VoteChange {
    #[serde(rename = "type")]
    pub direction: VoteDirection,
    pub viewer: Viewer,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentRequest {
    pub incident_id: u64,
    pub author: String,
    pub phone: String,
    pub dni: Option<String>,
    pub content: String,
}

impl NewCommentRequest {
    pub fn into_parts(self) -> (u64, NewComment) {
        (
            self.incident_id,
            NewComment {
                author: self.author,
                phone: self.phone,
                dni: self.dni,
                content: self.content,
            },
        )
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub incident_id: u64,
    pub state: VoteState,
    pub upvotes: u32,
    pub downvotes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VoteResponse {
    pub fn from_state(incident_id: u64, state: VoteState, tally: Tally) -> Self {
        Self {
            incident_id,
            state,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            message: None,
        }
    }

    pub fn from_receipt(incident_id: u64, receipt: &VoteReceipt) -> Self {
        Self {
            message: Some(receipt.message().to_string()),
            ..Self::from_state(incident_id, receipt.state, receipt.tally)
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyEntry {
    pub value: &'static str,
    pub label: &'static str,
    pub badge_class: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_color: Option<&'static str>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TaxonomyResponse {
    pub categories: Vec<TaxonomyEntry>,
    pub statuses: Vec<TaxonomyEntry>,
}

impl TaxonomyResponse {
    pub fn build() -> Self {
        Self {
            categories: Category::ALL
                .iter()
                .map(|category| TaxonomyEntry {
                    value: category.as_str(),
                    label: category.label(),
                    badge_class: category.badge_class(),
                    marker_color: None,
                })
                .collect(),
            statuses: Status::ALL
                .iter()
                .map(|status| TaxonomyEntry {
                    value: status.as_str(),
                    label: status.label(),
                    badge_class: status.badge_class(),
                    marker_color: Some(status.marker_color()),
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct VersionResponse {
    pub version: &'static str,
    pub build_timestamp: Option<&'static str>,
    pub git_sha: Option<&'static str>,
    pub git_commit_timestamp: Option<&'static str>,
}
