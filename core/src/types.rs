//! CRM payloads: object records, list envelopes and error bodies.
//!
//! # Design
//! These types mirror the service's v3 object schema but are defined
//! independently of the mock-server crate; the integration tests catch
//! drift between the two. Properties the client does not model explicitly
//! are kept in `other` so a record survives a read-modify-write unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Company properties. All values are strings on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub createdate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs_lastmodifieddate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs_object_id: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// A company record as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    #[serde(default)]
    pub properties: CompanyProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// Request payload for creating or updating a company. Only the properties
/// present are sent; omitted ones stay unchanged on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInput {
    pub properties: CompanyProperties,
}

/// Continuation of a list result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextPage {
    pub after: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextPage>,
}

/// One page of a list call: `{results: [...], paging: {next: {after, link}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            paging: None,
        }
    }
}

impl<T> ListResponse<T> {
    pub fn next_page(&self) -> Option<&NextPage> {
        self.paging.as_ref().and_then(|paging| paging.next.as_ref())
    }
}

/// The service's JSON error body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
