//! Generic per-object CRUD facade.
//!
//! # Design
//! A `Resource` borrows a `Client` and owns its precomputed object path; the
//! CRUD calls differ only in method, sub-path and payload. Typed facades
//! such as `Companies` wrap one.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::form_urlencoded;

use crate::client::Client;
use crate::endpoint::{normalize_link, object_path, ApiVersion};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::ListResponse;

/// Where a list call starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageCursor {
    First,
    /// Relative fragment appended to the object path, e.g. `?after=123`.
    Fragment(String),
    /// Full `paging.next.link` as returned by the service. Only its path and
    /// query are used; the request goes to the configured host.
    Link(String),
}

impl PageCursor {
    /// Cursor for the page after `page`, or `None` on the last page.
    pub fn next_from<R>(page: &ListResponse<R>) -> Option<Self> {
        let next = page.next_page()?;
        match next.link.as_deref() {
            Some(link) if !link.is_empty() => Some(PageCursor::Link(link.to_string())),
            _ => {
                let after: String = form_urlencoded::byte_serialize(next.after.as_bytes()).collect();
                Some(PageCursor::Fragment(format!("?after={after}")))
            }
        }
    }

    fn endpoint(&self, object_path: &str) -> String {
        match self {
            PageCursor::First => object_path.to_string(),
            PageCursor::Fragment(fragment) if fragment.starts_with('?') => {
                format!("{object_path}{fragment}")
            }
            PageCursor::Fragment(fragment) => format!("{object_path}/{fragment}"),
            PageCursor::Link(link) => normalize_link(link).to_string(),
        }
    }
}

/// CRUD over one object type, e.g. `/crm/v3/objects/contacts`.
pub struct Resource<'c, T> {
    client: &'c Client<T>,
    object_path: String,
}

impl<'c, T: Transport> Resource<'c, T> {
    pub fn new(client: &'c Client<T>, object: &str) -> Self {
        Self {
            client,
            object_path: object_path(ApiVersion::default(), object, ""),
        }
    }

    /// Facade using an explicit API version; unknown versions are an error.
    pub fn with_version(client: &'c Client<T>, object: &str, version: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client,
            object_path: client.object_path(object, "", version)?,
        })
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    fn record_endpoint(&self, id: &str) -> Result<String, ApiError> {
        if matches!(id, "" | "." | "..") || id.contains(|c: char| matches!(c, '/' | '?' | '#')) {
            return Err(ApiError::InvalidUrl {
                input: id.to_string(),
                reason: "object id must be a single non-empty path segment".to_string(),
            });
        }
        Ok(format!("{}/{}", self.object_path, id))
    }

    pub fn get<R>(&self, id: &str) -> Result<R, ApiError>
    where
        R: DeserializeOwned + Default,
    {
        let endpoint = self.record_endpoint(id)?;
        self.client.request(HttpMethod::Get, &endpoint)
    }

    pub fn create<D, R>(&self, data: &D) -> Result<R, ApiError>
    where
        D: Serialize + ?Sized,
        R: DeserializeOwned + Default,
    {
        let endpoint = format!("{}/", self.object_path);
        self.client.request_with(HttpMethod::Post, &endpoint, data)
    }

    pub fn update<D, R>(&self, id: &str, data: &D) -> Result<R, ApiError>
    where
        D: Serialize + ?Sized,
        R: DeserializeOwned + Default,
    {
        let endpoint = self.record_endpoint(id)?;
        self.client.request_with(HttpMethod::Put, &endpoint, data)
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let endpoint = self.record_endpoint(id)?;
        self.client.request_no_content(HttpMethod::Delete, &endpoint)
    }

    pub fn list<R>(&self, cursor: &PageCursor) -> Result<ListResponse<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        let endpoint = cursor.endpoint(&self.object_path);
        self.client.request(HttpMethod::Get, &endpoint)
    }

    /// Every record, following `paging.next` until the last page. Stops if
    /// the service hands back a cursor it already returned.
    pub fn list_all<R>(&self) -> Result<Vec<R>, ApiError>
    where
        R: DeserializeOwned,
    {
        let mut cursor = PageCursor::First;
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        loop {
            let page: ListResponse<R> = self.list(&cursor)?;
            let next = PageCursor::next_from(&page);
            records.extend(page.results);
            match next {
                Some(next) if seen.insert(next.clone()) => cursor = next,
                _ => break,
            }
        }
        Ok(records)
    }
}
