//! Typed facade for company records.

use crate::client::Client;
use crate::error::ApiError;
use crate::resource::{PageCursor, Resource};
use crate::transport::Transport;
use crate::types::{Company, CompanyInput, ListResponse};

pub const COMPANIES: &str = "companies";

/// Company CRUD over `/crm/v3/objects/companies`.
pub struct Companies<'c, T> {
    resource: Resource<'c, T>,
}

impl<'c, T: Transport> Companies<'c, T> {
    pub fn new(client: &'c Client<T>) -> Self {
        Self {
            resource: Resource::new(client, COMPANIES),
        }
    }

    pub fn object_path(&self) -> &str {
        self.resource.object_path()
    }

    pub fn get(&self, id: &str) -> Result<Company, ApiError> {
        self.resource.get(id)
    }

    pub fn create(&self, input: &CompanyInput) -> Result<Company, ApiError> {
        self.resource.create(input)
    }

    pub fn update(&self, id: &str, input: &CompanyInput) -> Result<Company, ApiError> {
        self.resource.update(id, input)
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.resource.delete(id)
    }

    /// One page. Pass `PageCursor::First` for the first page and
    /// `PageCursor::next_from(&page)` for the following ones.
    pub fn list(&self, cursor: &PageCursor) -> Result<ListResponse<Company>, ApiError> {
        self.resource.list(cursor)
    }

    pub fn list_all(&self) -> Result<Vec<Company>, ApiError> {
        self.resource.list_all()
    }
}
