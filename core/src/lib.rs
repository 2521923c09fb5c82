//! Typed client for the HubSpot-style CRM v3 object API.
//!
//! # Overview
//! `Client` composes requests against the configured host, attaches exactly
//! one credential (API key query parameter or OAuth bearer header), performs
//! the exchange through a `Transport` and classifies the outcome into a
//! decoded value or an `ApiError`. Resource facades (`Companies`, or a
//! generic `Resource` for any object type) sit on top.
//!
//! # Design
//! - `ClientConfig` is loaded once (`ClientConfig::from_env`) and passed in
//!   explicitly; the client freezes it and shares it read-only.
//! - URL composition is a set of pure functions in [`endpoint`].
//! - The network sits behind the `Transport` trait. `UreqTransport` is the
//!   blocking production implementation; tests substitute stubs.
//! - Facades hold a reference to the client plus a precomputed object path.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod companies;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod resource;
pub mod transport;
pub mod types;

pub use auth::Credentials;
pub use client::Client;
pub use companies::Companies;
pub use config::{ClientConfig, Timeouts};
pub use endpoint::{compose_url, normalize_link, object_path, parse_query, ApiVersion};
pub use error::{ApiError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resource::{PageCursor, Resource};
pub use transport::{Transport, UreqTransport};
pub use types::{Company, CompanyInput, CompanyProperties, ErrorResponse, ListResponse, NextPage, Paging};
