//! Authentication injection.
//!
//! The service accepts either a private-app API key in the `hapikey` query
//! parameter or an OAuth access token as a bearer header. Exactly one is
//! applied per request; the configuration decides which.

use url::Url;

use crate::endpoint::{query_params, set_query_params};
use crate::http::AUTHORIZATION;

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "hapikey";

/// The credential selected from a `ClientConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials<'a> {
    ApiKey(&'a str),
    OAuthToken(&'a str),
    Anonymous,
}

impl Credentials<'_> {
    /// Apply this credential to an in-progress request. Only the URL's query
    /// string or the header list is touched.
    ///
    /// A `hapikey` already present in the URL (from the host, the endpoint or
    /// a pagination link) is replaced by the configured key, or removed when
    /// no key is configured.
    pub fn apply(&self, url: &mut Url, headers: &mut Vec<(String, String)>) {
        match self {
            Credentials::ApiKey(key) => {
                let mut params = query_params(url);
                params.insert(API_KEY_PARAM.to_string(), key.to_string());
                set_query_params(url, &params);
            }
            Credentials::OAuthToken(token) => {
                strip_api_key(url);
                headers.retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
                headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
            }
            // The service rejects the call; nothing to validate locally.
            Credentials::Anonymous => strip_api_key(url),
        }
    }
}

fn strip_api_key(url: &mut Url) {
    let mut params = query_params(url);
    if params.remove(API_KEY_PARAM).is_some() {
        set_query_params(url, &params);
    }
}
