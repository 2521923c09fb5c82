//! URL composition: object paths, endpoint strings and pagination links.
//!
//! # Design
//! An endpoint is a path relative to the configured host, optionally
//! followed by `?key=value&...`. Composition joins the path onto the host,
//! merges the embedded query into the host's own query and re-encodes it in
//! key order, so the same inputs always produce the same URL. Links handed
//! back by the service for pagination are reduced to their path and query
//! first, so requests always go to the configured host.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ApiError;

/// Object-path scheme version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V3,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V3 => "v3",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = ApiError;

    /// An empty string selects the default version.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "v3" => Ok(ApiVersion::V3),
            other => Err(ApiError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// `/crm/{version}/objects/{object}`, plus `/{subpath}` when one is given.
///
/// A subpath that is only a query fragment (`?after=10`) is appended as-is
/// so no slash ends up in front of the query.
pub fn object_path(version: ApiVersion, object: &str, subpath: &str) -> String {
    let mut path = format!("/crm/{version}/objects/{object}");
    if !subpath.is_empty() {
        if !subpath.starts_with('?') {
            path.push('/');
        }
        path.push_str(subpath);
    }
    path
}

/// Like [`object_path`] with the version given as text; unknown versions are
/// reported rather than ignored.
pub fn resolve_object_path(object: &str, subpath: &str, version: &str) -> Result<String, ApiError> {
    let version: ApiVersion = version.parse()?;
    Ok(object_path(version, object, subpath))
}

/// Split an endpoint into its path and the query after the first `?`.
/// A `#fragment` is never sent, so it is dropped first.
pub fn split_endpoint(endpoint: &str) -> (&str, Option<&str>) {
    let endpoint = strip_fragment(endpoint);
    match endpoint.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint, None),
    }
}

/// Parse `key1=val1&key2=val2` into a map.
///
/// Pairs are split on `&`, then on the first `=`. A pair without `=` maps to
/// an empty value, empty pairs and empty keys are dropped, and a repeated key
/// keeps its last value. Keys and values are form-decoded.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = form_decode(key);
        if key.is_empty() {
            continue;
        }
        params.insert(key, form_decode(value));
    }
    params
}

fn form_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn strip_fragment(raw: &str) -> &str {
    raw.split_once('#').map_or(raw, |(head, _)| head)
}

/// Strip scheme, authority and fragment from a pagination link, keeping path
/// and query verbatim. Anything without a scheme is already a bare path.
pub fn normalize_link(link: &str) -> &str {
    let link = strip_fragment(link);
    let rest = match link.find("://") {
        Some(idx) if is_scheme(&link[..idx]) => &link[idx + 3..],
        _ => match link.strip_prefix("//") {
            Some(rest) => rest,
            None => return link,
        },
    };
    match rest.find(|c: char| c == '/' || c == '?') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Build the absolute URL for `endpoint` on `host`.
pub fn compose_url(host: &str, endpoint: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(host).map_err(|e| ApiError::InvalidUrl {
        input: host.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl {
            input: host.to_string(),
            reason: "host cannot carry a path".to_string(),
        });
    }

    let (path, query) = split_endpoint(endpoint);
    if path.contains("://") {
        return Err(ApiError::InvalidUrl {
            input: endpoint.to_string(),
            reason: "endpoint must be relative to the configured host".to_string(),
        });
    }

    let joined = join_path(url.path(), path);
    url.set_path(&joined);

    let mut params = query_params(&url);
    if let Some(query) = query {
        params.extend(parse_query(query));
    }
    set_query_params(&mut url, &params);
    Ok(url)
}

/// Join two paths the way a file path is cleaned: duplicate slashes and `.`
/// collapse, `..` drops the previous segment, no trailing slash.
fn join_path(base: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

pub(crate) fn query_params(url: &Url) -> BTreeMap<String, String> {
    url.query_pairs().into_owned().collect()
}

/// Replace the URL's query with `params`, encoded in key order.
pub(crate) fn set_query_params(url: &mut Url, params: &BTreeMap<String, String>) {
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params.iter());
    }
}
