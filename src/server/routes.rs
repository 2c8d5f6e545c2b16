//! Route table and request parameter extraction
//!
//! Routes:
//! - `GET /health`
//! - `GET /2023-07/entries/{code}.json`
//! - `GET /2023-07/sections/{code}.json`
//! - `GET /2023-07/items/{code}.json`

use hyper::{HeaderMap, Method};

use crate::context::Scope;
use crate::delivery::{EntryRequest, SectionRequest};
use crate::types::{DeliveryError, Result};

/// Delivery API version served under `/{version}/...`
pub const API_VERSION: &str = "2023-07";

/// Caller identity headers, set by the authentication layer in front of this service
pub const OWNER_HEADER: &str = "x-owner-id";
pub const PROJECT_HEADER: &str = "x-project-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    Entries(String),
    Sections(String),
    Items(String),
}

impl Route {
    pub fn parse(method: &Method, path: &str) -> Option<Route> {
        if method != Method::GET {
            return None;
        }

        if path == "/health" || path == "/healthz" {
            return Some(Route::Health);
        }

        let mut parts = path.trim_start_matches('/').splitn(3, '/');
        let version = parts.next()?;
        let resource = parts.next()?;
        let file = parts.next()?;

        if version != API_VERSION {
            return None;
        }

        let code = file.strip_suffix(".json")?;
        if code.is_empty() || code.contains('/') {
            return None;
        }
        let code = urlencoding::decode(code).ok()?.into_owned();

        match resource {
            "entries" => Some(Route::Entries(code)),
            "sections" => Some(Route::Sections(code)),
            "items" => Some(Route::Items(code)),
            _ => None,
        }
    }
}

/// Owner and project of the caller
pub fn scope_from_headers(headers: &HeaderMap) -> Result<Scope> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DeliveryError::InvalidRequest(format!("missing {} header", name)))
    };

    Ok(Scope::new(header(OWNER_HEADER)?, header(PROJECT_HEADER)?))
}

fn query_pairs(query: Option<&str>) -> Result<Vec<(String, String)>> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| DeliveryError::InvalidRequest(format!("malformed query string: {}", e)))
}

fn positive(key: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DeliveryError::InvalidRequest(format!(
            "{} must be a positive integer, got '{}'",
            key, value
        ))),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// `limit`, `page`, `sinceId`, `ids`, `fields`; anything else is a pass-through filter
pub fn entry_request(query: Option<&str>) -> Result<EntryRequest> {
    let mut request = EntryRequest::default();

    for (key, value) in query_pairs(query)? {
        match key.as_str() {
            "limit" => request.query.limit = positive(&key, &value)?,
            "page" => request.query.page = positive(&key, &value)?,
            "sinceId" | "since_id" => request.query.since_id = non_empty(value),
            "ids" => {
                request.query.ids = value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "fields" => request.fields = non_empty(value),
            _ => {
                request.query.filters.insert(key, value);
            }
        }
    }

    Ok(request)
}

/// `depth_level`, `section_id`, `section_code`
pub fn section_request(query: Option<&str>) -> Result<SectionRequest> {
    let mut request = SectionRequest::default();

    for (key, value) in query_pairs(query)? {
        match key.as_str() {
            "depth_level" => request.depth_level = positive(&key, &value)?,
            "section_id" => request.section_id = non_empty(value),
            "section_code" => request.section_code = non_empty(value),
            _ => {}
        }
    }

    Ok(request)
}

/// `depth_level`, defaulting to 1
pub fn depth_level(query: Option<&str>) -> Result<u32> {
    let mut depth = 1;
    for (key, value) in query_pairs(query)? {
        if key == "depth_level" {
            depth = positive(&key, &value)?;
        }
    }
    Ok(depth)
}
