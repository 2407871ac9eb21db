//! Request Fingerprint Module
//!
//! Derives the deduplication key of a request from its method, path, caller
//! identity and body.

use serde_json::Value;

/// Identity used when no authenticated principal is attached to a request.
pub const ANONYMOUS: &str = "anonymous";

// == Principal ==
/// Authenticated caller id.
///
/// An authentication layer in front of the deduplication middleware inserts
/// this into the request extensions; requests without it are fingerprinted as
/// [`ANONYMOUS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

// == Generate Key ==
/// Builds `"{METHOD}:{path?query}:{identity}:{body}"`.
///
/// JSON bodies are parsed and re-serialised. `serde_json::Map` keeps keys
/// sorted, so `{"b":1,"a":2}` and `{"a":2,"b":1}` produce the same key and
/// whitespace differences disappear. This relies on `serde_json::Map` being a
/// `BTreeMap`: if any crate in the build enables serde_json's `preserve_order`
/// feature, key order leaks into the fingerprint and
/// `test_structurally_equal_bodies_match` fails. Bodies that are not JSON are
/// used verbatim (lossy UTF-8); an empty body contributes an empty segment.
pub fn generate_key(
    method: &str,
    path_and_query: &str,
    principal: Option<&str>,
    body: &[u8],
) -> String {
    format!(
        "{}:{}:{}:{}",
        method,
        path_and_query,
        principal.unwrap_or(ANONYMOUS),
        canonical_body(body)
    )
}

fn canonical_body(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value.to_string(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}
