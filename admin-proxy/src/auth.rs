use hyper::header::{COOKIE, HeaderMap};
use std::fmt;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Admin token missing.";

/// Opaque admin bearer token taken from the caller's session cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminToken(String);

impl AdminToken {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Tokens end up in request spans; never print them.
impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken(..)")
    }
}

/// Looks up `cookie_name` across all `Cookie` headers. Empty values count as absent.
pub fn admin_token(headers: &HeaderMap, cookie_name: &str) -> Option<AdminToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
        .map(|value| AdminToken(value.to_string()))
}
