//! Converting binary data to and from `data:` URLs.

use std::sync::LazyLock;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use regex::Regex;

/// Regex for parsing a `data:` URL.
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime_type>[^;,]+);base64,(?P<data>[A-Za-z0-9+/=]+)$")
        .expect("failed to compile regex")
});

/// Convert binary data to a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    let base64_data = BASE64_STANDARD.encode(data);
    // Some sources indicate that the Base64 data should be percent-encoded, but
    // in practice this breaks Gemini and probably several other LLMs.
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// Parse a `data:` URL into a MIME type and Base64-encoded data.
///
/// We only check the shape of the Base64 payload here, not whether it decodes.
pub fn parse_data_url(data_url: &str) -> Option<(String, &str)> {
    let caps = DATA_URL_RE.captures(data_url)?;
    let mime_type = caps.name("mime_type")?.as_str().to_string();
    let data = caps.name("data")?.as_str();
    Some((mime_type, data))
}
