//! Hop-by-hop header stripping.
//!
//! These headers describe a single connection segment and must not cross
//! the proxy in either direction.

use std::sync::LazyLock;

use http::header::{self, HeaderMap, HeaderName};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "proxy-connection",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Removes every hop-by-hop header, including the extra ones a
/// `Connection` header nominates.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();
    for name in &nominated {
        headers.remove(name);
    }

    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}
