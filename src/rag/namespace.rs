use crate::core::errors::RagError;

const COMMON_TLDS: [&str; 12] = [
    "com", "org", "net", "edu", "gov", "io", "co", "us", "info", "biz", "app", "dev",
];

const SECOND_LEVEL_DOMAINS: [&str; 10] = [
    "co.uk", "com.au", "co.nz", "co.jp", "or.jp", "ne.jp", "ac.uk", "gov.uk", "org.uk", "co.za",
];

const NAMESPACE_SUFFIX: &str = "-01";

/// Derives a tenant namespace from a website URL: the main domain label,
/// reduced to `[a-zA-Z0-9-]`, with a `-01` suffix.
///
/// `https://www.shop.example.co.uk/about` becomes `example-01`.
pub fn namespace_for_url(url: &str) -> Result<String, RagError> {
    let host = host_of(url);
    let parts: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Err(RagError::Validation(format!(
            "cannot derive a namespace from '{}'",
            url
        )));
    }

    let n = parts.len();
    let tail = parts[n.saturating_sub(2)..].join(".");
    let main = if n >= 3 && SECOND_LEVEL_DOMAINS.contains(&tail.as_str()) {
        parts[n - 3]
    } else if n >= 2 {
        if (n > 2 && parts[0] == "www") || COMMON_TLDS.contains(&parts[n - 1]) {
            parts[n - 2]
        } else {
            parts[1]
        }
    } else {
        parts[0]
    };

    let base: String = main
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if base.is_empty() {
        return Err(RagError::Validation(format!(
            "cannot derive a namespace from '{}'",
            url
        )));
    }

    Ok(format!("{}{}", base, NAMESPACE_SUFFIX))
}

fn host_of(url: &str) -> String {
    let without_scheme = url.trim().rsplit("//").next().unwrap_or_default();
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    host.to_lowercase()
}
