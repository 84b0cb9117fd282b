/// URL classification and display names for Tab Wise
use url::Url;

/// Brand names for domains whose second-level label reads poorly
const KNOWN_DOMAINS: [(&str, &str); 10] = [
    ("google.com", "Google"),
    ("youtube.com", "YouTube"),
    ("github.com", "GitHub"),
    ("stackoverflow.com", "Stack Overflow"),
    ("facebook.com", "Facebook"),
    ("twitter.com", "Twitter"),
    ("linkedin.com", "LinkedIn"),
    ("reddit.com", "Reddit"),
    ("amazon.com", "Amazon"),
    ("netflix.com", "Netflix"),
];

pub const CHROME_GROUP: &str = "Chrome";
pub const LOCAL_FILES_GROUP: &str = "Local Files";
pub const OTHER_GROUP: &str = "Other";

/// Grey square shown when a tab or group has no favicon
pub const DEFAULT_FAVICON: &str = "data:image/svg+xml,<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 16 16\"><rect width=\"16\" height=\"16\" fill=\"%23ddd\"/></svg>";

/// What a tab URL points at, as far as domain grouping cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    /// chrome:// and chrome-extension:// pages
    Browser,
    /// file:// URLs
    LocalFile,
    /// Anything with a hostname, `www.` already stripped
    Web(String),
    /// Not a URL at all, or a URL without a host
    Unparsable,
}

/// Parse a tab URL, returning None for anything the URL parser rejects
pub fn parse_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim()).ok()
}

/// Classify a tab URL
///
/// Scheme checks run before host extraction, so `chrome://newtab` is a
/// browser page even though it has a host.
pub fn classify_url(raw: &str) -> UrlKind {
    let Some(url) = parse_url(raw) else {
        return UrlKind::Unparsable;
    };

    match url.scheme() {
        "chrome" | "chrome-extension" => UrlKind::Browser,
        "file" => UrlKind::LocalFile,
        _ => match url.host_str() {
            Some(host) if !host.is_empty() => UrlKind::Web(strip_www(host).to_string()),
            _ => UrlKind::Unparsable,
        },
    }
}

/// Remove one leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Display name of the domain group a URL falls into
///
/// Examples:
/// - chrome://extensions → Chrome
/// - file:///home/x.html → Local Files
/// - https://www.github.com/rust-lang → GitHub
/// - https://blog.example.com → Example
/// - "" → Other
pub fn domain_group_name(raw: &str) -> String {
    match classify_url(raw) {
        UrlKind::Browser => CHROME_GROUP.to_string(),
        UrlKind::LocalFile => LOCAL_FILES_GROUP.to_string(),
        UrlKind::Web(host) => prettify_domain(&host),
        UrlKind::Unparsable => OTHER_GROUP.to_string(),
    }
}

/// Turn a bare domain into a readable label
///
/// Algorithm:
/// 1. Known brands map straight to their name (github.com → GitHub)
/// 2. Otherwise split on "."
/// 3. With three or more labels take the second-to-last, else the first
/// 4. Capitalize its first letter
///
/// The second-to-last rule means `bbc.co.uk` reads as "Co"; callers live with it.
pub fn prettify_domain(domain: &str) -> String {
    if let Some((_, name)) = KNOWN_DOMAINS.iter().find(|(known, _)| *known == domain) {
        return name.to_string();
    }

    let parts: Vec<&str> = domain.split('.').collect();
    let main = if parts.len() > 2 {
        parts[parts.len() - 2]
    } else {
        parts[0]
    };

    capitalize(main)
}

/// Uppercase the first character, leave the rest alone
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Favicon to render for a tab or group
pub fn favicon_or_default(favicon: Option<&str>) -> &str {
    match favicon {
        Some(icon) if !icon.trim().is_empty() => icon,
        _ => DEFAULT_FAVICON,
    }
}
