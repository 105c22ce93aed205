use url::Url;

/// Resolves an extracted href to an absolute URL
///
/// Root-relative hrefs are appended to the origin verbatim so that ledger
/// entries keep the exact form the site links with. Absolute http(s) hrefs are
/// kept as they are.
///
/// Returns None if the link should be skipped:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - hrefs that cannot be resolved against the current page
///
/// # Arguments
///
/// * `origin` - The crawl origin, e.g. `https://example.test`
/// * `page_url` - The absolute URL of the page the href was found on
/// * `href` - The raw attribute value
pub fn resolve_href(origin: &str, page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Some(href.to_string());
    }

    if let Some(rest) = href.strip_prefix("//") {
        let scheme = origin.split("://").next().unwrap_or("https");
        return Some(format!("{}://{}", scheme, rest));
    }

    if href.starts_with('/') {
        return Some(format!("{}{}", origin, href));
    }

    // Document-relative: resolve against the page it was found on
    let base = Url::parse(page_url).ok()?;
    let joined = base.join(href).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}

/// Returns the path+query of `url` if it lives on `origin`
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::path_on_origin;
///
/// assert_eq!(
///     path_on_origin("https://example.test", "https://example.test/cat?page=2"),
///     Some("/cat?page=2".to_string())
/// );
/// assert_eq!(path_on_origin("https://example.test", "https://other.test/cat"), None);
/// ```
pub fn path_on_origin(origin: &str, url: &str) -> Option<String> {
    let rest = url.strip_prefix(origin)?;
    let rest = rest.split('#').next().unwrap_or_default();

    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else if rest.starts_with('?') {
        Some(format!("/{}", rest))
    } else {
        // e.g. https://example.test.evil.com when the origin is https://example.test
        None
    }
}
