use crate::{UrlError, UrlResult};
use url::Url;

/// Derives the object-store key for a resource URL
///
/// The key is the final path segment, percent-decoded except for escapes of
/// reserved characters (`; / ? : @ & = + $ , #`), which stay encoded. A key
/// therefore never contains a path separator. Distinct URLs that end in the
/// same file name share a key, and the later upload overwrites the earlier
/// object.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::storage_key;
///
/// let key = storage_key("https://example.test/images/a/ab/Cover%20Art.png").unwrap();
/// assert_eq!(key, "Cover Art.png");
///
/// let key = storage_key("https://example.test/images/AC%2FDC.png").unwrap();
/// assert_eq!(key, "AC%2FDC.png");
/// ```
pub fn storage_key(resource_url: &str) -> UrlResult<String> {
    let url = Url::parse(resource_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    if segment.is_empty() {
        return Err(UrlError::Malformed(format!(
            "no file name in '{}'",
            resource_url
        )));
    }

    Ok(decode_file_name(segment))
}

/// Bytes whose escapes are left encoded in file names
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Percent-decodes `segment`, keeping escapes of reserved characters
fn decode_file_name(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = String::with_capacity(segment.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match escaped_byte(bytes, i) {
            Some(byte) if RESERVED.contains(&byte) => {
                decoded.push_str(&decode_run(&segment[start..i]));
                decoded.push_str(&segment[i..i + 3]);
                i += 3;
                start = i;
            }
            _ => i += 1,
        }
    }

    decoded.push_str(&decode_run(&segment[start..]));
    decoded
}

/// The byte encoded by a `%XX` escape starting at `at`, if there is one
fn escaped_byte(bytes: &[u8], at: usize) -> Option<u8> {
    if bytes.get(at) != Some(&b'%') {
        return None;
    }

    let hex = bytes.get(at + 1..at + 3)?;
    if !hex.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }

    u8::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()
}

// Invalid UTF-8 after decoding keeps the raw run
fn decode_run(run: &str) -> String {
    urlencoding::decode(run)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| run.to_string())
}

/// Guesses the content type of a resource from its URL path
///
/// Unknown extensions fall back to `application/octet-stream`.
pub fn content_type_for(resource_url: &str) -> String {
    let path = Url::parse(resource_url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| resource_url.to_string());

    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
