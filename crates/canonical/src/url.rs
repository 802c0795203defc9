//! Canonical URL derivation.
//!
//! Two URLs that differ only in scheme/host case, default port, fragment,
//! trailing slash, or tracker query parameters must hash to the same
//! `canonical_url_hash` — this is tested end-to-end in scenario A of the
//! dedup property suite.

use url::Url;

const TRACKER_KEYS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref", "ref_src"];

/// Canonicalizes a raw URL string per the normalizer's rules, or `None` if
/// the input does not parse as a URL at all. A parse failure is not an
/// error — `canonical_url` is an optional field on `Article`.
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;

    url.set_fragment(None);

    let scheme = url.scheme().to_ascii_lowercase();
    let _ = url.set_scheme(&scheme);

    if let Some(host) = url.host_str() {
        let host = host.to_ascii_lowercase();
        let _ = url.set_host(Some(&host));
    }

    if is_default_port(&scheme, url.port()) {
        let _ = url.set_port(None);
    }

    let collapsed_path = collapse_slashes(url.path());
    let path = strip_trailing_slash(&collapsed_path);
    url.set_path(&path);

    prune_and_sort_query(&mut url);

    Some(url.to_string())
}

fn is_default_port(scheme: &str, port: Option<u16>) -> bool {
    match (scheme, port) {
        ("http", Some(80)) => true,
        ("https", Some(443)) => true,
        _ => false,
    }
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

fn strip_trailing_slash(path: &str) -> String {
    if path == "/" {
        path.to_string()
    } else if let Some(stripped) = path.strip_suffix('/') {
        stripped.to_string()
    } else {
        path.to_string()
    }
}

fn is_tracker_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.starts_with("utm_") || TRACKER_KEYS.contains(&lower.as_str())
}

fn prune_and_sort_query(url: &mut Url) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracker_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
        return;
    }

    let mut sorted = kept;
    sorted.sort();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &sorted {
        pairs.append_pair(k, v);
    }
    drop(pairs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_and_host_are_lowercased() {
        let a = canonicalize_url("https://Example.COM/news/path").unwrap();
        let b = canonicalize_url("HTTPS://example.com/news/path").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn default_port_is_stripped() {
        let a = canonicalize_url("https://example.com:443/news").unwrap();
        let b = canonicalize_url("https://example.com/news").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fragment_is_dropped() {
        let a = canonicalize_url("https://example.com/news#section").unwrap();
        let b = canonicalize_url("https://example.com/news").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_slash_is_stripped_unless_root() {
        let a = canonicalize_url("https://example.com/news/path/").unwrap();
        let b = canonicalize_url("https://example.com/news/path").unwrap();
        assert_eq!(a, b);

        let root = canonicalize_url("https://example.com/").unwrap();
        assert!(root.ends_with('/'));
    }

    #[test]
    fn tracker_params_are_stripped_and_remainder_sorted() {
        let a = canonicalize_url("https://example.com/news/path/?utm_source=x&b=2&a=1").unwrap();
        let b = canonicalize_url("https://example.com/news/path?a=1&b=2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn combination_of_all_equivalence_preserving_differences() {
        let a =
            canonicalize_url("https://Example.COM:443/news/path/?utm_source=x&b=2&a=1").unwrap();
        let b = canonicalize_url("https://example.com/news/path?a=1&b=2#frag").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unparseable_url_returns_none() {
        assert_eq!(canonicalize_url("not a url"), None);
    }

    #[test]
    fn non_default_port_is_preserved() {
        let a = canonicalize_url("https://example.com:8443/news").unwrap();
        assert!(a.contains("8443"));
    }
}
