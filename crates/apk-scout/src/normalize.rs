//! URL canonicalization.
//!
//! Undoes the wrapping the translation mirror applies to every link it
//! serves: percent-encoding, `?u=<target>` indirection, the mirror
//! authority, and the `_x_tr_*` query parameters. Also builds the proxied
//! form of a canonical URL for the opposite direction.
//!
//! [`Normalizer::normalize`] is total and idempotent: any string maps to a
//! string, and normalizing a normalized URL is a no-op.

use tracing::debug;
use url::Url;

use crate::config::SiteConfig;

/// Converts between canonical, proxied, and wrapped forms of site URLs.
#[derive(Debug, Clone)]
pub struct Normalizer {
    site: SiteConfig,
    canonical_authority: String,
    mirror_authority: String,
    canonical_scheme: String,
}

impl Normalizer {
    pub fn new(site: SiteConfig) -> Self {
        let canonical_authority = authority_of(&site.canonical_base);
        let mirror_authority = authority_of(&site.mirror_base);
        let canonical_scheme = site
            .canonical_base
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_else(|| "https".to_string());
        Self {
            site,
            canonical_authority,
            mirror_authority,
            canonical_scheme,
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Canonical form of `raw`. Never fails; empty input yields empty output.
    pub fn normalize(&self, raw: &str) -> String {
        self.normalize_at(raw, 0)
    }

    fn normalize_at(&self, raw: &str, depth: usize) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }

        // The raw form keeps the wrapped target's own query intact, so look there first.
        if let Some(inner) = self.unwrap_indirection(raw) {
            return self.descend(&inner, depth);
        }

        let decoded = decode_fully(raw);
        let decoded = decoded.trim();
        if let Some(inner) = self.unwrap_indirection(decoded) {
            return self.descend(&inner, depth);
        }

        // Absolutizing can expose a wrapper, e.g. a protocol-relative one.
        let cleaned = self.clean(decoded);
        if let Some(inner) = self.unwrap_indirection(&cleaned) {
            return self.descend(&inner, depth);
        }
        cleaned
    }

    fn descend(&self, inner: &str, depth: usize) -> String {
        if depth >= self.site.max_indirection_depth {
            debug!(depth, "indirection nested too deep, discarding url");
            return String::new();
        }
        self.normalize_at(inner, depth + 1)
    }

    /// Target of an indirection wrapper such as `https://translate.google.com/website?u=...`.
    fn unwrap_indirection(&self, s: &str) -> Option<String> {
        let marker = self.site.indirection_marker.as_str();
        let path = self.site.indirection_path.as_str();
        if marker.is_empty() || !s.contains(marker) || !s.contains(path) {
            return None;
        }
        let parsed = match s.strip_prefix("//") {
            Some(rest) => Url::parse(&format!("{}://{rest}", self.canonical_scheme)),
            None => Url::parse(s),
        }
        .ok()?;
        let host = parsed.host_str()?;
        if !host.contains(marker) || !parsed.path().contains(path) {
            return None;
        }
        parsed
            .query_pairs()
            .find(|(k, _)| k == self.site.indirection_param.as_str())
            .map(|(_, v)| v.into_owned())
    }

    fn clean(&self, s: &str) -> String {
        let rewritten = replace_authority(s, &self.mirror_authority, &self.canonical_authority);
        let stripped = strip_prefixed_params(&rewritten, &self.site.translation_param_prefix);

        let absolute = if stripped.starts_with("//") {
            format!("{}:{}", self.canonical_scheme, stripped)
        } else if stripped.starts_with('/') {
            format!("{}{}", self.site.canonical_base, stripped)
        } else {
            stripped
        };
        absolute.trim().to_string()
    }

    /// Mirror form of a canonical URL, with the translation parameters appended.
    pub fn proxied(&self, url: &str) -> String {
        let base = self.site.canonical_base.as_str();
        let mut target = match url.strip_prefix(base) {
            Some(rest) if rest.is_empty() || rest.starts_with(['/', '?', '#']) => {
                format!("{}{}", self.site.mirror_base, rest)
            }
            _ => url.to_string(),
        };
        let query = self.translation_query();
        if !query.is_empty() {
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&query);
        }
        target
    }

    /// `k=v&k=v` form of the configured translation parameters.
    pub fn translation_query(&self) -> String {
        self.site
            .translation_params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// `host[:port]` of a base URL, lowercased.
fn authority_of(base: &str) -> String {
    let rest = base.split_once("://").map(|(_, r)| r).unwrap_or(base);
    rest.split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Percent-decode until nothing changes.
///
/// Terminates: each changing round shortens the string or removes a `%`
/// (invalid UTF-8 becomes U+FFFD, which is never longer than its escape).
fn decode_fully(s: &str) -> String {
    let mut current = s.to_string();
    while current.contains('%') {
        let bytes = urlencoding::decode_binary(current.as_bytes());
        let decoded = String::from_utf8_lossy(&bytes).into_owned();
        if decoded == current {
            break;
        }
        current = decoded;
    }
    current
}

/// Replace whole-authority occurrences of `from` (lowercase) with `to`.
fn replace_authority(input: &str, from: &str, to: &str) -> String {
    if from.is_empty() || from == to {
        return input.to_string();
    }
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for (idx, _) in lower.match_indices(from) {
        let end = idx + from.len();
        let before_ok = lower[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '-'));
        let after_ok = lower[end..]
            .chars()
            .next()
            .map_or(true, |c| matches!(c, '/' | '?' | '#' | ':'));
        if before_ok && after_ok {
            out.push_str(&input[last..idx]);
            out.push_str(to);
            last = end;
        }
    }
    out.push_str(&input[last..]);
    out
}

/// Drop every query parameter whose name starts with `prefix`, including
/// parameters appended after a second `?`. The fragment is kept.
fn strip_prefixed_params(s: &str, prefix: &str) -> String {
    let (main, fragment) = match s.split_once('#') {
        Some((m, f)) => (m, Some(f)),
        None => (s, None),
    };
    let Some((base, query)) = main.split_once('?') else {
        return s.to_string();
    };

    let params: Vec<&str> = query.split(['&', '?']).collect();
    if !params.iter().any(|p| p.starts_with(prefix)) {
        return s.to_string();
    }

    let kept: Vec<&str> = params
        .into_iter()
        .filter(|p| !p.is_empty() && !p.starts_with(prefix))
        .collect();

    let mut out = base.to_string();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(SiteConfig::default())
    }

    fn wrap(url: &str) -> String {
        format!(
            "https://translate.google.com/website?sl=auto&tl=en&u={}",
            urlencoding::encode(url)
        )
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalizer().normalize(""), "");
        assert_eq!(normalizer().normalize("   "), "");
    }

    #[test]
    fn test_canonical_url_unchanged() {
        let url = "https://gamekillerapp.com/minecraft-pe";
        assert_eq!(normalizer().normalize(url), url);
    }

    #[test]
    fn test_mirror_rewritten_and_params_stripped() {
        let n = normalizer();
        assert_eq!(
            n.normalize("https://gamekillerapp-com.translate.goog/minecraft?_x_tr_sl=auto&_x_tr_tl=en&_x_tr_hl=en"),
            "https://gamekillerapp.com/minecraft"
        );
        assert_eq!(
            n.normalize("https://gamekillerapp-com.translate.goog/a?page=2&_x_tr_sl=auto&_x_tr_hl=en"),
            "https://gamekillerapp.com/a?page=2"
        );
    }

    #[test]
    fn test_params_after_second_question_mark() {
        assert_eq!(
            normalizer().normalize("https://gamekillerapp.com/a?id=1?_x_tr_sl=auto&lang=en"),
            "https://gamekillerapp.com/a?id=1&lang=en"
        );
    }

    #[test]
    fn test_fragment_preserved() {
        assert_eq!(
            normalizer().normalize("https://gamekillerapp-com.translate.goog/a?_x_tr_sl=auto#files"),
            "https://gamekillerapp.com/a#files"
        );
    }

    #[test]
    fn test_root_relative() {
        let n = normalizer();
        assert_eq!(n.normalize("/download/minecraft"), "https://gamekillerapp.com/download/minecraft");
        assert_eq!(n.normalize("//cdn.example/a.png"), "https://cdn.example/a.png");
    }

    #[test]
    fn test_percent_decoded() {
        assert_eq!(
            normalizer().normalize("https%3A%2F%2Fgamekillerapp.com%2Fsearch%2Fsky%20world"),
            "https://gamekillerapp.com/search/sky world"
        );
    }

    #[test]
    fn test_single_wrapper() {
        let inner = "https://gamekillerapp-com.translate.goog/app?ref=1&_x_tr_sl=auto";
        assert_eq!(
            normalizer().normalize(&wrap(inner)),
            "https://gamekillerapp.com/app?ref=1"
        );
    }

    #[test]
    fn test_double_wrapper() {
        let inner = "https://gamekillerapp.com/app/download?id=7&v=2";
        assert_eq!(normalizer().normalize(&wrap(&wrap(inner))), inner);
    }

    #[test]
    fn test_fully_encoded_wrapper() {
        let inner = "https://gamekillerapp.com/app";
        let encoded = urlencoding::encode(&wrap(inner)).into_owned();
        assert_eq!(normalizer().normalize(&encoded), inner);
    }

    #[test]
    fn test_protocol_relative_wrapper() {
        let n = normalizer();
        assert_eq!(
            n.normalize("//translate.google.com/website?u=https%3A%2F%2Fgamekillerapp.com%2Fapp"),
            "https://gamekillerapp.com/app"
        );
        let inner = format!("//{}", wrap("https://gamekillerapp.com/app").trim_start_matches("https://"));
        assert_eq!(n.normalize(&inner), "https://gamekillerapp.com/app");

        let with_query = format!(
            "//translate.google.com/website?u={}",
            urlencoding::encode("https://gamekillerapp.com/app?a=1&b=2")
        );
        assert_eq!(n.normalize(&with_query), "https://gamekillerapp.com/app?a=1&b=2");
    }

    #[test]
    fn test_depth_cap() {
        let n = normalizer();
        let cap = n.site().max_indirection_depth;

        let mut within = "https://gamekillerapp.com/app".to_string();
        for _ in 0..cap {
            within = wrap(&within);
        }
        assert_eq!(n.normalize(&within), "https://gamekillerapp.com/app");

        let too_deep = wrap(&within);
        assert_eq!(n.normalize(&too_deep), "");
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let mut url = "https://gamekillerapp.com/app".to_string();
        for _ in 0..200 {
            url = format!("https://translate.google.com/website?u={url}");
        }
        let out = normalizer().normalize(&url);
        assert_eq!(normalizer().normalize(&out), out);
    }

    #[test]
    fn test_authority_boundaries() {
        assert_eq!(
            replace_authority("http://127.0.0.1:4000/a", "127.0.0.1:4000", "127.0.0.1:5000"),
            "http://127.0.0.1:5000/a"
        );
        assert_eq!(
            replace_authority("http://127.0.0.1:40001/a", "127.0.0.1:4000", "127.0.0.1:5000"),
            "http://127.0.0.1:40001/a"
        );
        assert_eq!(
            replace_authority("https://xgamekillerapp-com.translate.goog/", "gamekillerapp-com.translate.goog", "gamekillerapp.com"),
            "https://xgamekillerapp-com.translate.goog/"
        );
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        let inputs = [
            "",
            "https://gamekillerapp.com/",
            "/relative/path?x=1",
            "//cdn.example/x",
            "https://gamekillerapp-com.translate.goog/a?_x_tr_sl=auto",
            "https%253A%252F%252Fgamekillerapp.com%252Fa",
            "%FF%FE%zz",
            "%25%25%2541",
            "https://translate.google.com/website?u=",
            "https://translate.google.com/website?x=1",
            "google /website u= not a url",
            "a?&&_x_tr_sl=1&&b= ",
            "ünïcødé/path?_x_tr_hl=en#frag?x",
            &wrap(&wrap("/relative?_x_tr_tl=en&k=v")),
            "//translate.google.com/website?u=https%3A%2F%2Fgamekillerapp.com%2Fapp",
            "//gamekillerapp-com.translate.goog/a?_x_tr_sl=auto",
        ];
        for input in inputs {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_proxied() {
        let n = normalizer();
        assert_eq!(
            n.proxied("https://gamekillerapp.com/minecraft"),
            "https://gamekillerapp-com.translate.goog/minecraft?_x_tr_sl=auto&_x_tr_tl=en&_x_tr_hl=en"
        );
        assert_eq!(
            n.proxied("https://gamekillerapp.com/minecraft/download?id=3"),
            "https://gamekillerapp-com.translate.goog/minecraft/download?id=3&_x_tr_sl=auto&_x_tr_tl=en&_x_tr_hl=en"
        );
        assert!(n
            .proxied("https://gamekillerapp.community/x")
            .starts_with("https://gamekillerapp.community/x?"));
    }

    #[test]
    fn test_proxied_round_trips_through_normalize() {
        let n = normalizer();
        let url = "https://gamekillerapp.com/minecraft/download?id=3";
        assert_eq!(n.normalize(&n.proxied(url)), url);
    }
}
