//! Redirect-anchor identification for the Zhihu column outbound-link
//! interstitial.
//!
//! The constants here are the single definition of the redirector pattern and
//! the decoding heuristics. The in-page engine (`browser::inject`) splices the
//! same values into its script template, so the native and in-page halves can
//! never drift apart.

pub mod decode;
pub mod rewrite;

pub use decode::decode_redirect_target;
pub use rewrite::{rewrite_document, RewriteOutcome};

use url::Url;

/// Hostname of the interstitial redirector.
pub const REDIRECT_HOST: &str = "link.zhihu.com";
/// Path of the platform-API redirect endpoint (matched on any host).
pub const REDIRECT_API_PATH: &str = "/platform-api/redirect";
/// Query parameter carrying the encoded destination.
pub const TARGET_PARAM: &str = "target";
/// Address prefix the in-page engine activates on.
pub const MATCH_PREFIX: &str = "https://zhuanlan.zhihu.com/";

/// Loose href fragments the click interceptor tests for. Substring matches on
/// the raw href, deliberately wider than the parsed-URL test above so clicks
/// are caught even on anchors the rewrite pass has not reached yet.
pub const CLICK_HOST_FRAGMENT: &str = "link.zhihu.com";
pub const CLICK_PATH_FRAGMENT: &str = "redirect/target";

/// Interstitial/modal selectors removed by the suppressor.
pub const MODAL_SELECTORS: &str = ".Modal-wrapper, .SecurityModal";
/// Suppressor timer period.
pub const SUPPRESSOR_INTERVAL_MS: u64 = 500;

/// Automation markers scrubbed from the reported user agent.
pub const UA_MARKER_PATTERN: &str = "Tampermonkey|HeadlessChrome";

/// Marker prefix of a wrapper value that carries a base64 payload.
pub const B64_WRAPPER_PREFIX: &str = "http%3A";
/// Wrapper values at or below this length never carry a base64 payload.
pub const B64_WRAPPER_MIN_CHARS: usize = 100;

/// Redirect-anchor test: the interstitial host or the platform-API path,
/// carrying a `target` parameter.
pub fn is_redirect_url(url: &Url) -> bool {
    let matches_redirector =
        url.host_str() == Some(REDIRECT_HOST) || url.path() == REDIRECT_API_PATH;
    matches_redirector && redirect_target(url).is_some()
}

/// The `target` query value, percent-decoded once by the URL parser. Peeling
/// the remaining layers is [`decode_redirect_target`]'s job.
pub fn redirect_target(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key.as_ref() == TARGET_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// The click interceptor's pattern: fragment match on the raw href rather
/// than a parsed-URL comparison.
pub fn href_matches_click_pattern(href: &str) -> bool {
    href.contains(CLICK_HOST_FRAGMENT) || href.contains(CLICK_PATH_FRAGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirector_host_with_target_matches() {
        let url = Url::parse("https://link.zhihu.com/?target=https%3A%2F%2Fexample.com").unwrap();
        assert!(is_redirect_url(&url));
        assert_eq!(
            redirect_target(&url).as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn platform_api_path_matches_on_any_host() {
        let url =
            Url::parse("https://www.zhihu.com/platform-api/redirect?target=https%3A%2F%2Fa.io")
                .unwrap();
        assert!(is_redirect_url(&url));
    }

    #[test]
    fn redirector_host_without_target_does_not_match() {
        let url = Url::parse("https://link.zhihu.com/?other=1").unwrap();
        assert!(!is_redirect_url(&url));
        assert!(redirect_target(&url).is_none());
    }

    #[test]
    fn ordinary_host_does_not_match() {
        let url = Url::parse("https://example.com/?target=https%3A%2F%2Fa.io").unwrap();
        assert!(!is_redirect_url(&url));
    }

    #[test]
    fn click_pattern_is_a_fragment_match() {
        assert!(href_matches_click_pattern(
            "https://link.zhihu.com/?target=x"
        ));
        assert!(href_matches_click_pattern(
            "https://www.zhihu.com/api/redirect/target?x=1"
        ));
        assert!(!href_matches_click_pattern("https://example.com/"));
    }
}
