//! The in-page engine: a document-start script carrying the whole bypass.
//!
//! The script runs inside the page, before any host-page script, and owns the
//! pieces that must react synchronously to DOM events: the rewrite pass over
//! existing and newly-injected anchors, the capture-phase click interceptor,
//! the interstitial suppressor, and the user-agent mask. It is assembled from
//! a template so every pattern and threshold stays defined once, in
//! `redirect`, shared with the native engine.

use crate::redirect;

const PAGE_SCRIPT_TEMPLATE: &str = r#"
(() => {
    'use strict';

    if (!location.href.startsWith('__MATCH_PREFIX__')) {
        return;
    }

    const TAG = '[zhihu-direct]';

    // Masquerade as ordinary traffic before any page script can sample the
    // UA, and pin the property so the host page cannot restore it.
    try {
        Object.defineProperty(navigator, 'userAgent', {
            value: navigator.userAgent.replace(/__UA_MARKER_PATTERN__/, ''),
            configurable: false,
            enumerable: true,
            writable: false
        });
    } catch (e) {
        console.warn(TAG, 'user-agent mask failed:', e);
    }

    // Peel percent-encoding layer by layer; a long http%3A wrapper carrying a
    // b64= field short-circuits to the base64 payload at whichever layer it
    // surfaces. Any malformed layer keeps the raw value.
    const decodeTarget = (raw) => {
        try {
            let decoded = raw;
            for (;;) {
                if (decoded.startsWith('__B64_PREFIX__') && decoded.length > __B64_MIN_CHARS__) {
                    const wrapped = decoded.match(/b64=([^&]*)/);
                    if (wrapped) {
                        return atob(wrapped[1]);
                    }
                }
                if (!/%[0-9A-Fa-f]{2}/.test(decoded)) {
                    return decoded;
                }
                decoded = decodeURIComponent(decoded);
            }
        } catch (e) {
            console.warn(TAG, 'target decode failed:', e);
            return raw;
        }
    };

    const rewriteAnchors = () => {
        document.querySelectorAll('a').forEach((link) => {
            try {
                const parsed = new URL(link.href);
                const isRedirect =
                    parsed.hostname === '__REDIRECT_HOST__' ||
                    parsed.pathname === '__REDIRECT_API_PATH__';
                if (!isRedirect || !parsed.searchParams.has('__TARGET_PARAM__')) {
                    return;
                }
                const fresh = link.cloneNode(true);
                fresh.href = decodeTarget(parsed.searchParams.get('__TARGET_PARAM__'));
                // Rebuild from the clone's children so no host-page click
                // handler survives on the replacement node.
                fresh.replaceWith(...fresh.childNodes);
                link.parentNode.replaceChild(fresh, link);
            } catch (e) {
                // unparseable href: leave the anchor alone
            }
        });
    };

    // Re-apply the rewrite whenever the host page injects new content.
    const observer = new MutationObserver((mutations) => {
        if (mutations.some((mutation) => mutation.type === 'childList')) {
            rewriteAnchors();
        }
    });
    observer.observe(document, {
        subtree: true,
        childList: true,
        attributes: false,
        characterData: false
    });

    rewriteAnchors();

    // Safety net for anchors clicked before a mutation callback has run:
    // capture phase, so this fires ahead of every host-page handler.
    document.addEventListener('click', (event) => {
        const link = event.target.closest('a');
        if (!link || !link.href) {
            return;
        }
        const href = link.href;
        if (!(href.includes('__CLICK_HOST_FRAGMENT__') || href.includes('__CLICK_PATH_FRAGMENT__'))) {
            return;
        }
        event.stopImmediatePropagation();
        event.preventDefault();
        let target = href;
        try {
            target = new URL(href).searchParams.get('__TARGET_PARAM__') || href;
        } catch (e) {}
        window.location.href = decodeTarget(target);
    }, true);

    // Keep the interstitial modals and blocking dialogs out of the way.
    setInterval(() => {
        document.querySelectorAll('__MODAL_SELECTORS__').forEach((modal) => modal.remove());
        window.alert = () => {};
        window.confirm = () => true;
    }, __SUPPRESSOR_INTERVAL_MS__);
})();
"#;

const ANCHOR_PROBE_TEMPLATE: &str = r#"
Array.from(document.querySelectorAll('a')).filter((link) => {
    try {
        const parsed = new URL(link.href);
        return (parsed.hostname === '__REDIRECT_HOST__' ||
                parsed.pathname === '__REDIRECT_API_PATH__') &&
               parsed.searchParams.has('__TARGET_PARAM__');
    } catch (e) {
        return false;
    }
}).length
"#;

/// Render the full page script with the shared constants spliced in.
pub fn page_script() -> String {
    splice(PAGE_SCRIPT_TEMPLATE)
}

/// JS expression counting anchors still pointing at the interstitial — the
/// post-navigation verification probe.
pub fn remaining_anchor_probe() -> String {
    splice(ANCHOR_PROBE_TEMPLATE)
}

fn splice(template: &str) -> String {
    template
        .replace("__MATCH_PREFIX__", redirect::MATCH_PREFIX)
        .replace("__REDIRECT_HOST__", redirect::REDIRECT_HOST)
        .replace("__REDIRECT_API_PATH__", redirect::REDIRECT_API_PATH)
        .replace("__TARGET_PARAM__", redirect::TARGET_PARAM)
        .replace("__B64_PREFIX__", redirect::B64_WRAPPER_PREFIX)
        .replace("__B64_MIN_CHARS__", &redirect::B64_WRAPPER_MIN_CHARS.to_string())
        .replace("__CLICK_HOST_FRAGMENT__", redirect::CLICK_HOST_FRAGMENT)
        .replace("__CLICK_PATH_FRAGMENT__", redirect::CLICK_PATH_FRAGMENT)
        .replace("__MODAL_SELECTORS__", redirect::MODAL_SELECTORS)
        .replace(
            "__SUPPRESSOR_INTERVAL_MS__",
            &redirect::SUPPRESSOR_INTERVAL_MS.to_string(),
        )
        .replace("__UA_MARKER_PATTERN__", redirect::UA_MARKER_PATTERN)
}
