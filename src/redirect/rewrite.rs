//! Native rewrite of redirect anchors in captured HTML.
//!
//! This is the static counterpart of the in-page engine: the same
//! redirect-anchor test and decoder, applied to an HTML document captured
//! from a live page or fetched over plain HTTP. The document is parsed once
//! to identify redirect anchors, then the raw text is patched
//! attribute-by-attribute so the rest of the markup survives byte-identical.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::core::types::RewrittenLink;

use super::{decode_redirect_target, is_redirect_url, redirect_target};

/// Result of one rewrite pass.
#[derive(Debug)]
pub struct RewriteOutcome {
    /// The document with every redirect anchor pointed at its destination.
    pub html: String,
    /// One entry per rewritten anchor, in document order.
    pub links: Vec<RewrittenLink>,
    /// Anchors inspected, matching or not.
    pub anchors_scanned: usize,
}

fn href_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href=(?:"([^"]*)"|'([^']*)')"#).expect("valid pattern"))
}

/// Scan every anchor in `html`, rewriting those whose resolved address is a
/// redirect anchor to the decoded destination. An anchor whose href fails to
/// parse is skipped; a parse failure on one link never aborts the scan.
pub fn rewrite_document(html: &str, base_url: &Url) -> RewriteOutcome {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("valid selector");

    // Keyed by the href attribute value as written (entities resolved, percent
    // layers intact) so the patching pass below can match raw attributes.
    let mut replacements: HashMap<String, String> = HashMap::new();
    let mut links = Vec::new();
    let mut anchors_scanned = 0usize;

    for element in document.select(&selector) {
        anchors_scanned += 1;
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let resolved = match base_url.join(href) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("skipping anchor with unparseable href {href:?}: {e}");
                continue;
            }
        };
        if !is_redirect_url(&resolved) {
            continue;
        }
        let Some(raw_target) = redirect_target(&resolved) else {
            continue;
        };
        let target = decode_redirect_target(&raw_target);
        let text = element.text().collect::<String>().trim().to_string();
        replacements.insert(href.to_string(), target.clone());
        links.push(RewrittenLink {
            original: resolved.into(),
            target,
            text,
        });
    }

    let html = if replacements.is_empty() {
        html.to_string()
    } else {
        patch_href_attributes(html, &replacements)
    };

    info!(
        "rewrote {} of {} anchors to direct destinations",
        links.len(),
        anchors_scanned
    );

    RewriteOutcome {
        html,
        links,
        anchors_scanned,
    }
}

/// Substitute the collected replacements into the raw document text. Only
/// href values observed on redirect anchors during the scan are touched;
/// everything else — including `href` on non-anchor elements — passes through
/// untouched because no replacement is keyed to it.
fn patch_href_attributes(html: &str, replacements: &HashMap<String, String>) -> String {
    href_attr_re()
        .replace_all(html, |caps: &Captures<'_>| {
            let (raw, quote) = match (caps.get(1), caps.get(2)) {
                (Some(m), _) => (m.as_str(), '"'),
                (_, Some(m)) => (m.as_str(), '\''),
                _ => return caps[0].to_string(),
            };
            match replacements.get(&unescape_attr(raw)) {
                Some(target) => format!("href={q}{v}{q}", q = quote, v = escape_attr(target, quote)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Minimal entity handling for attribute values: `&amp;` is the only entity
/// the redirector URLs carry in the wild.
fn unescape_attr(value: &str) -> String {
    value.replace("&amp;", "&")
}

fn escape_attr(value: &str, quote: char) -> String {
    let escaped = value.replace('&', "&amp;");
    match quote {
        '"' => escaped.replace('"', "&quot;"),
        '\'' => escaped.replace('\'', "&#39;"),
        _ => escaped,
    }
}
