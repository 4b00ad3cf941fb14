/// Integration tests: the native engine end-to-end over fixture documents —
/// redirect matching, layered decoding, and document patching together.
use url::Url;
use zhihu_direct::{decode_redirect_target, rewrite_document, RewriteReport};

// Initialize logging for tests
fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn column_base() -> Url {
    Url::parse("https://zhuanlan.zhihu.com/p/987654").unwrap()
}

#[test]
fn article_fixture_is_rewritten_to_direct_destinations() {
    init_logger();

    let html = r#"<!DOCTYPE html>
<html>
<body>
  <article>
    <p>Source is on
      <a class="external" target="_blank" rel="noopener"
         href="https://link.zhihu.com/?target=https%3A%2F%2Fgithub.com%2Frust-lang%2Frust">GitHub</a>
      and docs are
      <a href="https://link.zhihu.com/?target=https%253A%252F%252Fdoc.rust-lang.org%252Fbook%252F">here</a>.
    </p>
    <p>Internal <a href="https://zhuanlan.zhihu.com/p/111">column link</a> and
       <a href="https://link.zhihu.com/?utm=1">bare redirector</a> stay put.</p>
  </article>
</body>
</html>"#;

    let outcome = rewrite_document(html, &column_base());

    assert_eq!(outcome.anchors_scanned, 4);
    assert_eq!(outcome.links.len(), 2);

    assert_eq!(outcome.links[0].target, "https://github.com/rust-lang/rust");
    assert_eq!(outcome.links[0].text, "GitHub");
    // Double-encoded layer peeled all the way down.
    assert_eq!(outcome.links[1].target, "https://doc.rust-lang.org/book/");

    assert!(outcome
        .html
        .contains(r#"href="https://github.com/rust-lang/rust""#));
    assert!(outcome
        .html
        .contains(r#"href="https://doc.rust-lang.org/book/""#));
    // Surrounding attributes survive in place.
    assert!(outcome.html.contains(r#"class="external" target="_blank""#));
    // Untouched anchors survive verbatim.
    assert!(outcome
        .html
        .contains(r#"href="https://zhuanlan.zhihu.com/p/111""#));
    assert!(outcome.html.contains(r#"href="https://link.zhihu.com/?utm=1""#));
}

#[test]
fn base64_wrapped_target_is_unwrapped() {
    init_logger();

    // The wrapper as it sits in the query string: percent-encoded once on top
    // of the `http%3A...b64=...` form the decoder recognizes.
    let filler = "x".repeat(90);
    let encoded_wrapper = format!("http%253A{filler}b64%3DaHR0cHM6Ly9jcmF0ZXMuaW8%3D%26x");
    let html = format!(
        r#"<a href="https://link.zhihu.com/?target={encoded_wrapper}">crates</a>"#
    );

    let outcome = rewrite_document(&html, &column_base());
    assert_eq!(outcome.links.len(), 1);
    assert_eq!(outcome.links[0].target, "https://crates.io");
    assert!(outcome.html.contains(r#"href="https://crates.io""#));
}

#[test]
fn decoder_and_rewriter_agree_on_the_fallback_path() {
    init_logger();

    // An undecodable target passes through raw: the anchor is still rewritten,
    // to the raw value, matching the decoder's never-fail contract. The URL
    // parser's own lenient pass leaves the malformed sequence in place.
    let html = r#"<a href="https://link.zhihu.com/?target=%2Gbroken">x</a>"#;
    let outcome = rewrite_document(html, &column_base());
    assert_eq!(outcome.links.len(), 1);
    assert_eq!(outcome.links[0].target, "%2Gbroken");
    // Same contract when a valid byte sits next to a malformed one.
    assert_eq!(
        decode_redirect_target("broken%2Gvalue%41"),
        "broken%2Gvalue%41"
    );
}

#[test]
fn second_pass_over_rewritten_output_is_a_no_op() {
    init_logger();

    let html = r#"<p><a href="https://link.zhihu.com/?target=https%3A%2F%2Fexample.com">x</a></p>"#;
    let first = rewrite_document(html, &column_base());
    let second = rewrite_document(&first.html, &column_base());
    assert_eq!(second.links.len(), 0);
    assert_eq!(second.html, first.html);
}

#[test]
fn report_serializes_with_stable_fields() {
    init_logger();

    let html = r#"<a href="https://link.zhihu.com/?target=https%3A%2F%2Fexample.com">x</a>"#;
    let outcome = rewrite_document(html, &column_base());
    let report = RewriteReport::new("fixture.html", outcome.anchors_scanned, outcome.links);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["source"], "fixture.html");
    assert_eq!(json["anchors_scanned"], 1);
    assert_eq!(json["rewritten"][0]["target"], "https://example.com");
    assert!(json["timestamp"].is_string());
    // `remaining` only appears on live captures.
    assert!(json.get("remaining").is_none());
}
