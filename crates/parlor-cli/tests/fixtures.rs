//! Stream fixture helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use wiremock::ResponseTemplate;

// Load fixture templates at compile time
pub const TEXT_REPLY: &str = include_str!("fixtures/text_reply.sse");
pub const MARKDOWN_REPLY: &str = include_str!("fixtures/markdown_reply.sse");
pub const TRUNCATED_REPLY: &str = include_str!("fixtures/truncated_reply.sse");

/// Markup the markdown fixture renders to.
pub const MARKDOWN_REPLY_HTML: &str = "<h1>Plan</h1>\n<ol>\n<li><strong>first</strong> step</li>\n<li>run <code>cargo fmt</code></li>\n</ol>\n<pre><code class=\"language-sh\">echo &lt;done&gt;</code></pre>";

/// Create a single-text reply stream with the given content.
pub fn text_stream(text: &str) -> String {
    TEXT_REPLY.replace("{{TEXT}}", &escape_json(text))
}

/// Wrap a stream body in a ResponseTemplate.
pub fn stream_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

/// Convenience: single-text stream wrapped in ResponseTemplate.
pub fn text_response(text: &str) -> ResponseTemplate {
    stream_response(&text_stream(text))
}

/// The binary with an isolated home and no ambient parlor env vars.
pub fn parlor(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("parlor");
    cmd.env("PARLOR_HOME", home)
        .env_remove("PARLOR_BASE_URL")
        .env_remove("PARLOR_TOKEN")
        .env_remove("PARLOR_LOG");
    cmd
}

/// Escape a string for embedding in a JSON string value.
fn escape_json(s: &str) -> String {
    let quoted = serde_json::to_string(s).unwrap();
    quoted[1..quoted.len() - 1].to_string()
}
