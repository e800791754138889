// src/utils/html.rs

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use ammonia::Builder;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, TextMergeStream, html};
use pulldown_cmark_escape::{escape_href, escape_html};
use regex::Regex;

/// Tags that survive sanitization of post and comment bodies.
pub const ALLOWED_TAGS: [&str; 17] = [
    "a",
    "abbr",
    "acronym",
    "b",
    "blockquote",
    "code",
    "em",
    "i",
    "li",
    "ol",
    "pre",
    "strong",
    "ul",
    "h1",
    "h2",
    "h3",
    "p",
];

/// Content of these is dropped even from posts.
const ALWAYS_STRIPPED_TAGS: [&str; 2] = ["script", "style"];

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z][^\s/>]*)").expect("tag name pattern is valid"));

static LINKABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:https?://|www\.)[^\s<>"]*[^\s<>".,;:!?)\]'*]|[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}"#,
    )
    .expect("autolink pattern is valid")
});

/// Derived HTML for a post body.
///
/// Markdown is rendered, bare URLs and emails become links, then everything
/// outside the allow-list is removed. Text inside removed tags is kept.
pub fn render_post_body(body: &str) -> String {
    let stripped = HashSet::from(ALWAYS_STRIPPED_TAGS);
    sanitizer(stripped).clean(&markdown_to_html(body)).to_string()
}

/// Derived HTML for a comment body.
///
/// Same pipeline as posts, except that disallowed elements are dropped
/// along with everything they contain.
pub fn render_comment_body(body: &str) -> String {
    let html = markdown_to_html(body);
    let names = disallowed_tag_names(&html);
    let mut stripped: HashSet<&str> = names.iter().map(String::as_str).collect();
    stripped.extend(ALWAYS_STRIPPED_TAGS);
    sanitizer(stripped).clean(&html).to_string()
}

/// Lowercased names of every element in `html` outside `ALLOWED_TAGS`.
///
/// `img` is included because the parser turns `<image>` into it.
fn disallowed_tag_names(html: &str) -> HashSet<String> {
    TAG_NAME
        .captures_iter(html)
        .map(|c| c[1].to_ascii_lowercase())
        .chain(std::iter::once("img".to_string()))
        .filter(|name| !ALLOWED_TAGS.contains(&name.as_str()))
        .collect()
}

/// Renders markdown, turning bare URLs and email addresses into links.
///
/// Text already inside a link or a code block is left alone.
pub fn markdown_to_html(body: &str) -> String {
    let parser = TextMergeStream::new(Parser::new_ext(body, Options::empty()));

    let mut events: Vec<Event> = Vec::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in parser {
        match &event {
            Event::Start(Tag::Link { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Html(raw) | Event::InlineHtml(raw) => {
                let raw = raw.trim_start().to_ascii_lowercase();
                if raw.starts_with("<a ") || raw.starts_with("<a>") {
                    link_depth += 1;
                } else if raw.starts_with("</a") {
                    link_depth = link_depth.saturating_sub(1);
                }
            }
            Event::Text(text) if link_depth == 0 && !in_code_block => {
                if let Some(linked) = linkify(text) {
                    events.push(Event::InlineHtml(linked.into()));
                    continue;
                }
            }
            _ => {}
        }
        events.push(event);
    }

    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Escaped HTML for `text` with every URL or email wrapped in an anchor.
/// `None` when there is nothing to link.
fn linkify(text: &str) -> Option<String> {
    let mut matches = LINKABLE.find_iter(text).peekable();
    matches.peek()?;

    let mut out = String::with_capacity(text.len() + 32);
    let mut last = 0;
    for m in matches {
        escape_into(&mut out, &text[last..m.start()]);
        let shown = m.as_str();
        let href = if shown.contains("://") {
            shown.to_string()
        } else if shown.to_ascii_lowercase().starts_with("www.") {
            format!("http://{shown}")
        } else {
            format!("mailto:{shown}")
        };
        out.push_str("<a href=\"");
        // Writing into a String cannot fail.
        let _ = escape_href(&mut out, &href);
        out.push_str("\">");
        escape_into(&mut out, shown);
        out.push_str("</a>");
        last = m.end();
    }
    escape_into(&mut out, &text[last..]);
    Some(out)
}

fn escape_into(out: &mut String, text: &str) {
    let _ = escape_html(out, text);
}

fn sanitizer(stripped: HashSet<&str>) -> Builder<'_> {
    let tags: HashSet<&str> = ALLOWED_TAGS.into_iter().collect();
    let tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::from([
        ("a", HashSet::from(["href", "title"])),
        ("abbr", HashSet::from(["title"])),
        ("acronym", HashSet::from(["title"])),
    ]);
    let mut builder = Builder::default();
    builder
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .clean_content_tags(stripped)
        .link_rel(Some("nofollow"));
    builder
}
