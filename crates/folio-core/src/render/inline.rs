use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static LINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link pattern"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern"));
static UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.+?)__").expect("valid underline pattern"));

const INLINE_SCHEMES: [&str; 4] = ["http", "https", "mailto", "tel"];

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Bold and underline on already-escaped text.
fn format_basic(escaped: &str) -> String {
    let bold = BOLD.replace_all(escaped, "<strong>$1</strong>");
    UNDERLINE.replace_all(&bold, "<u>$1</u>").into_owned()
}

fn escape_and_format(text: &str) -> String {
    format_basic(&escape_html(text))
}

/// The trimmed URL when it is absolute and uses a scheme allowed in inline
/// anchors (`http`, `https`, `mailto`, `tel`).
pub fn sanitize_inline_url(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    let parsed = Url::parse(trimmed).ok()?;
    INLINE_SCHEMES.contains(&parsed.scheme()).then_some(trimmed)
}

/// Render one line or paragraph of reply text as inline HTML.
///
/// All text is escaped before tags are inserted; link spans with unsafe URLs
/// are kept as escaped text.
pub fn render_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for caps in LINK_SPAN.captures_iter(text) {
        let Some(full) = caps.get(0) else { continue };
        out.push_str(&escape_and_format(&text[cursor..full.start()]));

        match sanitize_inline_url(&caps[2]) {
            Some(href) => {
                out.push_str(&format!(
                    r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                    escape_html(href),
                    escape_html(&caps[1]),
                ));
            }
            None => out.push_str(&escape_and_format(full.as_str())),
        }
        cursor = full.end();
    }

    out.push_str(&escape_and_format(&text[cursor..]));
    out
}
