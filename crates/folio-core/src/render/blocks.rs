use std::sync::LazyLock;

use regex::Regex;

use super::inline::render_inline;

static BLOCK_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid block pattern"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s+").expect("valid bullet pattern"));

/// A top-level chunk of a reply. Content is raw reply text; use
/// [`Block::to_html`] to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    List(Vec<String>),
}

impl Block {
    pub fn to_html(&self) -> String {
        match self {
            Block::Paragraph(content) => {
                format!("<p>{}</p>", render_inline(content).replace('\n', "<br />"))
            }
            Block::List(items) => {
                let items: String = items
                    .iter()
                    .map(|item| format!("<li>{}</li>", render_inline(item)))
                    .collect();
                format!("<ul>{items}</ul>")
            }
        }
    }
}

/// Split reply text on blank lines. A block is a list only when every
/// non-empty line in it starts with a `- ` bullet.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    BLOCK_BREAK
        .split(text.trim())
        .filter_map(|block| {
            let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
            if lines.is_empty() {
                return None;
            }
            if lines.iter().all(|l| BULLET.is_match(l)) {
                let items = lines
                    .iter()
                    .map(|l| BULLET.replace(l, "").into_owned())
                    .collect();
                Some(Block::List(items))
            } else {
                Some(Block::Paragraph(block.to_owned()))
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_paragraphs_and_lists() {
        let blocks = parse_blocks("Intro line\nsecond line\n\n- one\n- **two**\n\n\nOutro");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("Intro line\nsecond line".into()),
                Block::List(vec!["one".into(), "**two**".into()]),
                Block::Paragraph("Outro".into()),
            ]
        );
    }

    #[test]
    fn mixed_block_is_a_paragraph() {
        let blocks = parse_blocks("Highlights:\n- shipped v1");
        assert_eq!(blocks, vec![Block::Paragraph("Highlights:\n- shipped v1".into())]);
    }

    #[test]
    fn whitespace_only_lines_do_not_break_lists() {
        let blocks = parse_blocks("  - a\n   \n- b");
        assert_eq!(blocks, vec![Block::List(vec!["a".into(), "b".into()])]);
    }

    #[test]
    fn dash_without_space_is_not_a_bullet() {
        let blocks = parse_blocks("-5 degrees");
        assert_eq!(blocks, vec![Block::Paragraph("-5 degrees".into())]);
    }

    #[test]
    fn empty_text_has_no_blocks() {
        assert!(parse_blocks("  \n\n  ").is_empty());
    }

    #[test]
    fn html_uses_breaks_and_list_items() {
        assert_eq!(Block::Paragraph("a\nb".into()).to_html(), "<p>a<br />b</p>");
        assert_eq!(
            Block::List(vec!["x".into(), "<y>".into()]).to_html(),
            "<ul><li>x</li><li>&lt;y&gt;</li></ul>"
        );
    }
}
