//! Assistant reply post-processing.
//!
//! Turns the model's markdown-ish text into escaped inline HTML split into
//! paragraphs and bullet lists, and extracts the links worth surfacing as
//! buttons next to the reply.

mod blocks;
mod inline;
mod links;

pub use blocks::{Block, parse_blocks};
pub use inline::{escape_html, render_inline, sanitize_inline_url};
pub use links::{GENERIC_LABELS, LinkLabels, accept_url, display_label, extract_links};

use folio_types::Link;

/// A reply ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    pub blocks: Vec<Block>,
    pub links: Vec<Link>,
}

impl RenderedReply {
    pub fn html(&self) -> String {
        self.blocks.iter().map(Block::to_html).collect()
    }
}

pub fn render_reply(text: &str, labels: &LinkLabels) -> RenderedReply {
    RenderedReply {
        blocks: parse_blocks(text),
        links: extract_links(text, labels),
    }
}

#[cfg(test)]
mod test {
    use folio_types::Project;

    use super::*;

    #[test]
    fn render_reply_combines_blocks_and_links() {
        let labels = LinkLabels::from_projects(&[Project {
            name: "Orbit".into(),
            links: [("repo".to_owned(), "https://git.test/orbit".to_owned())].into(),
        }]);
        let text = "Ada built **Orbit**.\n\n- Code: [repo](https://git.test/orbit)\n- Docs: https://docs.test.";

        let reply = render_reply(text, &labels);
        assert_eq!(reply.blocks.len(), 2);
        assert_eq!(
            reply.links,
            vec![
                Link { url: "https://git.test/orbit".into(), label: Some("Orbit — Repo".into()) },
                Link { url: "https://docs.test".into(), label: None },
            ]
        );
        let html = reply.html();
        assert!(html.starts_with("<p>Ada built <strong>Orbit</strong>.</p><ul><li>"));
        assert!(html.contains(r#"<a href="https://git.test/orbit" target="_blank" rel="noopener noreferrer">repo</a>"#));
    }
}
