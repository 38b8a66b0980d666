//! Host theme seam: how body blocks are laid out and how a finished body is
//! wrapped into a full document.

use crate::host::{Contents, RequestContext};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// One entry in the document `<head>`.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadTag {
    /// Copied verbatim.
    Raw(String),
    Stylesheet(String),
    Script(String),
    Style(String),
}

impl Display for HeadTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Raw(html) => f.write_str(html),
            Self::Stylesheet(href) => {
                write!(f, r#"<link rel="stylesheet" href="{}">"#, encode_double_quoted_attribute(href))
            },
            Self::Script(src) => write!(f, r#"<script src="{}"></script>"#, encode_double_quoted_attribute(src)),
            Self::Style(css) => write!(f, "<style>{css}</style>"),
        }
    }
}

pub trait Layout: Send + Sync {
    /// Lays out page contents without any document shell.
    fn render_body(&self, title: &str, contents: &Contents, role: u32) -> String;

    /// Wraps `body` in a complete, navigation-free document.
    fn wrap(&self, title: &str, body: &str, head: &[HeadTag], request: &RequestContext) -> String;
}

/// Minimal print theme: no menus, no alerts, blocks stacked in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintLayout;

impl Layout for PrintLayout {
    fn render_body(&self, _title: &str, contents: &Contents, _role: u32) -> String {
        match contents {
            Contents::Markup(html) => html.clone(),
            Contents::Blocks(blocks) => {
                blocks.iter().map(|block| format!(r#"<div class="block">{block}</div>"#)).collect()
            },
        }
    }

    fn wrap(&self, title: &str, body: &str, head: &[HeadTag], request: &RequestContext) -> String {
        let head: String = head.iter().map(|tag| format!("{tag}\n")).collect();
        format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html lang=\"{lang}\">\n",
                "<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{head}</head>\n",
                "<body>\n{body}\n</body>\n",
                "</html>\n",
            ),
            lang = encode_double_quoted_attribute(request.locale()),
            title = encode_text(title),
            head = head,
            body = body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_tags_escape_attributes() {
        let tag = HeadTag::Stylesheet(r#"/static/"x".css"#.to_string());
        assert_eq!(tag.to_string(), r#"<link rel="stylesheet" href="/static/&quot;x&quot;.css">"#);
    }

    #[test]
    fn test_wrap_escapes_title_and_keeps_body() {
        let request = RequestContext { locale: Some("de".into()), ..Default::default() };
        let html = PrintLayout.wrap("Q1 <draft>", "<p>Body</p>", &[HeadTag::Style("p{}".into())], &request);
        assert!(html.contains(r#"<html lang="de">"#));
        assert!(html.contains("<title>Q1 &lt;draft&gt;</title>"));
        assert!(html.contains("<style>p{}</style>"));
        assert!(html.contains("<p>Body</p>"));
    }

    #[test]
    fn test_blocks_are_stacked() {
        let body = PrintLayout.render_body("", &Contents::Blocks(vec!["a".into(), "b".into()]), 100);
        assert_eq!(body, r#"<div class="block">a</div><div class="block">b</div>"#);
    }
}
