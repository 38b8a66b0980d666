//! Print document composition.
//!
//! Page output is wrapped in the host's navigation-free print shell, with the
//! host's assets, operator customisations and the builtin print stylesheet in
//! `<head>`. When a header or footer fragment is present the body becomes a
//! table whose `<thead>`/`<tfoot>` rows are empty spacers; browsers repeat
//! those rows on every printed page, and the fragments themselves are
//! `position: fixed` overlays of the same height sitting on top of them:
//!
//! ```text
//! <style>            heights
//! .pressroom-header  fixed at the top edge
//! <table>            thead spacer / content / tfoot spacer
//! .pressroom-footer  fixed at the bottom edge
//! ```
//!
//! Page numbers are not composed here; they live in the engine's bottom
//! margin slot, outside the content box the footer overlay is confined to.

mod assets;

use self::assets::{Builtins, PRINT_STYLESHEET};
use crate::host::{Rendered, RequestContext};
use crate::layout::{HeadTag, Layout};
use html_escape::encode_script_double_quoted_text;
use pressroom_config::Config;
use tracing::instrument;

/// Header and footer markup for one document, already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragments {
    pub header: Option<String>,
    pub footer: Option<String>,
    /// Reserved height in cm; the configured default when unset.
    pub header_height_cm: Option<f64>,
    pub footer_height_cm: Option<f64>,
}

impl Fragments {
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.footer.is_none()
    }
}

pub struct Composer<'a> {
    config: &'a Config,
    layout: &'a dyn Layout,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a Config, layout: &'a dyn Layout) -> Self {
        Self { config, layout }
    }

    /// Builds the HTML for `rendered`.
    ///
    /// With `only_content` the page output is returned without any shell or
    /// fragments; this is how header and footer fragments themselves are built.
    #[instrument(skip_all, fields(name = %rendered.name, only_content))]
    pub fn compose(
        &self,
        rendered: &Rendered,
        fragments: &Fragments,
        request: &RequestContext,
        only_content: bool,
    ) -> String {
        let role = request.role(self.config.host.public_role);
        let body = self.layout.render_body(&rendered.title, &rendered.contents, role);
        let html = if only_content {
            body
        } else {
            let body = if fragments.is_empty() { body } else { self.paginate(&body, fragments) };
            self.layout.wrap(&rendered.title, &body, &self.head(request), request)
        };
        self.rewrite_image_links(html)
    }

    /// Everything the shell puts in `<head>`, in order.
    fn head(&self, request: &RequestContext) -> Vec<HeadTag> {
        let host = &self.config.host;
        let mut head: Vec<HeadTag> = host.extra_head.iter().cloned().map(HeadTag::Raw).collect();
        head.push(HeadTag::Raw(format!(
            r#"<script>var _csrf_token = "{}"; var _version_tag = "{}";</script>"#,
            encode_script_double_quoted_text(&request.csrf_token),
            encode_script_double_quoted_text(&host.version_tag),
        )));
        head.extend(host.stylesheets.iter().map(|css| HeadTag::Stylesheet(self.static_url(css))));
        head.extend(host.scripts.iter().map(|js| HeadTag::Script(self.static_url(js))));
        if !host.custom_css.trim().is_empty() {
            head.push(HeadTag::Style(host.custom_css.clone()));
        }
        if !host.custom_html.trim().is_empty() {
            head.push(HeadTag::Raw(host.custom_html.clone()));
        }
        match Builtins::css(PRINT_STYLESHEET) {
            Some(css) => head.push(HeadTag::Style(css.into_owned())),
            None => tracing::warn!(name = PRINT_STYLESHEET, "Builtin stylesheet missing"),
        }
        head
    }

    /// Versioned URL under the host's static route; absolute references are kept.
    fn static_url(&self, file: &str) -> String {
        if file.starts_with('/') || file.contains("://") {
            return file.to_string();
        }
        let route = self.config.host.static_route.trim_end_matches('/');
        match self.config.host.version_tag.trim() {
            "" => format!("{route}/{file}"),
            tag => format!("{route}/{tag}/{file}"),
        }
    }

    fn paginate(&self, body: &str, fragments: &Fragments) -> String {
        let layout = &self.config.layout;
        let mut style = String::from("<style>\n");
        let mut header = String::new();
        let mut footer = String::new();
        let (mut thead, mut tfoot) = (String::new(), String::new());
        if let Some(html) = &fragments.header {
            let height = positive(fragments.header_height_cm).unwrap_or(layout.header_height_cm);
            style.push_str(&format!(".pressroom-header, .pressroom-header-space {{ height: {height}cm; }}\n"));
            header = format!("<div class=\"pressroom-header\">{html}</div>\n");
            thead = "<thead><tr><td><div class=\"pressroom-header-space\">&nbsp;</div></td></tr></thead>\n".into();
        }
        if let Some(html) = &fragments.footer {
            let height = positive(fragments.footer_height_cm).unwrap_or(layout.footer_height_cm);
            style.push_str(&format!(".pressroom-footer, .pressroom-footer-space {{ height: {height}cm; }}\n"));
            footer = format!("<div class=\"pressroom-footer\">{html}</div>");
            tfoot = "<tfoot><tr><td><div class=\"pressroom-footer-space\">&nbsp;</div></td></tr></tfoot>\n".into();
        }
        style.push_str("</style>\n");
        format!(
            concat!(
                "{style}{header}",
                "<table class=\"pressroom-layout\">\n{thead}",
                "<tbody><tr><td><div class=\"pressroom-content\">{body}</div></td></tr></tbody>\n",
                "{tfoot}</table>\n{footer}",
            ),
            style = style,
            header = header,
            thead = thead,
            body = body,
            tfoot = tfoot,
            footer = footer,
        )
    }

    /// Page output links uploads relative to the page route; the staged file
    /// lives elsewhere, so make them root-relative.
    fn rewrite_image_links(&self, html: String) -> String {
        let route = format!("/{}/", self.config.host.serve_route.trim_matches('/'));
        let relative = format!(r#"<img src="..{route}"#);
        if !html.contains(&relative) {
            return html;
        }
        html.replace(&relative, &format!(r#"<img src="{route}"#))
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Contents;
    use crate::layout::PrintLayout;

    fn rendered(markup: &str) -> Rendered {
        let contents = Contents::Markup(markup.into());
        Rendered { contents, title: "Invoice".into(), name: "invoice".into(), min_role: 1 }
    }

    fn fragments() -> Fragments {
        Fragments { header: Some("<b>HEAD</b>".into()), footer: Some("<i>FOOT</i>".into()), ..Default::default() }
    }

    fn compose(config: &Config, markup: &str, fragments: &Fragments, only_content: bool) -> String {
        let request = RequestContext { csrf_token: "tok\"en".into(), ..Default::default() };
        Composer::new(config, &PrintLayout).compose(&rendered(markup), fragments, &request, only_content)
    }

    #[test]
    fn test_only_content_is_unwrapped() {
        let html = compose(&Config::default(), "<p>Total</p>", &fragments(), true);
        assert_eq!(html, "<p>Total</p>");
    }

    #[test]
    fn test_fragments_are_stacked_header_content_footer() {
        let html = compose(&Config::default(), "<p>BODY</p>", &fragments(), false);
        let body = &html[html.find("<body>").unwrap()..html.find("</body>").unwrap()];
        let header = body.find("HEAD").unwrap();
        let content = body.find("BODY").unwrap();
        let footer = body.find("FOOT").unwrap();
        assert!(header < content && content < footer);
        assert!(body.trim_end().ends_with(r#"<div class="pressroom-footer"><i>FOOT</i></div>"#));
        assert!(body.contains(".pressroom-header, .pressroom-header-space { height: 3cm; }"));
        assert!(body.contains(".pressroom-footer, .pressroom-footer-space { height: 3cm; }"));
    }

    #[test]
    fn test_caller_heights_win_over_defaults() {
        let fragments = Fragments { header_height_cm: Some(1.5), footer_height_cm: Some(0.0), ..fragments() };
        let html = compose(&Config::default(), "<p>BODY</p>", &fragments, false);
        assert!(html.contains(".pressroom-header, .pressroom-header-space { height: 1.5cm; }"));
        assert!(html.contains(".pressroom-footer, .pressroom-footer-space { height: 3cm; }"));
    }

    #[test]
    fn test_no_fragments_no_table() {
        let html = compose(&Config::default(), "<p>BODY</p>", &Fragments::default(), false);
        let body = &html[html.find("<body>").unwrap()..];
        assert!(!body.contains("<table"));
        assert!(!body.contains("pressroom-header"));
        assert!(body.contains("<p>BODY</p>"));
    }

    #[test]
    fn test_header_only_has_no_footer_spacer() {
        let fragments = Fragments { footer: None, ..fragments() };
        let html = compose(&Config::default(), "<p>BODY</p>", &fragments, false);
        assert!(html.contains("pressroom-header-space"));
        assert!(!html.contains("<tfoot>"));
    }

    #[test]
    fn test_shell_head_order() {
        let mut config = Config::default();
        config.host.version_tag = "v42".into();
        config.host.stylesheets = vec!["app.css".into()];
        config.host.scripts = vec!["app.js".into()];
        config.host.extra_head = vec![r#"<meta name="plugin">"#.into()];
        config.host.custom_css = ".brand { color: red }".into();
        config.host.custom_html = "<!-- operator -->".into();
        let html = compose(&config, "<p>BODY</p>", &Fragments::default(), false);

        let positions: Vec<usize> = [
            r#"<meta name="plugin">"#,
            r#"var _csrf_token = "tok\"en"; var _version_tag = "v42";"#,
            r#"<link rel="stylesheet" href="/static_assets/v42/app.css">"#,
            r#"<script src="/static_assets/v42/app.js"></script>"#,
            "<style>.brand { color: red }</style>",
            "<!-- operator -->",
            ".accordion-collapse",
        ]
        .iter()
        .map(|needle| html.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn test_relative_image_links_are_rewritten() {
        let html = compose(&Config::default(), r#"<img src="../files/serve/7">"#, &Fragments::default(), true);
        assert_eq!(html, r#"<img src="/files/serve/7">"#);
    }
}
