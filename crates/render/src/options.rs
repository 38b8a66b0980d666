//! What the engine is asked to produce.
//!
//! [`Capture`] is deliberately a closed enum: paginated exports carry page
//! geometry and never a selector, screenshots carry a selector and never
//! margins. Callers cannot hand the engine a contradictory option set.

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use url::Url;

const CM_PER_INCH: f64 = 2.54;

/// Right-aligned `N of M` footer, shown in the bottom margin.
pub const PAGE_NUMBER_TEMPLATE: &str = concat!(
    r#"<div style="text-align: right; width: 100%; font-size: 10px;">"#,
    r#"<span style="margin-right: 1cm"><span class="pageNumber"></span> of <span class="totalPages"></span></span>"#,
    "</div>",
);
/// Chrome substitutes its own date/title header for an empty template.
pub(crate) const BLANK_TEMPLATE: &str = "<span></span>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperFormat {
    A4,
    Letter,
    Legal,
}
impl PaperFormat {
    /// Portrait `(width, height)` in inches.
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            Self::A4 => (8.27, 11.7),
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}
impl ImageFormat {
    pub(crate) fn cdp(self) -> CaptureScreenshotFormat {
        match self {
            Self::Png => CaptureScreenshotFormat::Png,
            Self::Jpeg => CaptureScreenshotFormat::Jpeg,
            Self::Webp => CaptureScreenshotFormat::Webp,
        }
    }
}

/// Page margins in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}
impl Margins {
    pub fn uniform(cm: f64) -> Self {
        Self { top: cm, right: cm, bottom: cm, left: cm }
    }

    /// `(top, right, bottom, left)` in inches, as the DevTools protocol wants them.
    pub fn inches(&self) -> (f64, f64, f64, f64) {
        (self.top / CM_PER_INCH, self.right / CM_PER_INCH, self.bottom / CM_PER_INCH, self.left / CM_PER_INCH)
    }
}

/// Header/footer slots of the PDF export. The header slot is always blank:
/// header content is part of the page body.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChrome {
    /// `None` leaves the footer slot blank.
    pub footer_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOptions {
    pub paper: PaperFormat,
    pub landscape: bool,
    pub scale: f64,
    pub margins: Margins,
    /// Only present when page numbers or header/footer fragments are in use.
    pub page_chrome: Option<PageChrome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub format: ImageFormat,
    pub selector: String,
    pub omit_background: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Document(DocumentOptions),
    Image(ImageOptions),
}

/// A cookie installed in the browser before navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// URL the cookie is bound to; Chrome derives domain, path and secure from it.
    pub url: Option<String>,
    pub domain: Option<String>,
}

/// Everything one render needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub url: Url,
    pub capture: Capture,
    pub cookies: Vec<SessionCookie>,
}
