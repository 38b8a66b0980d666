//! Caller-facing render options and their reduction to engine options.
//!
//! [`RenderOptions`] is a flat, deserializable bag mirroring what an operator
//! configures on the action. Not every field applies to every format, so
//! [`RenderOptions::capture`] produces the engine's closed [`Capture`] enum:
//! the fields that don't apply to the chosen format are dropped there.

use crate::source::FragmentSource;
use pressroom_config::LayoutConfig;
use pressroom_render::{
    Capture, DocumentOptions, ImageFormat, ImageOptions, Margins, PAGE_NUMBER_TEMPLATE, PageChrome, PaperFormat,
};
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;
const DEFAULT_SELECTOR: &str = "body";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    A4,
    Letter,
    Legal,
    #[serde(rename = "PNG", alias = "png")]
    Png,
    #[serde(rename = "JPEG", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "WebP", alias = "webp")]
    Webp,
}

impl OutputFormat {
    pub fn is_raster(self) -> bool {
        matches!(self, Self::Png | Self::Jpeg | Self::Webp)
    }

    /// MIME type as `(super, sub)`.
    pub fn mime_parts(self) -> (&'static str, &'static str) {
        match self {
            Self::A4 | Self::Letter | Self::Legal => ("application", "pdf"),
            Self::Png => ("image", "png"),
            Self::Jpeg => ("image", "jpeg"),
            Self::Webp => ("image", "webp"),
        }
    }

    pub fn mime_type(self) -> String {
        let (sup, sub) = self.mime_parts();
        format!("{sup}/{sub}")
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::A4 | Self::Letter | Self::Legal => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Margins in centimetres; unset sides use the configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginOptions {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

impl MarginOptions {
    fn resolve(&self, default_cm: f64) -> Margins {
        for (side, value) in self.rejected() {
            tracing::warn!(side, requested = value, used = default_cm, "Invalid margin, using default");
        }
        let side = |value: Option<f64>| value.filter(|v| valid_margin(*v)).unwrap_or(default_cm);
        Margins { top: side(self.top), right: side(self.right), bottom: side(self.bottom), left: side(self.left) }
    }

    /// Sides set to a negative or non-finite value.
    fn rejected(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [("top", self.top), ("right", self.right), ("bottom", self.bottom), ("left", self.left)]
            .into_iter()
            .filter_map(|(side, value)| value.filter(|v| !valid_margin(*v)).map(|v| (side, v)))
    }
}

fn valid_margin(cm: f64) -> bool {
    cm.is_finite() && cm >= 0.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputTarget {
    /// Return the document inline, base64 encoded.
    #[default]
    Stream,
    /// Store the document with the host and redirect to it.
    File {
        /// Template such as `report-{id}.pdf`, interpolated against the
        /// triggering row and user.
        #[serde(default)]
        filename: Option<String>,
        /// Overrides the role inherited from the source page or view.
        #[serde(default)]
        min_role_read: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub landscape: bool,
    pub scale: f64,
    pub margins: MarginOptions,
    pub header: Option<FragmentSource>,
    pub footer: Option<FragmentSource>,
    pub header_height_cm: Option<f64>,
    pub footer_height_cm: Option<f64>,
    pub page_numbers: bool,
    /// Replaces the built-in `N of M` footer when page numbers are on.
    pub page_number_template: Option<String>,
    /// Element to capture in raster formats.
    pub selector: Option<String>,
    pub omit_background: bool,
    pub target: OutputTarget,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            landscape: false,
            scale: 1.0,
            margins: MarginOptions::default(),
            header: None,
            footer: None,
            header_height_cm: None,
            footer_height_cm: None,
            page_numbers: false,
            page_number_template: None,
            selector: None,
            omit_background: false,
            target: OutputTarget::default(),
        }
    }
}

impl RenderOptions {
    /// Header and footer fragments, only meaningful for paginated formats.
    pub fn fragments(&self) -> (Option<&FragmentSource>, Option<&FragmentSource>) {
        if self.format.is_raster() { (None, None) } else { (self.header.as_ref(), self.footer.as_ref()) }
    }

    /// Engine options for this request, keeping only what applies to the format.
    pub fn capture(&self, layout: &LayoutConfig) -> Capture {
        match self.format {
            OutputFormat::Png => self.image(ImageFormat::Png),
            OutputFormat::Jpeg => self.image(ImageFormat::Jpeg),
            OutputFormat::Webp => self.image(ImageFormat::Webp),
            OutputFormat::A4 => self.document(PaperFormat::A4, layout),
            OutputFormat::Letter => self.document(PaperFormat::Letter, layout),
            OutputFormat::Legal => self.document(PaperFormat::Legal, layout),
        }
    }

    fn image(&self, format: ImageFormat) -> Capture {
        let selector = self.selector.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SELECTOR);
        Capture::Image(ImageOptions { format, selector: selector.to_string(), omit_background: self.omit_background })
    }

    fn document(&self, paper: PaperFormat, layout: &LayoutConfig) -> Capture {
        let has_fragments = self.header.is_some() || self.footer.is_some();
        let page_chrome = (self.page_numbers || has_fragments).then(|| PageChrome {
            footer_template: self.page_numbers.then(|| {
                self.page_number_template
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or(PAGE_NUMBER_TEMPLATE)
                    .to_string()
            }),
        });
        Capture::Document(DocumentOptions {
            paper,
            landscape: self.landscape,
            scale: self.clamped_scale(),
            margins: self.margins.resolve(layout.margin_cm),
            page_chrome,
        })
    }

    fn clamped_scale(&self) -> f64 {
        if !self.scale.is_finite() {
            tracing::warn!(scale = self.scale, "Invalid scale, using 1.0");
            return 1.0;
        }
        let scale = self.scale.clamp(MIN_SCALE, MAX_SCALE);
        if scale != self.scale {
            tracing::warn!(requested = self.scale, used = scale, "Scale out of range, clamped");
        }
        scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn layout() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn loaded() -> RenderOptions {
        RenderOptions {
            landscape: true,
            margins: MarginOptions { top: Some(1.0), ..Default::default() },
            header: Some(FragmentSource::Page("letterhead".into())),
            footer: Some(FragmentSource::View("totals".into())),
            page_numbers: true,
            selector: Some("#chart".into()),
            omit_background: true,
            ..Default::default()
        }
    }

    #[rstest]
    #[case(OutputFormat::Png, ImageFormat::Png)]
    #[case(OutputFormat::Jpeg, ImageFormat::Jpeg)]
    #[case(OutputFormat::Webp, ImageFormat::Webp)]
    fn test_raster_drops_document_fields(#[case] format: OutputFormat, #[case] expected: ImageFormat) {
        let options = RenderOptions { format, ..loaded() };
        assert_eq!(
            options.capture(&layout()),
            Capture::Image(ImageOptions { format: expected, selector: "#chart".into(), omit_background: true })
        );
        assert_eq!(options.fragments(), (None, None));
    }

    #[rstest]
    #[case(OutputFormat::A4, PaperFormat::A4)]
    #[case(OutputFormat::Letter, PaperFormat::Letter)]
    #[case(OutputFormat::Legal, PaperFormat::Legal)]
    fn test_paginated_drops_selector(#[case] format: OutputFormat, #[case] paper: PaperFormat) {
        let options = RenderOptions { format, ..loaded() };
        let Capture::Document(document) = options.capture(&layout()) else { panic!("expected a document") };
        assert_eq!(document.paper, paper);
        assert!(document.landscape);
        assert_eq!(document.margins, Margins { top: 1.0, right: 2.0, bottom: 2.0, left: 2.0 });
        assert_eq!(document.page_chrome, Some(PageChrome { footer_template: Some(PAGE_NUMBER_TEMPLATE.into()) }));
    }

    #[test]
    fn test_default_selector_is_body() {
        let options = RenderOptions { format: OutputFormat::Png, selector: Some("  ".into()), ..Default::default() };
        let Capture::Image(image) = options.capture(&layout()) else { panic!("expected an image") };
        assert_eq!(image.selector, "body");
    }

    #[rstest]
    #[case(false, false, None)]
    #[case(true, false, Some(PageChrome { footer_template: Some(PAGE_NUMBER_TEMPLATE.into()) }))]
    #[case(false, true, Some(PageChrome { footer_template: None }))]
    fn test_page_chrome_only_when_needed(
        #[case] page_numbers: bool,
        #[case] footer: bool,
        #[case] expected: Option<PageChrome>,
    ) {
        let options = RenderOptions {
            page_numbers,
            footer: footer.then(|| FragmentSource::Page("footer".into())),
            ..Default::default()
        };
        let Capture::Document(document) = options.capture(&layout()) else { panic!("expected a document") };
        assert_eq!(document.page_chrome, expected);
    }

    #[test]
    fn test_custom_page_number_template() {
        let options = RenderOptions {
            page_numbers: true,
            page_number_template: Some(r#"<span class="pageNumber"></span>"#.into()),
            ..Default::default()
        };
        let Capture::Document(document) = options.capture(&layout()) else { panic!("expected a document") };
        assert_eq!(
            document.page_chrome.and_then(|c| c.footer_template).as_deref(),
            Some(r#"<span class="pageNumber"></span>"#)
        );
    }

    #[rstest]
    #[case(0.01, 0.1)]
    #[case(0.8, 0.8)]
    #[case(5.0, 2.0)]
    #[case(f64::NAN, 1.0)]
    fn test_scale_is_clamped(#[case] requested: f64, #[case] expected: f64) {
        let options = RenderOptions { scale: requested, ..Default::default() };
        let Capture::Document(document) = options.capture(&layout()) else { panic!("expected a document") };
        assert_eq!(document.scale, expected);
    }

    #[rstest]
    #[case(OutputFormat::A4, "application/pdf", "pdf")]
    #[case(OutputFormat::Png, "image/png", "png")]
    #[case(OutputFormat::Jpeg, "image/jpeg", "jpg")]
    #[case(OutputFormat::Webp, "image/webp", "webp")]
    fn test_mime_and_extension(#[case] format: OutputFormat, #[case] mime: &str, #[case] ext: &str) {
        assert_eq!(format.mime_type(), mime);
        assert_eq!(format.extension(), ext);
    }

    #[test]
    fn test_deserialize_action_options() {
        let options: RenderOptions = serde_json::from_str(
            r#"{
                "format": "WebP",
                "selector": ".card",
                "target": {"kind": "file", "filename": "card-{id}.webp"}
            }"#,
        )
        .unwrap();
        assert_eq!(options.format, OutputFormat::Webp);
        assert_eq!(options.scale, 1.0);
        assert_eq!(options.target, OutputTarget::File { filename: Some("card-{id}.webp".into()), min_role_read: None });
    }

    #[test]
    fn test_invalid_margins_are_reported_and_replaced() {
        let margins = MarginOptions { top: Some(-1.0), right: Some(0.0), bottom: Some(f64::INFINITY), left: None };
        let rejected: Vec<&str> = margins.rejected().map(|(side, _)| side).collect();
        assert_eq!(rejected, vec!["top", "bottom"]);
        assert_eq!(margins.resolve(2.0), Margins { top: 2.0, right: 0.0, bottom: 2.0, left: 2.0 });
    }
}
