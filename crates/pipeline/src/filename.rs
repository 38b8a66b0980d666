//! File name templating for stored documents.
//!
//! Templates use single braces, so an operator writes `report-{id}.pdf`
//! rather than `report-{{ id }}.pdf`. The triggering row's fields are
//! available at the top level and the acting user as `user`:
//!
//! | Expression            | Value                                      |
//! |-----------------------|--------------------------------------------|
//! | `{id}`                | field `id` of the triggering row           |
//! | `{customer.name}`     | nested field of a JSON row value           |
//! | `{user.id}`           | id of the acting user                      |
//! | `{title \| slug}`     | any string made URL and filesystem safe    |
//!
//! The rendered name must still be a single path segment; the file store
//! rejects anything else.

use crate::error::{Error, ErrorKind, Result};
use crate::host::{Row, User};
use exn::ResultExt;
use std::fmt;
use std::str::FromStr;
use upon::{Engine, Syntax, Template};

pub struct FilenameTemplate {
    engine: Engine<'static>,
    template: Template<'static>,
    source: String,
}

impl fmt::Debug for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilenameTemplate").field("source", &self.source).finish_non_exhaustive()
    }
}

impl FromStr for FilenameTemplate {
    type Err = Error;

    /// Compiles eagerly so that syntax errors surface before anything renders.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::with_syntax(Syntax::builder().expr("{", "}").block("{%", "%}").build());
        addons::configure(&mut engine);
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template(s.to_string()))?;
        Ok(Self { engine, template, source: s.to_string() })
    }
}

impl FilenameTemplate {
    /// Interpolates the template against `row` and `user`.
    ///
    /// Without a row the template text is used literally, so a fixed name
    /// containing braces still works for actions not triggered on a row.
    pub fn render(&self, row: Option<&Row>, user: Option<&User>) -> Result<String> {
        let Some(row) = row else {
            return Ok(self.source.trim().to_string());
        };
        let mut context = row.clone();
        let user = serde_json::to_value(user).or_raise(|| ErrorKind::Template(self.source.clone()))?;
        context.insert("user".to_string(), user);
        let name = self
            .template
            .render(&self.engine, context)
            .to_string()
            .or_raise(|| ErrorKind::Template(self.source.clone()))?;
        Ok(name.trim().to_string())
    }
}

mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", slugify!(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    #[case("report-{id}.pdf", json!({"id": 42}), "report-42.pdf")]
    #[case("{customer.name}.png", json!({"customer": {"name": "ACME"}}), "ACME.png")]
    #[case("{title | slug}.pdf", json!({"title": "Q1 Sales Report!"}), "q1-sales-report.pdf")]
    #[case("fixed.pdf", json!({"id": 1}), "fixed.pdf")]
    fn test_interpolates_row(#[case] template: &str, #[case] row_value: serde_json::Value, #[case] expected: &str) {
        let template: FilenameTemplate = template.parse().unwrap();
        assert_eq!(template.render(Some(&row(row_value)), None).unwrap(), expected);
    }

    #[test]
    fn test_user_fields_available() {
        let template: FilenameTemplate = "{user.id}-{id}.pdf".parse().unwrap();
        let user = User { id: 7, role_id: 40, language: None };
        assert_eq!(template.render(Some(&row(json!({"id": 3}))), Some(&user)).unwrap(), "7-3.pdf");
    }

    #[test]
    fn test_without_row_is_literal() {
        let template: FilenameTemplate = "report-{id}.pdf".parse().unwrap();
        assert_eq!(template.render(None, None).unwrap(), "report-{id}.pdf");
    }

    #[test]
    fn test_missing_field_is_template_error() {
        let template: FilenameTemplate = "report-{number}.pdf".parse().unwrap();
        let err = template.render(Some(&row(json!({"id": 1}))), None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template(_)));
    }

    #[test]
    fn test_debug_shows_source() {
        let template: FilenameTemplate = "report-{id}.pdf".parse().unwrap();
        assert_eq!(format!("{template:?}"), r#"FilenameTemplate { source: "report-{id}.pdf", .. }"#);
    }

    #[test]
    fn test_syntax_error_fails_fast() {
        let err = "report-{id.pdf".parse::<FilenameTemplate>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Template(_)));
    }
}
