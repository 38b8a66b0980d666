use serde::{Deserialize, Serialize};

/// What the host gets back from a render, serialized as
/// `{"download": {..}}`, `{"goto": .., "target": ..}` or `{"error": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderResult {
    Download { download: Download },
    Goto { goto: String, target: String },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    /// Base64 encoded document.
    pub blob: String,
    pub mimetype: String,
}

impl RenderResult {
    /// Redirect that opens the stored document in a new tab.
    pub fn goto(path: impl Into<String>) -> Self {
        Self::Goto { goto: path.into(), target: "_blank".to_string() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { error: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shapes() {
        let download = Download { blob: "JVBERg==".into(), mimetype: "application/pdf".into() };
        let download = RenderResult::Download { download };
        assert_eq!(
            serde_json::to_value(download).unwrap(),
            json!({"download": {"blob": "JVBERg==", "mimetype": "application/pdf"}})
        );
        assert_eq!(
            serde_json::to_value(RenderResult::goto("/files/serve/doc-1/a.pdf")).unwrap(),
            json!({"goto": "/files/serve/doc-1/a.pdf", "target": "_blank"})
        );
        assert_eq!(serde_json::to_value(RenderResult::error("boom")).unwrap(), json!({"error": "boom"}));
    }
}
