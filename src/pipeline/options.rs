use serde::{Deserialize, Serialize};

use crate::citation::TextFormat;
use crate::layers::LayerKind;

/// Per-request switches. Each flag gates one layer or the extractor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyOptions {
    pub enable_ai_scoring: bool,
    pub check_content: bool,
    pub format: TextFormat,
    /// Shortens the request deadline. Never extends it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            enable_ai_scoring: true,
            check_content: true,
            format: TextFormat::Plain,
            timeout_secs: None,
        }
    }
}

impl VerifyOptions {
    pub fn is_enabled(&self, layer: LayerKind) -> bool {
        match layer {
            LayerKind::Url | LayerKind::Metadata => true,
            LayerKind::Content => self.check_content,
            LayerKind::Ai => self.enable_ai_scoring,
        }
    }

    /// Enabled layers in canonical order.
    pub fn enabled_layers(&self) -> Vec<LayerKind> {
        LayerKind::ALL
            .into_iter()
            .filter(|layer| self.is_enabled(*layer))
            .collect()
    }

    pub fn without_ai(mut self) -> Self {
        self.enable_ai_scoring = false;
        self
    }

    pub fn without_content(mut self) -> Self {
        self.check_content = false;
        self
    }

    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}
