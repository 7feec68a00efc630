use serde::{Deserialize, Serialize};

/// Paper sizes understood by the exporter, dimensions in inches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PaperFormat {
    /// `(width, height)` in inches, portrait orientation
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::Ledger => (17.0, 11.0),
            PaperFormat::A0 => (33.1, 46.8),
            PaperFormat::A1 => (23.4, 33.1),
            PaperFormat::A2 => (16.54, 23.4),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::A6 => (4.13, 5.83),
        }
    }
}

/// Page margins in inches
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Caller-tunable PDF layout options.
///
/// Unset fields fall back to A4 portrait with backgrounds printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PdfOptions {
    pub format: PaperFormat,
    pub landscape: bool,
    pub print_background: bool,
    pub scale: f64,
    pub margin: PdfMargin,
    /// Let CSS `@page` size rules win over `format`
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            landscape: false,
            print_background: true,
            scale: 1.0,
            margin: PdfMargin::default(),
            prefer_css_page_size: false,
        }
    }
}

impl PdfOptions {
    /// Check ranges the engine would otherwise reject mid-export
    pub fn validate(&self) -> Result<(), String> {
        if !(0.1..=2.0).contains(&self.scale) {
            return Err(format!("scale must be between 0.1 and 2.0, got {}", self.scale));
        }

        let margins = [
            ("top", self.margin.top),
            ("right", self.margin.right),
            ("bottom", self.margin.bottom),
            ("left", self.margin.left),
        ];
        for (side, value) in margins {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("margin.{} must be a non-negative number", side));
            }
        }

        let (width, height) = self.format.dimensions();
        if self.margin.left + self.margin.right >= width
            || self.margin.top + self.margin.bottom >= height
        {
            return Err("margins leave no printable area".to_string());
        }

        Ok(())
    }
}
