//! Overlay timeline elements.
//!
//! Overlays are immutable once submitted. Their order in a submission is
//! significant: it is the compositing (z) order and the order in which the
//! filter graph chains stream labels.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Default size fraction for image and clip overlays.
pub const DEFAULT_MEDIA_SIZE: f64 = 0.2;
/// Default font height fraction for text overlays.
pub const DEFAULT_TEXT_HEIGHT: f64 = 0.05;

/// Kind of visual element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    /// Literal text drawn onto the frame
    Text,
    /// Still image asset
    Image,
    /// Secondary video asset
    #[serde(alias = "video")]
    Clip,
}

impl OverlayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayKind::Text => "text",
            OverlayKind::Image => "image",
            OverlayKind::Clip => "clip",
        }
    }
}

impl std::str::FromStr for OverlayKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OverlayKind::Text),
            "image" => Ok(OverlayKind::Image),
            "clip" | "video" => Ok(OverlayKind::Clip),
            other => Err(ModelError::InvalidPayload(format!(
                "unknown overlay type '{other}'"
            ))),
        }
    }
}

/// One timed visual element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Optional caller-side identifier, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Element kind
    #[serde(rename = "type", alias = "kind")]
    pub kind: OverlayKind,
    /// Literal text, or an asset reference for image/clip overlays
    pub content: String,
    /// Window start in seconds
    pub start_time: f64,
    /// Window end in seconds
    pub end_time: f64,
    /// Left edge as a fraction of frame width
    pub x: f64,
    /// Top edge as a fraction of frame height
    pub y: f64,
    /// Width as a fraction of frame width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height as a fraction of frame height (font size for text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Overlay {
    /// Create a text overlay.
    pub fn text(content: impl Into<String>, start_time: f64, end_time: f64, x: f64, y: f64) -> Self {
        Self::new(OverlayKind::Text, content, start_time, end_time, x, y)
    }

    /// Create an image overlay referencing a stored asset.
    pub fn image(asset: impl Into<String>, start_time: f64, end_time: f64, x: f64, y: f64) -> Self {
        Self::new(OverlayKind::Image, asset, start_time, end_time, x, y)
    }

    /// Create a clip overlay referencing a stored asset.
    pub fn clip(asset: impl Into<String>, start_time: f64, end_time: f64, x: f64, y: f64) -> Self {
        Self::new(OverlayKind::Clip, asset, start_time, end_time, x, y)
    }

    fn new(
        kind: OverlayKind,
        content: impl Into<String>,
        start_time: f64,
        end_time: f64,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            id: None,
            kind,
            content: content.into(),
            start_time,
            end_time,
            x,
            y,
            width: None,
            height: None,
        }
    }

    /// Set the size fractions.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set only the height fraction (font size for text overlays).
    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Effective width fraction.
    pub fn width_fraction(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_MEDIA_SIZE)
    }

    /// Effective height fraction. Text falls back to a smaller default.
    pub fn height_fraction(&self) -> f64 {
        match self.kind {
            OverlayKind::Text => self.height.unwrap_or(DEFAULT_TEXT_HEIGHT),
            OverlayKind::Image | OverlayKind::Clip => self.height.unwrap_or(DEFAULT_MEDIA_SIZE),
        }
    }

    /// Validate caller-supplied values.
    ///
    /// An empty window (`start_time >= end_time`) is accepted; it simply
    /// never renders.
    pub fn validate(&self, index: usize) -> ModelResult<()> {
        if self.content.trim().is_empty() {
            return Err(ModelError::EmptyContent { index });
        }

        for (field, value) in [("start_time", self.start_time), ("end_time", self.end_time)] {
            if !value.is_finite() {
                return Err(ModelError::NotFinite { index, field });
            }
            if value < 0.0 {
                return Err(ModelError::Negative { index, field });
            }
        }

        let fractions = [
            ("x", Some(self.x)),
            ("y", Some(self.y)),
            ("width", self.width),
            ("height", self.height),
        ];
        for (field, value) in fractions {
            let Some(value) = value else { continue };
            if !value.is_finite() {
                return Err(ModelError::NotFinite { index, field });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::OutOfRange { index, field, value });
            }
        }

        Ok(())
    }
}

/// Validate an ordered overlay list.
pub fn validate_overlays(overlays: &[Overlay]) -> ModelResult<()> {
    overlays
        .iter()
        .enumerate()
        .try_for_each(|(index, overlay)| overlay.validate(index))
}

/// Parse and validate an overlay list from its JSON form.
pub fn parse_overlays(json: &str) -> ModelResult<Vec<Overlay>> {
    let overlays: Vec<Overlay> =
        serde_json::from_str(json).map_err(|e| ModelError::InvalidPayload(e.to_string()))?;
    validate_overlays(&overlays)?;
    Ok(overlays)
}
