//! Render configuration

use crate::drawing::EMU_PER_INCH;
use crate::error::{TemplateRenderError, TemplateResult};
use crate::placeholder::is_placeholder_name;
use serde::{Deserialize, Serialize};

/// Reserved text the QR placeholder is swapped for before substitution
pub const DEFAULT_QR_MARKER: &str = "[[QR_INLINE_IMG]]";

/// Page corner used when the QR image has to be anchored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl AnchorCorner {
    pub fn is_right(self) -> bool {
        matches!(self, AnchorCorner::TopRight | AnchorCorner::BottomRight)
    }

    pub fn is_bottom(self) -> bool {
        matches!(self, AnchorCorner::BottomLeft | AnchorCorner::BottomRight)
    }
}

/// Options controlling a single render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Marker text standing in for the QR image between substitution and embedding
    pub qr_marker: String,
    /// Placeholder name that receives the QR image
    pub qr_placeholder: String,
    /// Width and height of the QR image in EMU
    pub qr_size_emu: i64,
    /// Corner used by the anchored fallback
    pub anchor_corner: AnchorCorner,
    /// Distance from the page edges for the anchored fallback, in EMU
    pub anchor_margin_emu: i64,
    /// Relationship id registered for the QR media part
    pub qr_relationship_id: String,
    /// Media file stem (`word/media/<stem>.png`)
    pub qr_media_name: String,
    /// Convert `\n` in values into Word line breaks
    pub linebreaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            qr_marker: DEFAULT_QR_MARKER.to_string(),
            qr_placeholder: "QRCode".to_string(),
            qr_size_emu: EMU_PER_INCH,
            anchor_corner: AnchorCorner::BottomRight,
            anchor_margin_emu: EMU_PER_INCH / 2,
            qr_relationship_id: "rIdQrCode".to_string(),
            qr_media_name: "qrcode".to_string(),
            linebreaks: true,
        }
    }
}

impl RenderOptions {
    /// Reject options that would produce broken XML or an unfindable marker
    pub fn validate(&self) -> TemplateResult<()> {
        if self.qr_marker.trim().is_empty() {
            return Err(TemplateRenderError::InvalidOptions("QR marker is empty".into()));
        }
        if self.qr_marker.contains(['<', '>', '&', '"', '{', '}']) {
            return Err(TemplateRenderError::InvalidOptions(format!(
                "QR marker {:?} contains XML or placeholder syntax",
                self.qr_marker
            )));
        }
        if !is_placeholder_name(&self.qr_placeholder) {
            return Err(TemplateRenderError::InvalidOptions(format!(
                "{:?} is not a valid placeholder name",
                self.qr_placeholder
            )));
        }
        if self.qr_size_emu <= 0 {
            return Err(TemplateRenderError::InvalidOptions("QR size must be positive".into()));
        }
        if self.anchor_margin_emu < 0 {
            return Err(TemplateRenderError::InvalidOptions("anchor margin must not be negative".into()));
        }
        let id_ok = !self.qr_relationship_id.is_empty()
            && self.qr_relationship_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !id_ok {
            return Err(TemplateRenderError::InvalidOptions(format!(
                "relationship id {:?} must be alphanumeric",
                self.qr_relationship_id
            )));
        }
        let stem_ok = !self.qr_media_name.is_empty()
            && self.qr_media_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !stem_ok {
            return Err(TemplateRenderError::InvalidOptions(format!(
                "media name {:?} is not a safe file stem",
                self.qr_media_name
            )));
        }
        Ok(())
    }
}
