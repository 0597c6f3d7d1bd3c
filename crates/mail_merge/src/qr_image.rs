//! QR code images for certificate verification links

use std::io::Cursor;

use base64::Engine;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};

use crate::batch::QrEncoder;
use crate::error::{MailMergeError, Result};

/// Encodes each row's text as a black on white PNG QR code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrCodeEncoder {
    /// Pixels per module
    module_px: u32,
    /// Light border around the code, in modules
    quiet_zone: u32,
}

impl Default for QrCodeEncoder {
    fn default() -> Self {
        Self {
            module_px: 8,
            quiet_zone: 4,
        }
    }
}

impl QrCodeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module_px(mut self, module_px: u32) -> Self {
        self.module_px = module_px.max(1);
        self
    }

    pub fn with_quiet_zone(mut self, quiet_zone: u32) -> Self {
        self.quiet_zone = quiet_zone;
        self
    }

    /// PNG bytes for `text`
    pub fn png(&self, text: &str) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Err(MailMergeError::QrEncode("nothing to encode".into()));
        }
        let code = QrCode::new(text.as_bytes()).map_err(|e| MailMergeError::QrEncode(e.to_string()))?;

        let modules = code.width() as u32;
        let size = (modules + 2 * self.quiet_zone) * self.module_px;
        let mut img = GrayImage::from_pixel(size, size, Luma([255]));
        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let x0 = (i as u32 % modules + self.quiet_zone) * self.module_px;
            let y0 = (i as u32 / modules + self.quiet_zone) * self.module_px;
            for y in y0..y0 + self.module_px {
                for x in x0..x0 + self.module_px {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }

        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| MailMergeError::QrEncode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

impl QrEncoder for QrCodeEncoder {
    fn encode(&self, text: &str) -> Result<String> {
        let png = self.png(text)?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        ))
    }
}
