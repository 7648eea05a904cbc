// Business profile, page geometry and watermark settings for quotations.

use crate::error::{QuoteError, QuoteResult};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Constants
// ============================================================================

/// A4 dimensions in mm
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Watermark opacity band; anything outside it is clamped.
pub const MIN_WATERMARK_OPACITY: f32 = 0.05;
pub const MAX_WATERMARK_OPACITY: f32 = 0.10;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotationConfig {
    pub page: PageSize,
    pub business: BusinessProfile,
    pub watermark: WatermarkSettings,
    /// Leading part of the artifact file name, `<prefix>_<client>.pdf`
    pub artifact_prefix: String,
}

impl Default for QuotationConfig {
    fn default() -> Self {
        Self {
            page: PageSize::default(),
            business: BusinessProfile::default(),
            watermark: WatermarkSettings::default(),
            artifact_prefix: "Quotation".to_string(),
        }
    }
}

impl QuotationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> QuoteResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuoteError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> QuoteResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| QuoteError::Config(format!("Invalid JSON: {}", e)))?;
        config.page.check()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageSize {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self {
            width_mm: A4_WIDTH_MM,
            height_mm: A4_HEIGHT_MM,
        }
    }
}

impl PageSize {
    fn check(&self) -> QuoteResult<()> {
        if !(self.width_mm > 0.0 && self.height_mm > 0.0) {
            return Err(QuoteError::Config(format!(
                "page size must be positive, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusinessProfile {
    pub name: String,
    /// Heading printed above the business name
    pub title: String,
    /// Paragraph introducing the quotation, reflowed to the page width
    pub description: String,
    pub signatory: String,
    pub closing_message: String,
    pub currency: String,
    pub terms: Vec<String>,
    pub contact: ContactDetails,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: "Studio Lumiere Photography".to_string(),
            title: "QUOTATION".to_string(),
            description: "Thank you for considering us for your special day. This quotation \
                covers the photography and videography services selected below. Prices are \
                per day of coverage unless stated otherwise and include editing and delivery \
                of the final gallery."
                .to_string(),
            signatory: "Authorized Signatory".to_string(),
            closing_message: "We look forward to capturing your memories!".to_string(),
            currency: "Rs.".to_string(),
            terms: vec![
                "50% advance is required to confirm the booking.".to_string(),
                "The balance is payable on the day of the event.".to_string(),
                "Travel and accommodation outside the city are charged separately.".to_string(),
                "Edited photos are delivered within 30 days of the event.".to_string(),
                "This quotation is valid for 15 days from the booked date.".to_string(),
            ],
            contact: ContactDetails::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub phone: String,
    pub email: String,
    pub address: String,
    /// Encoded as a QR mark in the contact block when present
    pub website: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    /// Brand image, file path or http(s) URL
    pub source: Option<String>,
    pub opacity: f32,
    /// Edge length each tile is scaled to fit, in raster pixels
    pub tile_px: u32,
    /// Distance between tile origins, in raster pixels
    pub stride_px: u32,
    /// Resolution of the offscreen watermark surface
    pub raster_dpi: f32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            source: None,
            opacity: 0.08,
            tile_px: 120,
            stride_px: 200,
            raster_dpi: 96.0,
        }
    }
}

impl WatermarkSettings {
    pub fn clamped_opacity(&self) -> f32 {
        if self.opacity.is_nan() {
            return MIN_WATERMARK_OPACITY;
        }
        self.opacity
            .clamp(MIN_WATERMARK_OPACITY, MAX_WATERMARK_OPACITY)
    }
}
