// Brand watermark: load the source image and tile it faintly across a page-sized raster.

use crate::config::{PageSize, WatermarkSettings};
use crate::error::AssetError;
use ::image::imageops::{self, FilterType};
use ::image::{DynamicImage, RgbaImage};
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Edge length of the small logo mark kept for the signature block
const MARK_SIZE_PX: u32 = 96;

/// Largest raster edge the composer will allocate
pub const MAX_SURFACE_PX: u32 = 16_384;

/// Where the brand image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum WatermarkSource {
    Path(PathBuf),
    Url(String),
    Bytes(Vec<u8>),
}

impl WatermarkSource {
    /// Treats http(s) references as URLs and everything else as a file path.
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            WatermarkSource::Url(reference.to_string())
        } else {
            WatermarkSource::Path(PathBuf::from(reference))
        }
    }

    fn describe(&self) -> String {
        match self {
            WatermarkSource::Path(p) => p.display().to_string(),
            WatermarkSource::Url(u) => u.clone(),
            WatermarkSource::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

/// A scaled, alpha-reduced copy of the source and every place it lands.
#[derive(Debug, Clone)]
pub struct WatermarkTile {
    pub source_image: RgbaImage,
    pub opacity: f32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub origin_offsets: Vec<(u32, u32)>,
}

/// Finished background plus the logo mark decoded from the same asset.
#[derive(Debug, Clone)]
pub struct WatermarkRaster {
    pub surface: RgbaImage,
    pub mark: RgbaImage,
}

/// Result of one load attempt. Exactly one of these is produced per call.
#[derive(Debug)]
pub enum WatermarkOutcome {
    Composited(WatermarkRaster),
    Unavailable(AssetError),
}

impl WatermarkOutcome {
    pub fn is_composited(&self) -> bool {
        matches!(self, WatermarkOutcome::Composited(_))
    }

    pub fn raster(&self) -> Option<&WatermarkRaster> {
        match self {
            WatermarkOutcome::Composited(raster) => Some(raster),
            WatermarkOutcome::Unavailable(_) => None,
        }
    }
}

// ============================================================================
// Composer
// ============================================================================

#[derive(Debug, Clone)]
pub struct WatermarkComposer {
    settings: WatermarkSettings,
    page: PageSize,
}

impl WatermarkComposer {
    pub fn new(settings: WatermarkSettings, page: PageSize) -> Self {
        Self { settings, page }
    }

    /// Surface dimensions in pixels for the configured page and dpi.
    pub fn surface_size(&self) -> Result<(u32, u32), AssetError> {
        let dpi = self.settings.raster_dpi;
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(AssetError::Settings(format!("raster dpi {} is not positive", dpi)));
        }
        let to_px = |mm: f32| ((mm / 25.4) * dpi).round().max(1.0);
        let (width, height) = (to_px(self.page.width_mm), to_px(self.page.height_mm));
        if width > MAX_SURFACE_PX as f32 || height > MAX_SURFACE_PX as f32 {
            return Err(AssetError::Settings(format!(
                "raster dpi {} gives a {}x{} surface, above the {} px limit",
                dpi, width, height, MAX_SURFACE_PX
            )));
        }
        Ok((width as u32, height as u32))
    }

    /// Loads and composites the watermark. Never fails: any problem,
    /// including bad settings found before the load starts, comes back
    /// as `Unavailable`.
    pub async fn compose(&self, source: Option<&WatermarkSource>) -> WatermarkOutcome {
        match self.try_compose(source).await {
            Ok(raster) => {
                debug!(
                    width = raster.surface.width(),
                    height = raster.surface.height(),
                    "watermark composited"
                );
                WatermarkOutcome::Composited(raster)
            }
            Err(AssetError::NotConfigured) => {
                debug!("no watermark source, continuing without it");
                WatermarkOutcome::Unavailable(AssetError::NotConfigured)
            }
            Err(e) => {
                warn!("watermark unavailable, continuing without it: {}", e);
                WatermarkOutcome::Unavailable(e)
            }
        }
    }

    async fn try_compose(
        &self,
        source: Option<&WatermarkSource>,
    ) -> Result<WatermarkRaster, AssetError> {
        let source = source.ok_or(AssetError::NotConfigured)?;
        let (surface_w, surface_h) = self.surface_size()?;
        check_grid(self.settings.tile_px, self.settings.stride_px)?;

        debug!(source = %source.describe(), "loading watermark source");
        let bytes = load_source_bytes(source).await?;
        let image = ::image::load_from_memory(&bytes)
            .map_err(|e| AssetError::Decode(e.to_string()))?;

        let tile = build_tile(&image, &self.settings, surface_w, surface_h);
        let surface = composite_tiles(&tile, surface_w, surface_h);
        let mark = image
            .resize(MARK_SIZE_PX, MARK_SIZE_PX, FilterType::Triangle)
            .to_rgba8();

        Ok(WatermarkRaster { surface, mark })
    }
}

fn check_grid(tile_px: u32, stride_px: u32) -> Result<(), AssetError> {
    if tile_px == 0 {
        return Err(AssetError::Settings("tile size must be at least 1px".to_string()));
    }
    if stride_px <= tile_px {
        return Err(AssetError::Settings(format!(
            "stride {}px must exceed tile size {}px",
            stride_px, tile_px
        )));
    }
    Ok(())
}

// ============================================================================
// Loading
// ============================================================================

async fn load_source_bytes(source: &WatermarkSource) -> Result<Vec<u8>, AssetError> {
    match source {
        WatermarkSource::Path(path) => {
            tokio::fs::read(path).await.map_err(|e| AssetError::Read {
                path: path.display().to_string(),
                source: e,
            })
        }
        WatermarkSource::Url(url) => {
            let url = url.clone();
            tokio::task::spawn_blocking(move || fetch_url(&url))
                .await
                .map_err(|e| AssetError::Interrupted(e.to_string()))?
        }
        WatermarkSource::Bytes(bytes) => Ok(bytes.clone()),
    }
}

fn fetch_url(url: &str) -> Result<Vec<u8>, AssetError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| AssetError::Fetch(e.to_string()))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| AssetError::Fetch(format!("Failed to read response: {}", e)))?;
    Ok(bytes)
}

// ============================================================================
// Tiling
// ============================================================================

/// Grid origins for tiles of `tile` px spaced `stride` px apart, with the
/// leftover gap split evenly around each tile.
pub fn tile_origins(
    surface_w: u32,
    surface_h: u32,
    tile_w: u32,
    tile_h: u32,
    stride: u32,
) -> Vec<(u32, u32)> {
    if stride == 0 {
        return Vec::new();
    }
    let inset_x = stride.saturating_sub(tile_w) / 2;
    let inset_y = stride.saturating_sub(tile_h) / 2;

    let mut origins = Vec::new();
    let mut y = inset_y;
    while y < surface_h {
        let mut x = inset_x;
        while x < surface_w {
            origins.push((x, y));
            match x.checked_add(stride) {
                Some(next) => x = next,
                None => break,
            }
        }
        match y.checked_add(stride) {
            Some(next) => y = next,
            None => break,
        }
    }
    origins
}

fn build_tile(
    image: &DynamicImage,
    settings: &WatermarkSettings,
    surface_w: u32,
    surface_h: u32,
) -> WatermarkTile {
    let opacity = settings.clamped_opacity();
    let mut source_image = image
        .resize(settings.tile_px, settings.tile_px, FilterType::Triangle)
        .to_rgba8();
    for pixel in source_image.pixels_mut() {
        pixel.0[3] = (f32::from(pixel.0[3]) * opacity).round() as u8;
    }

    let (tile_width, tile_height) = source_image.dimensions();
    let origin_offsets = tile_origins(
        surface_w,
        surface_h,
        tile_width,
        tile_height,
        settings.stride_px,
    );

    WatermarkTile {
        source_image,
        opacity,
        tile_width,
        tile_height,
        origin_offsets,
    }
}

fn composite_tiles(tile: &WatermarkTile, surface_w: u32, surface_h: u32) -> RgbaImage {
    let mut surface = RgbaImage::new(surface_w, surface_h);
    for &(x, y) in &tile.origin_offsets {
        imageops::overlay(&mut surface, &tile.source_image, i64::from(x), i64::from(y));
    }
    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn brand_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(40, 20, Rgba([200, 30, 30, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn composer(settings: WatermarkSettings) -> WatermarkComposer {
        WatermarkComposer::new(settings, PageSize::default())
    }

    #[test]
    fn origins_follow_stride_without_overlap() {
        let origins = tile_origins(500, 300, 80, 60, 200);
        assert_eq!(
            origins,
            vec![(60, 70), (260, 70), (460, 70), (60, 270), (260, 270), (460, 270)]
        );
        for pair in origins.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.1 == b.1 {
                assert!(b.0 - a.0 >= 80);
            }
        }
    }

    #[test]
    fn origins_stop_at_the_numeric_edge() {
        let stride = u32::MAX / 2 + 1;
        let origins = tile_origins(u32::MAX, u32::MAX, 10, 10, stride);
        let inset = (stride - 10) / 2;
        assert_eq!(
            origins,
            vec![
                (inset, inset),
                (inset + stride, inset),
                (inset, inset + stride),
                (inset + stride, inset + stride),
            ]
        );
    }

    #[tokio::test]
    async fn oversized_dpi_is_refused_before_loading() {
        let settings = WatermarkSettings {
            raster_dpi: 1e9,
            ..WatermarkSettings::default()
        };
        let composer = composer(settings);
        assert!(matches!(composer.surface_size(), Err(AssetError::Settings(_))));

        let source = WatermarkSource::Bytes(brand_png());
        let outcome = composer.compose(Some(&source)).await;
        assert!(matches!(
            outcome,
            WatermarkOutcome::Unavailable(AssetError::Settings(_))
        ));
    }

    #[test]
    fn a4_surface_at_96_dpi() {
        let size = composer(WatermarkSettings::default()).surface_size().unwrap();
        assert_eq!(size, (794, 1123));
    }

    #[tokio::test]
    async fn composites_faint_tiles() {
        let composer = composer(WatermarkSettings::default());
        let source = WatermarkSource::Bytes(brand_png());
        let outcome = composer.compose(Some(&source)).await;

        let raster = outcome.raster().expect("watermark should composite");
        assert_eq!(raster.surface.dimensions(), (794, 1123));

        let max_alpha = raster.surface.pixels().map(|p| p.0[3]).max().unwrap();
        assert!(max_alpha > 0);
        assert!(f32::from(max_alpha) <= 255.0 * 0.10 + 1.0);

        // Gap between tiles stays empty
        assert_eq!(raster.surface.get_pixel(0, 0).0[3], 0);
        assert_eq!(raster.mark.width(), MARK_SIZE_PX);
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let composer = composer(WatermarkSettings::default());
        let source = WatermarkSource::parse("tests/output/does-not-exist.png");
        let outcome = composer.compose(Some(&source)).await;
        assert!(matches!(
            outcome,
            WatermarkOutcome::Unavailable(AssetError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_bytes_are_unavailable() {
        let composer = composer(WatermarkSettings::default());
        let source = WatermarkSource::Bytes(b"not an image".to_vec());
        let outcome = composer.compose(Some(&source)).await;
        assert!(matches!(
            outcome,
            WatermarkOutcome::Unavailable(AssetError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn bad_grid_fails_before_loading() {
        let settings = WatermarkSettings {
            stride_px: 50,
            tile_px: 50,
            ..WatermarkSettings::default()
        };
        let source = WatermarkSource::Bytes(brand_png());
        let outcome = composer(settings).compose(Some(&source)).await;
        assert!(matches!(
            outcome,
            WatermarkOutcome::Unavailable(AssetError::Settings(_))
        ));
    }

    #[tokio::test]
    async fn no_source_is_unavailable() {
        let outcome = composer(WatermarkSettings::default()).compose(None).await;
        assert!(!outcome.is_composited());
    }

    #[test]
    fn parse_distinguishes_urls() {
        assert!(matches!(
            WatermarkSource::parse("https://example.com/logo.png"),
            WatermarkSource::Url(_)
        ));
        assert!(matches!(
            WatermarkSource::parse("assets/logo.png"),
            WatermarkSource::Path(_)
        ));
    }
}
