// Paints a finished layout onto a single-page PDF document.

use crate::error::{QuoteError, QuoteResult};
use crate::layout::{
    BlockContent, DocumentLayout, ItemTable, PlacedBlock, RenderBlock, CELL_PADDING_MM,
    HEADER_FONT_SIZE, LINE_HEIGHT_MM, LOGO_MARK_MM, NORMAL_FONT_SIZE,
    PARAGRAPH_LINE_HEIGHT_MM, QR_SIZE_MM, SMALL_FONT_SIZE, TABLE_LINE_HEIGHT_MM,
    TERMS_LINE_SPACING_MM, TITLE_FONT_SIZE, text_width_mm,
};
use ::image::{DynamicImage, Luma, Rgba, RgbImage, RgbaImage};
use printpdf::*;
use qrcode::QrCode;
use tracing::warn;

/// Drop from a line's top edge to its text baseline
const BASELINE_DROP_MM: f32 = 4.0;

/// Fonts and the page being drawn on.
struct Canvas<'a> {
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    page_height: f32,
}

impl Canvas<'_> {
    /// Converts a top-down layout y into PDF space.
    fn y(&self, top_down: f32) -> Mm {
        Mm(self.page_height - top_down)
    }

    fn text(&self, text: &str, size: f32, x: f32, top_down: f32, bold: bool) {
        let font = if bold { self.bold } else { self.regular };
        self.layer.use_text(text, size, Mm(x), self.y(top_down), font);
    }

    fn centered_text(&self, text: &str, size: f32, block: &RenderBlock, top_down: f32, bold: bool) {
        let width = text_width_mm(text, size);
        let x = block.position.x + ((block.size.width - width) / 2.0).max(0.0);
        self.text(text, size, x, top_down, bold);
    }

    fn line(&self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let points = vec![
            (Point::new(Mm(x1), self.y(y1)), false),
            (Point::new(Mm(x2), self.y(y2)), false),
        ];
        let line = Line {
            points,
            is_closed: false,
        };
        self.layer.add_line(line);
    }

    fn outline(&self, block: &RenderBlock, gray: f32, thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(gray, gray, gray, None)));
        self.layer.set_outline_thickness(thickness);
        let (x, y) = (block.position.x, block.position.y);
        let (r, b) = (block.right(), block.bottom());
        self.line(x, y, r, y);
        self.line(r, y, r, b);
        self.line(r, b, x, b);
        self.line(x, b, x, y);
    }
}

/// Draws every block of `layout` and returns the document surface.
pub fn paint(layout: &DocumentLayout, title: &str) -> QuoteResult<PdfDocumentReference> {
    let (doc, page1, layer1) = PdfDocument::new(
        title,
        Mm(layout.page.width_mm),
        Mm(layout.page.height_mm),
        "Layer 1",
    );

    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| QuoteError::Pdf(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| QuoteError::Pdf(e.to_string()))?;

    let canvas = Canvas {
        layer: doc.get_page(page1).get_layer(layer1),
        regular: &font_regular,
        bold: &font_bold,
        page_height: layout.page.height_mm,
    };

    // Background first so every other block draws over it
    if let Some(raster) = &layout.watermark {
        embed_rgba(&canvas, &raster.surface, 0.0, 0.0, layout.page.width_mm, false);
    }

    let mark = layout.watermark.as_ref().map(|r| &r.mark);
    for placed in &layout.blocks {
        paint_block(&canvas, placed, mark);
    }

    Ok(doc)
}

fn paint_block(canvas: &Canvas, placed: &PlacedBlock, mark: Option<&RgbaImage>) {
    let block = &placed.block;
    let (x, y) = (block.position.x, block.position.y);

    match &placed.content {
        BlockContent::Header {
            title,
            business_name,
        } => {
            canvas.centered_text(title, TITLE_FONT_SIZE, block, y + 8.0, true);
            canvas.centered_text(business_name, HEADER_FONT_SIZE, block, y + 17.0, true);
        }
        BlockContent::Watermark => {}
        BlockContent::ClientDetails { lines } => {
            for (i, line) in lines.iter().enumerate() {
                let top = y + i as f32 * LINE_HEIGHT_MM;
                canvas.text(line, NORMAL_FONT_SIZE, x, top + BASELINE_DROP_MM, i == 1);
            }
        }
        BlockContent::Description { lines } => {
            for (i, line) in lines.iter().enumerate() {
                let top = y + i as f32 * PARAGRAPH_LINE_HEIGHT_MM;
                canvas.text(line, NORMAL_FONT_SIZE, x, top + BASELINE_DROP_MM, false);
            }
        }
        BlockContent::ItemTable(table) => paint_table(canvas, block, table),
        BlockContent::Totals { label, amount } => {
            canvas.outline(block, 0.0, 0.6);
            let baseline = y + block.size.height / 2.0 + 1.5;
            canvas.text(label, NORMAL_FONT_SIZE, x + 3.0, baseline, true);
            let amount_x = block.right() - 3.0 - text_width_mm(amount, NORMAL_FONT_SIZE);
            canvas.text(amount, NORMAL_FONT_SIZE, amount_x, baseline, true);
        }
        BlockContent::Signature {
            signatory,
            business_name,
        } => {
            if let Some(mark) = mark {
                embed_rgba(canvas, mark, x, y, LOGO_MARK_MM, true);
            }
            let rule_y = y + LOGO_MARK_MM + 4.0;
            canvas
                .layer
                .set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
            canvas.layer.set_outline_thickness(0.4);
            canvas.line(x, rule_y, block.right(), rule_y);
            canvas.text(signatory, SMALL_FONT_SIZE, x, rule_y + 4.0, false);
            canvas.text(business_name, SMALL_FONT_SIZE, x, rule_y + 8.0, true);
        }
        BlockContent::Terms { heading, lines } => {
            canvas.text(heading, NORMAL_FONT_SIZE, x, y + BASELINE_DROP_MM, true);
            for (i, line) in lines.iter().enumerate() {
                let top = y + (i + 1) as f32 * TERMS_LINE_SPACING_MM;
                canvas.text(line, SMALL_FONT_SIZE, x, top + BASELINE_DROP_MM, false);
            }
        }
        BlockContent::Contact { lines, qr_payload } => {
            for (i, line) in lines.iter().enumerate() {
                let top = y + i as f32 * LINE_HEIGHT_MM;
                canvas.text(line, NORMAL_FONT_SIZE, x, top + BASELINE_DROP_MM, false);
            }
            if let Some(payload) = qr_payload {
                match generate_qr_image(payload) {
                    Ok(qr) => {
                        let qr_x = block.right() - QR_SIZE_MM;
                        embed_rgba(canvas, &qr.to_rgba8(), qr_x, y, QR_SIZE_MM, false);
                    }
                    Err(e) => warn!("contact QR skipped: {}", e),
                }
            }
        }
        BlockContent::Closing { text } => {
            canvas.centered_text(text, HEADER_FONT_SIZE, block, y + 6.0, true);
        }
    }
}

fn paint_table(canvas: &Canvas, block: &RenderBlock, table: &ItemTable) {
    let x_start = block.position.x;
    let mut y = block.position.y;

    let mut column_x = Vec::with_capacity(table.columns.len());
    let mut x = x_start;
    for column in &table.columns {
        column_x.push(x);
        x += column.width;
    }

    // Header row
    for (column, cx) in table.columns.iter().zip(&column_x) {
        let text_y = y + table.header_height / 2.0 + 1.5;
        canvas.text(column.title, NORMAL_FONT_SIZE, cx + CELL_PADDING_MM, text_y, true);
    }
    canvas
        .layer
        .set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    canvas.layer.set_outline_thickness(0.5);
    canvas.line(x_start, y, block.right(), y);
    y += table.header_height;
    canvas.line(x_start, y, block.right(), y);

    for row in &table.rows {
        for (lines, cx) in row.cells.iter().zip(&column_x) {
            for (i, line) in lines.iter().enumerate() {
                let top = y + 1.5 + i as f32 * TABLE_LINE_HEIGHT_MM;
                canvas.text(line, NORMAL_FONT_SIZE, cx + CELL_PADDING_MM, top + BASELINE_DROP_MM, false);
            }
        }
        y += row.height;
        canvas
            .layer
            .set_outline_color(Color::Rgb(Rgb::new(0.8, 0.8, 0.8, None)));
        canvas.layer.set_outline_thickness(0.3);
        canvas.line(x_start, y, block.right(), y);
    }
}

// ============================================================================
// Images
// ============================================================================

fn generate_qr_image(payload: &str) -> QuoteResult<DynamicImage> {
    let code = QrCode::new(payload.as_bytes()).map_err(|e| QuoteError::Pdf(e.to_string()))?;
    let image = code.render::<Luma<u8>>().build();
    Ok(DynamicImage::ImageLuma8(image))
}

/// Embeds an RGBA raster flattened onto white, top-left at (`x`, `top`)
/// in layout space, scaled to `width_mm`. With `fit_height` the width is
/// treated as a square bound instead.
fn embed_rgba(
    canvas: &Canvas,
    rgba_image: &RgbaImage,
    x: f32,
    top: f32,
    width_mm: f32,
    fit_height: bool,
) {
    let (width_px, height_px) = rgba_image.dimensions();
    if width_px == 0 || height_px == 0 {
        return;
    }

    // Composite against white background
    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (px, py, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let bg = 255.0;
        let out_r = (r as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_g = (g as f32 * alpha + bg * (1.0 - alpha)) as u8;
        let out_b = (b as f32 * alpha + bg * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(px, py, ::image::Rgb([out_r, out_g, out_b]));
    }

    // Calculate dimensions preserving aspect ratio
    let aspect_ratio = width_px as f32 / height_px as f32;
    let (final_width_mm, final_height_mm) = if fit_height && aspect_ratio < 1.0 {
        (width_mm * aspect_ratio, width_mm)
    } else {
        (width_mm, width_mm / aspect_ratio)
    };

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // DPI = pixels / (mm / 25.4)
    let dpi = (width_px as f32) / (final_width_mm / 25.4);

    // printpdf anchors images at their bottom-left corner
    image.add_to_layer(
        canvas.layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(canvas.y(top + final_height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}
