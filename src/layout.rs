// Page layout: every block is stacked below the previous one's bottom edge.
//
// Coordinates are millimetres measured from the top-left corner of the page.
// The renderer flips them into PDF space.

use crate::config::{BusinessProfile, PageSize, QuotationConfig};
use crate::model::Quotation;
use crate::pricing::{extended_price, format_amount};
use crate::watermark::WatermarkRaster;

// ============================================================================
// Constants
// ============================================================================

/// Left/right/top margin
pub const MARGIN_MM: f32 = 15.0;

/// Gap between consecutive blocks
pub const BLOCK_SPACING_MM: f32 = 6.0;

/// Vertical step between client/contact lines
pub const LINE_HEIGHT_MM: f32 = 6.0;
pub const PARAGRAPH_LINE_HEIGHT_MM: f32 = 5.0;
pub const TERMS_LINE_SPACING_MM: f32 = 5.0;

pub const HEADER_HEIGHT_MM: f32 = 22.0;
pub const CLOSING_HEIGHT_MM: f32 = 8.0;

pub const TABLE_HEADER_HEIGHT_MM: f32 = 8.0;
pub const TABLE_LINE_HEIGHT_MM: f32 = 5.0;
pub const TABLE_ROW_PADDING_MM: f32 = 3.0;
pub const CELL_PADDING_MM: f32 = 2.0;

pub const TOTALS_WIDTH_MM: f32 = 70.0;
pub const TOTALS_HEIGHT_MM: f32 = 12.0;

/// Room kept for the logo mark whether or not it loaded
pub const LOGO_MARK_MM: f32 = 14.0;
pub const SIGNATURE_HEIGHT_MM: f32 = LOGO_MARK_MM + 14.0;

pub const QR_SIZE_MM: f32 = 22.0;

/// Font sizes in points
pub const TITLE_FONT_SIZE: f32 = 20.0;
pub const HEADER_FONT_SIZE: f32 = 14.0;
pub const NORMAL_FONT_SIZE: f32 = 11.0;
pub const SMALL_FONT_SIZE: f32 = 9.0;

/// Helvetica averages roughly half an em per glyph
const AVG_GLYPH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 25.4 / 72.0;

/// Item table columns; their sum stays below any supported page width.
pub const TABLE_COLUMNS: [TableColumn; 4] = [
    TableColumn { title: "Service", width: 50.0 },
    TableColumn { title: "Description", width: 70.0 },
    TableColumn { title: "Days/Quantity", width: 25.0 },
    TableColumn { title: "Total", width: 35.0 },
];

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Header,
    Watermark,
    ClientDetails,
    Description,
    ItemTable,
    Totals,
    Signature,
    Terms,
    Contact,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBlock {
    pub kind: BlockKind,
    pub position: Position,
    pub size: Size,
}

impl RenderBlock {
    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.height
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.width
    }
}

/// A block's horizontal placement and height, before it is stacked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSpec {
    pub kind: BlockKind,
    pub x: f32,
    pub width: f32,
    pub height: f32,
}

/// Places the first block at `top` and each following block at the
/// previous block's bottom edge plus `spacing`.
pub fn stack_blocks(top: f32, spacing: f32, specs: &[BlockSpec]) -> Vec<RenderBlock> {
    specs
        .iter()
        .fold(Vec::with_capacity(specs.len()), |mut placed, spec| {
            let y = placed
                .last()
                .map_or(top, |prev: &RenderBlock| prev.bottom() + spacing);
            placed.push(RenderBlock {
                kind: spec.kind,
                position: Position { x: spec.x, y },
                size: Size {
                    width: spec.width,
                    height: spec.height,
                },
            });
            placed
        })
}

/// Left edge that centres a table of `columns_width` on the page.
pub fn table_origin_x(page_width: f32, columns_width: f32) -> f32 {
    ((page_width - columns_width) / 2.0).max(0.0)
}

// ============================================================================
// Text Metrics
// ============================================================================

fn char_width_mm(font_size: f32) -> f32 {
    font_size * AVG_GLYPH_EM * PT_TO_MM
}

/// Approximate rendered width of `text` in a builtin font.
pub fn text_width_mm(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * char_width_mm(font_size)
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap_text(text: &str, max_width_mm: f32, font_size: f32) -> Vec<String> {
    let max_chars = ((max_width_mm / char_width_mm(font_size)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ============================================================================
// Block Content
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableColumn {
    pub title: &'static str,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Wrapped lines per column
    pub cells: [Vec<String>; 4],
    pub height: f32,
}

impl TableRow {
    /// Cell text with wrapped lines joined back together.
    pub fn texts(&self) -> [String; 4] {
        self.cells.clone().map(|lines| lines.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemTable {
    pub columns: [TableColumn; 4],
    pub header_height: f32,
    pub rows: Vec<TableRow>,
}

impl ItemTable {
    pub fn columns_width(&self) -> f32 {
        self.columns.iter().map(|c| c.width).sum()
    }

    pub fn height(&self) -> f32 {
        self.header_height + self.rows.iter().map(|r| r.height).sum::<f32>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Header {
        title: String,
        business_name: String,
    },
    Watermark,
    ClientDetails {
        lines: Vec<String>,
    },
    Description {
        lines: Vec<String>,
    },
    ItemTable(ItemTable),
    Totals {
        label: String,
        amount: String,
    },
    Signature {
        signatory: String,
        business_name: String,
    },
    Terms {
        heading: String,
        lines: Vec<String>,
    },
    Contact {
        lines: Vec<String>,
        qr_payload: Option<String>,
    },
    Closing {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub block: RenderBlock,
    pub content: BlockContent,
}

/// Positioned blocks for one page plus the optional background raster.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub page: PageSize,
    pub blocks: Vec<PlacedBlock>,
    pub watermark: Option<WatermarkRaster>,
}

impl DocumentLayout {
    pub fn render_blocks(&self) -> Vec<RenderBlock> {
        self.blocks.iter().map(|b| b.block).collect()
    }

    pub fn block(&self, kind: BlockKind) -> Option<&PlacedBlock> {
        self.blocks.iter().find(|b| b.block.kind == kind)
    }

    pub fn item_table(&self) -> Option<&ItemTable> {
        self.blocks.iter().find_map(|b| match &b.content {
            BlockContent::ItemTable(table) => Some(table),
            _ => None,
        })
    }
}

// ============================================================================
// Layout Engine
// ============================================================================

#[derive(Debug, Clone)]
pub struct DocumentLayoutEngine {
    page: PageSize,
    business: BusinessProfile,
}

impl DocumentLayoutEngine {
    pub fn new(config: &QuotationConfig) -> Self {
        Self {
            page: config.page,
            business: config.business.clone(),
        }
    }

    fn content_width(&self) -> f32 {
        (self.page.width_mm - 2.0 * MARGIN_MM).max(1.0)
    }

    pub fn layout(
        &self,
        quotation: &Quotation,
        total_amount: u64,
        watermark: Option<WatermarkRaster>,
    ) -> DocumentLayout {
        let page_width = self.page.width_mm;
        let content_width = self.content_width();

        let header = BlockContent::Header {
            title: self.business.title.clone(),
            business_name: self.business.name.clone(),
        };
        let client_lines = client_lines(quotation);
        let description_lines =
            wrap_text(&self.business.description, content_width, NORMAL_FONT_SIZE);
        let table = item_table(quotation);
        let totals = BlockContent::Totals {
            label: "Total Amount".to_string(),
            amount: format!("{} {}", self.business.currency, format_amount(total_amount)),
        };
        let signature = BlockContent::Signature {
            signatory: self.business.signatory.clone(),
            business_name: self.business.name.clone(),
        };
        let terms_lines = self.terms_lines(content_width);
        let (contact_lines, qr_payload) = self.contact_lines();
        let closing = BlockContent::Closing {
            text: self.business.closing_message.clone(),
        };

        let table_width = table.columns_width();
        let totals_x = page_width - MARGIN_MM - TOTALS_WIDTH_MM;
        let contact_height = (contact_lines.len() as f32 * LINE_HEIGHT_MM).max(if qr_payload.is_some() {
            QR_SIZE_MM
        } else {
            0.0
        });

        let flow = vec![
            (
                BlockSpec {
                    kind: BlockKind::Header,
                    x: 0.0,
                    width: page_width,
                    height: HEADER_HEIGHT_MM,
                },
                header,
            ),
            (
                BlockSpec {
                    kind: BlockKind::ClientDetails,
                    x: MARGIN_MM,
                    width: content_width,
                    height: client_lines.len() as f32 * LINE_HEIGHT_MM,
                },
                BlockContent::ClientDetails { lines: client_lines },
            ),
            (
                BlockSpec {
                    kind: BlockKind::Description,
                    x: MARGIN_MM,
                    width: content_width,
                    height: description_lines.len() as f32 * PARAGRAPH_LINE_HEIGHT_MM,
                },
                BlockContent::Description {
                    lines: description_lines,
                },
            ),
            (
                BlockSpec {
                    kind: BlockKind::ItemTable,
                    x: table_origin_x(page_width, table_width),
                    width: table_width,
                    height: table.height(),
                },
                BlockContent::ItemTable(table),
            ),
            (
                BlockSpec {
                    kind: BlockKind::Totals,
                    x: totals_x,
                    width: TOTALS_WIDTH_MM,
                    height: TOTALS_HEIGHT_MM,
                },
                totals,
            ),
            (
                BlockSpec {
                    kind: BlockKind::Signature,
                    x: totals_x,
                    width: TOTALS_WIDTH_MM,
                    height: SIGNATURE_HEIGHT_MM,
                },
                signature,
            ),
            (
                BlockSpec {
                    kind: BlockKind::Terms,
                    x: MARGIN_MM,
                    width: content_width,
                    height: (terms_lines.len() + 1) as f32 * TERMS_LINE_SPACING_MM,
                },
                BlockContent::Terms {
                    heading: "Terms & Conditions".to_string(),
                    lines: terms_lines,
                },
            ),
            (
                BlockSpec {
                    kind: BlockKind::Contact,
                    x: MARGIN_MM,
                    width: content_width,
                    height: contact_height,
                },
                BlockContent::Contact {
                    lines: contact_lines,
                    qr_payload,
                },
            ),
            (
                BlockSpec {
                    kind: BlockKind::Closing,
                    x: 0.0,
                    width: page_width,
                    height: CLOSING_HEIGHT_MM,
                },
                closing,
            ),
        ];

        let specs: Vec<BlockSpec> = flow.iter().map(|(spec, _)| *spec).collect();
        let mut blocks: Vec<PlacedBlock> = stack_blocks(MARGIN_MM, BLOCK_SPACING_MM, &specs)
            .into_iter()
            .zip(flow.into_iter().map(|(_, content)| content))
            .map(|(block, content)| PlacedBlock { block, content })
            .collect();

        // Background sits right after the header and spans the whole page
        if watermark.is_some() {
            blocks.insert(
                1,
                PlacedBlock {
                    block: RenderBlock {
                        kind: BlockKind::Watermark,
                        position: Position { x: 0.0, y: 0.0 },
                        size: Size {
                            width: page_width,
                            height: self.page.height_mm,
                        },
                    },
                    content: BlockContent::Watermark,
                },
            );
        }

        DocumentLayout {
            page: self.page,
            blocks,
            watermark,
        }
    }

    fn terms_lines(&self, content_width: f32) -> Vec<String> {
        self.business
            .terms
            .iter()
            .enumerate()
            .flat_map(|(i, term)| {
                wrap_text(&format!("{}. {}", i + 1, term), content_width, SMALL_FONT_SIZE)
            })
            .collect()
    }

    fn contact_lines(&self) -> (Vec<String>, Option<String>) {
        let contact = &self.business.contact;
        let mut lines = Vec::new();
        for (label, value) in [
            ("Phone", contact.phone.as_str()),
            ("Email", contact.email.as_str()),
            ("Address", contact.address.as_str()),
        ] {
            if !value.trim().is_empty() {
                lines.push(format!("{}: {}", label, value));
            }
        }
        let website = contact
            .website
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string);
        if let Some(site) = &website {
            lines.push(format!("Website: {}", site));
        }
        (lines, website)
    }
}

fn client_lines(quotation: &Quotation) -> Vec<String> {
    let client = &quotation.client;
    let mut lines = vec![
        format!("Booked on: {}", quotation.generated_at.format("%-d %B %Y")),
        format!("Name: {}", client.name),
        format!("Mobile: {}", client.mobile),
    ];
    if let Some(email) = client.email.as_deref().filter(|e| !e.trim().is_empty()) {
        lines.push(format!("Email: {}", email));
    }
    lines.push(format!("Event date: {}", client.event_date.format("%-d %B %Y")));
    lines
}

fn item_table(quotation: &Quotation) -> ItemTable {
    let rows = quotation
        .items
        .items()
        .iter()
        .map(|item| {
            let raw = [
                item.name.clone(),
                item.description.clone(),
                item.quantity_units.to_string(),
                format_amount(extended_price(item)),
            ];
            let mut cells: [Vec<String>; 4] = Default::default();
            for (i, text) in raw.iter().enumerate() {
                let width = TABLE_COLUMNS[i].width - 2.0 * CELL_PADDING_MM;
                cells[i] = wrap_text(text, width, NORMAL_FONT_SIZE);
            }
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            TableRow {
                cells,
                height: line_count as f32 * TABLE_LINE_HEIGHT_MM + TABLE_ROW_PADDING_MM,
            }
        })
        .collect();

    ItemTable {
        columns: TABLE_COLUMNS,
        header_height: TABLE_HEADER_HEIGHT_MM,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Client, ItemSet, LineItem};
    use ::image::RgbaImage;
    use chrono::NaiveDate;

    fn quotation(items: Vec<LineItem>) -> Quotation {
        let client = Client {
            name: "Jane Doe".to_string(),
            mobile: "9800000000".to_string(),
            email: Some("jane@example.com".to_string()),
            event_date: NaiveDate::from_ymd_opt(2026, 12, 5).unwrap(),
        };
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        Quotation::new(client, ItemSet::from_items(items).unwrap(), at)
    }

    fn engine() -> DocumentLayoutEngine {
        let mut config = QuotationConfig::default();
        config.business.contact.website = Some("https://studio.example".to_string());
        DocumentLayoutEngine::new(&config)
    }

    fn raster() -> WatermarkRaster {
        WatermarkRaster {
            surface: RgbaImage::new(10, 10),
            mark: RgbaImage::new(2, 2),
        }
    }

    #[test]
    fn stacking_follows_previous_bottom_edge() {
        let specs = [
            BlockSpec { kind: BlockKind::Header, x: 0.0, width: 100.0, height: 10.0 },
            BlockSpec { kind: BlockKind::Description, x: 5.0, width: 90.0, height: 7.5 },
            BlockSpec { kind: BlockKind::Closing, x: 0.0, width: 100.0, height: 3.0 },
        ];
        let blocks = stack_blocks(15.0, 4.0, &specs);
        assert_eq!(blocks[0].position.y, 15.0);
        assert_eq!(blocks[1].position.y, 29.0);
        assert_eq!(blocks[2].position.y, 40.5);
        assert_eq!(blocks[1].position.x, 5.0);
    }

    #[test]
    fn table_is_centred_for_any_wider_page() {
        let columns: f32 = TABLE_COLUMNS.iter().map(|c| c.width).sum();
        for width in [181.0_f32, 210.0, 215.9, 297.0, 420.0] {
            assert_eq!(table_origin_x(width, columns), (width - columns) / 2.0);
        }
        assert_eq!(table_origin_x(210.0, columns), 15.0);
    }

    #[test]
    fn wrap_respects_width_and_keeps_words() {
        let text = "Full day candid coverage with two photographers and a cinematic highlight film";
        let lines = wrap_text(text, 40.0, NORMAL_FONT_SIZE);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, NORMAL_FONT_SIZE) <= 40.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let lines = wrap_text(&"x".repeat(50), 10.0, NORMAL_FONT_SIZE);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat().len(), 50);
    }

    #[test]
    fn single_package_row() {
        let layout = engine().layout(
            &quotation(vec![LineItem::new("Classic Package", 29999, 1)]),
            29999,
            None,
        );
        let table = layout.item_table().unwrap();
        assert_eq!(table.rows.len(), 1);
        let texts = table.rows[0].texts();
        assert_eq!(texts[0], "Classic Package");
        assert_eq!(texts[2], "1");
        assert_eq!(texts[3], "29,999");

        match &layout.block(BlockKind::Totals).unwrap().content {
            BlockContent::Totals { amount, .. } => assert_eq!(amount, "Rs. 29,999"),
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn description_column_carries_item_description() {
        let item = LineItem::new("Classic Package", 29999, 2)
            .with_description("Full day coverage")
            .with_category(Category::Package);
        let layout = engine().layout(&quotation(vec![item]), 59998, None);
        let table = layout.item_table().unwrap();
        assert_eq!(table.columns[1].title, "Description");
        let texts = table.rows[0].texts();
        assert_eq!(texts[1], "Full day coverage");
        assert_eq!(texts[2], "2");
        assert_eq!(texts[3], "59,998");
    }

    #[test]
    fn blocks_come_in_page_order_without_overlap() {
        let layout = engine().layout(
            &quotation(vec![
                LineItem::new("Drone Photography", 10000, 2),
                LineItem::new("Videography", 15000, 1),
            ]),
            35000,
            None,
        );
        let kinds: Vec<_> = layout.render_blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Header,
                BlockKind::ClientDetails,
                BlockKind::Description,
                BlockKind::ItemTable,
                BlockKind::Totals,
                BlockKind::Signature,
                BlockKind::Terms,
                BlockKind::Contact,
                BlockKind::Closing,
            ]
        );
        for pair in layout.render_blocks().windows(2) {
            assert_eq!(pair[1].position.y, pair[0].bottom() + BLOCK_SPACING_MM);
        }
    }

    #[test]
    fn totals_box_sits_at_right_margin_below_table() {
        let layout = engine().layout(
            &quotation(vec![LineItem::new("Classic Package", 29999, 1)]),
            29999,
            None,
        );
        let table = layout.block(BlockKind::ItemTable).unwrap().block;
        let totals = layout.block(BlockKind::Totals).unwrap().block;
        let signature = layout.block(BlockKind::Signature).unwrap().block;
        assert_eq!(totals.right(), layout.page.width_mm - MARGIN_MM);
        assert!(totals.position.y > table.bottom());
        assert_eq!(signature.position.x, totals.position.x);
    }

    #[test]
    fn more_items_push_later_blocks_down() {
        let one = engine().layout(
            &quotation(vec![LineItem::new("Classic Package", 29999, 1)]),
            29999,
            None,
        );
        let three = engine().layout(
            &quotation(vec![
                LineItem::new("Classic Package", 29999, 1),
                LineItem::new("Drone Photography", 10000, 2),
                LineItem::new("Videography", 15000, 1),
            ]),
            79999,
            None,
        );
        let shift = three.block(BlockKind::Totals).unwrap().block.position.y
            - one.block(BlockKind::Totals).unwrap().block.position.y;
        assert!(shift >= 2.0 * (TABLE_LINE_HEIGHT_MM + TABLE_ROW_PADDING_MM) - 0.001);
    }

    #[test]
    fn watermark_only_adds_background_block() {
        let q = quotation(vec![LineItem::new("Classic Package", 29999, 1)]);
        let plain = engine().layout(&q, 29999, None);
        let marked = engine().layout(&q, 29999, Some(raster()));

        assert_eq!(marked.blocks[0].block.kind, BlockKind::Header);
        assert_eq!(marked.blocks[1].block.kind, BlockKind::Watermark);
        let background = marked.block(BlockKind::Watermark).unwrap().block;
        assert_eq!(background.position, Position { x: 0.0, y: 0.0 });
        assert_eq!(background.size.height, marked.page.height_mm);

        let without: Vec<_> = marked
            .blocks
            .iter()
            .filter(|b| b.block.kind != BlockKind::Watermark)
            .cloned()
            .collect();
        assert_eq!(without, plain.blocks);
    }

    #[test]
    fn identical_input_gives_identical_layout() {
        let q = quotation(vec![
            LineItem::new("Drone Photography", 10000, 2),
            LineItem::new("Videography", 15000, 1),
        ]);
        let a = engine().layout(&q, 35000, None);
        let b = engine().layout(&q, 35000, None);
        assert_eq!(a.blocks, b.blocks);
    }

    #[test]
    fn contact_block_carries_website_qr() {
        let layout = engine().layout(
            &quotation(vec![LineItem::new("Classic Package", 29999, 1)]),
            29999,
            None,
        );
        let contact = layout.block(BlockKind::Contact).unwrap();
        match &contact.content {
            BlockContent::Contact { qr_payload, .. } => {
                assert_eq!(qr_payload.as_deref(), Some("https://studio.example"));
            }
            other => panic!("unexpected content {:?}", other),
        }
        assert!(contact.block.size.height >= QR_SIZE_MM);
    }
}
