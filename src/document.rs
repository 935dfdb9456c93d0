//! A minimal top-to-bottom page layout on top of `printpdf`.
//!
//! Invoices are a fixed stack of blocks on a single A4 page, so instead of a
//! layout engine this keeps a vertical cursor and emits `printpdf` operations
//! for each block as it is added.

use printpdf::font::BuiltinFont;
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::image::RawImage;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::xobject::XObjectTransform;
use printpdf::{Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, TextMatrix};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 36.0;
/// Line height as a multiple of the font size
const LEADING: f32 = 1.5;
const CELL_PADDING: f32 = 4.0;

/// Possible errors to occur while laying out a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to decode image {name}: {reason}")]
    ImageDecode { name: String, reason: String },
}

/// The fonts text blocks can be set in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weight {
    Normal,
    Bold,
}

impl Weight {
    fn font(self) -> BuiltinFont {
        match self {
            Weight::Normal => BuiltinFont::Helvetica,
            Weight::Bold => BuiltinFont::HelveticaBold,
        }
    }
}

/// A single page document that is filled from top to bottom
pub struct PageBuilder {
    document: PdfDocument,
    ops: Vec<Op>,
    /// Distance of the next block from the top edge, in points
    cursor: f32,
    /// Size of the last text line, used for blank lines
    line_size: f32,
}

impl PageBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            document: PdfDocument::new(title),
            ops: Vec::new(),
            cursor: MARGIN,
            line_size: 12.0,
        }
    }

    /// Distance of the next block from the top edge, in points
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Adds a left aligned paragraph
    ///
    /// Every `\n` in `text` starts a new line.
    pub fn paragraph(&mut self, text: &str, size: f32, weight: Weight) -> &mut Self {
        for line in text.lines() {
            self.cursor += size;
            self.write_text(line, MARGIN, self.cursor, size, weight);
            self.cursor += size * (LEADING - 1.0);
        }
        self.line_size = size;

        self
    }

    /// Adds vertical space of one line in the current font size
    pub fn blank_line(&mut self) -> &mut Self {
        self.cursor += self.line_size * LEADING;
        self
    }

    /// Adds an encoded image, scaled to fit into the given box and centered horizontally
    ///
    /// The aspect ratio is preserved. Small images are scaled up as well.
    pub fn image_centered(
        &mut self,
        name: &str,
        bytes: &[u8],
        max_width: f32,
        max_height: f32,
    ) -> Result<&mut Self, DocumentError> {
        let mut warnings = Vec::new();
        let image = RawImage::decode_from_bytes(bytes, &mut warnings)
            .map_err(|reason| DocumentError::ImageDecode { name: name.to_owned(), reason })?;
        let (img_w, img_h) = (image.width as f32, image.height as f32);
        if img_w == 0.0 || img_h == 0.0 {
            return Err(DocumentError::ImageDecode {
                name: name.to_owned(),
                reason: "the image is empty".to_owned(),
            });
        }

        let scale = (max_width / img_w).min(max_height / img_h);
        let (width, height) = (img_w * scale, img_h * scale);
        let x = (PAGE_WIDTH - width) / 2.0;
        let y = PAGE_HEIGHT - (self.cursor + height);

        let id = self.document.add_image(&image);
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                rotate: None,
                dpi: Some(72.0),
            },
        });
        self.cursor += height;

        Ok(self)
    }

    /// Adds a full width table with bordered cells
    ///
    /// The first row is set in bold. Cells may contain multiple lines, every
    /// row is as high as its tallest cell.
    pub fn table(&mut self, rows: &[Vec<String>], size: f32) -> &mut Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return self;
        }
        let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
        let line_height = size * LEADING;

        for (index, row) in rows.iter().enumerate() {
            let weight = match index {
                0 => Weight::Bold,
                _ => Weight::Normal,
            };
            let lines = row.iter().map(|cell| cell.lines().count().max(1)).max().unwrap_or(1);
            let row_height = lines as f32 * line_height + 2.0 * CELL_PADDING;

            for column in 0..columns {
                let x = MARGIN + column as f32 * column_width;
                self.stroke_rect(x, self.cursor, column_width, row_height);

                let cell = row.get(column).map(String::as_str).unwrap_or_default();
                for (line_index, line) in cell.lines().enumerate() {
                    let baseline = self.cursor + CELL_PADDING + size + line_index as f32 * line_height;
                    self.write_text(line, x + CELL_PADDING, baseline, size, weight);
                }
            }

            self.cursor += row_height;
        }
        self.line_size = size;

        self
    }

    /// Lays out the page and serializes the document
    pub fn finish(mut self) -> Vec<u8> {
        let page = PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), self.ops);
        self.document.pages.push(page);

        let mut warnings = Vec::new();
        let bytes = self.document.save(&PdfSaveOptions::default(), &mut warnings);
        for warning in warnings {
            log::debug!("PDF serialization: {:?}", warning);
        }

        bytes
    }

    /// `baseline` is measured from the top edge
    fn write_text(&mut self, text: &str, x: f32, baseline: f32, size: f32, weight: Weight) {
        if text.is_empty() {
            return;
        }
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetFontSizeBuiltinFont { size: Pt(size), font: weight.font() });
        self.ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(Pt(x), Pt(PAGE_HEIGHT - baseline)),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_owned())],
            font: weight.font(),
        });
        self.ops.push(Op::EndTextSection);
    }

    /// `top` is measured from the top edge
    fn stroke_rect(&mut self, x: f32, top: f32, width: f32, height: f32) {
        let y = PAGE_HEIGHT - (top + height);
        let polygon = Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    LinePoint { p: Point { x: Pt(x), y: Pt(y) }, bezier: false },
                    LinePoint { p: Point { x: Pt(x + width), y: Pt(y) }, bezier: false },
                    LinePoint { p: Point { x: Pt(x + width), y: Pt(y + height) }, bezier: false },
                    LinePoint { p: Point { x: Pt(x), y: Pt(y + height) }, bezier: false },
                ],
            }],
            mode: PaintMode::Stroke,
            winding_order: WindingOrder::NonZero,
        };
        self.ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
        self.ops.push(Op::DrawPolygon { polygon });
    }
}
