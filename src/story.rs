//! Translation of body elements into layout primitives.
//!
//! A [`Story`] is the ordered list of primitives the renderer paginates. Paragraphs
//! become [`TextBlock`]s, tables become a [`GridBlock`] followed by a [`Spacer`].

use crate::error::Error;
use crate::fonts::{FontFace, FontSet};
use crate::model::{Alignment, Block, Document, Paragraph, Table};

pub const PLACEHOLDER_TEXT: &str = "(Unable to render text)";

/// Space after every translated paragraph.
pub const PARAGRAPH_SPACE_AFTER: f32 = 12.0;
/// 0.3 inch.
pub const TABLE_SPACER_HEIGHT: f32 = 0.3 * 72.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ParagraphStyle {
    pub name: String,
    pub parent: Option<String>,
    pub font_size: f32,
    pub leading: f32,
    pub alignment: Alignment,
    pub space_before: f32,
    pub space_after: f32,
}

impl ParagraphStyle {
    /// The built-in body text style every paragraph style derives from.
    pub fn normal() -> Self {
        ParagraphStyle {
            name: "Normal".to_string(),
            parent: None,
            font_size: 10.0,
            leading: 12.0,
            alignment: Alignment::Left,
            space_before: 0.0,
            space_after: 0.0,
        }
    }

    /// A child of this style overriding only alignment and space after.
    pub fn derive(&self, name: String, alignment: Alignment, space_after: f32) -> Self {
        ParagraphStyle {
            name,
            parent: Some(self.name.clone()),
            alignment,
            space_after,
            ..self.clone()
        }
    }
}

/// A paragraph of text, already validated against the font it will be drawn with.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    text: String,
    style: ParagraphStyle,
    words: Vec<Vec<u8>>,
}

impl TextBlock {
    /// Fails with `Error::Layout` when the font cannot show some character of `text`.
    pub fn new(text: &str, style: ParagraphStyle, font: &FontFace) -> Result<Self, Error> {
        let words = text
            .split_whitespace()
            .map(|word| font.encode(word))
            .collect::<Result<Vec<_>, char>>()
            .map_err(|c| {
                Error::Layout(format!(
                    "{} cannot render character U+{:04X}",
                    font.base_name(),
                    c as u32
                ))
            })?;
        Ok(TextBlock {
            text: text.to_string(),
            style,
            words,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &ParagraphStyle {
        &self.style
    }

    pub fn alignment(&self) -> Alignment {
        self.style.alignment
    }

    /// Encoded words; runs of whitespace in the source text separate them.
    pub(crate) fn words(&self) -> &[Vec<u8>] {
        &self.words
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellStyle {
    pub background: [f32; 3],
    pub text_color: [f32; 3],
    pub bold: bool,
    pub font_size: f32,
    pub leading: f32,
    pub top_padding: f32,
    pub bottom_padding: f32,
    pub left_padding: f32,
    pub right_padding: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridStyle {
    /// Applied to row 0.
    pub header: CellStyle,
    /// Applied to every other row.
    pub body: CellStyle,
    pub grid_width: f32,
    pub grid_color: [f32; 3],
}

const GREY: [f32; 3] = [128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0];
const WHITESMOKE: [f32; 3] = [245.0 / 255.0, 245.0 / 255.0, 245.0 / 255.0];
const BEIGE: [f32; 3] = [245.0 / 255.0, 245.0 / 255.0, 220.0 / 255.0];
const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

impl Default for GridStyle {
    fn default() -> Self {
        let body = CellStyle {
            background: BEIGE,
            text_color: BLACK,
            bold: false,
            font_size: 9.0,
            leading: 12.0,
            top_padding: 3.0,
            bottom_padding: 3.0,
            left_padding: 6.0,
            right_padding: 6.0,
        };
        GridStyle {
            header: CellStyle {
                background: GREY,
                text_color: WHITESMOKE,
                bold: true,
                font_size: 10.0,
                bottom_padding: 12.0,
                ..body
            },
            body,
            grid_width: 1.0,
            grid_color: BLACK,
        }
    }
}

impl GridStyle {
    pub fn for_row(&self, row: usize) -> &CellStyle {
        if row == 0 { &self.header } else { &self.body }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridBlock {
    rows: Vec<Vec<String>>,
    style: GridStyle,
}

impl GridBlock {
    pub fn new(rows: Vec<Vec<String>>, style: GridStyle) -> Self {
        GridBlock { rows, style }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn style(&self) -> &GridStyle {
        &self.style
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacer {
    pub height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Text(TextBlock),
    Grid(GridBlock),
    Spacer(Spacer),
}

/// The ordered primitives of one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Story {
    primitives: Vec<Primitive>,
}

impl Story {
    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Primitive> {
        self.primitives.iter()
    }
}

impl<'a> IntoIterator for &'a Story {
    type Item = &'a Primitive;
    type IntoIter = std::slice::Iter<'a, Primitive>;

    fn into_iter(self) -> Self::IntoIter {
        self.primitives.iter()
    }
}

/// Translate every paragraph and table of `doc`, in body order.
pub fn build_story(doc: &Document, fonts: &FontSet) -> Story {
    let normal = ParagraphStyle::normal();
    let mut story = Story::default();

    for block in doc.blocks() {
        match block {
            Block::Paragraph(para) => {
                if let Some(text_block) = translate_paragraph(para, &normal, fonts.regular()) {
                    story.push(Primitive::Text(text_block));
                }
            }
            Block::Table(table) => {
                if let Some((grid, spacer)) = translate_table(table) {
                    story.push(Primitive::Grid(grid));
                    story.push(Primitive::Spacer(spacer));
                }
            }
        }
    }

    log::debug!(
        "Story: {} primitives from {} body elements",
        story.len(),
        doc.body.len()
    );
    story
}

/// Paragraph to text block. Blank paragraphs produce nothing; text the font rejects
/// is retried as ASCII only, then replaced by [`PLACEHOLDER_TEXT`].
pub fn translate_paragraph(
    para: &Paragraph,
    normal: &ParagraphStyle,
    font: &FontFace,
) -> Option<TextBlock> {
    let text = para.text.trim();
    if text.is_empty() {
        return None;
    }

    let style = normal.derive(
        format!("para_{}", para.body_index),
        para.alignment(),
        PARAGRAPH_SPACE_AFTER,
    );

    match TextBlock::new(text, style.clone(), font) {
        Ok(block) => return Some(block),
        Err(e) => log::warn!("Paragraph {}: {e}; retrying as ASCII", para.body_index),
    }

    let ascii: String = text.chars().filter(char::is_ascii).collect();
    match TextBlock::new(&ascii, style.clone(), font) {
        Ok(block) => return Some(block),
        Err(e) => log::warn!("Paragraph {}: {e}; using placeholder", para.body_index),
    }

    // The placeholder is plain ASCII; only a font without Latin glyphs fails it.
    let placeholder = TextBlock::new(PLACEHOLDER_TEXT, style.clone(), font).unwrap_or(TextBlock {
        text: PLACEHOLDER_TEXT.to_string(),
        style,
        words: Vec::new(),
    });
    Some(placeholder)
}

/// Table to a styled grid plus the spacer that follows it. Tables without rows
/// produce nothing.
pub fn translate_table(table: &Table) -> Option<(GridBlock, Spacer)> {
    if table.rows.is_empty() {
        return None;
    }
    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.trim().to_string()).collect())
        .collect();
    Some((
        GridBlock::new(rows, GridStyle::default()),
        Spacer {
            height: TABLE_SPACER_HEIGHT,
        },
    ))
}
