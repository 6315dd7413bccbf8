use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use crate::error::Error;
use crate::fonts::{FontFace, FontSet};
use crate::model::Alignment;
use crate::story::{GridBlock, Primitive, Spacer, Story, TextBlock};

/// US letter.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
/// Inset of the content frame inside the margins.
const FRAME_PADDING: f32 = 6.0;

const REGULAR_FONT: &[u8] = b"F1";
const BOLD_FONT: &[u8] = b"F2";

#[derive(Clone, Copy, Debug)]
struct Frame {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl Frame {
    fn letter() -> Self {
        Frame {
            left: MARGIN + FRAME_PADDING,
            right: PAGE_WIDTH - MARGIN - FRAME_PADDING,
            top: PAGE_HEIGHT - MARGIN - FRAME_PADDING,
            bottom: MARGIN + FRAME_PADDING,
        }
    }

    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

struct Line {
    bytes: Vec<u8>,
    width: f32,
    /// Number of word gaps (spaces) in the line.
    gaps: usize,
}

/// Greedy word wrap. A word wider than `max_width` gets a line of its own.
fn wrap(words: &[Vec<u8>], font: &FontFace, font_size: f32, max_width: f32) -> Vec<Line> {
    let space = font.width(b" ", font_size);
    let mut lines = Vec::new();
    let mut current: Option<Line> = None;

    for word in words {
        let word_width = font.width(word, font_size);
        let fits = current
            .as_ref()
            .is_some_and(|line| line.width + space + word_width <= max_width);
        if fits {
            if let Some(line) = current.as_mut() {
                line.bytes.push(b' ');
                line.bytes.extend_from_slice(word);
                line.width += space + word_width;
                line.gaps += 1;
            }
        } else {
            lines.extend(current.take());
            current = Some(Line {
                bytes: word.clone(),
                width: word_width,
                gaps: 0,
            });
        }
    }

    lines.extend(current);
    lines
}

/// Lays primitives out top to bottom, starting a new page whenever the next
/// piece does not fit in the frame.
struct PageWriter<'a> {
    fonts: &'a FontSet,
    frame: Frame,
    pages: Vec<Content>,
    content: Content,
    cursor_y: f32,
    /// Nothing has been placed on the current page yet.
    fresh: bool,
}

impl<'a> PageWriter<'a> {
    fn new(fonts: &'a FontSet) -> Self {
        let frame = Frame::letter();
        PageWriter {
            fonts,
            frame,
            pages: Vec::new(),
            content: Content::new(),
            cursor_y: frame.top,
            fresh: true,
        }
    }

    fn break_page(&mut self) {
        let finished = std::mem::replace(&mut self.content, Content::new());
        self.pages.push(finished);
        self.cursor_y = self.frame.top;
        self.fresh = true;
    }

    /// Start a new page unless `height` fits below the cursor. A fresh page never breaks.
    fn ensure(&mut self, height: f32) {
        if !self.fresh && self.cursor_y - height < self.frame.bottom {
            self.break_page();
        }
    }

    fn font_for(&self, bold: bool) -> (&'static [u8], &'a FontFace) {
        let fonts = self.fonts;
        if bold && fonts.has_separate_bold() {
            (BOLD_FONT, fonts.bold())
        } else {
            (REGULAR_FONT, fonts.regular())
        }
    }

    fn text(&mut self, block: &TextBlock) {
        let style = block.style();
        let (font_name, font) = self.font_for(false);
        let lines = wrap(block.words(), font, style.font_size, self.frame.width());

        if !self.fresh {
            self.cursor_y -= style.space_before;
        }

        for (i, line) in lines.iter().enumerate() {
            self.ensure(style.leading);

            let is_last = i + 1 == lines.len();
            let slack = self.frame.width() - line.width;
            let (x, word_spacing) = match style.alignment {
                Alignment::Left => (self.frame.left, 0.0),
                Alignment::Center => (self.frame.left + slack / 2.0, 0.0),
                Alignment::Right => (self.frame.left + slack, 0.0),
                Alignment::Justify if !is_last && line.gaps > 0 && slack > 0.0 => {
                    (self.frame.left, slack / line.gaps as f32)
                }
                Alignment::Justify => (self.frame.left, 0.0),
            };
            let baseline = self.cursor_y - style.font_size;

            self.content
                .begin_text()
                .set_font(Name(font_name), style.font_size)
                .set_word_spacing(word_spacing)
                .next_line(x, baseline)
                .show(Str(&line.bytes))
                .end_text();

            self.cursor_y -= style.leading;
            self.fresh = false;
        }

        self.cursor_y -= style.space_after;
    }

    fn spacer(&mut self, spacer: &Spacer) {
        if self.cursor_y - spacer.height < self.frame.bottom {
            if !self.fresh {
                self.break_page();
            }
        } else {
            self.cursor_y -= spacer.height;
        }
    }

    fn grid(&mut self, grid: &GridBlock) -> Result<(), Error> {
        let style = grid.style();

        // rows -> cells -> encoded lines
        let mut cells: Vec<Vec<Vec<Vec<u8>>>> = Vec::with_capacity(grid.rows().len());
        for (r, row) in grid.rows().iter().enumerate() {
            let (_, font) = self.font_for(style.for_row(r).bold);
            let encoded_row = row
                .iter()
                .map(|cell| {
                    cell.split('\n')
                        .map(|line| {
                            let (bytes, dropped) = font.encode_lossy(line);
                            if dropped > 0 {
                                log::warn!(
                                    "Table cell {line:?}: dropped {dropped} character(s) {} cannot render",
                                    font.base_name()
                                );
                            }
                            bytes
                        })
                        .collect()
                })
                .collect();
            cells.push(encoded_row);
        }

        let column_count = cells.iter().map(Vec::len).max().unwrap_or(0);
        let mut col_widths = vec![0.0f32; column_count];
        for (r, row) in cells.iter().enumerate() {
            let cell_style = style.for_row(r);
            let (_, font) = self.font_for(cell_style.bold);
            for (c, lines) in row.iter().enumerate() {
                let text_width = lines
                    .iter()
                    .map(|line| font.width(line, cell_style.font_size))
                    .fold(0.0f32, f32::max);
                let width = text_width + cell_style.left_padding + cell_style.right_padding;
                col_widths[c] = col_widths[c].max(width);
            }
        }

        let row_heights: Vec<f32> = cells
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let cell_style = style.for_row(r);
                let line_count = row.iter().map(Vec::len).max().unwrap_or(1).max(1);
                line_count as f32 * cell_style.leading
                    + cell_style.top_padding
                    + cell_style.bottom_padding
            })
            .collect();

        let frame_height = self.frame.height();
        if let Some((r, h)) = row_heights
            .iter()
            .enumerate()
            .find(|(_, h)| **h > frame_height)
        {
            return Err(Error::Layout(format!(
                "table row {r} is {h:.1}pt tall but a page holds {frame_height:.1}pt"
            )));
        }

        let total_width: f32 = col_widths.iter().sum();
        let x0 = self.frame.left + (self.frame.width() - total_width) / 2.0;

        for (r, row) in cells.iter().enumerate() {
            let cell_style = style.for_row(r);
            let (font_name, font) = self.font_for(cell_style.bold);
            let height = row_heights[r];

            self.ensure(height);
            let bottom = self.cursor_y - height;

            let mut x = x0;
            for (c, lines) in row.iter().enumerate() {
                let width = col_widths[c];
                let [br, bg, bb] = cell_style.background;
                let [tr, tg, tb] = cell_style.text_color;
                let [gr, gg, gb] = style.grid_color;

                self.content
                    .save_state()
                    .set_fill_rgb(br, bg, bb)
                    .rect(x, bottom, width, height)
                    .fill_nonzero()
                    .restore_state();

                let inner = width - cell_style.left_padding - cell_style.right_padding;
                let first_baseline = bottom
                    + cell_style.bottom_padding
                    + lines.len() as f32 * cell_style.leading
                    - cell_style.font_size;
                self.content.save_state().set_fill_rgb(tr, tg, tb);
                for (i, line) in lines.iter().enumerate() {
                    if line.is_empty() {
                        continue;
                    }
                    let line_width = font.width(line, cell_style.font_size);
                    let lx = x + cell_style.left_padding + (inner - line_width) / 2.0;
                    let ly = first_baseline - i as f32 * cell_style.leading;
                    self.content
                        .begin_text()
                        .set_font(Name(font_name), cell_style.font_size)
                        .set_word_spacing(0.0)
                        .next_line(lx, ly)
                        .show(Str(line))
                        .end_text();
                }
                self.content.restore_state();

                self.content
                    .save_state()
                    .set_stroke_rgb(gr, gg, gb)
                    .set_line_width(style.grid_width)
                    .rect(x, bottom, width, height)
                    .stroke()
                    .restore_state();

                x += width;
            }

            self.cursor_y = bottom;
            self.fresh = false;
        }

        Ok(())
    }

    fn finish(mut self) -> Vec<Content> {
        let last = std::mem::replace(&mut self.content, Content::new());
        self.pages.push(last);
        self.pages
    }
}

/// Lay the story out into page content streams.
fn layout(story: &Story, fonts: &FontSet) -> Result<Vec<Content>, Error> {
    let mut writer = PageWriter::new(fonts);
    for primitive in story {
        match primitive {
            Primitive::Text(block) => writer.text(block),
            Primitive::Grid(grid) => writer.grid(grid)?,
            Primitive::Spacer(spacer) => writer.spacer(spacer),
        }
    }
    Ok(writer.finish())
}

pub fn render(story: &Story, fonts: &FontSet) -> Result<Vec<u8>, Error> {
    let pages = layout(story, fonts)?;

    let mut pdf = Pdf::new();
    let mut next_id = 1;
    let mut alloc = || {
        let id = Ref::new(next_id);
        next_id += 1;
        id
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let regular_ref = fonts.regular().register(&mut pdf, &mut alloc);
    let bold_ref = fonts
        .has_separate_bold()
        .then(|| fonts.bold().register(&mut pdf, &mut alloc));
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc(), alloc())).collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(page_ids.len() as i32);

    for ((page_id, content_id), content) in page_ids.iter().zip(pages) {
        pdf.stream(*content_id, &content.finish());

        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT))
            .parent(pages_id)
            .contents(*content_id);
        let mut resources = page.resources();
        let mut font_dict = resources.fonts();
        font_dict.pair(Name(REGULAR_FONT), regular_ref);
        if let Some(bold_ref) = bold_ref {
            font_dict.pair(Name(BOLD_FONT), bold_ref);
        }
    }

    log::debug!("Rendered {} page(s)", page_ids.len());
    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Table};
    use crate::story::{ParagraphStyle, translate_paragraph, translate_table};

    fn text_story(texts: &[&str], alignment_code: Option<u8>) -> Story {
        let fonts = FontSet::default();
        let normal = ParagraphStyle::normal();
        let mut story = Story::default();
        for (i, text) in texts.iter().enumerate() {
            let para = Paragraph {
                body_index: i,
                text: text.to_string(),
                alignment_code,
            };
            if let Some(block) = translate_paragraph(&para, &normal, fonts.regular()) {
                story.push(Primitive::Text(block));
            }
        }
        story
    }

    fn table_story(rows: Vec<Vec<String>>) -> Story {
        let mut story = Story::default();
        let (grid, spacer) = translate_table(&Table { body_index: 0, rows }).unwrap();
        story.push(Primitive::Grid(grid));
        story.push(Primitive::Spacer(spacer));
        story
    }

    #[test]
    fn wrap_respects_width() {
        let fonts = FontSet::default();
        let source = "lorem ipsum dolor sit amet ".repeat(20);
        let words: Vec<Vec<u8>> = source
            .split_whitespace()
            .map(|w| w.as_bytes().to_vec())
            .collect();
        let lines = wrap(&words, fonts.regular(), 10.0, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width <= 200.0);
            assert_eq!(line.gaps, line.bytes.iter().filter(|b| **b == b' ').count());
        }
        let word_count: usize = lines.iter().map(|l| l.gaps + 1).sum();
        assert_eq!(word_count, words.len());
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let fonts = FontSet::default();
        let words = vec![b"a".to_vec(), vec![b'W'; 200], b"b".to_vec()];
        let lines = wrap(&words, fonts.regular(), 10.0, 100.0);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn single_paragraph_is_one_page() {
        let bytes = render(&text_story(&["Hello"], None), &FontSet::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 1"));
        assert!(text.contains("(Hello) Tj"));
        assert!(text.contains("/Helvetica"));
    }

    #[test]
    fn paragraphs_flow_across_pages() {
        let texts = vec!["A line of text"; 100];
        let pages = layout(&text_story(&texts, None), &FontSet::default()).unwrap();
        // 24pt per paragraph on a 636pt frame
        assert_eq!(pages.len(), 4);
    }

    #[test]
    fn justified_lines_stretch_word_spacing() {
        let long = "justify these words across the line ".repeat(10);
        let bytes = render(&text_story(&[long.as_str()], Some(3)), &FontSet::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let stretched = text
            .lines()
            .filter_map(|l| l.strip_suffix(" Tw"))
            .filter_map(|v| v.trim().parse::<f32>().ok())
            .filter(|v| *v > 0.0)
            .count();
        assert!(stretched >= 1);
    }

    #[test]
    fn table_rows_flow_across_pages() {
        let mut rows = vec![vec!["Name".to_string(), "Value".to_string()]];
        for i in 0..60 {
            rows.push(vec![format!("row {i}"), i.to_string()]);
        }
        let pages = layout(&table_story(rows), &FontSet::default()).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn table_uses_bold_header_font() {
        let rows = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string(), "2".to_string()],
        ];
        let bytes = render(&table_story(rows), &FontSet::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Helvetica-Bold"));
        assert!(text.contains("/F2 10 Tf"));
        assert!(text.contains("/F1 9 Tf"));
    }

    #[test]
    fn row_taller_than_page_is_a_layout_error() {
        let rows = vec![vec!["x\n".repeat(60)]];
        let err = render(&table_story(rows), &FontSet::default()).unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
    }

    #[test]
    fn ragged_rows_render() {
        let rows = vec![
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec!["1".to_string()],
        ];
        assert!(render(&table_story(rows), &FontSet::default()).is_ok());
    }

    #[test]
    fn output_is_deterministic() {
        let story = text_story(&["Same", "input"], Some(1));
        let fonts = FontSet::default();
        assert_eq!(render(&story, &fonts).unwrap(), render(&story, &fonts).unwrap());
    }
}
