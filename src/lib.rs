mod docx;
mod error;
mod fonts;
mod model;
mod pdf;
mod story;

pub use error::Error;
pub use fonts::{FontFace, FontSet};
pub use model::{Alignment, Block, BodyElement, Document, Paragraph, Table};
pub use pdf::{PAGE_HEIGHT, PAGE_WIDTH};
pub use story::{
    CellStyle, GridBlock, GridStyle, PLACEHOLDER_TEXT, ParagraphStyle, Primitive, Spacer, Story,
    TextBlock, translate_paragraph, translate_table,
};

use std::path::{Path, PathBuf};

/// Font selection for a conversion. The default draws with the standard
/// Helvetica fonts, which are not embedded.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    /// TrueType/OpenType file embedded for body text.
    pub font: Option<PathBuf>,
    /// TrueType/OpenType file for table header cells; defaults to `font`.
    pub bold_font: Option<PathBuf>,
}

/// Parse a DOCX file into its body paragraphs and tables.
pub fn load(path: &Path) -> Result<Document, Error> {
    docx::parse(path)
}

pub fn build_story(doc: &Document, fonts: &FontSet) -> Story {
    story::build_story(doc, fonts)
}

/// Paginate and serialize a non-empty story.
pub fn render_story(story: &Story, fonts: &FontSet) -> Result<Vec<u8>, Error> {
    pdf::render(story, fonts)
}

pub fn convert_docx_to_pdf(input: &Path, output: &Path) -> Result<(), Error> {
    convert_with_options(input, output, &ConvertOptions::default())
}

/// Convert `input` to a PDF at `output`, overwriting it.
///
/// A document with nothing to draw leaves `output` as an empty file.
pub fn convert_with_options(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<(), Error> {
    if !input.exists() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }

    let doc = docx::parse(input)?;
    let fonts = FontSet::load(options)?;
    let story = story::build_story(&doc, &fonts);

    let bytes = if story.is_empty() {
        log::warn!("{}: no paragraphs or tables to render", input.display());
        Vec::new()
    } else {
        pdf::render(&story, &fonts)?
    };

    std::fs::write(output, bytes).map_err(Error::Io)
}
