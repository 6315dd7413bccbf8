/// Horizontal paragraph alignment, as far as the PDF output distinguishes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Map a WordprocessingML alignment code (see `docx::alignment_code`) to the
    /// rendered alignment. Unset and every code other than 1/2/3 render left.
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(1) => Alignment::Center,
            Some(2) => Alignment::Right,
            Some(3) => Alignment::Justify,
            _ => Alignment::Left,
        }
    }
}

/// A parsed DOCX body.
///
/// Paragraphs and tables live in their own collections; `body` keeps the reading
/// order as indices into them.
#[derive(Debug, Default)]
pub struct Document {
    pub body: Vec<BodyElement>,
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyElement {
    Paragraph(usize),
    Table(usize),
    /// Any other body child, by local tag name (`sectPr`, `sdt`, ...).
    Other(String),
}

/// A body element resolved against the document's collections.
#[derive(Clone, Copy, Debug)]
pub enum Block<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    /// Position of this paragraph among the body's children.
    pub body_index: usize,
    /// Untrimmed run text.
    pub text: String,
    /// Raw `w:jc` code; `None` when the paragraph has no direct alignment.
    pub alignment_code: Option<u8>,
}

impl Paragraph {
    pub fn alignment(&self) -> Alignment {
        Alignment::from_code(self.alignment_code)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub body_index: usize,
    /// Cell text per row, untrimmed. Rows are not required to be the same length.
    pub rows: Vec<Vec<String>>,
}

impl Document {
    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.body.push(BodyElement::Paragraph(self.paragraphs.len()));
        self.paragraphs.push(paragraph);
    }

    pub fn push_table(&mut self, table: Table) {
        self.body.push(BodyElement::Table(self.tables.len()));
        self.tables.push(table);
    }

    pub fn push_other(&mut self, tag: &str) {
        self.body.push(BodyElement::Other(tag.to_string()));
    }

    /// Body elements in reading order. `Other` elements and indices that do not
    /// resolve are skipped.
    pub fn blocks(&self) -> impl Iterator<Item = Block<'_>> + '_ {
        self.body.iter().filter_map(|element| match element {
            BodyElement::Paragraph(i) => self.paragraphs.get(*i).map(Block::Paragraph),
            BodyElement::Table(i) => self.tables.get(*i).map(Block::Table),
            BodyElement::Other(_) => None,
        })
    }
}
