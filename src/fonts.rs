use std::path::Path;

use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::ConvertOptions;
use crate::error::Error;

/// First byte covered by the width tables; everything below is a control code.
const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

/// A simple (single-byte, WinAnsi-encoded) font as used for drawing text.
#[derive(Clone, Debug)]
pub struct FontFace {
    base_name: String,
    /// Advance widths at 1000 units/em for bytes FIRST_CHAR..=LAST_CHAR.
    widths_1000: Vec<f32>,
    /// Whether the font has a glyph for each byte in the same range.
    covered: Vec<bool>,
    program: Option<FontProgram>,
}

/// An embedded TrueType/OpenType program plus the descriptor metrics the PDF needs.
#[derive(Clone, Debug)]
struct FontProgram {
    data: Vec<u8>,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: Rect,
}

/// The faces used by a conversion: regular text and bold table headers.
#[derive(Clone, Debug)]
pub struct FontSet {
    regular: FontFace,
    bold: Option<FontFace>,
}

impl Default for FontSet {
    fn default() -> Self {
        FontSet {
            regular: FontFace::standard("Helvetica", false),
            bold: Some(FontFace::standard("Helvetica-Bold", true)),
        }
    }
}

impl FontSet {
    pub fn load(options: &ConvertOptions) -> Result<Self, Error> {
        let fonts = match (&options.font, &options.bold_font) {
            (None, None) => FontSet::default(),
            (Some(regular), None) => FontSet {
                regular: FontFace::from_file(regular)?,
                bold: None,
            },
            (None, Some(bold)) => FontSet {
                regular: FontFace::standard("Helvetica", false),
                bold: Some(FontFace::from_file(bold)?),
            },
            (Some(regular), Some(bold)) => FontSet {
                regular: FontFace::from_file(regular)?,
                bold: Some(FontFace::from_file(bold)?),
            },
        };
        log::debug!(
            "Fonts: regular={} bold={}",
            fonts.regular().base_name(),
            fonts.bold().base_name()
        );
        Ok(fonts)
    }

    pub fn regular(&self) -> &FontFace {
        &self.regular
    }

    /// Falls back to the regular face when no separate bold face was configured.
    pub fn bold(&self) -> &FontFace {
        self.bold.as_ref().unwrap_or(&self.regular)
    }

    pub(crate) fn has_separate_bold(&self) -> bool {
        self.bold.is_some()
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

impl FontFace {
    /// One of the standard 14 Type1 fonts; drawn by the viewer, never embedded.
    fn standard(base_name: &str, bold: bool) -> Self {
        FontFace {
            base_name: base_name.to_string(),
            widths_1000: helvetica_widths(bold),
            covered: vec![true; usize::from(LAST_CHAR - FIRST_CHAR) + 1],
            program: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read(path)
            .map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;
        Self::from_bytes(data).map_err(|reason| Error::Font(format!("{}: {reason}", path.display())))
    }

    /// Parses the first face; collections (`.ttc`) are not searched further.
    fn from_bytes(data: Vec<u8>) -> Result<Self, String> {
        let face = Face::parse(&data, 0).map_err(|e| e.to_string())?;

        let units = face.units_per_em() as f32;
        let ascent = face.ascender() as f32 / units * 1000.0;
        let descent = face.descender() as f32 / units * 1000.0;
        let cap_height = face
            .capital_height()
            .map(|h| h as f32 / units * 1000.0)
            .unwrap_or(700.0);

        let bb = face.global_bounding_box();
        let bbox = Rect::new(
            bb.x_min as f32 / units * 1000.0,
            bb.y_min as f32 / units * 1000.0,
            bb.x_max as f32 / units * 1000.0,
            bb.y_max as f32 / units * 1000.0,
        );

        let glyphs: Vec<Option<ttf_parser::GlyphId>> = (FIRST_CHAR..=LAST_CHAR)
            .map(|byte| face.glyph_index(winansi_to_char(byte)))
            .collect();
        let widths_1000 = glyphs
            .iter()
            .map(|gid| {
                gid.and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();
        let covered = glyphs.iter().map(Option::is_some).collect();

        let family = font_family_name(&face).unwrap_or_else(|| "EmbeddedFont".to_string());
        let base_name = family.replace(' ', "");

        Ok(FontFace {
            base_name,
            widths_1000,
            covered,
            program: Some(FontProgram {
                data,
                ascent,
                descent,
                cap_height,
                bbox,
            }),
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn is_embedded(&self) -> bool {
        self.program.is_some()
    }

    fn covers(&self, byte: u8) -> bool {
        byte >= FIRST_CHAR && self.covered[usize::from(byte - FIRST_CHAR)]
    }

    /// Encode text for a PDF string, failing on the first character the font
    /// cannot show.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, char> {
        text.chars()
            .map(|c| to_winansi(c).filter(|b| self.covers(*b)).ok_or(c))
            .collect()
    }

    /// Encode text, dropping characters the font cannot show. Returns the bytes
    /// and the number of characters dropped.
    pub fn encode_lossy(&self, text: &str) -> (Vec<u8>, usize) {
        let mut dropped = 0;
        let bytes = text
            .chars()
            .filter_map(|c| {
                let byte = to_winansi(c).filter(|b| self.covers(*b));
                if byte.is_none() {
                    dropped += 1;
                }
                byte
            })
            .collect();
        (bytes, dropped)
    }

    /// Advance width of encoded text in points.
    pub fn width(&self, bytes: &[u8], font_size: f32) -> f32 {
        let units: f32 = bytes
            .iter()
            .filter(|b| **b >= FIRST_CHAR)
            .map(|b| self.widths_1000[usize::from(*b - FIRST_CHAR)])
            .sum();
        units * font_size / 1000.0
    }

    /// Write the font dictionary (and, for embedded faces, the descriptor and
    /// font program) to the PDF.
    pub(crate) fn register(&self, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref) -> Ref {
        let font_ref = alloc();

        let Some(program) = &self.program else {
            pdf.type1_font(font_ref)
                .base_font(Name(self.base_name.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            return font_ref;
        };

        let descriptor_ref = alloc();
        let data_ref = alloc();

        let data_len = i32::try_from(program.data.len()).unwrap_or(i32::MAX);
        pdf.stream(data_ref, &program.data)
            .pair(Name(b"Length1"), data_len);

        pdf.font_descriptor(descriptor_ref)
            .name(Name(self.base_name.as_bytes()))
            .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
            .bbox(program.bbox)
            .italic_angle(0.0)
            .ascent(program.ascent)
            .descent(program.descent)
            .cap_height(program.cap_height)
            .stem_v(80.0)
            .font_file2(data_ref);

        {
            let mut d = pdf.indirect(font_ref).dict();
            d.pair(Name(b"Type"), Name(b"Font"));
            d.pair(Name(b"Subtype"), Name(b"TrueType"));
            d.pair(Name(b"BaseFont"), Name(self.base_name.as_bytes()));
            d.pair(Name(b"Encoding"), Name(b"WinAnsiEncoding"));
            d.pair(Name(b"FirstChar"), i32::from(FIRST_CHAR));
            d.pair(Name(b"LastChar"), i32::from(LAST_CHAR));
            d.pair(Name(b"FontDescriptor"), descriptor_ref);
            d.insert(Name(b"Widths"))
                .array()
                .items(self.widths_1000.iter().copied());
        }

        font_ref
    }
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// WinAnsi code for a printable character. Control characters (C0, DEL, C1) have none.
fn to_winansi(c: char) -> Option<u8> {
    match c as u32 {
        0x0020..=0x007E => Some(c as u8),
        0x00A0..=0x00FF => Some(c as u8),
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Approximate Helvetica / Helvetica-Bold widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    (FIRST_CHAR..=LAST_CHAR)
        .map(|b| match (b, bold) {
            (32, _) => 278.0,                               // space
            (33..=47, false) => 333.0,                      // punctuation
            (33..=47, true) => 389.0,
            (48..=57, _) => 556.0,                          // digits
            (58..=64, false) => 333.0,
            (58..=64, true) => 389.0,
            (73 | 74, _) => 278.0,                          // I J
            (77, _) => 833.0,                               // M
            (65..=90, false) => 667.0,                      // uppercase A-Z (average)
            (65..=90, true) => 722.0,
            (91..=96, _) => 333.0,                          // brackets etc.
            (102 | 105 | 106 | 108 | 116, false) => 278.0,  // f i j l t
            (102 | 105 | 106 | 108 | 116, true) => 333.0,
            (109 | 119, false) => 833.0,                    // m w
            (109 | 119, true) => 889.0,
            (97..=122, false) => 556.0,                     // lowercase a-z (average)
            (97..=122, true) => 611.0,
            (_, false) => 556.0,
            (_, true) => 611.0,
        })
        .collect()
}
