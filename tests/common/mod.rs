#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use zip::write::SimpleFileOptions;

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn temp_path(prefix: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time must be after UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "docx_convert_{}_{}_{}_{}.{}",
        prefix,
        std::process::id(),
        nanos,
        COUNTER.fetch_add(1, Ordering::Relaxed),
        extension
    ))
}

pub fn para(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
}

pub fn aligned_para(text: &str, jc: &str) -> String {
    format!(
        "<w:p><w:pPr><w:jc w:val=\"{jc}\"/></w:pPr><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>"
    )
}

pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in *row {
            xml.push_str("<w:tc>");
            xml.push_str(&para(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WML_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

fn content_types_xml(main_part: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/{main_part}" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#
    )
}

fn rels_xml(main_part: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="{main_part}"/></Relationships>"#
    )
}

/// Write a minimal DOCX package whose body is `body` (WordprocessingML fragments).
pub fn write_docx(path: &Path, body: &str) {
    write_docx_with_main_part(path, body, "word/document.xml");
}

pub fn write_docx_with_main_part(path: &Path, body: &str, main_part: &str) {
    let file = std::fs::File::create(path).expect("failed to create docx");
    let mut zip = zip::ZipWriter::new(file);
    let opts = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", opts).unwrap();
    zip.write_all(content_types_xml(main_part).as_bytes()).unwrap();

    zip.start_file("_rels/.rels", opts).unwrap();
    zip.write_all(rels_xml(main_part).as_bytes()).unwrap();

    zip.start_file(main_part, opts).unwrap();
    zip.write_all(document_xml(body).as_bytes()).unwrap();

    zip.finish().expect("failed to finish docx");
}

/// A docx on disk that is removed when dropped.
pub struct TempDocx(pub PathBuf);

impl TempDocx {
    pub fn new(prefix: &str, body: &str) -> Self {
        let path = temp_path(prefix, "docx");
        write_docx(&path, body);
        TempDocx(path)
    }
}

impl Drop for TempDocx {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
