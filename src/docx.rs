use std::io::Read;
use std::path::Path;

use crate::error::Error;
use crate::model::{Document, Paragraph, Table};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
/// Word's column limit; used when a table carries no `w:tblGrid`.
const MAX_GRID_COLUMNS: usize = 63;

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

/// Numeric code for a `w:jc` value, matching Word's paragraph alignment enumeration.
fn alignment_code(val: &str) -> Option<u8> {
    match val {
        "left" | "start" => Some(0),
        "center" => Some(1),
        "right" | "end" => Some(2),
        "both" => Some(3),
        "distribute" => Some(4),
        "mediumKashida" => Some(5),
        "highKashida" => Some(7),
        "lowKashida" => Some(8),
        "thaiDistribute" => Some(9),
        _ => None,
    }
}

/// Find the main document part through the package relationships.
fn main_part_name(zip: &mut zip::ZipArchive<std::fs::File>) -> String {
    let mut xml_content = String::new();
    let Ok(mut file) = zip.by_name("_rels/.rels") else {
        return DEFAULT_MAIN_PART.to_string();
    };
    if file.read_to_string(&mut xml_content).is_err() {
        return DEFAULT_MAIN_PART.to_string();
    }
    let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
        return DEFAULT_MAIN_PART.to_string();
    };

    xml.root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship")
        .find(|n| {
            n.attribute("Type")
                .is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL))
        })
        .and_then(|n| n.attribute("Target"))
        .map(|target| target.trim_start_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string())
}

pub fn parse(path: &Path) -> Result<Document, Error> {
    let file = std::fs::File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;

    let part = main_part_name(&mut zip);
    let mut xml_content = String::new();
    match zip.by_name(&part) {
        Ok(mut entry) => {
            entry.read_to_string(&mut xml_content)?;
        }
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(Error::InvalidDocx(format!("missing {part}")));
        }
        Err(e) => return Err(e.into()),
    }

    let doc = parse_document_xml(&xml_content)?;
    log::debug!(
        "Loaded {}: {} body elements, {} paragraphs, {} tables",
        path.display(),
        doc.body.len(),
        doc.paragraphs.len(),
        doc.tables.len()
    );
    Ok(doc)
}

/// Parse the main document part. Each paragraph and table is tagged with its
/// position among the body's children while walking them in order.
pub(crate) fn parse_document_xml(xml_content: &str) -> Result<Document, Error> {
    let xml = roxmltree::Document::parse(xml_content)?;
    let root = xml.root_element();

    let body = wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let mut doc = Document::default();
    for (body_index, node) in body.children().filter(|n| n.is_element()).enumerate() {
        if is_wml(node, "p") {
            let alignment_code = wml(node, "pPr")
                .and_then(|ppr| wml_attr(ppr, "jc"))
                .and_then(alignment_code);
            doc.push_paragraph(Paragraph {
                body_index,
                text: paragraph_text(node),
                alignment_code,
            });
        } else if is_wml(node, "tbl") {
            doc.push_table(Table {
                body_index,
                rows: table_rows(node),
            });
        } else {
            doc.push_other(node.tag_name().name());
        }
    }

    Ok(doc)
}

fn paragraph_text(para_node: roxmltree::Node) -> String {
    let mut text = String::new();
    collect_run_text(para_node, &mut text);
    text
}

fn collect_run_text(node: roxmltree::Node, out: &mut String) {
    for child in node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "r" => run_text(child, out),
            // Run containers; w:del is left out so deleted text stays deleted.
            "hyperlink" | "smartTag" | "ins" | "fldSimple" | "customXml" => {
                collect_run_text(child, out)
            }
            _ => {}
        }
    }
}

fn run_text(run_node: roxmltree::Node, out: &mut String) {
    for child in run_node.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => out.push_str(child.text().unwrap_or("")),
            "tab" | "ptab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            "noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

fn cell_text(cell_node: roxmltree::Node) -> String {
    cell_node
        .children()
        .filter(|n| is_wml(*n, "p"))
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of grid columns a row may fill: the `w:gridCol` count, or Word's limit
/// when the table has no grid.
fn grid_column_count(table_node: roxmltree::Node) -> usize {
    let declared = wml(table_node, "tblGrid")
        .map(|grid| grid.children().filter(|n| is_wml(*n, "gridCol")).count())
        .unwrap_or(0);
    if declared == 0 { MAX_GRID_COLUMNS } else { declared }
}

/// Cell text per row, one entry per grid column: a cell spanning several
/// columns repeats, and a vertical-merge continuation takes the text above it.
/// Spans are clamped to the columns left in the grid.
fn table_rows(table_node: roxmltree::Node) -> Vec<Vec<String>> {
    let grid_columns = grid_column_count(table_node);
    let mut rows: Vec<Vec<String>> = Vec::new();

    for row_node in table_node.children().filter(|n| is_wml(*n, "tr")) {
        let mut row: Vec<String> = Vec::new();

        for cell_node in row_node.children().filter(|n| is_wml(*n, "tc")) {
            let tcpr = wml(cell_node, "tcPr");
            let declared_span = tcpr
                .and_then(|n| wml_attr(n, "gridSpan"))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            let span = declared_span.min(grid_columns.saturating_sub(row.len()).max(1));
            if span < declared_span {
                log::warn!(
                    "Table row {}: gridSpan {declared_span} runs past the {grid_columns}-column grid; using {span}",
                    rows.len()
                );
            }
            let continues_merge = tcpr.and_then(|n| wml(n, "vMerge")).is_some_and(|vm| {
                vm.attribute((WML_NS, "val"))
                    .is_none_or(|v| v == "continue")
            });

            let text = if continues_merge {
                rows.last()
                    .and_then(|above| above.get(row.len()))
                    .cloned()
                    .unwrap_or_default()
            } else {
                cell_text(cell_node)
            };

            for _ in 0..span {
                row.push(text.clone());
            }
        }

        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, BodyElement, Block};

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WML_NS}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{body}</w:body></w:document>"#
        )
    }

    #[test]
    fn paragraphs_and_tables_keep_body_order() {
        let xml = document(
            "<w:p><w:r><w:t>P1</w:t></w:r></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             <w:p><w:r><w:t>P2</w:t></w:r></w:p>\
             <w:sectPr/>",
        );
        let doc = parse_document_xml(&xml).unwrap();

        assert_eq!(
            doc.body,
            vec![
                BodyElement::Paragraph(0),
                BodyElement::Table(0),
                BodyElement::Paragraph(1),
                BodyElement::Other("sectPr".into()),
            ]
        );
        assert_eq!(doc.paragraphs[1].body_index, 2);
        assert_eq!(doc.tables[0].body_index, 1);
        assert_eq!(doc.blocks().count(), 3);
        assert!(matches!(doc.blocks().nth(1), Some(Block::Table(_))));
    }

    #[test]
    fn run_text_includes_hyperlinks_tabs_and_breaks() {
        let xml = document(
            "<w:p><w:r><w:t xml:space=\"preserve\">Hello </w:t></w:r>\
             <w:hyperlink r:id=\"rId5\"><w:r><w:t>world</w:t></w:r></w:hyperlink>\
             <w:r><w:tab/><w:t>a</w:t><w:br/><w:t>b</w:t></w:r>\
             <w:del><w:r><w:delText>gone</w:delText></w:r></w:del>\
             <w:r><w:t>e</w:t><w:noBreakHyphen/><w:t>mail</w:t>\
             <w:ptab w:relativeTo=\"margin\" w:alignment=\"right\" w:leader=\"none\"/><w:t>x</w:t></w:r></w:p>",
        );
        let doc = parse_document_xml(&xml).unwrap();
        assert_eq!(doc.paragraphs[0].text, "Hello world\ta\nbe-mail\tx");
    }

    #[test]
    fn alignment_comes_from_direct_jc() {
        let xml = document(
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>c</w:t></w:r></w:p>\
             <w:p><w:pPr><w:jc w:val=\"right\"/></w:pPr><w:r><w:t>r</w:t></w:r></w:p>\
             <w:p><w:pPr><w:jc w:val=\"both\"/></w:pPr><w:r><w:t>j</w:t></w:r></w:p>\
             <w:p><w:pPr><w:jc w:val=\"distribute\"/></w:pPr><w:r><w:t>d</w:t></w:r></w:p>\
             <w:p><w:r><w:t>l</w:t></w:r></w:p>",
        );
        let doc = parse_document_xml(&xml).unwrap();
        let codes: Vec<Option<u8>> = doc.paragraphs.iter().map(|p| p.alignment_code).collect();
        assert_eq!(codes, [Some(1), Some(2), Some(3), Some(4), None]);
        let aligns: Vec<Alignment> = doc.paragraphs.iter().map(|p| p.alignment()).collect();
        assert_eq!(
            aligns,
            [
                Alignment::Center,
                Alignment::Right,
                Alignment::Justify,
                Alignment::Left,
                Alignment::Left
            ]
        );
    }

    #[test]
    fn table_cells_join_paragraphs_and_expand_merges() {
        let xml = document(
            "<w:tbl>\
               <w:tr>\
                 <w:tc><w:tcPr><w:gridSpan w:val=\"2\"/></w:tcPr><w:p><w:r><w:t>Wide</w:t></w:r></w:p></w:tc>\
                 <w:tc><w:tcPr><w:vMerge w:val=\"restart\"/></w:tcPr><w:p><w:r><w:t>Tall</w:t></w:r></w:p></w:tc>\
               </w:tr>\
               <w:tr>\
                 <w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p><w:p><w:r><w:t>y</w:t></w:r></w:p></w:tc>\
                 <w:tc><w:p/></w:tc>\
                 <w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc>\
               </w:tr>\
             </w:tbl>",
        );
        let doc = parse_document_xml(&xml).unwrap();
        assert_eq!(
            doc.tables[0].rows,
            vec![
                vec!["Wide".to_string(), "Wide".into(), "Tall".into()],
                vec!["x\ny".to_string(), "".into(), "Tall".into()],
            ]
        );
    }

    #[test]
    fn oversized_grid_span_is_clamped_to_the_grid() {
        let xml = document(
            "<w:tbl>\
               <w:tblGrid><w:gridCol w:w=\"2000\"/><w:gridCol w:w=\"2000\"/><w:gridCol w:w=\"2000\"/></w:tblGrid>\
               <w:tr>\
                 <w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc>\
                 <w:tc><w:tcPr><w:gridSpan w:val=\"4000000000\"/></w:tcPr><w:p><w:r><w:t>huge</w:t></w:r></w:p></w:tc>\
               </w:tr>\
             </w:tbl>",
        );
        let doc = parse_document_xml(&xml).unwrap();
        assert_eq!(
            doc.tables[0].rows,
            vec![vec!["a".to_string(), "huge".into(), "huge".into()]]
        );
    }

    #[test]
    fn grid_span_without_tbl_grid_stops_at_word_column_limit() {
        let xml = document(
            "<w:tbl><w:tr>\
               <w:tc><w:tcPr><w:gridSpan w:val=\"18446744073709551615\"/></w:tcPr><w:p/></w:tc>\
               <w:tc><w:p><w:r><w:t>after</w:t></w:r></w:p></w:tc>\
             </w:tr></w:tbl>",
        );
        let doc = parse_document_xml(&xml).unwrap();
        let row = &doc.tables[0].rows[0];
        assert_eq!(row.len(), MAX_GRID_COLUMNS + 1);
        assert_eq!(row.last().map(String::as_str), Some("after"));
    }

    #[test]
    fn missing_body_is_invalid() {
        let xml = format!(r#"<w:document xmlns:w="{WML_NS}"/>"#);
        assert!(matches!(
            parse_document_xml(&xml),
            Err(Error::InvalidDocx(_))
        ));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(matches!(
            parse_document_xml("<w:document"),
            Err(Error::Xml(_))
        ));
    }
}
