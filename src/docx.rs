use std::io::{Seek, Write};

use anyhow::Context as _;
use zip::write::SimpleFileOptions;

use crate::digest::Section;
use crate::formats::DigestRecord;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Writes `record` as a WordprocessingML package into `out`.
pub fn write_digest<W: Write + Seek>(record: &DigestRecord, out: W) -> anyhow::Result<W> {
    let mut zip = zip::ZipWriter::new(out);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let parts = [
        ("[Content_Types].xml", render_content_types()),
        ("_rels/.rels", render_package_rels()),
        ("docProps/core.xml", render_core_properties(record)),
        ("word/_rels/document.xml.rels", render_document_rels()),
        ("word/styles.xml", render_styles()),
        ("word/document.xml", render_document(record)),
    ];
    for (name, xml) in parts {
        zip.start_file(name, options)
            .with_context(|| format!("docx start_file {name}"))?;
        zip.write_all(xml.as_bytes())
            .with_context(|| format!("docx write {name}"))?;
    }

    zip.finish().context("docx finish zip")
}

fn render_content_types() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>
"#
    .to_owned()
}

fn render_package_rels() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>
"#
    .to_owned()
}

fn render_document_rels() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>
"#
    .to_owned()
}

fn render_core_properties(record: &DigestRecord) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{}</dc:title>
  <dc:creator>paper-digest</dc:creator>
  <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
</cp:coreProperties>
"#,
        xml_escape(record.title()),
        record.timestamp.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

fn render_styles() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:pPr><w:spacing w:after="120"/></w:pPr>
    <w:rPr><w:sz w:val="22"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Title">
    <w:name w:val="Title"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:pPr><w:spacing w:after="240"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="48"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="0"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="1F3864"/><w:sz w:val="30"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet">
    <w:name w:val="List Bullet"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr>
  </w:style>
</w:styles>
"#
    .to_owned()
}

fn render_document(record: &DigestRecord) -> String {
    let fields = &record.fields;
    let mut body = String::new();

    let title = if fields.title.is_empty() {
        "Untitled paper"
    } else {
        fields.title.as_str()
    };
    body.push_str(&paragraph(Some("Title"), &[Run::plain(title)]));

    body.push_str(&paragraph(
        Some("Heading1"),
        &[Run::plain("Document Information")],
    ));
    let date = record.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    body.push_str(&paragraph(None, &[Run::bold("Date: "), Run::plain(&date)]));
    body.push_str(&paragraph(
        None,
        &[
            Run::bold("Source Type: "),
            Run::plain(record.source_type.as_str()),
        ],
    ));
    if let Some(url) = record.source_url.as_deref() {
        body.push_str(&paragraph(
            None,
            &[Run::bold("Source URL: "), Run::plain(url)],
        ));
    }

    for section in Section::ALL {
        let text = match section {
            Section::Title => continue,
            Section::FieldOrTopic => &fields.field_or_topic,
            Section::ResearchQuestion => &fields.research_question,
            Section::Methodology => &fields.methodology,
            Section::Limitations => &fields.limitations,
            Section::PersonalTakeaway => &fields.personal_takeaway,
            Section::KeyFindings => {
                body.push_str(&paragraph(
                    Some("Heading1"),
                    &[Run::plain(section.heading())],
                ));
                for finding in &fields.key_findings {
                    body.push_str(&paragraph(
                        Some("ListBullet"),
                        &[Run::plain("\u{2022}\t"), Run::plain(finding)],
                    ));
                }
                continue;
            }
        };
        body.push_str(&paragraph(
            Some("Heading1"),
            &[Run::plain(section.heading())],
        ));
        body.push_str(&paragraph(None, &[Run::plain(text)]));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
{body}    <w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr>
  </w:body>
</w:document>
"#
    )
}

struct Run<'a> {
    text: &'a str,
    bold: bool,
}

impl<'a> Run<'a> {
    fn plain(text: &'a str) -> Self {
        Self { text, bold: false }
    }

    fn bold(text: &'a str) -> Self {
        Self { text, bold: true }
    }
}

fn paragraph(style: Option<&str>, runs: &[Run<'_>]) -> String {
    let mut out = String::from("    <w:p>");
    if let Some(style) = style {
        out.push_str(&format!("<w:pPr><w:pStyle w:val=\"{style}\"/></w:pPr>"));
    }
    for run in runs {
        out.push_str("<w:r>");
        if run.bold {
            out.push_str("<w:rPr><w:b/></w:rPr>");
        }
        out.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t>",
            xml_escape(run.text)
        ));
        out.push_str("</w:r>");
    }
    out.push_str("</w:p>\n");
    out
}

/// Escapes markup and drops characters XML 1.0 cannot carry (PDF text often has them).
fn xml_escape(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}'))
        .collect::<String>()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read as _};

    use super::*;
    use crate::formats::{DigestFields, SourceInput};

    fn sample_record() -> DigestRecord {
        let fields = DigestFields {
            title: "Bits & <Bytes>".to_owned(),
            field_or_topic: "Systems".to_owned(),
            key_findings: vec!["Fast".to_owned(), "Small\u{0}".to_owned()],
            ..DigestFields::default()
        };
        DigestRecord::new(
            fields,
            &SourceInput::Url("https://example.com/p?a=1&b=2".to_owned()),
        )
    }

    fn read_part(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn package_contains_required_parts() {
        let out = write_digest(&sample_record(), Cursor::new(Vec::new())).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(out.into_inner())).unwrap();
        let mut names = archive.file_names().collect::<Vec<_>>();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/styles.xml",
            ]
        );
    }

    #[test]
    fn document_body_is_escaped_and_lists_findings() {
        let out = write_digest(&sample_record(), Cursor::new(Vec::new())).unwrap();
        let xml = read_part(out.into_inner(), "word/document.xml");

        assert!(xml.contains("Bits &amp; &lt;Bytes&gt;"));
        assert!(xml.contains("https://example.com/p?a=1&amp;b=2"));
        assert!(xml.contains("<w:pStyle w:val=\"ListBullet\"/>"));
        assert!(xml.contains(">Fast<"));
        assert!(xml.contains(">Small<"));
        assert!(!xml.contains('\u{0}'));
        assert!(xml.contains(">Document Information<"));
        assert!(xml.contains(">Personal Takeaway<"));
    }
}
