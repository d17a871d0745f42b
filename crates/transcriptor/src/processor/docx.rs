use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::AssemblyError;
use crate::processor::report::ReportSection;
use crate::processor::DocumentAssembler;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Transcript runs are 12 pt (half-points).
const TRANSCRIPT_FONT_SIZE: &str = "24";

/// Paragraph content for the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Text { text: String, bold: bool, size: Option<&'static str> },
    Separator,
}

fn section_blocks(section: &ReportSection) -> Vec<Block> {
    let mut blocks: Vec<Block> = section
        .header()
        .into_iter()
        .map(|(caption, value)| Block::Text {
            text: format!("{}: {}", caption, value),
            bold: true,
            size: None,
        })
        .collect();

    blocks.push(Block::Text {
        text: "Transcript:".to_string(),
        bold: false,
        size: None,
    });
    blocks.extend(section.transcript_lines().map(|line| Block::Text {
        text: line.to_string(),
        bold: false,
        size: Some(TRANSCRIPT_FONT_SIZE),
    }));
    blocks.push(Block::Separator);
    blocks
}

/// Writes reports as Office Open XML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxAssembler;

impl DocxAssembler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentAssembler for DocxAssembler {
    async fn assemble(&self, sections: &[ReportSection], output: &Path) -> Result<(), AssemblyError> {
        let blocks: Vec<Block> = sections.iter().flat_map(section_blocks).collect();
        write_blocks_async(blocks, output.to_path_buf()).await
    }

    async fn assemble_fallback(&self, message: &str, output: &Path) -> Result<(), AssemblyError> {
        let blocks = vec![Block::Text {
            text: message.to_string(),
            bold: false,
            size: None,
        }];
        write_blocks_async(blocks, output.to_path_buf()).await
    }
}

async fn write_blocks_async(blocks: Vec<Block>, output: PathBuf) -> Result<(), AssemblyError> {
    let target = output.clone();
    tokio::task::spawn_blocking(move || write_docx(&blocks, &target))
        .await
        .map_err(|e| AssemblyError::Finish {
            path: output,
            message: e.to_string(),
        })?
}

fn write_docx(blocks: &[Block], output: &Path) -> Result<(), AssemblyError> {
    let document = render_document(blocks)?;

    let file = File::create(output).map_err(|e| AssemblyError::Create {
        path: output.to_path_buf(),
        source: e,
    })?;

    let result = write_package(file, &document, output);
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    result
}

fn write_package(file: File, document: &[u8], output: &Path) -> Result<(), AssemblyError> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (part, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("word/document.xml", document),
    ] {
        zip.start_file(part, options)
            .map_err(|e| AssemblyError::WritePart {
                part: part.to_string(),
                message: e.to_string(),
            })?;
        zip.write_all(content).map_err(|e| AssemblyError::WritePart {
            part: part.to_string(),
            message: e.to_string(),
        })?;
    }

    zip.finish().map_err(|e| AssemblyError::Finish {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

fn render_document(blocks: &[Block]) -> Result<Vec<u8>, AssemblyError> {
    let mut writer = Writer::new(Vec::new());
    let part_error = |e: std::io::Error| AssemblyError::WritePart {
        part: "word/document.xml".to_string(),
        message: e.to_string(),
    };

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(part_error)?;
    writer
        .write_event(Event::Start(
            BytesStart::new("w:document").with_attributes([("xmlns:w", WORDML_NS)]),
        ))
        .map_err(part_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:body")))
        .map_err(part_error)?;

    for block in blocks {
        write_block(&mut writer, block).map_err(part_error)?;
    }

    writer
        .write_event(Event::Empty(BytesStart::new("w:sectPr")))
        .map_err(part_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:body")))
        .map_err(part_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:document")))
        .map_err(part_error)?;

    Ok(writer.into_inner())
}

fn write_block<W: Write>(writer: &mut Writer<W>, block: &Block) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;

    match block {
        Block::Separator => {
            writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
            writer.write_event(Event::Start(BytesStart::new("w:pBdr")))?;
            writer.write_event(Event::Empty(BytesStart::new("w:bottom").with_attributes([
                ("w:val", "single"),
                ("w:sz", "6"),
                ("w:space", "1"),
                ("w:color", "auto"),
            ])))?;
            writer.write_event(Event::End(BytesEnd::new("w:pBdr")))?;
            writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
        }
        Block::Text { text, bold, size } => {
            writer.write_event(Event::Start(BytesStart::new("w:r")))?;
            if *bold || size.is_some() {
                writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
                if *bold {
                    writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
                }
                if let Some(size) = size {
                    writer.write_event(Event::Empty(
                        BytesStart::new("w:sz").with_attributes([("w:val", *size)]),
                    ))?;
                }
                writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
            }
            writer.write_event(Event::Start(
                BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
            ))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("w:t")))?;
            writer.write_event(Event::End(BytesEnd::new("w:r")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

/// Extracts paragraph text from a DOCX file, one line per paragraph.
pub fn read_docx_text(path: &Path) -> Result<String, AssemblyError> {
    let file = File::open(path).map_err(|e| AssemblyError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| AssemblyError::Finish {
        path: path.to_path_buf(),
        message: format!("Failed to open DOCX: {}", e),
    })?;

    extract_docx_text(&mut archive)
}

fn extract_docx_text<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, AssemblyError> {
    let part_error = |message: String| AssemblyError::WritePart {
        part: "word/document.xml".to_string(),
        message,
    };

    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| part_error(format!("Failed to find document.xml: {}", e)))?;

    let mut xml_content = String::new();
    document_xml
        .read_to_string(&mut xml_content)
        .map_err(|e| part_error(format!("Failed to read document.xml: {}", e)))?;

    parse_document_xml(&xml_content).map_err(part_error)
}

fn parse_document_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => {
                in_text_element = true;
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e.decode().unwrap_or_default();
                    text.push_str(&decoded);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text_element {
                    let name = e.decode().unwrap_or_default();
                    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                        text.push_str(resolved);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parsing error: {}", e)),
            _ => {}
        }
    }

    Ok(text)
}
