//! Word document export (.docx)

use chrono::{DateTime, Utc};
use tracing::info;

use super::ooxml::{content_types, relationships, Package, XmlPart};
use super::{file_name, opt_timestamp, ExportData, ExportFile, MediaLinks, DOCX_CONTENT_TYPE};
use crate::records::text::clean_html;
use crate::records::{format_timestamp, Conversation, JournalEntry};
use crate::types::Result;

pub const TITLE: &str = "ENCV Data Export";
pub const EDUCATION_HEADING: &str = "1) Education Strand";
pub const HEALTH_HEADING: &str = "2) Health Strand";

const INTRO: &str = "This document contains data exported from the ENCV database.

Data is organised into 2 strands:
1) Education Strand (includes a list of 'Journal Entries' from participants)
2) Health Strand (includes 'Conversations' between cancer champions and the patients)";

const SEPARATOR_WIDTH: usize = 118;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Block-level content of the document body
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading { level: u8, text: String },
    /// Line breaks inside the text are kept
    Paragraph(String),
    PageBreak,
}

impl Block {
    fn write(&self, part: &mut XmlPart) -> Result<()> {
        match self {
            Block::Title(text) => styled_paragraph(part, "Title", text),
            Block::Heading { level, text } => {
                styled_paragraph(part, &format!("Heading{level}"), text)
            }
            Block::Paragraph(text) => {
                part.open("w:p", &[])?;
                runs(part, text)?;
                part.close("w:p")
            }
            Block::PageBreak => {
                part.open("w:p", &[])?;
                part.open("w:r", &[])?;
                part.empty("w:br", &[("w:type", "page")])?;
                part.close("w:r")?;
                part.close("w:p")
            }
        }
    }
}

fn styled_paragraph(part: &mut XmlPart, style: &str, text: &str) -> Result<()> {
    part.open("w:p", &[])?;
    part.open("w:pPr", &[])?;
    part.empty("w:pStyle", &[("w:val", style)])?;
    part.close("w:pPr")?;
    runs(part, text)?;
    part.close("w:p")
}

/// One run; newlines become `<w:br/>`
fn runs(part: &mut XmlPart, text: &str) -> Result<()> {
    part.open("w:r", &[])?;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            part.empty("w:br", &[])?;
        }
        if !line.is_empty() {
            part.leaf("w:t", &[("xml:space", "preserve")], line)?;
        }
    }
    part.close("w:r")
}

/// Paragraph styles: Normal, Title, Heading1 and Heading2
fn styles() -> Result<XmlPart> {
    let mut part = XmlPart::new()?;
    part.open("w:styles", &[("xmlns:w", NS_W)])?;

    part.open("w:style", &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")])?;
    part.empty("w:name", &[("w:val", "Normal")])?;
    part.open("w:rPr", &[])?;
    part.empty("w:sz", &[("w:val", "22")])?;
    part.close("w:rPr")?;
    part.close("w:style")?;

    // (style id, display name, outline level, half-point size)
    let derived = [
        ("Title", "Title", None, "56"),
        ("Heading1", "heading 1", Some("0"), "32"),
        ("Heading2", "heading 2", Some("1"), "26"),
    ];
    for (id, name, outline, size) in derived {
        part.open("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])?;
        part.empty("w:name", &[("w:val", name)])?;
        part.empty("w:basedOn", &[("w:val", "Normal")])?;
        part.empty("w:next", &[("w:val", "Normal")])?;
        if let Some(level) = outline {
            part.open("w:pPr", &[])?;
            part.empty("w:outlineLvl", &[("w:val", level)])?;
            part.close("w:pPr")?;
        }
        part.open("w:rPr", &[])?;
        if outline.is_some() {
            part.empty("w:b", &[])?;
            part.empty("w:color", &[("w:val", "2F5496")])?;
        }
        part.empty("w:sz", &[("w:val", size)])?;
        part.close("w:rPr")?;
        part.close("w:style")?;
    }

    part.close("w:styles")?;
    Ok(part)
}

fn separator() -> Block {
    Block::Paragraph(format!("\n{}\n", "-".repeat(SEPARATOR_WIDTH)))
}

/// `Label:` line followed by its value and a blank line
fn labelled(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(label, value)| format!("{label}:\n{value}\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn journal_entry_block(entry: &JournalEntry, data: &ExportData, links: &MediaLinks) -> String {
    labelled(&[
        ("Author", data.author(entry.meta.author)),
        ("Created", format_timestamp(&entry.meta.created)),
        ("Last Updated", opt_timestamp(entry.meta.last_updated.as_ref())),
        ("Link", entry.link.clone().unwrap_or_default()),
        ("Image (download link)", links.link(entry.image.as_deref())),
        ("Audio (download link)", links.link(entry.audio.as_deref())),
        ("Video (download link)", links.link(entry.video.as_deref())),
        ("Prompt(s)", entry.prompts_as_str()),
        ("Journal Entry Text", clean_html(entry.text.as_deref().unwrap_or_default())),
    ])
}

fn conversation_block(
    conversation: &Conversation,
    data: &ExportData,
    links: &MediaLinks,
) -> String {
    labelled(&[
        ("Author", data.author(conversation.meta.author)),
        ("Created", format_timestamp(&conversation.meta.created)),
        ("Last Updated", opt_timestamp(conversation.meta.last_updated.as_ref())),
        ("Conversation Date", conversation.conversation_date.format("%Y-%m-%d").to_string()),
        (
            "Conversation Audio (download link)",
            links.link(Some(conversation.conversation_audio.as_str())),
        ),
        (
            "Conversation Transcript (download link)",
            links.link(conversation.conversation_transcript.as_deref()),
        ),
        (
            "Cancer Champion Reflection",
            conversation.cancer_champion_reflection.clone().unwrap_or_default(),
        ),
    ])
}

/// Document body in reading order. Records appear oldest first.
pub fn document_blocks(data: &ExportData, links: &MediaLinks) -> Vec<Block> {
    let mut entries: Vec<&JournalEntry> = data.journal_entries.iter().collect();
    entries.sort_by(|a, b| a.meta.created.cmp(&b.meta.created).then(a.meta.id.cmp(&b.meta.id)));
    let mut conversations: Vec<&Conversation> = data.conversations.iter().collect();
    conversations.sort_by(|a, b| {
        a.meta
            .created
            .cmp(&b.meta.created)
            .then(a.meta.id.cmp(&b.meta.id))
    });

    let mut blocks = vec![
        Block::Title(TITLE.into()),
        Block::Paragraph(INTRO.into()),
        Block::PageBreak,
        Block::Heading { level: 1, text: EDUCATION_HEADING.into() },
        separator(),
    ];

    for entry in entries {
        blocks.push(Block::Heading {
            level: 2,
            text: format!("Journal Entry ID: {}", entry.meta.id),
        });
        blocks.push(Block::Paragraph(journal_entry_block(entry, data, links)));
        blocks.push(separator());
    }

    blocks.extend([
        Block::PageBreak,
        Block::PageBreak,
        Block::Heading { level: 1, text: HEALTH_HEADING.into() },
        separator(),
    ]);

    for conversation in conversations {
        blocks.push(Block::Heading {
            level: 2,
            text: format!("Conversation ID: {}", conversation.meta.id),
        });
        blocks.push(Block::Paragraph(conversation_block(conversation, data, links)));
        blocks.push(separator());
    }

    blocks
}

/// Build the Word document covering both strands
pub fn create_document(
    data: &ExportData,
    links: &MediaLinks,
    now: DateTime<Utc>,
) -> Result<ExportFile> {
    let blocks = document_blocks(data, links);

    let mut document = XmlPart::new()?;
    document.open("w:document", &[("xmlns:w", NS_W)])?;
    document.open("w:body", &[])?;
    for block in &blocks {
        block.write(&mut document)?;
    }
    document.close("w:body")?;
    document.close("w:document")?;

    let mut pkg = Package::new();
    pkg.add_part(
        "[Content_Types].xml",
        content_types(&[
            (
                "/word/document.xml",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
            (
                "/word/styles.xml",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            ),
        ])?,
    )?;
    pkg.add_part(
        "_rels/.rels",
        relationships(&[("rId1", "officeDocument", "word/document.xml")])?,
    )?;
    pkg.add_part(
        "word/_rels/document.xml.rels",
        relationships(&[("rId1", "styles", "styles.xml")])?,
    )?;
    pkg.add_part("word/styles.xml", styles()?)?;
    pkg.add_part("word/document.xml", document)?;

    let file_name = file_name(now, "docx");
    info!("Built document {} ({} blocks)", file_name, blocks.len());

    Ok(ExportFile {
        file_name,
        content_type: DOCX_CONTENT_TYPE,
        bytes: pkg.finish()?,
    })
}
