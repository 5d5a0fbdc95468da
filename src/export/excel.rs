//! Excel workbook export (.xlsx)

use chrono::{DateTime, Utc};
use tracing::info;

use super::ooxml::{column_name, content_types, relationships, Package, XmlPart, NS_REL};
use super::{file_name, opt_timestamp, ExportData, ExportFile, MediaLinks, XLSX_CONTENT_TYPE};
use crate::records::format_timestamp;
use crate::types::Result;

pub const JOURNAL_SHEET: &str = "Education - Journal Entries";
pub const CONVERSATION_SHEET: &str = "Health - Conversations";

pub const JOURNAL_COLUMNS: [&str; 10] = [
    "ID",
    "Author",
    "Prompt",
    "Text",
    "Link",
    "Image (download link)",
    "Audio (download link)",
    "Video (download link)",
    "Created",
    "Last Updated",
];

pub const CONVERSATION_COLUMNS: [&str; 8] = [
    "ID",
    "Author",
    "Conversation Date",
    "Conversation Audio (download link)",
    "Conversation Transcript (download link)",
    "Cancer Champion Reflection",
    "Created",
    "Last Updated",
];

// Indexes into cellXfs written by `styles`
const STYLE_HEADER: &str = "1";
const STYLE_WRAP: &str = "2";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// One worksheet: a header row followed by data rows
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Width of each column: the longest value in it, header included
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (col, value) in row.iter().enumerate() {
                let width = value.chars().count();
                match widths.get_mut(col) {
                    Some(max) if *max < width => *max = width,
                    Some(_) => {}
                    None => widths.push(width),
                }
            }
        }
        widths
    }

    fn to_part(&self) -> Result<XmlPart> {
        let mut part = XmlPart::new()?;
        part.open("worksheet", &[("xmlns", NS_MAIN)])?;

        part.open("cols", &[])?;
        for (col, width) in self.column_widths().into_iter().enumerate() {
            let n = (col + 1).to_string();
            let width = width.max(1).to_string();
            part.empty(
                "col",
                &[
                    ("min", n.as_str()),
                    ("max", n.as_str()),
                    ("width", width.as_str()),
                    ("customWidth", "1"),
                ],
            )?;
        }
        part.close("cols")?;

        part.open("sheetData", &[])?;
        write_row(&mut part, 1, self.columns.iter().copied(), STYLE_HEADER)?;
        for (i, row) in self.rows.iter().enumerate() {
            write_row(&mut part, i + 2, row.iter().map(String::as_str), STYLE_WRAP)?;
        }
        part.close("sheetData")?;

        part.close("worksheet")?;
        Ok(part)
    }
}

/// Cells are inline strings; empty values get a styled blank cell
fn write_row<'a>(
    part: &mut XmlPart,
    number: usize,
    values: impl Iterator<Item = &'a str>,
    style: &str,
) -> Result<()> {
    let r = number.to_string();
    part.open("row", &[("r", r.as_str())])?;
    for (col, value) in values.enumerate() {
        let cell = format!("{}{}", column_name(col), number);
        if value.is_empty() {
            part.empty("c", &[("r", cell.as_str()), ("s", style)])?;
        } else {
            part.open("c", &[("r", cell.as_str()), ("s", style), ("t", "inlineStr")])?;
            part.open("is", &[])?;
            part.leaf("t", &[("xml:space", "preserve")], value)?;
            part.close("is")?;
            part.close("c")?;
        }
    }
    part.close("row")
}

/// Regular font, then the bold white header font on a `#002060` fill
fn styles() -> Result<XmlPart> {
    let mut part = XmlPart::new()?;
    part.open("styleSheet", &[("xmlns", NS_MAIN)])?;

    part.open("fonts", &[("count", "2")])?;
    part.open("font", &[])?;
    part.empty("sz", &[("val", "11")])?;
    part.empty("name", &[("val", "Calibri")])?;
    part.close("font")?;
    part.open("font", &[])?;
    part.empty("b", &[])?;
    part.empty("sz", &[("val", "11")])?;
    part.empty("color", &[("rgb", "FFFFFFFF")])?;
    part.empty("name", &[("val", "Calibri")])?;
    part.close("font")?;
    part.close("fonts")?;

    part.open("fills", &[("count", "3")])?;
    for pattern in ["none", "gray125"] {
        part.open("fill", &[])?;
        part.empty("patternFill", &[("patternType", pattern)])?;
        part.close("fill")?;
    }
    part.open("fill", &[])?;
    part.open("patternFill", &[("patternType", "solid")])?;
    part.empty("fgColor", &[("rgb", "FF002060")])?;
    part.empty("bgColor", &[("indexed", "64")])?;
    part.close("patternFill")?;
    part.close("fill")?;
    part.close("fills")?;

    part.open("borders", &[("count", "1")])?;
    part.open("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        part.empty(side, &[])?;
    }
    part.close("border")?;
    part.close("borders")?;

    let plain = [("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")];
    part.open("cellStyleXfs", &[("count", "1")])?;
    part.empty("xf", &plain)?;
    part.close("cellStyleXfs")?;

    part.open("cellXfs", &[("count", "3")])?;
    part.empty(
        "xf",
        &[
            ("numFmtId", "0"),
            ("fontId", "0"),
            ("fillId", "0"),
            ("borderId", "0"),
            ("xfId", "0"),
        ],
    )?;
    part.empty(
        "xf",
        &[
            ("numFmtId", "0"),
            ("fontId", "1"),
            ("fillId", "2"),
            ("borderId", "0"),
            ("xfId", "0"),
            ("applyFont", "1"),
            ("applyFill", "1"),
        ],
    )?;
    part.open(
        "xf",
        &[
            ("numFmtId", "0"),
            ("fontId", "0"),
            ("fillId", "0"),
            ("borderId", "0"),
            ("xfId", "0"),
            ("applyAlignment", "1"),
        ],
    )?;
    part.empty("alignment", &[("wrapText", "1")])?;
    part.close("xf")?;
    part.close("cellXfs")?;

    part.open("cellStyles", &[("count", "1")])?;
    part.empty("cellStyle", &[("name", "Normal"), ("xfId", "0"), ("builtinId", "0")])?;
    part.close("cellStyles")?;

    part.close("styleSheet")?;
    Ok(part)
}

pub fn journal_entry_sheet(data: &ExportData, links: &MediaLinks) -> Sheet {
    let rows = data
        .journal_entries
        .iter()
        .map(|entry| {
            vec![
                entry.meta.id.to_string(),
                data.author(entry.meta.author),
                entry.prompts_as_str(),
                entry.text.clone().unwrap_or_default(),
                entry.link.clone().unwrap_or_default(),
                links.link(entry.image.as_deref()),
                links.link(entry.audio.as_deref()),
                links.link(entry.video.as_deref()),
                format_timestamp(&entry.meta.created),
                opt_timestamp(entry.meta.last_updated.as_ref()),
            ]
        })
        .collect();

    Sheet {
        name: JOURNAL_SHEET,
        columns: &JOURNAL_COLUMNS,
        rows,
    }
}

pub fn conversation_sheet(data: &ExportData, links: &MediaLinks) -> Sheet {
    let rows = data
        .conversations
        .iter()
        .map(|conversation| {
            vec![
                conversation.meta.id.to_string(),
                data.author(conversation.meta.author),
                conversation.conversation_date.format("%Y-%m-%d").to_string(),
                links.link(Some(conversation.conversation_audio.as_str())),
                links.link(conversation.conversation_transcript.as_deref()),
                conversation.cancer_champion_reflection.clone().unwrap_or_default(),
                format_timestamp(&conversation.meta.created),
                opt_timestamp(conversation.meta.last_updated.as_ref()),
            ]
        })
        .collect();

    Sheet {
        name: CONVERSATION_SHEET,
        columns: &CONVERSATION_COLUMNS,
        rows,
    }
}

/// Build the workbook with both strand sheets
pub fn create_workbook(
    data: &ExportData,
    links: &MediaLinks,
    now: DateTime<Utc>,
) -> Result<ExportFile> {
    let sheets = [journal_entry_sheet(data, links), conversation_sheet(data, links)];
    let bytes = package(&sheets)?;
    let file_name = file_name(now, "xlsx");

    info!(
        "Built workbook {} ({} journal entries, {} conversations)",
        file_name,
        sheets[0].rows.len(),
        sheets[1].rows.len()
    );

    Ok(ExportFile {
        file_name,
        content_type: XLSX_CONTENT_TYPE,
        bytes,
    })
}

fn package(sheets: &[Sheet]) -> Result<Vec<u8>> {
    let sheet_paths: Vec<String> = (1..=sheets.len())
        .map(|n| format!("worksheets/sheet{n}.xml"))
        .collect();
    let rel_ids: Vec<String> = (1..=sheets.len()).map(|n| format!("rId{n}")).collect();
    let styles_id = format!("rId{}", sheets.len() + 1);

    let part_names: Vec<String> = sheet_paths.iter().map(|p| format!("/xl/{p}")).collect();
    let mut overrides = vec![
        (
            "/xl/workbook.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        ),
        (
            "/xl/styles.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
        ),
    ];
    for name in &part_names {
        overrides.push((
            name.as_str(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        ));
    }

    let mut workbook = XmlPart::new()?;
    workbook.open("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)])?;
    workbook.open("sheets", &[])?;
    for (i, sheet) in sheets.iter().enumerate() {
        let sheet_id = (i + 1).to_string();
        workbook.empty(
            "sheet",
            &[("name", sheet.name), ("sheetId", sheet_id.as_str()), ("r:id", rel_ids[i].as_str())],
        )?;
    }
    workbook.close("sheets")?;
    workbook.close("workbook")?;

    let mut workbook_rels: Vec<(&str, &str, &str)> = rel_ids
        .iter()
        .zip(&sheet_paths)
        .map(|(id, path)| (id.as_str(), "worksheet", path.as_str()))
        .collect();
    workbook_rels.push((styles_id.as_str(), "styles", "styles.xml"));

    let mut pkg = Package::new();
    pkg.add_part("[Content_Types].xml", content_types(&overrides)?)?;
    pkg.add_part(
        "_rels/.rels",
        relationships(&[("rId1", "officeDocument", "xl/workbook.xml")])?,
    )?;
    pkg.add_part("xl/workbook.xml", workbook)?;
    pkg.add_part("xl/_rels/workbook.xml.rels", relationships(&workbook_rels)?)?;
    pkg.add_part("xl/styles.xml", styles()?)?;
    for (path, sheet) in sheet_paths.iter().zip(sheets) {
        pkg.add_part(&format!("xl/{path}"), sheet.to_part()?)?;
    }
    pkg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::UserDirectory;
    use crate::identity::User;
    use crate::records::education::JournalEntryForm;
    use crate::records::health::ConversationForm;
    use crate::records::{Conversation, JournalEntry};
    use chrono::NaiveDate;
    use std::io::{Cursor, Read};

    fn sample() -> ExportData {
        let author = User::new("champion", "h", None, None);

        let mut entry = JournalEntry::from_form(JournalEntryForm {
            text: Some("<p>Tom & Jerry</p>".into()),
            image: Some("education/journal_entry/image/a.png".into()),
            prompts: vec!["Week 1".into()],
            ..Default::default()
        })
        .unwrap();
        entry.meta.author = Some(author.id);

        let conversation = Conversation::from_form(ConversationForm {
            conversation_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            conversation_audio: "health/conversation/audio/c.mp3".into(),
            conversation_transcript: None,
            cancer_champion_reflection: Some("Went well".into()),
        })
        .unwrap();

        ExportData {
            journal_entries: vec![entry],
            conversations: vec![conversation],
            users: UserDirectory::from_users(&[author]),
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut part).unwrap();
        part
    }

    #[test]
    fn test_column_widths_track_longest_value() {
        let sheet = Sheet {
            name: "s",
            columns: &["ID", "Text"],
            rows: vec![vec!["1".into(), "a much longer value".into()]],
        };
        assert_eq!(sheet.column_widths(), vec![2, 19]);
    }

    #[test]
    fn test_journal_rows() {
        let links = MediaLinks::new("https://encv.example.org", "/media/");
        let sheet = journal_entry_sheet(&sample(), &links);
        let row = &sheet.rows[0];

        assert_eq!(row.len(), JOURNAL_COLUMNS.len());
        assert_eq!(row[1], "champion");
        assert_eq!(row[2], "Week 1");
        assert_eq!(row[5], "https://encv.example.org/media/education/journal_entry/image/a.png");
        assert_eq!(row[6], "");
        assert_eq!(row[9], "");
    }

    #[test]
    fn test_workbook_contains_both_sheets() {
        let links = MediaLinks::new("http://localhost:8080", "/media/");
        let file = create_workbook(&sample(), &links, Utc::now()).unwrap();

        assert!(file.file_name.starts_with("encv_data_"));
        assert!(file.file_name.ends_with(".xlsx"));
        assert_eq!(file.content_type, XLSX_CONTENT_TYPE);

        let workbook = read_part(&file.bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Education - Journal Entries""#));
        assert!(workbook.contains(r#"name="Health - Conversations""#));

        let journal = read_part(&file.bytes, "xl/worksheets/sheet1.xml");
        let header = r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">ID</t>"#;
        assert!(journal.contains(header));
        assert!(journal.contains("Tom &amp; Jerry"));

        let conversations = read_part(&file.bytes, "xl/worksheets/sheet2.xml");
        assert!(conversations.contains("Cancer Champion Reflection"));
        assert!(conversations.contains("2023-06-01"));

        let styles = read_part(&file.bytes, "xl/styles.xml");
        assert!(styles.contains("FF002060"));
    }
}
