//! Minimal Office Open XML packaging
//!
//! Both report formats are zip archives of XML parts. Parts are written
//! with quick-xml, which escapes text and attribute values; the archive
//! writer lives here too.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt::Display;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::types::{EncvError, Result};

pub const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

fn xml_error(err: impl Display) -> EncvError {
    EncvError::Export(format!("XML write error: {err}"))
}

/// One XML part, declaration included
pub struct XmlPart {
    writer: Writer<Vec<u8>>,
}

impl XmlPart {
    pub fn new() -> Result<Self> {
        let mut part = Self {
            writer: Writer::new(Vec::new()),
        };
        part.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(part)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_error)
    }

    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Start(BytesStart::new(name).with_attributes(attrs.iter().copied())))
    }

    pub fn close(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Empty(BytesStart::new(name).with_attributes(attrs.iter().copied())))
    }

    /// Escaped character data. Control characters XML 1.0 cannot carry are dropped.
    pub fn text(&mut self, text: &str) -> Result<()> {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
            .collect();
        self.write(Event::Text(BytesText::new(&cleaned)))
    }

    /// `<name attrs>text</name>`
    pub fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.open(name, attrs)?;
        self.text(text)?;
        self.close(name)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// `_rels/*.rels` part from `(id, type suffix, target)` triples
pub fn relationships(rels: &[(&str, &str, &str)]) -> Result<XmlPart> {
    let mut part = XmlPart::new()?;
    part.open("Relationships", &[("xmlns", NS_PKG_REL)])?;
    for &(id, kind, target) in rels {
        let kind = format!("{NS_REL}/{kind}");
        part.empty(
            "Relationship",
            &[("Id", id), ("Type", kind.as_str()), ("Target", target)],
        )?;
    }
    part.close("Relationships")?;
    Ok(part)
}

/// `[Content_Types].xml` with the rels/xml defaults and one override per part
pub fn content_types(overrides: &[(&str, &str)]) -> Result<XmlPart> {
    let mut part = XmlPart::new()?;
    part.open("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    part.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    part.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for &(name, content_type) in overrides {
        part.empty("Override", &[("PartName", name), ("ContentType", content_type)])?;
    }
    part.close("Types")?;
    Ok(part)
}

/// In-memory OOXML archive
pub struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl Package {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn add_part(&mut self, path: &str, part: XmlPart) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(path, options)?;
        self.zip.write_all(&part.into_bytes())?;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

/// Spreadsheet column letters for a zero-based index: 0 → A, 26 → AA
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn render(part: XmlPart) -> String {
        String::from_utf8(part.into_bytes()).unwrap()
    }

    #[test]
    fn test_text_and_attributes_escaped() {
        let mut part = XmlPart::new().unwrap();
        part.leaf("t", &[("title", r#"say "hi""#)], "a < b & c\u{1}").unwrap();
        let xml = render(part);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.contains("a &lt; b &amp; c</t>"));
        assert!(xml.contains("title=\"say &quot;hi&quot;\""));
    }

    #[test]
    fn test_relationships_part() {
        let xml = render(relationships(&[("rId1", "styles", "styles.xml")]).unwrap());
        assert!(xml.contains(&format!(
            r#"<Relationship Id="rId1" Type="{NS_REL}/styles" Target="styles.xml"/>"#
        )));
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(9), "J");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }

    #[test]
    fn test_package_parts_readable() {
        let mut part = XmlPart::new().unwrap();
        part.empty("root", &[]).unwrap();

        let mut package = Package::new();
        package.add_part("docProps/test.xml", part).unwrap();
        let bytes = package.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("docProps/test.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.ends_with("<root/>"));
    }
}
