//! Zip container of a `.docx` file

use crate::error::{Result, ResumeTailorError};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const NUMBERING_PART: &str = "word/numbering.xml";

/// An in-memory `.docx` package. Part order is preserved so that a
/// rewritten package keeps `[Content_Types].xml` first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ResumeTailorError::UnreadableDocument("document is empty".to_string()));
        }

        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ResumeTailorError::UnreadableDocument(format!("not a Word document: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ResumeTailorError::UnreadableDocument(format!("corrupt package entry: {}", e)))?;
            if file.is_dir() {
                continue;
            }
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)
                .map_err(|e| ResumeTailorError::UnreadableDocument(format!("corrupt package entry: {}", e)))?;
            parts.push((file.name().to_string(), content));
        }

        let package = Self { parts };
        if package.part(DOCUMENT_PART).is_none() {
            return Err(ResumeTailorError::UnreadableDocument(format!(
                "package has no {}",
                DOCUMENT_PART
            )));
        }
        Ok(package)
    }

    pub fn from_parts(parts: Vec<(String, Vec<u8>)>) -> Self {
        Self { parts }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(part_name, _)| part_name == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn part_str(&self, name: &str) -> Result<Option<&str>> {
        match self.part(name) {
            Some(data) => std::str::from_utf8(data)
                .map(Some)
                .map_err(|e| ResumeTailorError::UnreadableDocument(format!("{} is not UTF-8: {}", name, e))),
            None => Ok(None),
        }
    }

    pub fn document_xml(&self) -> Result<&str> {
        self.part_str(DOCUMENT_PART)?
            .ok_or_else(|| ResumeTailorError::UnreadableDocument(format!("package has no {}", DOCUMENT_PART)))
    }

    /// Replace a part in place, or append it if missing.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(part_name, _)| part_name == name) {
            Some((_, existing)) => *existing = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Serialize to zip bytes. Timestamps are fixed so identical parts
    /// always produce identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(data)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocxPackage {
        DocxPackage::from_parts(vec![
            ("[Content_Types].xml".to_string(), b"<Types/>".to_vec()),
            (DOCUMENT_PART.to_string(), b"<w:document/>".to_vec()),
        ])
    }

    #[test]
    fn test_roundtrip_preserves_order_and_content() {
        let bytes = sample().to_bytes().unwrap();
        let reread = DocxPackage::from_bytes(&bytes).unwrap();

        let names: Vec<&str> = reread.part_names().collect();
        assert_eq!(names, vec!["[Content_Types].xml", DOCUMENT_PART]);
        assert_eq!(reread.document_xml().unwrap(), "<w:document/>");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        assert_eq!(sample().to_bytes().unwrap(), sample().to_bytes().unwrap());
    }

    #[test]
    fn test_rejects_non_zip_and_empty() {
        assert!(matches!(
            DocxPackage::from_bytes(b""),
            Err(ResumeTailorError::UnreadableDocument(_))
        ));
        assert!(matches!(
            DocxPackage::from_bytes(b"this is not a zip file"),
            Err(ResumeTailorError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn test_rejects_package_without_document() {
        let bytes = DocxPackage::from_parts(vec![("other.xml".to_string(), b"<x/>".to_vec())])
            .to_bytes()
            .unwrap();
        assert!(matches!(
            DocxPackage::from_bytes(&bytes),
            Err(ResumeTailorError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn test_set_part_replaces_in_place() {
        let mut package = sample();
        package.set_part(DOCUMENT_PART, b"<new/>".to_vec());
        package.set_part(STYLES_PART, b"<styles/>".to_vec());

        let names: Vec<&str> = package.part_names().collect();
        assert_eq!(names, vec!["[Content_Types].xml", DOCUMENT_PART, STYLES_PART]);
        assert_eq!(package.part(DOCUMENT_PART).unwrap(), b"<new/>");
    }
}
