//! Content access: plain text out of the formats found in a resume folder.

use crate::models::Extension;
use std::fs;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

const MAX_TEXT_BYTES: usize = 4 * 1024 * 1024;
const MIN_PRINTABLE_RUN: usize = 4;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("xml error: {0}")]
    Xml(String),
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("support for .{0} is not compiled in")]
    FeatureDisabled(&'static str),
    #[error("no text extracted")]
    Empty,
}

/// Seam between the orchestrator and the document-parsing libraries.
pub trait ContentAccessor: Send + Sync {
    fn load(&self, path: &Path, extension: Extension) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone)]
pub struct FsContentAccessor {
    max_text_bytes: usize,
}

impl Default for FsContentAccessor {
    fn default() -> Self {
        Self {
            max_text_bytes: MAX_TEXT_BYTES,
        }
    }
}

impl FsContentAccessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentAccessor for FsContentAccessor {
    fn load(&self, path: &Path, extension: Extension) -> Result<String, ExtractError> {
        let text = match extension {
            Extension::Pdf => pdf_text(path)?,
            Extension::Docx => office::docx_text(path)?,
            Extension::Pptx => office::pptx_text(path)?,
            Extension::Doc => legacy_doc_text(path)?,
            Extension::Txt => read_text(path, self.max_text_bytes)?,
            Extension::Other => {
                let ext = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_else(|| "(none)".to_string());
                return Err(ExtractError::Unsupported(ext));
            }
        };
        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}

fn read_text(path: &Path, max_bytes: usize) -> Result<String, ExtractError> {
    let file = fs::File::open(path)?;
    let mut buf = Vec::new();
    file.take(max_bytes as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Legacy Word binaries: keep runs of printable ASCII long enough to be words.
fn legacy_doc_text(path: &Path) -> Result<String, ExtractError> {
    let raw = fs::read(path)?;
    Ok(printable_runs(&raw, MIN_PRINTABLE_RUN))
}

pub(crate) fn printable_runs(raw: &[u8], min_run: usize) -> String {
    let mut out = String::new();
    let mut run = String::new();
    let flush = |run: &mut String, out: &mut String| {
        let trimmed = run.trim();
        if trimmed.len() >= min_run {
            out.push_str(trimmed);
            out.push('\n');
        }
        run.clear();
    };
    for &b in raw {
        if (0x20..0x7f).contains(&b) {
            run.push(b as char);
        } else {
            flush(&mut run, &mut out);
        }
    }
    flush(&mut run, &mut out);
    out
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> Result<String, ExtractError> {
    pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(format!("{e:?}")))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_path: &Path) -> Result<String, ExtractError> {
    Err(ExtractError::FeatureDisabled("pdf"))
}

#[cfg(feature = "office")]
mod office {
    use super::ExtractError;
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;
    use zip::ZipArchive;

    pub(super) fn docx_text(path: &Path) -> Result<String, ExtractError> {
        let mut archive = open(path)?;
        let xml = read_part(&mut archive, "word/document.xml")?;
        super::xml_text(&xml)
    }

    /// Slides in numeric order, one block of text per slide.
    pub(super) fn pptx_text(path: &Path) -> Result<String, ExtractError> {
        let mut archive = open(path)?;
        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|n| slide_number(n).map(|i| (i, n.to_string())))
            .collect();
        slides.sort();
        let mut out = String::new();
        for (_, name) in slides {
            let xml = read_part(&mut archive, &name)?;
            out.push_str(&super::xml_text(&xml)?);
            out.push('\n');
        }
        Ok(out)
    }

    fn slide_number(name: &str) -> Option<u32> {
        name.strip_prefix("ppt/slides/slide")?
            .strip_suffix(".xml")?
            .parse()
            .ok()
    }

    fn open(path: &Path) -> Result<ZipArchive<File>, ExtractError> {
        let file = File::open(path)?;
        ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))
    }

    fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<String, ExtractError> {
        let mut part = archive
            .by_name(name)
            .map_err(|e| ExtractError::Archive(format!("{name}: {e}")))?;
        let mut xml = String::new();
        part.read_to_string(&mut xml)?;
        Ok(xml)
    }
}

#[cfg(not(feature = "office"))]
mod office {
    use super::ExtractError;
    use std::path::Path;

    pub(super) fn docx_text(_path: &Path) -> Result<String, ExtractError> {
        Err(ExtractError::FeatureDisabled("docx"))
    }

    pub(super) fn pptx_text(_path: &Path) -> Result<String, ExtractError> {
        Err(ExtractError::FeatureDisabled("pptx"))
    }
}

/// Text runs (`w:t`, `a:t`) of an Office XML part. Paragraph ends and
/// explicit breaks become newlines, tabs become tabs.
#[cfg_attr(not(feature = "office"), allow(dead_code))]
pub(crate) fn xml_text(xml: &str) -> Result<String, ExtractError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"br" | b"p" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Xml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_text_keeps_runs_and_paragraphs() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Jane</w:t></w:r><w:r><w:t xml:space="preserve"> Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t>R&amp;D Experience</w:t><w:tab/><w:t>2020</w:t></w:r></w:p>
            <w:p><w:r><w:instrText>IGNORED</w:instrText></w:r></w:p>
        </w:body></w:document>"#;
        let text = xml_text(xml).unwrap();
        assert_eq!(text, "Jane Doe\nR&D Experience\t2020\n\n");
    }

    #[test]
    fn drawingml_runs_are_read() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>Agenda</a:t></a:r><a:br/><a:r><a:t>Roadmap</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(xml_text(xml).unwrap(), "Agenda\nRoadmap\n");
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(matches!(xml_text("<a:t>open</a:x>"), Err(ExtractError::Xml(_))));
    }

    #[test]
    fn printable_runs_drop_binary_noise() {
        let mut raw = vec![0u8, 1, 2];
        raw.extend_from_slice(b"Jane Doe Resume");
        raw.extend_from_slice(&[0xd0, 0xcf, 0x11]);
        raw.extend_from_slice(b"ab");
        raw.push(0);
        raw.extend_from_slice(b"  Experience  ");
        assert_eq!(printable_runs(&raw, 4), "Jane Doe Resume\nExperience\n");
    }

    #[test]
    fn unsupported_and_empty_files_are_errors() {
        let temp = tempfile::tempdir().unwrap();
        let sheet = temp.path().join("tracker.xlsx");
        std::fs::write(&sheet, b"PK").unwrap();
        let accessor = FsContentAccessor::new();
        assert!(matches!(
            accessor.load(&sheet, Extension::Other),
            Err(ExtractError::Unsupported(ext)) if ext == ".xlsx"
        ));

        let blank = temp.path().join("blank.txt");
        std::fs::write(&blank, " \n ").unwrap();
        assert!(matches!(
            accessor.load(&blank, Extension::Txt),
            Err(ExtractError::Empty)
        ));

        let missing = temp.path().join("gone.txt");
        assert!(matches!(
            accessor.load(&missing, Extension::Txt),
            Err(ExtractError::Io(_))
        ));
    }

    #[test]
    fn text_files_are_read_lossily() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, b"Jane Doe \xff resume").unwrap();
        let text = FsContentAccessor::new().load(&path, Extension::Txt).unwrap();
        assert!(text.starts_with("Jane Doe "));
        assert!(text.ends_with(" resume"));
    }
}
