//! Document decode/encode — the file-format collaborators of the pipeline.
//!
//! The pipeline only sees the `DocumentDecoder` trait; `FileDecoder` is the
//! production implementation (pdf-extract for PDF, docx-rs for DOCX).

use std::io::Cursor;

use docx_rs::{DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// DOCX MIME type used for generated downloads.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME: &str = "application/pdf";

/// Declared format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Infers the format from a filename extension. `None` for anything
    /// other than `.pdf` / `.docx`.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocumentFormat::Pdf)
        } else if lower.ends_with(".docx") {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => PDF_MIME,
            DocumentFormat::Docx => DOCX_MIME,
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to decode {format:?} document: {reason}")]
    Decode {
        format: DocumentFormat,
        reason: String,
    },

    #[error("failed to encode document: {0}")]
    Encode(String),
}

/// Extracts plain text from raw document bytes.
pub trait DocumentDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], format: DocumentFormat) -> Result<String, DocumentError>;
}

/// Production decoder backed by pdf-extract and docx-rs.
pub struct FileDecoder;

impl DocumentDecoder for FileDecoder {
    fn decode(&self, bytes: &[u8], format: DocumentFormat) -> Result<String, DocumentError> {
        match format {
            DocumentFormat::Pdf => {
                pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Decode {
                    format,
                    reason: e.to_string(),
                })
            }
            DocumentFormat::Docx => docx_to_text(bytes).map_err(|reason| DocumentError::Decode {
                format,
                reason,
            }),
        }
    }
}

/// Flattens a DOCX body into newline-joined paragraph text.
fn docx_to_text(bytes: &[u8]) -> Result<String, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| e.to_string())?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            let mut line = String::new();
            for pc in &para.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            line.push_str(&t.text);
                        }
                    }
                }
            }
            lines.push(line);
        }
    }

    Ok(lines.join("\n"))
}

/// Encodes plain text into a downloadable DOCX byte stream, one paragraph
/// per input line. Used to synthesize the resume / cover-letter downloads.
pub fn text_to_docx(text: &str) -> Result<Vec<u8>, DocumentError> {
    let mut docx = Docx::new();
    for line in text.lines() {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| DocumentError::Encode(e.to_string()))?;

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(
            DocumentFormat::from_filename("resume.pdf"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_filename("Resume.DOCX"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_filename("resume.txt"), None);
        assert_eq!(DocumentFormat::from_filename("resume"), None);
    }

    #[test]
    fn test_text_to_docx_produces_zip_container() {
        let bytes = text_to_docx("Summary\n- Shipped things\n\nSkills: Rust").unwrap();
        // DOCX is a ZIP archive: PK magic
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_docx_round_trip_preserves_text() {
        let original = "Jane Doe\nSenior Engineer at Initech, 2019-2024\nSkills: Rust, Kubernetes";
        let bytes = text_to_docx(original).unwrap();

        let decoded = FileDecoder
            .decode(&bytes, DocumentFormat::Docx)
            .expect("decode of own encoder output");
        assert!(decoded.contains("Initech"));
        assert!(decoded.contains("Kubernetes"));
    }

    #[test]
    fn test_decode_garbage_pdf_is_an_error() {
        let result = FileDecoder.decode(b"not a pdf at all", DocumentFormat::Pdf);
        assert!(result.is_err());
    }
}
