// Serializes a painted document and hands it to a sink.

use crate::error::{QuoteError, QuoteResult};
use printpdf::PdfDocumentReference;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Characters that would break out of, or be rejected by, a file name.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// A finished, named binary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Destination for finished artifacts. `emit` is the save/download step.
pub trait ArtifactSink {
    fn emit(&mut self, artifact: &Artifact) -> QuoteResult<PathBuf>;
}

/// Writes artifacts into a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn emit(&mut self, artifact: &Artifact) -> QuoteResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.file_name);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&artifact.bytes)?;
        writer.flush()?;
        Ok(path)
    }
}

/// Makes a client name safe to embed in a file name.
pub fn sanitize_client_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    if cleaned.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "client".to_string()
    } else {
        cleaned
    }
}

/// `<prefix>_<client>.pdf`
pub fn artifact_file_name(prefix: &str, client_name: &str) -> String {
    format!("{}_{}.pdf", prefix, sanitize_client_name(client_name))
}

#[derive(Debug, Clone)]
pub struct DocumentExporter {
    prefix: String,
}

impl DocumentExporter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn serialize(
        &self,
        document: PdfDocumentReference,
        client_name: &str,
    ) -> QuoteResult<Artifact> {
        let bytes = document
            .save_to_bytes()
            .map_err(|e| QuoteError::Pdf(e.to_string()))?;
        Ok(Artifact {
            file_name: artifact_file_name(&self.prefix, client_name),
            bytes,
        })
    }

    /// Serializes and emits once. No retries.
    pub fn export(
        &self,
        document: PdfDocumentReference,
        client_name: &str,
        sink: &mut dyn ArtifactSink,
    ) -> QuoteResult<(Artifact, PathBuf)> {
        let artifact = self.serialize(document, client_name)?;
        let path = sink.emit(&artifact)?;
        info!(
            file = %artifact.file_name,
            bytes = artifact.bytes.len(),
            "quotation exported"
        );
        Ok((artifact, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printpdf::{Mm, PdfDocument};

    #[derive(Default)]
    struct Recorder {
        emitted: Vec<String>,
    }

    impl ArtifactSink for Recorder {
        fn emit(&mut self, artifact: &Artifact) -> QuoteResult<PathBuf> {
            self.emitted.push(artifact.file_name.clone());
            Ok(PathBuf::from(&artifact.file_name))
        }
    }

    fn blank_document() -> PdfDocumentReference {
        let (doc, _, _) = PdfDocument::new("Quotation", Mm(210.0), Mm(297.0), "Layer 1");
        doc
    }

    #[test]
    fn file_name_keeps_client_name() {
        assert_eq!(
            artifact_file_name("Quotation", "Jane Doe"),
            "Quotation_Jane Doe.pdf"
        );
    }

    #[test]
    fn path_separators_are_replaced() {
        assert_eq!(sanitize_client_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_client_name("A\\B:C"), "A_B_C");
        assert!(!artifact_file_name("Quotation", "x/y").contains('/'));
    }

    #[test]
    fn blank_names_fall_back() {
        assert_eq!(sanitize_client_name("   "), "client");
        assert_eq!(sanitize_client_name("//"), "client");
    }

    #[test]
    fn export_emits_exactly_once() {
        let mut sink = Recorder::default();
        let exporter = DocumentExporter::new("Quotation");
        let (artifact, path) = exporter
            .export(blank_document(), "Jane Doe", &mut sink)
            .unwrap();
        assert_eq!(sink.emitted, vec!["Quotation_Jane Doe.pdf".to_string()]);
        assert_eq!(path, PathBuf::from("Quotation_Jane Doe.pdf"));
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn directory_sink_writes_file() {
        let dir = Path::new("tests/output/export-unit");
        let mut sink = DirectorySink::new(dir);
        let artifact = Artifact {
            file_name: "Quotation_Unit.pdf".to_string(),
            bytes: b"%PDF-1.3 test".to_vec(),
        };
        let path = sink.emit(&artifact).unwrap();
        assert_eq!(sink.dir(), dir);
        assert_eq!(path, sink.dir().join("Quotation_Unit.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
        std::fs::remove_file(path).ok();
    }
}
