use crate::error::AnalysisError;
use crate::models::Document;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// An uploaded document parked in a temporary `.pdf` file. The file is
/// deleted when this value is dropped, whichever way the analysis ended.
pub struct TransientDocument {
    file: NamedTempFile,
    filename: Option<String>,
}

impl TransientDocument {
    pub fn materialize(
        bytes: &[u8],
        filename: Option<String>,
        dir: Option<&Path>,
    ) -> Result<Self, AnalysisError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("advisor-").suffix(".pdf");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| AnalysisError::Configuration(format!("cannot create temporary file: {}", e)))?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| AnalysisError::Configuration(format!("cannot write temporary file: {}", e)))?;

        log::debug!("Stored {} bytes in {}", bytes.len(), file.path().display());
        Ok(Self { file, filename })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> Result<Document, AnalysisError> {
        let document = Document::from_path(self.path())?;
        Ok(match &self.filename {
            Some(name) => document.with_filename(name.clone()),
            None => document,
        })
    }
}
