use axum::extract::Multipart;

/// Fields of the upload form, checked before any analysis starts.
#[derive(Debug)]
pub struct AnalyzePayload {
    pub goal: String,
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl AnalyzePayload {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, String> {
        let mut goal = None;
        let mut file = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
            let name = field.name().map(|name| name.to_string());
            match name.as_deref() {
                Some("goal") => {
                    goal = Some(field.text().await.map_err(|e| e.to_string())?);
                }
                Some("file") => {
                    let filename = field.file_name().map(|name| name.to_string());
                    let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                    file = Some((filename, bytes.to_vec()));
                }
                _ => {}
            }
        }

        let goal = goal
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .ok_or_else(|| "goal is required".to_string())?;

        let (filename, bytes) = file
            .filter(|(_, bytes)| !bytes.is_empty())
            .ok_or_else(|| "a PDF file is required".to_string())?;

        Ok(Self {
            goal,
            filename,
            bytes,
        })
    }
}
