use crate::domain::ports::FileSource;
use crate::utils::error::{DirectoryError, Result};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
    name: String,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl FileSource for PathSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DirectoryError::ImportReadError {
                source_name: self.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Already-loaded file contents.
#[derive(Debug, Clone)]
pub struct TextSource {
    name: String,
    text: String,
}

impl TextSource {
    pub fn new(name: &str, text: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl FileSource for TextSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}
