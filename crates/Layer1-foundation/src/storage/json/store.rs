//! JSON 파일 저장소

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// 프로젝트/글로벌 설정 디렉토리 이름
pub const CONFIG_DIR_NAME: &str = "aiexec";

/// JSON 설정 저장소
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (<config dir>/aiexec/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join(CONFIG_DIR_NAME);
        Ok(Self::new(dir))
    }

    /// 프로젝트 설정 (.aiexec/)
    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(format!(".{}", CONFIG_DIR_NAME)))
    }

    /// 현재 디렉토리 프로젝트 설정
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// JSON 로드 (Optional) - 파일이 없으면 `None`
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sample {
        name: String,
        depth: usize,
    }

    #[test]
    fn test_load_optional() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("sample.json"),
            r#"{ "name": "agents", "depth": 2 }"#,
        )
        .unwrap();
        let store = JsonStore::new(temp.path());

        let loaded: Option<Sample> = store.load_optional("sample.json").unwrap();
        assert_eq!(
            loaded,
            Some(Sample {
                name: "agents".into(),
                depth: 2
            })
        );
    }

    #[test]
    fn test_load_optional_missing() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());

        let loaded: Option<Sample> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        let store = JsonStore::new(temp.path());

        let err = store.load_optional::<Sample>("broken.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_project_dir_name() {
        let store = JsonStore::project("/work");
        assert_eq!(
            store.file_path("discovery.json"),
            Path::new("/work/.aiexec/discovery.json")
        );
    }
}
