//! Module Loader - 컴포넌트 유닛 열거 및 로드
//!
//! 유닛(unit)은 하나 이상의 컴포넌트를 정의하는 파일이다.
//! 각 유닛은 독립적으로 로드되며, 한 유닛의 실패는 기록만 되고
//! 같은 디렉토리나 다른 디렉토리의 나머지 유닛에 영향을 주지 않는다.
//!
//! ## 유닛 문서 형태
//!
//! ```text
//! { "name": "Agent", "display_name": "Agent", ... }        단일 컴포넌트
//! [ { "name": "A", ... }, { "name": "B", ... } ]           배열
//! { "components": [ { "name": "A", ... }, ... ] }          components 키
//! ```

use super::error::{LoadError, LoadFailure};
use super::retry::with_retry;
use aiexec_foundation::DiscoveryConfig;
use futures::future::join_all;
use ignore::WalkBuilder;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

// ============================================================================
// ComponentDefinition - 로드된 원시 정의
// ============================================================================

/// 유닛에서 읽어낸 컴포넌트 정의 (검증 전)
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    /// 정의 필드 전체
    pub fields: Map<String, Value>,

    /// `name` 필드가 없을 때 쓸 이름 (단일 컴포넌트 유닛의 파일 stem)
    pub fallback_name: Option<String>,
}

impl ComponentDefinition {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            fallback_name: None,
        }
    }

    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = Some(name.into());
        self
    }
}

// ============================================================================
// ComponentLoader - 로더 추상화
// ============================================================================

/// 유닛 하나를 로드하는 로더
///
/// `load`는 blocking pool에서 호출된다. 유닛 사이에 공유 가변 상태가 없어야 한다.
pub trait ComponentLoader: Send + Sync {
    /// 이 로더가 처리할 수 있는 파일인지
    fn supports(&self, path: &Path) -> bool;

    /// 유닛 로드
    fn load(&self, path: &Path) -> Result<Vec<ComponentDefinition>, LoadError>;
}

/// JSON / YAML / TOML 파일 로더
#[derive(Debug, Clone)]
pub struct FileComponentLoader {
    extensions: Vec<String>,
}

impl FileComponentLoader {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.extensions.clone())
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// 확장자에 맞는 파서로 문서를 JSON Value로 변환
    fn parse_document(path: &Path, content: &str) -> Result<Value, LoadError> {
        match Self::extension(path).as_deref() {
            Some("json") => serde_json::from_str(content).map_err(|e| LoadError::parse("json", e)),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(content).map_err(|e| LoadError::parse("yaml", e))
            }
            Some("toml") => toml::from_str(content).map_err(|e| LoadError::parse("toml", e)),
            Some(other) => Err(LoadError::Unsupported(format!("extension '.{}'", other))),
            None => Err(LoadError::Unsupported("file has no extension".to_string())),
        }
    }
}

impl Default for FileComponentLoader {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}

impl ComponentLoader for FileComponentLoader {
    fn supports(&self, path: &Path) -> bool {
        Self::extension(path).map_or(false, |ext| self.extensions.contains(&ext))
    }

    fn load(&self, path: &Path) -> Result<Vec<ComponentDefinition>, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::parse_document(path, &content)?;
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        split_document(document, stem)
    }
}

/// 문서를 컴포넌트 정의 목록으로 분해
fn split_document(document: Value, stem: Option<String>) -> Result<Vec<ComponentDefinition>, LoadError> {
    match document {
        Value::Object(mut map) => match map.remove("components") {
            Some(Value::Array(items)) if map.is_empty() => collect_entries(items),
            Some(other) => {
                // components 키가 목록이 아니면 평범한 필드로 취급
                map.insert("components".to_string(), other);
                Ok(vec![single(map, stem)])
            }
            None => Ok(vec![single(map, stem)]),
        },
        Value::Array(items) => collect_entries(items),
        other => Err(LoadError::invalid(format!(
            "expected an object or a list of objects, found {}",
            value_kind(&other)
        ))),
    }
}

fn single(fields: Map<String, Value>, stem: Option<String>) -> ComponentDefinition {
    let definition = ComponentDefinition::new(fields);
    match stem {
        Some(stem) => definition.with_fallback_name(stem),
        None => definition,
    }
}

fn collect_entries(items: Vec<Value>) -> Result<Vec<ComponentDefinition>, LoadError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(fields) => Ok(ComponentDefinition::new(fields)),
            other => Err(LoadError::invalid(format!(
                "entry #{} is {}, expected an object",
                i,
                value_kind(&other)
            ))),
        })
        .collect()
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// SourceUnit - 열거된 유닛
// ============================================================================

/// 스캔 루트 아래에서 발견된 유닛
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// 유닛 파일 경로
    pub path: PathBuf,

    /// 유닛이 속한 루트 바로 아래 디렉토리 이름 (카테고리 기본값)
    pub folder: Option<String>,
}

impl SourceUnit {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let folder = path.strip_prefix(root).ok().and_then(|relative| {
            let mut components = relative.components();
            let first = components.next()?;
            // 루트 바로 아래 파일이면 폴더 없음
            components.next()?;
            Some(first.as_os_str().to_string_lossy().into_owned())
        });

        Self { path, folder }
    }
}

/// 루트 하나를 순회하여 유닛 목록 생성 (blocking)
///
/// 파일 이름 순으로 정렬된 안정적인 순회 순서를 보장한다.
pub fn enumerate_units(
    root: &Path,
    config: &DiscoveryConfig,
    loader: &dyn ComponentLoader,
    excludes: &[glob::Pattern],
) -> (Vec<SourceUnit>, Vec<LoadFailure>) {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .follow_links(config.follow_links)
        .max_depth(Some(config.max_depth))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut units = Vec::new();
    let mut failures = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk component directory {:?}: {}", root, e);
                failures.push(LoadFailure::new(root, LoadError::Walk(e.to_string())));
                continue;
            }
        };

        if !entry.file_type().map_or(false, |ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();

        // 파일을 루트로 직접 지정한 경우 `_` 규칙과 exclude는 적용하지 않음
        if entry.depth() == 0 {
            if loader.supports(path) {
                units.push(SourceUnit::new(root, path.to_path_buf()));
            } else {
                debug!("Component root {:?} is not a supported unit file", path);
            }
            continue;
        }

        if is_private(path) || !loader.supports(path) || is_excluded(root, path, excludes) {
            debug!("Skipping non-component file {:?}", path);
            continue;
        }

        units.push(SourceUnit::new(root, path.to_path_buf()));
    }

    (units, failures)
}

/// `_`로 시작하는 파일 (`__init__.json` 등)
fn is_private(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |n| n.to_string_lossy().starts_with('_'))
}

fn is_excluded(root: &Path, path: &Path, excludes: &[glob::Pattern]) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative = relative.to_string_lossy().replace('\\', "/");
    excludes.iter().any(|p| p.matches(&relative))
}

// ============================================================================
// 병렬 로드
// ============================================================================

/// 로드 결과 (유닛 단위)
#[derive(Debug)]
pub struct LoadedUnit {
    pub unit: SourceUnit,
    pub result: Result<Vec<ComponentDefinition>, LoadError>,
}

/// 유닛들을 병렬 로드
///
/// 각 유닛은 blocking pool에서 읽고 파싱하며, 세마포어로 동시 로드 수를 제한한다.
/// 결과 순서는 입력 순서와 같다.
pub async fn load_units(
    loader: Arc<dyn ComponentLoader>,
    units: Vec<SourceUnit>,
    config: &DiscoveryConfig,
) -> Vec<LoadedUnit> {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_loads.max(1)));

    let futures: Vec<_> = units
        .into_iter()
        .map(|unit| {
            let sem = Arc::clone(&semaphore);
            let loader = Arc::clone(&loader);
            let retry = config.retry.clone();

            async move {
                // 세마포어 획득
                let _permit = sem.acquire_owned().await.ok();

                let result = with_retry(&retry, &unit.path, || {
                    let loader = Arc::clone(&loader);
                    let path = unit.path.clone();
                    async move {
                        match tokio::task::spawn_blocking(move || loader.load(&path)).await {
                            Ok(result) => result,
                            Err(e) => Err(LoadError::Panicked(e.to_string())),
                        }
                    }
                })
                .await;

                LoadedUnit { unit, result }
            }
        })
        .collect();

    join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_split_single_object() {
        let defs = split_document(json!({ "name": "Agent" }), Some("agent".into())).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].fallback_name.as_deref(), Some("agent"));
    }

    #[test]
    fn test_split_components_key() {
        let doc = json!({ "components": [ { "name": "A" }, { "name": "B" } ] });
        let defs = split_document(doc, Some("multi".into())).unwrap();
        assert_eq!(defs.len(), 2);
        assert!(defs.iter().all(|d| d.fallback_name.is_none()));
    }

    #[test]
    fn test_split_components_with_extra_fields_is_single() {
        let doc = json!({ "name": "Bundle", "components": [ { "name": "A" } ] });
        let defs = split_document(doc, Some("bundle".into())).unwrap();
        assert_eq!(defs.len(), 1);
        assert!(defs[0].fields.contains_key("components"));
    }

    #[test]
    fn test_split_rejects_scalars() {
        assert!(matches!(split_document(json!(42), None), Err(LoadError::Invalid(_))));
        assert!(matches!(
            split_document(json!([{ "name": "A" }, "oops"]), None),
            Err(LoadError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_each_format() {
        let temp = TempDir::new().unwrap();
        let loader = FileComponentLoader::default();

        let json_path = temp.path().join("a.json");
        write(&json_path, r#"{ "display_name": "A" }"#);
        let yaml_path = temp.path().join("b.yaml");
        write(&yaml_path, "display_name: B\ntype: B\n");
        let toml_path = temp.path().join("c.toml");
        write(&toml_path, "display_name = \"C\"\n[template.x]\ntype = \"str\"\n");

        for path in [&json_path, &yaml_path, &toml_path] {
            let defs = loader.load(path).unwrap();
            assert_eq!(defs.len(), 1);
            assert!(defs[0].fields.contains_key("display_name"));
        }
    }

    #[test]
    fn test_load_syntax_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        write(&path, r#"{ "display_name": "#);

        let err = FileComponentLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { format: "json", .. }));
    }

    #[test]
    fn test_supports_extension_case_insensitive() {
        let loader = FileComponentLoader::new(vec![".JSON".into()]);
        assert!(loader.supports(Path::new("x/agent.Json")));
        assert!(!loader.supports(Path::new("x/agent.py")));
        assert!(!loader.supports(Path::new("x/README")));
    }

    #[test]
    fn test_source_unit_folder() {
        let root = Path::new("/c");
        assert_eq!(
            SourceUnit::new(root, PathBuf::from("/c/agents/agent.json")).folder.as_deref(),
            Some("agents")
        );
        assert_eq!(SourceUnit::new(root, PathBuf::from("/c/agent.json")).folder, None);
        assert_eq!(SourceUnit::new(Path::new("/c/agent.json"), PathBuf::from("/c/agent.json")).folder, None);
    }

    #[test]
    fn test_enumerate_units_filters_and_orders() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(&root.join("tools/b.json"), "{}");
        write(&root.join("tools/a.yaml"), "{}");
        write(&root.join("tools/__init__.json"), "{}");
        write(&root.join("tools/.hidden.json"), "{}");
        write(&root.join("tools/notes.md"), "# notes");
        write(&root.join("drafts/wip.json"), "{}");
        write(&root.join("deep/one/two/three.json"), "{}");
        write(&root.join("top.toml"), "");

        let config = DiscoveryConfig::default();
        let excludes = vec![glob::Pattern::new("drafts/*").unwrap()];
        let loader = FileComponentLoader::default();

        let (units, failures) = enumerate_units(root, &config, &loader, &excludes);
        assert!(failures.is_empty());

        let names: Vec<String> = units
            .iter()
            .map(|u| u.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["tools/a.yaml", "tools/b.json", "top.toml"]);
    }

    #[test]
    fn test_enumerate_units_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("_draft.json");
        write(&file, r#"{ "name": "Draft" }"#);
        let notes = temp.path().join("notes.md");
        write(&notes, "# notes");

        let config = DiscoveryConfig::default();
        let excludes = vec![glob::Pattern::new("*").unwrap()];
        let loader = FileComponentLoader::default();

        let (units, failures) = enumerate_units(&file, &config, &loader, &excludes);
        assert!(failures.is_empty());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, file);
        assert!(units[0].folder.is_none());

        let (units, _) = enumerate_units(&notes, &config, &loader, &excludes);
        assert!(units.is_empty());
    }

    struct FlakyLoader;

    impl ComponentLoader for FlakyLoader {
        fn supports(&self, _path: &Path) -> bool {
            true
        }

        fn load(&self, path: &Path) -> Result<Vec<ComponentDefinition>, LoadError> {
            if path.ends_with("panic.json") {
                panic!("loader bug");
            }
            Ok(vec![ComponentDefinition::new(Map::new())])
        }
    }

    #[tokio::test]
    async fn test_load_units_isolates_panics() {
        let units = vec![
            SourceUnit::new(Path::new("/c"), PathBuf::from("/c/x/ok.json")),
            SourceUnit::new(Path::new("/c"), PathBuf::from("/c/x/panic.json")),
            SourceUnit::new(Path::new("/c"), PathBuf::from("/c/x/ok2.json")),
        ];

        let loaded = load_units(Arc::new(FlakyLoader), units, &DiscoveryConfig::default()).await;

        assert_eq!(loaded.len(), 3);
        assert!(loaded[0].result.is_ok());
        assert!(matches!(loaded[1].result, Err(LoadError::Panicked(_))));
        assert!(loaded[2].result.is_ok());
    }
}
