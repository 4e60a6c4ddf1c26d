//! Discovery Config - 컴포넌트 발견 설정
//!
//! 글로벌(`<config dir>/aiexec/discovery.json`) → 프로젝트(`.aiexec/discovery.json`)
//! 순서로 병합하고, 마지막으로 `AIEXEC_COMPONENTS_PATH` 환경 변수를 적용한다.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// 설정 파일명
pub const DISCOVERY_CONFIG_FILE: &str = "discovery.json";

/// 빌트인 컴포넌트 경로를 덮어쓰는 환경 변수
pub const COMPONENTS_PATH_ENV: &str = "AIEXEC_COMPONENTS_PATH";

// ============================================================================
// DiscoveryConfig
// ============================================================================

/// 컴포넌트 발견 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryConfig {
    /// 빌트인 컴포넌트 디렉토리 (비어 있으면 번들 디렉토리 사용)
    #[serde(default)]
    pub builtin_paths: Vec<PathBuf>,

    /// 컴포넌트 유닛으로 인식할 확장자
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// 제외할 glob 패턴 (스캔 루트 기준 상대 경로에 매칭)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// 스캔 루트로부터의 최대 깊이 (root/<category>/<unit> = 2)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// 동시에 로드할 유닛 수 (열린 파일 핸들 수의 상한)
    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,

    /// 심볼릭 링크 추적
    #[serde(default)]
    pub follow_links: bool,

    /// 일시적 I/O 에러 재시도 정책
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            builtin_paths: Vec::new(),
            extensions: default_extensions(),
            exclude: Vec::new(),
            max_depth: default_max_depth(),
            max_concurrent_loads: default_max_concurrent_loads(),
            follow_links: false,
            retry: RetryConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경 변수 병합 로드
    ///
    /// 읽을 수 없거나 잘못된 레이어는 경고 후 건너뛰고 나머지 레이어는 유지한다.
    pub fn load() -> Result<Self> {
        let mut layers = Vec::new();
        if let Ok(global) = JsonStore::global() {
            layers.push(("global", global));
        }
        if let Ok(project) = JsonStore::current_project() {
            layers.push(("project", project));
        }

        let components_path = std::env::var_os(COMPONENTS_PATH_ENV);
        Self::load_layered(&layers, components_path.as_deref())
    }

    /// 주어진 저장소들을 순서대로 병합한 뒤 `AIEXEC_COMPONENTS_PATH` 값을 적용
    pub fn load_layered(
        layers: &[(&str, JsonStore)],
        components_path: Option<&OsStr>,
    ) -> Result<Self> {
        let mut config = Self::new();

        for (layer, store) in layers {
            config.merge_layer(layer, store);
        }

        if let Some(value) = components_path {
            config.apply_components_path(value);
        }

        config.validate()?;
        Ok(config)
    }

    fn merge_layer(&mut self, layer: &str, store: &JsonStore) {
        let path = store.file_path(DISCOVERY_CONFIG_FILE);

        let overlay = match store.load_optional::<DiscoveryConfigFile>(DISCOVERY_CONFIG_FILE) {
            Ok(Some(overlay)) => overlay,
            Ok(None) => return,
            Err(e) => {
                warn!("Skipping {} discovery config: {}", layer, e);
                return;
            }
        };

        let mut candidate = self.clone();
        candidate.merge(overlay);
        match candidate.validate() {
            Ok(()) => {
                debug!("Loaded {} discovery config from {}", layer, path.display());
                *self = candidate;
            }
            Err(e) => warn!(
                "Skipping {} discovery config {}: {}",
                layer,
                path.display(),
                e
            ),
        }
    }

    /// 단일 파일에서 로드 (레이어 병합 없음)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let overlay: DiscoveryConfigFile = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        let mut config = Self::new();
        config.merge(overlay);
        config.validate()?;
        Ok(config)
    }

    /// 부분 설정 병합 (지정된 필드만 덮어씀)
    pub fn merge(&mut self, other: DiscoveryConfigFile) {
        if let Some(paths) = other.builtin_paths {
            self.builtin_paths = paths;
        }
        if let Some(extensions) = other.extensions {
            self.extensions = extensions;
        }
        if let Some(exclude) = other.exclude {
            self.exclude = exclude;
        }
        if let Some(depth) = other.max_depth {
            self.max_depth = depth;
        }
        if let Some(loads) = other.max_concurrent_loads {
            self.max_concurrent_loads = loads;
        }
        if let Some(follow) = other.follow_links {
            self.follow_links = follow;
        }
        if let Some(retry) = other.retry {
            self.retry = retry;
        }
    }

    /// `AIEXEC_COMPONENTS_PATH` 형식의 경로 목록 적용 (플랫폼 구분자)
    pub fn apply_components_path(&mut self, value: &OsStr) {
        let paths: Vec<PathBuf> = std::env::split_paths(value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !paths.is_empty() {
            self.builtin_paths = paths;
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        for (index, path) in self.builtin_paths.iter().enumerate() {
            if path.as_os_str().is_empty() {
                return Err(Error::empty_path(index));
            }
        }
        if self.max_concurrent_loads == 0 {
            return Err(Error::Config(
                "maxConcurrentLoads must be at least 1".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(Error::Config(
                "extensions must list at least one component file extension".to_string(),
            ));
        }
        for pattern in &self.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::Config(format!("Invalid exclude pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_builtin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.builtin_paths.push(path.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_concurrent_loads(mut self, loads: usize) -> Self {
        self.max_concurrent_loads = loads;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// 설정 파일 오버레이 (모든 필드 선택적)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builtin_paths: Option<Vec<PathBuf>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_loads: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_links: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

// ============================================================================
// RetryConfig
// ============================================================================

/// 일시적 I/O 에러(파일 핸들 고갈 등) 재시도 설정
///
/// `max_retries = 0`이면 재시도 없이 best-effort로 동작한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// 최대 재시도 횟수
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 초기 대기 시간 (밀리초)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// 최대 대기 시간 (밀리초)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// 백오프 배수
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// 재시도 없음
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// n번째 재시도의 대기 시간 계산
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32))
            as u64;
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_extensions() -> Vec<String> {
    ["json", "yaml", "yml", "toml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_depth() -> usize {
    2
}

fn default_max_concurrent_loads() -> usize {
    16
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    25
}

fn default_max_delay_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}
