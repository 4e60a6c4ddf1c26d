//! Component Discovery - 빌트인/커스텀 컴포넌트 발견과 캐시
//!
//! ```text
//! paths ──▶ validate_paths ──▶ resolve ──▶ enumerate_units ──▶ load_units
//!                                                                  │
//!            Arc<Registry> ◀── ScanCache ◀── CategoryAggregator ◀── extract_all
//! ```
//!
//! 빌트인과 커스텀은 스캔 대상 디렉토리와 캐시 버킷만 다르다.
//! 두 결과는 절대 병합하지 않는다 (`Registry::merged` 참고).

use super::cache::{CacheKey, CacheStats, ScanCache};
use super::descriptor::extract_all;
use super::error::{LoadError, LoadFailure};
use super::loader::{enumerate_units, load_units, ComponentLoader, FileComponentLoader, SourceUnit};
use super::path::{resolve, validate_paths, ScanPlan};
use super::registry::{BuiltinComponents, CategoryAggregator, Registry};
use aiexec_foundation::{DiscoveryConfig, Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 크레이트에 번들된 빌트인 컴포넌트 디렉토리
pub const BUNDLED_COMPONENTS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/components");

// ============================================================================
// ScanReport
// ============================================================================

/// 캐시를 거치지 않은 스캔의 전체 진단 정보
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// 발견된 컴포넌트
    pub registry: Registry,

    /// 유닛별 로드 실패 (Registry에서 제외됨)
    pub failures: Vec<LoadFailure>,

    /// 존재하지 않는 스캔 루트
    pub missing_paths: Vec<PathBuf>,

    /// 로드를 시도한 유닛 수
    pub units_scanned: usize,

    /// 카테고리/이름 충돌 수
    pub collisions: usize,

    pub elapsed: Duration,
    pub scanned_at: DateTime<Utc>,
}

impl ScanReport {
    fn empty() -> Self {
        Self {
            registry: Registry::new(),
            failures: Vec::new(),
            missing_paths: Vec::new(),
            units_scanned: 0,
            collisions: 0,
            elapsed: Duration::ZERO,
            scanned_at: Utc::now(),
        }
    }

    /// 실패와 충돌이 없는지
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.collisions == 0
    }

    /// 한 줄 요약
    pub fn summary(&self) -> String {
        format!(
            "{} components in {} categories from {} units ({} failed, {} collisions, {} missing paths) in {}ms",
            self.registry.len(),
            self.registry.category_count(),
            self.units_scanned,
            self.failures.len(),
            self.collisions,
            self.missing_paths.len(),
            self.elapsed.as_millis()
        )
    }
}

// ============================================================================
// ComponentDiscovery
// ============================================================================

static GLOBAL_DISCOVERY: OnceLock<ComponentDiscovery> = OnceLock::new();

/// 컴포넌트 발견 엔진
///
/// 재진입 가능하며 여러 태스크에서 동시에 호출해도 안전하다.
pub struct ComponentDiscovery {
    config: DiscoveryConfig,
    loader: Arc<dyn ComponentLoader>,
    excludes: Vec<glob::Pattern>,
    cache: ScanCache,
}

impl std::fmt::Debug for ComponentDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDiscovery")
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .finish()
    }
}

impl ComponentDiscovery {
    /// 기본 파일 로더로 생성
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        let loader = Arc::new(FileComponentLoader::from_config(&config));
        Self::with_loader(config, loader)
    }

    /// 커스텀 로더로 생성
    pub fn with_loader(config: DiscoveryConfig, loader: Arc<dyn ComponentLoader>) -> Result<Self> {
        config.validate()?;

        let excludes = config
            .exclude
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern)
                    .map_err(|e| Error::Config(format!("Invalid exclude pattern '{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            loader,
            excludes,
            cache: ScanCache::new(),
        })
    }

    /// 프로세스 전역 인스턴스 (`DiscoveryConfig::load()`로 지연 초기화)
    pub fn global() -> &'static ComponentDiscovery {
        GLOBAL_DISCOVERY.get_or_init(|| {
            let config = DiscoveryConfig::load().unwrap_or_else(|e| {
                warn!(
                    "Invalid discovery config, all layers discarded, using defaults: {}",
                    e
                );
                DiscoveryConfig::default()
            });

            Self::new(config).unwrap_or_else(|e| {
                warn!("Invalid discovery config, using defaults: {}", e);
                Self {
                    loader: Arc::new(FileComponentLoader::default()),
                    config: DiscoveryConfig::default(),
                    excludes: Vec::new(),
                    cache: ScanCache::new(),
                }
            })
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// 빌트인 스캔 루트 (설정이 비어 있으면 번들 디렉토리)
    pub fn builtin_roots(&self) -> Vec<PathBuf> {
        if self.config.builtin_paths.is_empty() {
            vec![PathBuf::from(BUNDLED_COMPONENTS_PATH)]
        } else {
            self.config.builtin_paths.clone()
        }
    }

    // ========================================================================
    // 캐시되는 진입점
    // ========================================================================

    /// 빌트인 컴포넌트 (`{"components": Registry}`)
    pub async fn builtin(&self) -> BuiltinComponents {
        let registry = self
            .cache
            .get_or_scan(CacheKey::Builtin, || async { self.scan_builtin().await.registry })
            .await;

        BuiltinComponents::new(registry)
    }

    /// 호출자 경로의 커스텀 컴포넌트
    ///
    /// 빈 문자열 경로가 있으면 `Error::Config`. 빈 목록과 존재하지 않는 경로는
    /// 빈 Registry를 낸다.
    pub async fn custom<S: AsRef<str>>(&self, paths: &[S]) -> Result<Arc<Registry>> {
        validate_paths(paths)?;
        if paths.is_empty() {
            return Ok(Arc::new(Registry::new()));
        }

        let plan = resolve(&as_paths(paths)).await;
        let key = CacheKey::Custom(plan.key().clone());

        Ok(self
            .cache
            .get_or_scan(key, || async { self.scan_plan(&plan).await.registry })
            .await)
    }

    // ========================================================================
    // 캐시 없는 스캔 (진단용)
    // ========================================================================

    /// 경로를 스캔하고 전체 리포트 반환
    pub async fn scan<S: AsRef<str>>(&self, paths: &[S]) -> Result<ScanReport> {
        validate_paths(paths)?;
        if paths.is_empty() {
            return Ok(ScanReport::empty());
        }

        let plan = resolve(&as_paths(paths)).await;
        Ok(self.scan_plan(&plan).await)
    }

    /// 빌트인 루트 스캔
    pub async fn scan_builtin(&self) -> ScanReport {
        let plan = resolve(&self.builtin_roots()).await;
        self.scan_plan(&plan).await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn scan_plan(&self, plan: &ScanPlan) -> ScanReport {
        let started = Instant::now();
        let mut report = ScanReport::empty();

        let mut seen = HashSet::new();
        let mut units = Vec::new();

        for root in plan.roots() {
            if !root.exists {
                debug!("Component path {:?} does not exist", root.path);
                report.missing_paths.push(root.path.clone());
                continue;
            }

            let (found, failures) = self.enumerate(&root.path).await;
            report.failures.extend(failures);

            // 겹치는 루트: 먼저 정렬된 루트의 유닛만 사용
            units.extend(found.into_iter().filter(|unit| seen.insert(unit.path.clone())));
        }

        report.units_scanned = units.len();
        let loaded = load_units(Arc::clone(&self.loader), units, &self.config).await;

        let mut aggregator = CategoryAggregator::new();
        for loaded in loaded {
            let unit = loaded.unit;
            match loaded.result.and_then(|definitions| extract_all(definitions, &unit)) {
                Ok(descriptors) => {
                    debug!("Loaded {} component(s) from {:?}", descriptors.len(), unit.path);
                    aggregator.extend(descriptors);
                }
                Err(e) => {
                    warn!("Failed to load component unit {:?}: {}", unit.path, e);
                    report.failures.push(LoadFailure::new(unit.path, e));
                }
            }
        }

        let (registry, collisions) = aggregator.finish();
        report.registry = registry;
        report.collisions = collisions;
        report.elapsed = started.elapsed();

        info!(
            components = report.registry.len(),
            categories = report.registry.category_count(),
            failures = report.failures.len(),
            missing = report.missing_paths.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Component scan finished"
        );

        report
    }

    /// 루트 순회 (blocking pool)
    async fn enumerate(&self, root: &Path) -> (Vec<SourceUnit>, Vec<LoadFailure>) {
        let root_path = root.to_path_buf();
        let config = self.config.clone();
        let loader = Arc::clone(&self.loader);
        let excludes = self.excludes.clone();

        let result = tokio::task::spawn_blocking(move || {
            enumerate_units(&root_path, &config, loader.as_ref(), &excludes)
        })
        .await;

        match result {
            Ok(found) => found,
            Err(e) => {
                warn!("Directory walk for {:?} aborted: {}", root, e);
                (
                    Vec::new(),
                    vec![LoadFailure::new(root, LoadError::Walk(e.to_string()))],
                )
            }
        }
    }
}

fn as_paths<S: AsRef<str>>(paths: &[S]) -> Vec<&Path> {
    paths.iter().map(|p| Path::new(p.as_ref())).collect()
}

// ============================================================================
// 전역 진입점
// ============================================================================

/// 빌트인 컴포넌트 발견 (전역 캐시)
pub async fn discover_builtin_components() -> BuiltinComponents {
    ComponentDiscovery::global().builtin().await
}

/// 커스텀 경로의 컴포넌트 발견 (전역 캐시)
///
/// ```ignore
/// let registry = discover_custom_components(&["./my_components"]).await?;
/// for (category, components) in registry.iter() {
///     println!("{}: {}", category, components.len());
/// }
/// ```
pub async fn discover_custom_components<S: AsRef<str>>(paths: &[S]) -> Result<Arc<Registry>> {
    ComponentDiscovery::global().custom(paths).await
}
