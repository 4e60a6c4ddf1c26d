//! # Component Discovery
//!
//! 워크플로우 에디터가 사용하는 컴포넌트(에이전트/도구 빌딩 블록) 발견 및 타입 레지스트리
//!
//! ## 개요
//!
//! 빌트인 컴포넌트와 사용자 디렉토리의 커스텀 컴포넌트를 찾아
//! `category → name → template` 레지스트리로 노출한다:
//! - 한 유닛의 실패는 나머지 유닛에 영향을 주지 않음
//! - 빌트인/커스텀 결과는 프로세스 전역으로 캐시됨 (경로 집합별)
//! - 빈 문자열 경로는 에러, 존재하지 않는 경로는 빈 결과
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  ComponentDiscovery                      │
//! │   builtin() ─────┐                 ┌───── custom(paths)  │
//! │                  ▼                 ▼                     │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │ ScanCache  (Builtin | Custom(ScanKey)) → OnceCell  │ │
//! │  └────────────────────────────────────────────────────┘ │
//! │                          │ miss                          │
//! │  path ─▶ loader ─▶ descriptor ─▶ registry (aggregator)  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let builtin = discover_builtin_components().await;
//! let agents = builtin.components.category("agents");
//!
//! let custom = discover_custom_components(&["./my_components"]).await?;
//! let all = Registry::merged(&builtin.components, &custom);
//! ```

mod cache;
mod descriptor;
mod discovery;
mod error;
mod loader;
mod path;
mod registry;
mod retry;

pub use cache::{CacheKey, CacheStats, ScanCache};
pub use descriptor::{extract, extract_all, ComponentDescriptor, DEFAULT_CATEGORY, RECOGNIZED_FIELDS};
pub use discovery::{
    discover_builtin_components, discover_custom_components, ComponentDiscovery, ScanReport,
    BUNDLED_COMPONENTS_PATH,
};
pub use error::{LoadError, LoadFailure};
pub use loader::{
    enumerate_units, load_units, ComponentDefinition, ComponentLoader, FileComponentLoader,
    LoadedUnit, SourceUnit,
};
pub use path::{resolve, validate_paths, ScanKey, ScanPlan, ScanRoot};
pub use registry::{BuiltinComponents, CategoryAggregator, CategoryMap, Insertion, Registry};
pub use retry::with_retry;
