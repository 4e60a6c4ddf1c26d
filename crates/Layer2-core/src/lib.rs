//! aiexec-core: Component discovery runtime for aiexec
//!
//! Layer2 - 컴포넌트 발견 및 타입 레지스트리 레이어
//!
//! # 주요 모듈
//!
//! - `component`: 빌트인/커스텀 컴포넌트 발견, 레지스트리, 캐시
//!
//! # 사용 예시
//!
//! ```ignore
//! use aiexec_core::{discover_builtin_components, discover_custom_components};
//!
//! // {"components": {category: {name: template}}}
//! let builtin = discover_builtin_components().await;
//! println!("{}", builtin.to_json());
//!
//! // {category: {name: template}}
//! let custom = discover_custom_components(&["./components"]).await?;
//! for (category, components) in custom.iter() {
//!     println!("{}: {:?}", category, components.keys().collect::<Vec<_>>());
//! }
//! ```

pub mod component;

// Re-exports: Discovery
pub use component::{
    discover_builtin_components, discover_custom_components, BuiltinComponents, CacheStats,
    ComponentDefinition, ComponentDescriptor, ComponentDiscovery, ComponentLoader,
    FileComponentLoader, LoadError, LoadFailure, Registry, ScanReport, BUNDLED_COMPONENTS_PATH,
};

// Layer1 re-exports
pub use aiexec_foundation::{DiscoveryConfig, Error, Result, RetryConfig};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_bundled_components_exist() {
        assert!(Path::new(BUNDLED_COMPONENTS_PATH).is_dir());
    }
}
