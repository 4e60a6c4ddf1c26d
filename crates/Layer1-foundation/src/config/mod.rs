//! Config - 통합 설정 관리
//!
//! - `discovery.rs` - 컴포넌트 발견 설정 (DiscoveryConfig, RetryConfig)

mod discovery;

pub use discovery::{
    DiscoveryConfig, DiscoveryConfigFile, RetryConfig, COMPONENTS_PATH_ENV, DISCOVERY_CONFIG_FILE,
};
