//! # aiexec-foundation
//!
//! Foundation layer for aiexec:
//! - Error: 서브시스템 경계 에러 (Error, Result)
//! - Config: 컴포넌트 발견 설정 (DiscoveryConfig, RetryConfig)
//! - Storage: JsonStore (글로벌/프로젝트 설정 파일)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  aiexec-cli (aiexec-components)                         │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  aiexec-core: ComponentDiscovery                        │
//! │  ├── builtin (번들 컴포넌트)                             │
//! │  └── custom  (호출자 경로)                               │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  aiexec-foundation: Error / DiscoveryConfig / JsonStore │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    DiscoveryConfig, DiscoveryConfigFile, RetryConfig, COMPONENTS_PATH_ENV, DISCOVERY_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, CONFIG_DIR_NAME};
