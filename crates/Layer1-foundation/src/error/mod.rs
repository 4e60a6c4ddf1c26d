//! Error types for aiexec
//!
//! 서브시스템 경계를 넘는 에러를 중앙에서 관리
//!
//! 컴포넌트 하나의 로드 실패는 여기 속하지 않는다. 그것은 `aiexec-core`의
//! `LoadError`로 기록되고 스캔 내부에서 흡수된다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// aiexec 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 빈 문자열 경로 에러 생성 헬퍼
    pub fn empty_path(index: usize) -> Self {
        Error::Config(format!(
            "component path at index {} is an empty string; every path must name a directory",
            index
        ))
    }

    /// 호출자 입력이 원인인 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
