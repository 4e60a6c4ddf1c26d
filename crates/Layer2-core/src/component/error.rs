//! Component load errors
//!
//! 유닛 하나의 로드 실패. 스캔 경계를 넘지 않고 `ScanReport`에 기록된다.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 유닛 로드 에러
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// 파일 읽기 실패
    #[error("failed to read unit: {message}")]
    Io {
        kind: io::ErrorKind,
        raw_os_error: Option<i32>,
        message: String,
    },

    /// 문법 오류
    #[error("{format} syntax error: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// 문법은 맞지만 컴포넌트 정의가 아님
    #[error("invalid component definition: {0}")]
    Invalid(String),

    /// 지원하지 않는 유닛 형식
    #[error("unsupported unit: {0}")]
    Unsupported(String),

    /// 디렉토리 순회 실패
    #[error("directory walk failed: {0}")]
    Walk(String),

    /// 로더 내부 panic
    #[error("loader panicked: {0}")]
    Panicked(String),
}

impl LoadError {
    pub fn parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        LoadError::Parse {
            format,
            message: err.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        LoadError::Invalid(message.into())
    }

    /// 재시도 가능한 일시적 에러인지 확인 (파일 핸들 고갈 등)
    pub fn is_retryable(&self) -> bool {
        match self {
            LoadError::Io {
                kind, raw_os_error, ..
            } => {
                is_handle_exhaustion(*raw_os_error)
                    || matches!(
                        kind,
                        io::ErrorKind::Interrupted
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                    )
            }
            _ => false,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io {
            kind: err.kind(),
            raw_os_error: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

/// EMFILE / ENFILE
#[cfg(unix)]
fn is_handle_exhaustion(raw: Option<i32>) -> bool {
    matches!(raw, Some(23) | Some(24))
}

/// ERROR_TOO_MANY_OPEN_FILES
#[cfg(not(unix))]
fn is_handle_exhaustion(raw: Option<i32>) -> bool {
    matches!(raw, Some(4))
}

/// 스캔 중 기록된 유닛 실패
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    /// 실패한 유닛(또는 순회 루트) 경로
    pub path: PathBuf,

    /// 원인
    pub error: LoadError,
}

impl LoadFailure {
    pub fn new(path: impl Into<PathBuf>, error: LoadError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}
