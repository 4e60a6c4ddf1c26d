//! Path Validator - 스캔 경로 검증 및 정규화
//!
//! 1. 파일 시스템 접근 전에 모든 항목을 검사한다 (빈 문자열 = 호출자 에러)
//! 2. 절대 경로로 바꾸고 정규화한다 (존재하면 canonicalize)
//! 3. 중복을 제거하고 순서와 무관한 캐시 키를 만든다
//!
//! 존재하지 않는 경로는 에러가 아니다. 해당 루트는 컴포넌트 0개를 낸다.

use aiexec_foundation::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

// ============================================================================
// ScanRoot / ScanKey / ScanPlan
// ============================================================================

/// 정규화된 스캔 루트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    /// 정규화된 절대 경로
    pub path: PathBuf,

    /// 디스크에 존재하는지
    pub exists: bool,
}

/// 순서와 무관한 경로 집합 (캐시 키)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanKey(BTreeSet<PathBuf>);

impl ScanKey {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 검증과 정규화를 마친 스캔 계획
#[derive(Debug, Clone, Default)]
pub struct ScanPlan {
    roots: Vec<ScanRoot>,
    key: ScanKey,
}

impl ScanPlan {
    /// 정렬되고 중복 제거된 루트들
    pub fn roots(&self) -> &[ScanRoot] {
        &self.roots
    }

    pub fn key(&self) -> &ScanKey {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

// ============================================================================
// 검증
// ============================================================================

/// 경로 문자열 검증 (파일 시스템 접근 없음)
///
/// 빈 시퀀스는 유효하다. 빈 문자열 항목이 하나라도 있으면 `Error::Config`.
pub fn validate_paths<S: AsRef<str>>(paths: &[S]) -> Result<()> {
    for (index, path) in paths.iter().enumerate() {
        if path.as_ref().is_empty() {
            return Err(Error::empty_path(index));
        }
    }
    Ok(())
}

/// 경로 정규화 및 중복 제거
pub async fn resolve<P: AsRef<Path>>(paths: &[P]) -> ScanPlan {
    let cwd = std::env::current_dir().ok();
    let mut seen = BTreeSet::new();
    let mut roots = Vec::new();

    for path in paths {
        let root = resolve_one(path.as_ref(), cwd.as_deref()).await;
        if seen.insert(root.path.clone()) {
            roots.push(root);
        } else {
            debug!("Skipping duplicate component path {:?}", root.path);
        }
    }

    roots.sort_by(|a, b| a.path.cmp(&b.path));

    ScanPlan {
        roots,
        key: ScanKey(seen),
    }
}

async fn resolve_one(path: &Path, cwd: Option<&Path>) -> ScanRoot {
    let absolute = match cwd {
        Some(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    let normalized = normalize(&absolute);

    match tokio::fs::canonicalize(&normalized).await {
        Ok(canonical) => ScanRoot {
            path: canonical,
            exists: true,
        },
        Err(e) => {
            debug!("Component path {:?} not resolvable: {}", normalized, e);
            ScanRoot {
                path: normalized,
                exists: false,
            }
        }
    }
}

/// `.`/`..` 제거 (심볼릭 링크는 해석하지 않음)
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
