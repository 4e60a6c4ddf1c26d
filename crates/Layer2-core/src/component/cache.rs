//! Scan Cache - 키별 single-flight 캐시
//!
//! 키마다 `tokio::sync::OnceCell`을 하나 두고, 셀 맵은 `parking_lot::Mutex`로
//! 보호한다. 락은 셀을 찾거나 만드는 동안만 잡고, 스캔은 락 밖에서 한다.
//!
//! - 같은 키의 동시 호출자는 스캔 하나를 함께 기다린다
//! - 반쯤 채워진 Registry는 관찰되지 않는다
//! - 초기화 중인 호출자가 drop되면 셀은 비어 있는 채로 남고 다음 호출자가 다시 스캔한다

use super::path::ScanKey;
use super::registry::Registry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// 캐시 버킷 키
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// 빌트인 컴포넌트 (전용 버킷)
    Builtin,
    /// 호출자 경로 집합
    Custom(ScanKey),
}

type Cell = Arc<OnceCell<Arc<Registry>>>;

/// 캐시 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 프로세스 수명의 스캔 캐시
#[derive(Debug, Default)]
pub struct ScanCache {
    cells: Mutex<HashMap<CacheKey, Cell>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &CacheKey) -> Cell {
        let mut cells = self.cells.lock();
        Arc::clone(cells.entry(key.clone()).or_default())
    }

    /// 캐시된 값 반환, 없으면 `scan`을 한 번만 실행해 채움
    pub async fn get_or_scan<F, Fut>(&self, key: CacheKey, scan: F) -> Arc<Registry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Registry>,
    {
        let cell = self.cell(&key);

        if let Some(registry) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(registry);
        }

        let scanned = AtomicBool::new(false);
        let flag = &scanned;
        let registry = cell
            .get_or_init(|| async move {
                flag.store(true, Ordering::Relaxed);
                Arc::new(scan().await)
            })
            .await;

        if scanned.load(Ordering::Relaxed) {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            // 다른 호출자의 스캔을 기다림
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        Arc::clone(registry)
    }

    /// 초기화된 값만 조회
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<Registry>> {
        self.cells.lock().get(key).and_then(|cell| cell.get().cloned())
    }

    /// 모든 버킷 제거 (진행 중인 스캔은 자기 셀을 끝까지 채운다)
    pub fn clear(&self) {
        self.cells.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .cells
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count();

        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::descriptor::ComponentDescriptor;
    use serde_json::Map;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn sample() -> Registry {
        Registry::from_descriptors([ComponentDescriptor::new("Calc", "tools", Map::new(), "/c/tools/calc.json")])
    }

    #[tokio::test]
    async fn test_second_call_hits() {
        let cache = ScanCache::new();
        let first = cache.get_or_scan(CacheKey::Builtin, || async { sample() }).await;
        let second = cache
            .get_or_scan(CacheKey::Builtin, || async { Registry::new() })
            .await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_scan() {
        let cache = Arc::new(ScanCache::new());
        let scans = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let scans = Arc::clone(&scans);
                tokio::spawn(async move {
                    cache
                        .get_or_scan(CacheKey::Builtin, || async move {
                            scans.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            sample()
                        })
                        .await
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        assert_eq!(scans.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = ScanCache::new();
        cache.get_or_scan(CacheKey::Builtin, || async { sample() }).await;
        let custom = cache
            .get_or_scan(CacheKey::Custom(ScanKey::default()), || async { Registry::new() })
            .await;

        assert!(custom.is_empty());
        assert_eq!(cache.stats().entries, 2);
    }

    #[tokio::test]
    async fn test_clear_forces_rescan() {
        let cache = ScanCache::new();
        cache.get_or_scan(CacheKey::Builtin, || async { sample() }).await;
        cache.clear();

        assert!(cache.peek(&CacheKey::Builtin).is_none());
        let rescanned = cache.get_or_scan(CacheKey::Builtin, || async { Registry::new() }).await;
        assert!(rescanned.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_scan_leaves_cell_empty() {
        let cache = ScanCache::new();
        let pending = cache.get_or_scan(CacheKey::Builtin, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            sample()
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), pending).await.is_err());

        assert!(cache.peek(&CacheKey::Builtin).is_none());
        let registry = cache.get_or_scan(CacheKey::Builtin, || async { sample() }).await;
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            entries: 1,
            hits: 3,
            misses: 1,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
