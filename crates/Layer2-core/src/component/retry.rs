//! Retry logic for unit loads
//!
//! 파일 핸들 고갈 같은 일시적 I/O 에러만 재시도한다.

use super::error::LoadError;
use aiexec_foundation::RetryConfig;
use std::future::Future;
use std::path::Path;
use tokio::time::sleep;

/// 재시도 로직으로 유닛 로드 실행
///
/// # Arguments
/// * `config` - 재시도 설정
/// * `unit` - 로깅용 유닛 경로
/// * `f` - 실행할 비동기 함수
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, unit: &Path, mut f: F) -> Result<T, LoadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LoadError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt >= config.max_retries {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    unit = %unit.display(),
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying unit load after transient error"
                );

                attempt += 1;
                sleep(delay).await;
            }
        }
    }
}
