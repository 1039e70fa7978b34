use std::time::Duration;

use crate::error::PasoError;

/// Exponential backoff schedule for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            attempts: 5,
            base: Duration::from_millis(10),
            factor: 2,
            cap: Duration::from_millis(200),
        }
    }
}

impl Backoff {
    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base.saturating_mul(self.factor.saturating_pow(attempt));
        scaled.min(self.cap)
    }
}

/// Retries `op` while it returns `PasoError::Transient`, sleeping with
/// capped exponential backoff between attempts. Any other error, or
/// exhaustion of the schedule, is returned to the caller immediately.
pub async fn with_backoff<F, Fut, T>(schedule: Backoff, mut op: F) -> Result<T, PasoError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, PasoError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(PasoError::Transient(msg)) => {
                if attempt + 1 >= schedule.attempts {
                    return Err(PasoError::Transient(msg));
                }
                tokio::time::sleep(schedule.delay_for(attempt)).await;
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_try() {
        let result = with_backoff(Backoff::default(), || async { Ok::<_, PasoError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(
            Backoff { attempts: 5, base: Duration::from_millis(1), factor: 2, cap: Duration::from_millis(5) },
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(PasoError::Transient("busy".into()))
                } else {
                    Ok(n)
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn non_transient_errors_short_circuit() {
        let calls = AtomicU32::new(0);
        let result: Result<(), PasoError> = with_backoff(Backoff::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PasoError::validation("nope"))
        })
        .await;
        assert!(matches!(result, Err(PasoError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_schedule() {
        let result: Result<(), PasoError> = with_backoff(
            Backoff { attempts: 3, base: Duration::from_millis(1), factor: 2, cap: Duration::from_millis(2) },
            || async { Err(PasoError::transient("still busy")) },
        )
        .await;
        assert!(matches!(result, Err(PasoError::Transient(_))));
    }
}
