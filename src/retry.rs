//! Bounded exponential backoff for the result sink's outbound writes
//! (spec section 7: "bounded exponential backoff, up to a small cap").

use std::future::Future;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(50);

pub async fn with_backoff<F, Fut, T>(mut attempt: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut last_err = None;
    for n in 0..MAX_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if n + 1 < MAX_ATTEMPTS {
                    tokio::time::sleep(BASE_DELAY * 2u32.pow(n)).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("retry attempted zero times")))
}
