//! 結果整合な状態の待機
//!
//! メール到着・オブジェクト取り込み・自動更新・UI要素の出現などを、
//! 固定間隔ポーリングとタイムアウトで待つ。

use crate::error::{Result, SuiteError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// ポーリング設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    /// 待機上限
    pub timeout: Duration,
    /// ポーリング間隔
    pub interval: Duration,
}

impl Poll {
    /// 新しいポーリング設定を作成
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// タイムアウトだけ差し替える
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

/// 条件が真になるまで待つ
pub async fn wait_until<F, Fut>(poll: Poll, what: &str, mut cond: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if cond().await {
            debug!(what, elapsed_ms = start.elapsed().as_millis() as u64, "Condition met");
            return Ok(());
        }
        sleep_or_timeout(poll, start, what).await?;
    }
}

/// プローブが値を返すまで待つ
///
/// プローブの一時障害はログに残してポーリングを続け、それ以外のエラーは即座に返す。
pub async fn wait_for_value<T, F, Fut>(poll: Poll, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    loop {
        match probe().await {
            Ok(Some(value)) => {
                debug!(what, elapsed_ms = start.elapsed().as_millis() as u64, "Value ready");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                debug!(what, error = %e, "Transient error while polling");
            }
            Err(e) => return Err(e),
        }
        sleep_or_timeout(poll, start, what).await?;
    }
}

async fn sleep_or_timeout(poll: Poll, start: Instant, what: &str) -> Result<()> {
    let elapsed = start.elapsed();
    if elapsed >= poll.timeout {
        return Err(SuiteError::Timeout {
            what: what.to_string(),
            elapsed,
        });
    }
    let remaining = poll.timeout - elapsed;
    tokio::time::sleep(poll.interval.min(remaining)).await;
    Ok(())
}
