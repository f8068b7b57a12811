//! 一時障害のリトライ
//!
//! 500/502/503/504/429 や接続失敗など `SuiteError::is_transient()` が真のエラーのみ、
//! 指数バックオフ（±20% ジッター）で再試行する。429/503 で `Retry-After` が
//! 返っていればそれを優先する（上限は `max_delay`）。

use crate::error::{Result, SuiteError};
use camsuite_common::config::RetryConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// ジッター幅（±20%）
const JITTER_RATIO: f64 = 0.2;

/// リトライポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回含む）。0は1として扱う
    pub attempts: u32,
    /// 初回待機
    pub base_delay: Duration,
    /// 待機上限
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// リトライしないポリシー
    pub fn none() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// `attempt` 回目の失敗後の基準待機時間（ジッターなし）
    ///
    /// base·2^(attempt-1) を `max_delay` で頭打ちにする。
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let factor = rand::thread_rng().gen_range((1.0 - JITTER_RATIO)..=(1.0 + JITTER_RATIO));
        base.mul_f64(factor).min(self.max_delay)
    }

    fn delay_after(&self, attempt: u32, error: &SuiteError) -> Duration {
        match error.retry_after() {
            Some(advertised) => advertised.min(self.max_delay),
            None => self.jittered_delay(attempt),
        }
    }
}

/// 非同期処理をポリシーに従って再試行する
///
/// 一時障害以外のエラーは即座に返す。試行回数を使い切った場合は最後のエラーを返す。
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && error.is_transient() => {
                let delay = policy.delay_after(attempt, &error);
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
