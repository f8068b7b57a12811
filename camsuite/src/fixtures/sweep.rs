//! 異常終了したランが残したリソースの掃除

use super::NAME_PREFIX;
use crate::api::ApiClient;
use crate::cache::camera_cache;
use crate::error::Result;
use camsuite_common::types::{Camera, Company, CompanyKind};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use tracing::{info, warn};

/// 掃除の条件
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// 対象とする名前の接頭辞
    pub prefix: String,
    /// この時間より古いものだけを対象にする
    ///
    /// 0以下なら名前にタイムスタンプを持たないカメラも対象にする。
    pub older_than: Duration,
    /// 削除せずに一覧だけ返す
    pub dry_run: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            prefix: NAME_PREFIX.to_string(),
            older_than: Duration::hours(6),
            dry_run: false,
        }
    }
}

/// 掃除の結果
#[derive(Debug, Default)]
pub struct SweepReport {
    /// 対象になった会社
    pub companies: Vec<Company>,
    /// 対象になったカメラ
    pub cameras: Vec<Camera>,
    /// 削除に失敗した `(名前, エラー)`
    pub failed: Vec<(String, String)>,
}

/// `e2e-<YYYYMMDDHHMMSS>-...` 形式の名前からランの開始時刻を読む
pub fn run_started_at(name: &str, prefix: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(prefix)?.get(..14)?;
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn is_stale_company(company: &Company, prefix: &str, cutoff: DateTime<Utc>) -> bool {
    company.name.starts_with(prefix) && company.created_at < cutoff
}

/// カメラには作成時刻がないため名前のタイムスタンプで判定する
///
/// タイムスタンプを持たない名前（`CAMSUITE_RUN_ID` 指定のラン）は
/// `sweep_untimed` のときだけ対象にする。
fn is_stale_camera(
    camera: &Camera,
    prefix: &str,
    cutoff: DateTime<Utc>,
    sweep_untimed: bool,
) -> bool {
    if !camera.name.starts_with(prefix) {
        return false;
    }
    match run_started_at(&camera.name, prefix) {
        Some(started) => started < cutoff,
        None => sweep_untimed,
    }
}

fn depth(kind: CompanyKind) -> u8 {
    match kind {
        CompanyKind::Spc => 0,
        CompanyKind::Ic => 1,
        CompanyKind::Euc => 2,
    }
}

/// 古いE2Eリソースを削除する（カメラ → 会社の子から順）
pub async fn sweep_stale(api: &ApiClient, options: &SweepOptions) -> Result<SweepReport> {
    let cutoff = Utc::now() - options.older_than;
    let sweep_untimed = options.older_than <= Duration::zero();

    let cameras: Vec<Camera> = api
        .list_cameras()
        .await?
        .into_iter()
        .filter(|c| is_stale_camera(c, &options.prefix, cutoff, sweep_untimed))
        .collect();
    let mut companies: Vec<Company> = api
        .list_companies()
        .await?
        .into_iter()
        .filter(|c| is_stale_company(c, &options.prefix, cutoff))
        .collect();
    companies.sort_by_key(|c| std::cmp::Reverse(depth(c.kind)));

    info!(
        cameras = cameras.len(),
        companies = companies.len(),
        dry_run = options.dry_run,
        %cutoff,
        "Stale resources found"
    );

    let mut report = SweepReport::default();
    if !options.dry_run {
        for camera in &cameras {
            if let Err(e) = api.delete_idempotent(&format!("/cameras/{}", camera.id)).await {
                warn!(camera = %camera.name, error = %e, "Failed to sweep camera");
                report.failed.push((camera.name.clone(), e.to_string()));
            }
        }
        camera_cache().invalidate();
        for company in &companies {
            if let Err(e) = api
                .delete_idempotent(&format!("/companies/{}", company.id))
                .await
            {
                warn!(company = %company.name, error = %e, "Failed to sweep company");
                report.failed.push((company.name.clone(), e.to_string()));
            }
        }
    }

    report.cameras = cameras;
    report.companies = companies;
    Ok(report)
}
