//! feeder subcommand
//!
//! Provisions cameras with synthetic streams and feeds them detected objects.

use super::GlobalArgs;
use crate::fixtures::{create_cameras_bounded, run_tag, NAME_PREFIX};
use anyhow::anyhow;
use camsuite_common::protocol::{CreateCameraRequest, SyntheticObject};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

/// Arguments for the feeder subcommand
#[derive(Args, Debug, Clone)]
pub struct FeederArgs {
    /// Number of cameras to create
    #[arg(long, default_value_t = 1)]
    pub cameras: usize,

    /// Parallel camera creations (default: config concurrency.camera_provisioning)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Synthetic objects to ingest per camera
    #[arg(long, default_value_t = 0)]
    pub objects: usize,

    /// Object type of the synthetic detections
    #[arg(long, default_value = "person")]
    pub object_type: String,

    /// Location to attach the cameras to
    #[arg(long)]
    pub location_id: Option<String>,

    /// Camera name prefix
    #[arg(long, default_value = NAME_PREFIX)]
    pub prefix: String,

    /// Print a JSON summary instead of camera ids
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct FedCamera {
    id: String,
    name: String,
    objects: usize,
}

#[derive(Debug, Default, Serialize)]
struct FeederSummary {
    run_tag: String,
    cameras: Vec<FedCamera>,
    failures: Vec<String>,
}

/// 検出時刻を1秒ずつ過去にずらした合成オブジェクト
pub fn synthetic_objects(count: usize, object_type: &str, now: DateTime<Utc>) -> Vec<SyntheticObject> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| SyntheticObject {
            object_type: object_type.to_string(),
            detected_at: now - Duration::seconds(i as i64),
            confidence: rng.gen_range(0.5..0.99),
        })
        .collect()
}

fn camera_names(prefix: &str, tag: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{tag}-feed-{i}")).collect()
}

/// Execute the feeder command
pub async fn execute(global: &GlobalArgs, args: &FeederArgs) -> Result<(), anyhow::Error> {
    let (env, api) = global.login().await?;
    let concurrency = args.concurrency.unwrap_or(env.camera_concurrency).max(1);
    info!(
        cameras = args.cameras,
        concurrency,
        objects = args.objects,
        "Feeding cameras"
    );

    let requests = camera_names(&args.prefix, run_tag(), args.cameras)
        .into_iter()
        .map(|name| CreateCameraRequest::synthetic(name, args.location_id.clone()))
        .collect();

    let mut summary = FeederSummary {
        run_tag: run_tag().to_string(),
        ..FeederSummary::default()
    };
    let mut created = Vec::new();
    for result in create_cameras_bounded(&api, requests, concurrency).await {
        match result {
            Ok(camera) => created.push(camera),
            Err(e) => {
                warn!(error = %e, "Camera creation failed");
                summary.failures.push(e.to_string());
            }
        }
    }

    let now = Utc::now();
    let ingested: Vec<_> = stream::iter(created)
        .map(|camera| {
            let api = api.clone();
            let objects = synthetic_objects(args.objects, &args.object_type, now);
            async move {
                let result = if objects.is_empty() {
                    Ok(())
                } else {
                    api.ingest_objects(&camera.id, objects).await
                };
                (camera, result)
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    for (camera, result) in ingested {
        match result {
            Ok(()) => summary.cameras.push(FedCamera {
                id: camera.id,
                name: camera.name,
                objects: args.objects,
            }),
            Err(e) => {
                warn!(camera_id = %camera.id, error = %e, "Ingestion failed");
                summary
                    .failures
                    .push(format!("ingest into {}: {e}", camera.id));
                summary.cameras.push(FedCamera {
                    id: camera.id,
                    name: camera.name,
                    objects: 0,
                });
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for camera in &summary.cameras {
            println!("{}", camera.id);
        }
    }

    if summary.failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} operation(s) failed: {}",
            summary.failures.len(),
            summary.failures.join("; ")
        ))
    }
}
