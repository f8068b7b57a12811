//! download-objects subcommand
//!
//! Pages through the object search API and writes the detections to a file or stdout.

use super::GlobalArgs;
use camsuite_common::protocol::ObjectSearchRequest;
use camsuite_common::types::DetectedObject;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// 1リクエストあたりの取得件数
const PAGE_SIZE: u32 = 200;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// One JSON object per line
    Json,
}

/// Arguments for the download-objects subcommand
#[derive(Args, Debug, Clone)]
pub struct DownloadObjectsArgs {
    /// Camera id (repeatable)
    #[arg(long = "camera", required = true)]
    pub cameras: Vec<String>,

    /// Start of the time range (RFC 3339)
    #[arg(long)]
    pub from: DateTime<Utc>,

    /// End of the time range (RFC 3339, default: now)
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,

    /// Object type filter (repeatable)
    #[arg(long = "type")]
    pub object_types: Vec<String>,

    /// Maximum number of objects to fetch and write
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl DownloadObjectsArgs {
    /// 検索リクエストを組み立てる
    pub fn search_request(&self, now: DateTime<Utc>) -> ObjectSearchRequest {
        let page_size = self
            .limit
            .map(|limit| (limit.min(PAGE_SIZE as usize)).max(1) as u32)
            .unwrap_or(PAGE_SIZE);
        ObjectSearchRequest {
            camera_ids: self.cameras.clone(),
            from: self.from,
            to: self.to.unwrap_or(now),
            object_types: self.object_types.clone(),
            limit: page_size,
            offset: 0,
        }
    }
}

/// 検出オブジェクトを指定形式で書き出し、件数を返す
pub fn write_objects<W: Write>(
    objects: &[DetectedObject],
    format: OutputFormat,
    writer: W,
) -> Result<usize, anyhow::Error> {
    match format {
        OutputFormat::Csv => {
            let mut csv = csv::Writer::from_writer(writer);
            for object in objects {
                csv.serialize(object)?;
            }
            csv.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            for object in objects {
                serde_json::to_writer(&mut writer, object)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
    }
    Ok(objects.len())
}

/// Execute the download-objects command
pub async fn execute(global: &GlobalArgs, args: &DownloadObjectsArgs) -> Result<(), anyhow::Error> {
    let (_env, api) = global.login().await?;
    let request = args.search_request(Utc::now());
    info!(
        cameras = ?request.camera_ids,
        from = %request.from,
        to = %request.to,
        "Downloading objects"
    );

    let objects = api.search_objects_up_to(&request, args.limit).await?;

    let count = match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_objects(&objects, args.format, std::io::BufWriter::new(file))?
        }
        None => write_objects(&objects, args.format, std::io::stdout().lock())?,
    };

    match &args.output {
        Some(path) => eprintln!("Wrote {count} objects to {}", path.display()),
        None => eprintln!("Wrote {count} objects"),
    }
    Ok(())
}
