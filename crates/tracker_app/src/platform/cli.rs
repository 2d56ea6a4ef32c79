use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracker_core::TrackerSettings;
use tracker_engine::ApiSettings;
use url::Url;

use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "tracker",
    version,
    about = "Submit remote images for tiling and follow their download"
)]
pub struct Cli {
    /// Source image URLs; each is submitted once the previous job settles.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Root URL of the tile server.
    #[arg(long, default_value = "http://localhost:8000/")]
    pub server: String,

    /// Anti-forgery token issued by the server for this session.
    #[arg(long, env = "TRACKER_XSRF_TOKEN")]
    pub xsrf_token: Option<String>,

    /// Milliseconds between progress polls.
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Polls before giving up on a download.
    #[arg(long, default_value_t = 60)]
    pub give_up_after: u32,

    /// Number of preload rounds after a download completes.
    #[arg(long, default_value_t = 20)]
    pub preload_rounds: u32,

    /// Ceiling in milliseconds for the doubling delay between preload rounds.
    #[arg(long, default_value_t = 30_000)]
    pub preload_max_interval_ms: u64,

    /// Preview endpoint path.
    #[arg(long)]
    pub preview_path: Option<String>,

    /// Commit (download) endpoint path.
    #[arg(long)]
    pub commit_path: Option<String>,

    /// Progress endpoint path.
    #[arg(long)]
    pub progress_path: Option<String>,

    /// Preload list path; `{fileid}` is replaced by the job id.
    #[arg(long)]
    pub preload_path: Option<String>,

    /// Hit endpoint path.
    #[arg(long)]
    pub hit_path: Option<String>,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn tracker_settings(&self) -> anyhow::Result<TrackerSettings> {
        let origin = Url::parse(&self.server)
            .with_context(|| format!("invalid server url {:?}", self.server))?;
        Ok(TrackerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            give_up_after: self.give_up_after.max(1),
            preload_max_rounds: self.preload_rounds.max(1),
            preload_max_interval: Some(Duration::from_millis(self.preload_max_interval_ms.max(1))),
            site_origin: Some(origin),
            ..TrackerSettings::default()
        })
    }

    pub fn api_settings(&self) -> ApiSettings {
        let mut settings = ApiSettings {
            base_url: self.server.clone(),
            xsrf_token: self.xsrf_token.clone(),
            ..ApiSettings::default()
        };
        let overrides = [
            (&self.preview_path, &mut settings.preview_path),
            (&self.commit_path, &mut settings.commit_path),
            (&self.progress_path, &mut settings.progress_path),
            (&self.preload_path, &mut settings.preload_path),
            (&self.hit_path, &mut settings.hit_path),
        ];
        for (value, target) in overrides {
            if let Some(path) = value {
                *target = path.clone();
            }
        }
        settings
    }
}
