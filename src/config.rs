use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "classroomd")]
#[command(version, about = "School administration sidecar speaking JSON lines on stdio")]
pub struct Config {
    /// Workspace to open at startup
    #[arg(long, env = "CLASSROOMD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `classroomd=trace`
    #[arg(long, env = "CLASSROOMD_LOG", default_value = "info")]
    pub log: String,

    /// Minimum age of a grade's defaulter list before listing recomputes it
    #[arg(long, env = "CLASSROOMD_DEFAULTERS_REFRESH_SECS", default_value_t = 60)]
    pub defaulters_refresh_secs: u64,

    /// TrueType font embedded in exported PDFs
    #[arg(long, env = "CLASSROOMD_PDF_FONT")]
    pub pdf_font: Option<PathBuf>,
}

impl Config {
    pub fn defaulters_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.defaulters_refresh_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log: "info".to_string(),
            defaulters_refresh_secs: 60,
            pdf_font: None,
        }
    }
}
