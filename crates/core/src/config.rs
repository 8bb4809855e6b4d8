use crate::capture::BackendKind;
use crate::error::{AppError, Result};
use directories::ProjectDirs;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory for screenshots, queue, and mailbox files.
    pub root_dir: PathBuf,
    /// Capture strategy, resolved once at startup.
    pub backend: BackendKind,
    /// External capture utility override for the pipeline backend.
    pub capture_command: Option<String>,
    /// Sharpening pass in the pipeline backend.
    pub sharpen: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let root_dir = match env::var("SHOTPIPE_ROOT") {
            Ok(path) => PathBuf::from(path),
            Err(_) => ProjectDirs::from("", "", "shotpipe")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    AppError::Config(
                        "no home directory found; set SHOTPIPE_ROOT explicitly".to_string(),
                    )
                })?,
        };

        let backend = match env::var("SHOTPIPE_BACKEND") {
            Ok(name) => name.parse()?,
            Err(_) => BackendKind::platform_default(),
        };

        let capture_command = env::var("SHOTPIPE_CAPTURE_CMD").ok();

        let sharpen = env::var("SHOTPIPE_SHARPEN")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        Ok(Self {
            root_dir,
            backend,
            capture_command,
            sharpen,
        })
    }
}
