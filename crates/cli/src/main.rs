use anyhow::{Context, Result};
use clap::Parser;
use shotpipe_core::capture::{FrameSource, PrimaryDisplaySource};
use shotpipe_core::overlay::{run_selection_overlay, OverlaySurfaces, SessionOutcome};
use shotpipe_core::{init, Config, SelectionRect, ShotPipe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prompt to attach to the capture (used when the overlay prompt is empty)
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// Capture a fixed region "x,y,width,height" in logical pixels instead
    /// of opening the selection overlay
    #[arg(long)]
    region: Option<String>,

    /// Comma-separated destination sinks
    #[arg(short, long, default_value = "queue")]
    to: String,

    /// Override the capture backend (thumbnail, monitor, pipeline)
    #[arg(long)]
    backend: Option<String>,

    /// Override the storage root directory
    #[arg(long)]
    root: Option<PathBuf>,

    /// List available displays and exit
    #[arg(long)]
    list_monitors: bool,

    /// Consumer mode: pop and print all pending queue items, then exit
    #[arg(long)]
    drain: bool,
}

/// The binary has no persistent main window of its own (the assistant UI
/// lives in another process), so the visibility transitions are just traced.
struct CliSurfaces;

impl OverlaySurfaces for CliSurfaces {
    fn hide_main(&self) {
        debug!("main surface hidden");
    }

    fn show_main(&self) {
        debug!("main surface restored");
    }

    fn open_selection(&self) -> shotpipe_core::Result<()> {
        debug!("selection surface opening");
        Ok(())
    }

    fn close_selection(&self) {
        debug!("selection surface closed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    init();
    let args = Args::parse();

    // Handle --list-monitors before touching configuration
    if args.list_monitors {
        println!("Available displays:");
        for info in PrimaryDisplaySource::list_displays()? {
            println!("{}", info);
        }
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    if let Some(backend) = &args.backend {
        config.backend = backend.parse()?;
    }

    let app = ShotPipe::with_config(config).context("Failed to initialize pipeline")?;

    if args.drain {
        return drain_queue(&app);
    }

    let destinations: Vec<String> = args
        .to
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let cli_prompt = {
        let joined = args.prompt.join(" ");
        (!joined.trim().is_empty()).then(|| joined.trim().to_string())
    };

    if let Some(region) = &args.region {
        // Headless capture: no overlay, no controller
        let selection = parse_region(region)?;
        let report = app
            .capture_and_route(selection, cli_prompt, destinations)
            .await
            .context("Capture failed")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // Interactive: overlay controller owns the window transitions
    let controller = app.controller(Arc::new(CliSurfaces));
    let listener = controller
        .start_capture()?
        .context("a capture session is already active")?;

    let backdrop = match PrimaryDisplaySource::new().and_then(|s| s.full_frame()) {
        Ok(frame) => frame,
        Err(e) => {
            // The session must not stay half-open with the main surface hidden
            controller.cancel();
            return Err(e).context("Failed to grab the backdrop frame");
        }
    };

    match run_selection_overlay(backdrop) {
        Ok(Some(choice)) => {
            let prompt = choice.prompt.or(cli_prompt);
            controller.confirm_selection(choice.selection, prompt, destinations);
        }
        Ok(None) => controller.cancel(),
        Err(e) => {
            controller.cancel();
            return Err(e).context("Selection overlay failed");
        }
    }

    match listener.await.context("capture session dropped")? {
        SessionOutcome::Delivered(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.fully_delivered() {
                std::process::exit(1);
            }
        }
        SessionOutcome::Cancelled => println!("Selection cancelled"),
        SessionOutcome::Failed(e) => return Err(e).context("Capture failed"),
    }

    Ok(())
}

/// Drains the standard queue the way a polling consumer would.
fn drain_queue(app: &ShotPipe) -> Result<()> {
    let queue = app.queue();
    let mut drained = 0usize;
    while let Some(item) = queue.dequeue()? {
        println!("{}", serde_json::to_string_pretty(&item)?);
        drained += 1;
    }
    eprintln!("({} item(s) drained)", drained);
    Ok(())
}

/// Parses "x,y,width,height" in logical pixels.
fn parse_region(s: &str) -> Result<SelectionRect> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("invalid region '{}'", s))?;
    anyhow::ensure!(
        parts.len() == 4,
        "region must be x,y,width,height (got '{}')",
        s
    );
    Ok(SelectionRect::new(parts[0], parts[1], parts[2], parts[3]))
}
