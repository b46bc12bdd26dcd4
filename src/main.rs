use std::fs::File;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use pagepinch::event_source::{EventSource, InputEvent, SimulatedEventSource};
use pagepinch::panic_handler;
use pagepinch::render::{MupdfRenderer, SurfaceSize};
use pagepinch::settings;
use pagepinch::source_store::{FileFetcher, SourceStore, resolve_source};
use pagepinch::viewer::Viewer;

/// Longest wait for one render when draining at exit
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on render rounds when draining at exit
const MAX_DRAIN_ROUNDS: usize = 120;

#[derive(Parser, Debug)]
#[command(name = "pagepinch", version, about = "Pan and pinch-zoom a document page")]
struct Args {
    /// Document to open; the last opened document when omitted
    source: Option<String>,

    /// JSON gesture script to replay
    #[arg(long)]
    script: Option<PathBuf>,

    /// Extra frames to run after the script so momentum can settle
    #[arg(long, default_value_t = 60)]
    frames: u32,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Write the visible frame to this PNG file at exit
    #[arg(long)]
    output: Option<PathBuf>,

    /// Always fetch the source, ignoring the cached copy
    #[arg(long)]
    no_cache: bool,

    #[arg(long, default_value = "pagepinch.log")]
    log_file: PathBuf,

    /// Log at trace level
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Cannot create log file {}", args.log_file.display()))?,
    )?;

    panic_handler::initialize_panic_handler();
    settings::load_settings();
    if args.no_cache {
        settings::set_source_cache_enabled(false);
    }

    info!("Starting pagepinch");
    let result = run(&args);
    if let Err(e) = &result {
        error!("Application error: {e:?}");
    }
    info!("Shutting down pagepinch");
    result
}

fn run(args: &Args) -> Result<()> {
    let mut store = SourceStore::load_or_ephemeral(SourceStore::default_dir().as_deref());

    let Some(source) = args
        .source
        .clone()
        .or_else(|| store.last_source().map(str::to_string))
    else {
        bail!("No document given and no previous document to restore");
    };
    if args.source.is_none() {
        info!("Restoring last document {source}");
    }

    let display = SurfaceSize::new(args.width, args.height);
    let mut viewer = Viewer::new(MupdfRenderer::new(), settings::viewer_config(), display);

    let allow_cache = settings::is_source_cache_enabled();
    let resolved = resolve_source(&mut store, &FileFetcher, &source, allow_cache)
        .with_context(|| format!("Cannot open {source}"))?;
    let document = viewer
        .init(resolved.bytes)
        .with_context(|| format!("Cannot load {source}"))?;
    store.set_last_source(&source);
    info!(
        "Opened {source} ({} pages){}",
        document.page_count,
        if resolved.from_cache { " from cache" } else { "" }
    );

    let mut events = match &args.script {
        Some(path) => SimulatedEventSource::from_file(path)?,
        None => SimulatedEventSource::new(Vec::new()),
    };
    let interval = Duration::from_millis(settings::get_frame_interval_ms());

    replay(&mut viewer, &mut events, interval)?;
    for _ in 0..args.frames {
        frame(&mut viewer, interval);
    }

    drain(&mut viewer);
    viewer.stop();

    if let Some(output) = &args.output {
        viewer
            .front()
            .as_image()
            .save(output)
            .with_context(|| format!("Cannot write {}", output.display()))?;
        info!("Wrote frame to {}", output.display());
    }
    Ok(())
}

/// Apply script events, ticking once per `frame` marker.
fn replay(viewer: &mut Viewer, events: &mut dyn EventSource, interval: Duration) -> Result<()> {
    while events.poll(Duration::ZERO)? {
        match events.read()? {
            InputEvent::Frame => frame(viewer, interval),
            event => viewer.apply(&event),
        }
    }
    Ok(())
}

fn frame(viewer: &mut Viewer, interval: Duration) {
    let started = Instant::now();
    viewer.tick();
    if let Some(remaining) = interval.checked_sub(started.elapsed()) {
        thread::sleep(remaining);
    }
}

/// Render until the front surface shows the current transform.
fn drain(viewer: &mut Viewer) {
    for _ in 0..MAX_DRAIN_ROUNDS {
        if viewer.render_loop().is_rendering() {
            if !viewer.settle(SETTLE_TIMEOUT) && viewer.render_loop().is_rendering() {
                warn!("Render did not finish within {SETTLE_TIMEOUT:?}");
                return;
            }
        } else if !viewer.is_dirty() {
            return;
        }
        viewer.tick();
    }
    warn!("Viewer still busy after {MAX_DRAIN_ROUNDS} rounds");
}
