use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tabflow_core::{
    plan_transition, ExplanationBundle, JsonFileService, LayoutEngine, Session,
    VisualizerConfig,
};
use tracing::{error, info};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode and validate a bundle, then print a summary of its steps
    Validate {
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,
    },
    /// Print the transition plan between every pair of consecutive steps as JSON
    Plan {
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Visualizer settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Autoplay a bundle and write every frame as a PNG
    Render {
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Output directory for frames
        #[arg(long, default_value = "frames")]
        out: PathBuf,

        /// Frames per second
        #[arg(long, default_value_t = 30)]
        fps: u32,

        #[arg(long, default_value_t = 800)]
        width: u32,

        #[arg(long, default_value_t = 500)]
        height: u32,

        /// Visualizer settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many frames
        #[arg(long, default_value_t = 10_000)]
        max_frames: u32,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_directive(level))
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
}

fn level_directive(level: LogLevel) -> Directive {
    let level = match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };
    level.into()
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Validate { bundle } => validate(&bundle),
        Command::Plan { bundle, config } => plan(&bundle, config.as_deref()),
        Command::Render {
            bundle,
            out,
            fps,
            width,
            height,
            config,
            max_frames,
        } => render(
            &bundle,
            &out,
            fps,
            (width, height),
            config.as_deref(),
            max_frames,
        ),
    }
}

fn read_bundle(path: &Path) -> Result<ExplanationBundle> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading bundle {}", path.display()))?;
    ExplanationBundle::from_json(&text)
        .with_context(|| format!("invalid bundle {}", path.display()))
}

fn read_config(path: Option<&Path>) -> Result<VisualizerConfig> {
    match path {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(VisualizerConfig::default()),
    }
}

fn validate(path: &Path) -> Result<()> {
    let bundle = read_bundle(path)?;
    println!("{}", bundle.overall_summary);
    for (index, step) in bundle.steps.iter().enumerate() {
        let phase = step
            .phase()
            .map(|p| format!("{:?}", p).to_lowercase())
            .unwrap_or_else(|| "-".to_string());
        let groups = step.groups.as_ref().map(Vec::len).unwrap_or(0);
        println!(
            "{:>3}  {:<12} {:>3} cols {:>4} rows {:>3} groups  {}",
            index,
            phase,
            step.table.columns.len(),
            step.table.rows.len(),
            groups,
            step.title
        );
    }
    info!(steps = bundle.len(), "bundle is valid");
    Ok(())
}

fn plan(path: &Path, config: Option<&Path>) -> Result<()> {
    let bundle = read_bundle(path)?;
    let config = read_config(config)?;
    let mut engine = LayoutEngine::new(config.geometry);

    let mut plans = Vec::with_capacity(bundle.len());
    let mut previous = None;
    for (index, step) in bundle.steps.iter().enumerate() {
        let plan = plan_transition(previous, step, &mut engine)?;
        plans.push(serde_json::json!({
            "from": index.checked_sub(1),
            "to": index,
            "title": step.title,
            "plan": plan,
        }));
        previous = Some(step);
    }
    println!("{}", serde_json::to_string_pretty(&plans)?);
    Ok(())
}

fn render(
    path: &Path,
    out: &Path,
    fps: u32,
    (width, height): (u32, u32),
    config: Option<&Path>,
    max_frames: u32,
) -> Result<()> {
    if fps == 0 {
        bail!("--fps must be positive");
    }
    let config = read_config(config)?;
    let mut session = Session::new(config, width as f32, height as f32);

    let service = JsonFileService::new(path);
    pollster::block_on(session.analyze(&service, ""))
        .with_context(|| format!("loading bundle {}", path.display()))?;

    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    info!("Output: {:?}", out);

    session.toggle_play(0.0)?;
    let frame_ms = 1000.0 / fps as f64;
    let mut frame = 0u32;
    loop {
        let now = frame as f64 * frame_ms;
        session.tick(now)?;

        let png = session.snapshot_png()?;
        let file = out.join(format!("frame_{:05}.png", frame));
        fs::write(&file, png).with_context(|| format!("writing {}", file.display()))?;

        frame += 1;
        let done = !session.cursor().playing && now >= session.settled_at();
        if done || frame >= max_frames {
            break;
        }
    }

    info!(frames = frame, "Render complete.");
    Ok(())
}
