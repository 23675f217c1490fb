use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "thala", version)]
struct Cli {
    /// Log per-node build details.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render the frame at one point in time as a PNG.
    Frame(FrameArgs),
    /// Print the root extent and audio duration of a scene.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Engine config JSON (font, text color, TTS backend, sample rate).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
    /// Fail instead of replacing an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Output frames per second.
    #[arg(long, default_value_t = 16)]
    fps: u32,

    /// Render without an audio track.
    #[arg(long, default_value_t = false)]
    no_audio: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Time in seconds.
    #[arg(long)]
    t: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[command(flatten)]
    scene: SceneArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn load(args: &SceneArgs) -> anyhow::Result<(thala::Scene, thala::Engine)> {
    let scene = thala::Scene::from_path(&args.in_path)
        .with_context(|| format!("load scene '{}'", args.in_path.display()))?;
    let config = match &args.config {
        Some(path) => thala::EngineConfig::from_path(path)?,
        None => thala::EngineConfig::default(),
    };
    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let engine = thala::Engine::new(config, assets_root)?;
    Ok((scene, engine))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (scene, mut engine) = load(&args.scene)?;
    let opts = thala::RenderOpts {
        fps: thala::Fps::new(args.fps, 1)?,
        enable_audio: !args.no_audio,
    };
    let mut sink = thala::FfmpegSink::new(thala::FfmpegSinkOpts {
        out_path: args.out.clone(),
        overwrite: !args.no_overwrite,
    });
    let stats = engine.render(&scene, &opts, &mut sink)?;

    eprintln!(
        "wrote {} ({} frames)",
        args.out.display(),
        stats.frames_total
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (scene, mut engine) = load(&args.scene)?;
    let clip = engine.build(&scene)?;
    let frame = clip.video.image(args.t)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_rgba8(),
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let (scene, mut engine) = load(&args.scene)?;
    let clip = engine.build(&scene)?;
    let extent = clip.video.extent();
    println!("nodes: {}", scene.node_count());
    println!("size: {}x{}", extent.width, extent.height);
    println!("duration: {:.3}s", extent.duration);
    println!(
        "audio: {:.3}s, {} Hz, {} ch",
        clip.audio.duration_secs(),
        clip.audio.sample_rate(),
        clip.audio.channels()
    );
    Ok(())
}
