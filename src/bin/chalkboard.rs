use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chalkboard::{
    ChoreographySource, CpuRenderer, DiagramDocument, EngineConfig, EntityId, ExportOptions,
    Exporter, FfmpegWebmEncoder, FrameSource, SceneRenderer as _, Selection, Sequence,
    SequenceSource,
};

#[derive(Parser, Debug)]
#[command(name = "chalkboard", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the batches a diagram would play, as JSON.
    Plan(PlanArgs),
    /// Render the choreography at one point in time as a PNG.
    Frame(FrameArgs),
    /// Export a WebM video (requires `ffmpeg` with libvpx-vp9).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Diagram document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Engine config JSON; overrides the document's own config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restrict to one entity's causal chain.
    #[arg(long)]
    entity: Option<String>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Playback time in milliseconds.
    #[arg(long, default_value_t = 0.0)]
    at_ms: f64,

    #[arg(long, default_value_t = 1050)]
    width: u32,

    #[arg(long, default_value_t = 680)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Keyframe sequence JSON; exports the sequence instead of the annotations.
    #[arg(long)]
    sequence: Option<PathBuf>,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Output WebM path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn read_document(input: &InputArgs) -> anyhow::Result<DiagramDocument> {
    let raw = std::fs::read_to_string(&input.in_path)
        .with_context(|| format!("read diagram '{}'", input.in_path.display()))?;
    let mut doc = DiagramDocument::from_json_str(&raw)
        .with_context(|| format!("parse diagram '{}'", input.in_path.display()))?;
    if let Some(path) = &input.config {
        doc.config = EngineConfig::from_json_path(path)?;
    }
    Ok(doc)
}

fn selection(input: &InputArgs) -> Option<Selection> {
    input
        .entity
        .as_ref()
        .map(|id| Selection::Entity(EntityId::new(id.as_str())))
}

fn choreography_source(
    doc: &DiagramDocument,
    input: &InputArgs,
) -> anyhow::Result<ChoreographySource> {
    let source = match selection(input) {
        Some(sel) => ChoreographySource::scoped(&doc.diagram, &sel, doc.config.clone())?,
        None => ChoreographySource::new(&doc.diagram, doc.config.clone())?,
    };
    Ok(source)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let doc = read_document(&args.input)?;
    let queue = match selection(&args.input) {
        Some(sel) => chalkboard::build_scoped(&doc.diagram, &sel, &doc.config),
        None => chalkboard::build_unscoped(&doc.diagram, &doc.config),
    };
    let Some(queue) = queue else {
        eprintln!("nothing to animate");
        return Ok(());
    };

    let batches: Vec<serde_json::Value> = queue
        .batches()
        .iter()
        .map(|batch| {
            serde_json::json!({
                "step": batch.first().map(|q| q.step),
                "duration_ms": chalkboard::choreography::queue::batch_duration_ms(batch),
                "items": batch,
            })
        })
        .collect();
    let out = serde_json::json!({
        "replay": queue.replay,
        "total_ms": queue.total_duration_ms(),
        "batches": batches,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let doc = read_document(&args.input)?;
    let mut source = choreography_source(&doc, &args.input)?;
    let scene = source.scene_at(args.at_ms.max(0.0))?;

    let mut renderer = CpuRenderer::new(args.width, args.height, doc.config.render.clone())?;
    let frame = renderer.render(&scene)?;

    chalkboard::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let doc = read_document(&args.input)?;
    let mut source: Box<dyn FrameSource> = match &args.sequence {
        Some(path) => Box::new(SequenceSource::new(read_sequence(path)?, &doc.diagram)?),
        None => Box::new(choreography_source(&doc, &args.input)?),
    };

    let options = ExportOptions {
        fps: args.fps,
        width: args.width,
        height: args.height,
    };
    let mut renderer = CpuRenderer::new(args.width, args.height, doc.config.render.clone())?;
    let mut encoder = FfmpegWebmEncoder::new(doc.config.render.background_rgba);

    let mut last_tenth = 0u32;
    let bytes = Exporter::new().export(
        source.as_mut(),
        &mut renderer,
        &mut encoder,
        options,
        &mut |p| {
            let tenth = (p * 10.0).floor() as u32;
            if tenth > last_tenth {
                last_tenth = tenth;
                eprintln!("export {}%", tenth * 10);
            }
        },
    )?;

    chalkboard::encode::ffmpeg::ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write video '{}'", args.out.display()))?;
    eprintln!("wrote {} ({} bytes)", args.out.display(), bytes.len());
    Ok(())
}

fn read_sequence(path: &Path) -> anyhow::Result<Sequence> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read sequence '{}'", path.display()))?;
    Ok(Sequence::from_json(&raw)?)
}
