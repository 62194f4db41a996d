use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use vapack::{
    AnimConfig, BoxType, ConsoleListener, RateControl, VideoCodec, VideoPipeline, find_box,
    mp4_box::{read_payload, write_box_file},
};

#[derive(Parser, Debug)]
#[command(name = "vapack", version, about = "Pack transparent animations into alpha-carrying MP4s")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack a frame sequence (or a .webm) and encode it into an MP4 with embedded metadata.
    Create(CreateArgs),
    /// Wrap a payload file into a standalone box.
    Wrap(WrapArgs),
    /// Locate a box inside a container and print or extract its payload.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct CreateArgs {
    /// Directory of `000.png`, `001.png`, ... frames, or a `.webm` video.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Base configuration JSON; flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (default: `<in>/output`).
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    ffmpeg: Option<String>,

    /// Container editor used to splice the metadata box.
    #[arg(long, conflicts_with = "no_mp4edit")]
    mp4edit: Option<String>,

    /// Encode without splicing the metadata box.
    #[arg(long)]
    no_mp4edit: bool,

    #[arg(long, value_enum)]
    codec: Option<CodecChoice>,

    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    force_key_frames: Option<String>,

    /// Alpha region scale in [0.5, 1.0].
    #[arg(long)]
    scale: Option<f64>,

    /// Target bitrate in kbps.
    #[arg(long, conflicts_with = "crf")]
    bitrate: Option<i64>,

    /// Constant rate factor, 0-51.
    #[arg(long)]
    crf: Option<i32>,

    /// `.mp3` soundtrack to mux into the video.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Maximum number of frames packed concurrently.
    #[arg(long)]
    threads: Option<usize>,

    /// Stop after packing frames.
    #[arg(long)]
    frames_only: bool,
}

#[derive(Parser, Debug)]
struct WrapArgs {
    /// Payload file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Box file to write.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value = "vapc")]
    box_type: BoxType,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Container file to scan.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Also write the payload here.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value = "vapc")]
    box_type: BoxType,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    H264,
    H265,
}

impl From<CodecChoice> for VideoCodec {
    fn from(c: CodecChoice) -> Self {
        match c {
            CodecChoice::H264 => VideoCodec::H264,
            CodecChoice::H265 => VideoCodec::H265,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Create(args) => cmd_create(args),
        Command::Wrap(args) => cmd_wrap(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn build_config(args: &CreateArgs) -> anyhow::Result<AnimConfig> {
    let mut cfg = match &args.config {
        Some(path) => AnimConfig::from_json_file(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => AnimConfig::default(),
    };

    if let Some(v) = &args.in_path {
        cfg.input = v.clone();
    }
    if let Some(v) = &args.out {
        cfg.output = Some(v.clone());
    }
    if let Some(v) = &args.ffmpeg {
        cfg.ffmpeg_cmd = v.clone();
    }
    if let Some(v) = &args.mp4edit {
        cfg.mp4edit_cmd = Some(v.clone());
    }
    if args.no_mp4edit {
        cfg.mp4edit_cmd = None;
    }
    if let Some(v) = args.codec {
        cfg.codec = v.into();
    }
    if let Some(v) = args.fps {
        cfg.fps = v;
    }
    if let Some(v) = &args.force_key_frames {
        cfg.force_key_frames = v.clone();
    }
    if let Some(v) = args.scale {
        cfg.scale = v;
    }
    if let Some(v) = args.bitrate {
        cfg.rate_control = RateControl::Bitrate(v);
    }
    if let Some(v) = args.crf {
        cfg.rate_control = RateControl::Crf(v);
    }
    if let Some(v) = &args.audio {
        cfg.audio = Some(v.clone());
    }
    if let Some(v) = args.threads {
        cfg.max_parallelism = v;
    }

    if cfg.input.as_os_str().is_empty() {
        anyhow::bail!("no input given (use --in or set \"input\" in --config)");
    }
    Ok(cfg)
}

fn cmd_create(args: CreateArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args)?;
    let pipeline = VideoPipeline::new(Arc::new(ConsoleListener::new()));
    let out = pipeline.create(&cfg, !args.frames_only)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_wrap(args: WrapArgs) -> anyhow::Result<()> {
    let out = write_box_file(&args.in_path, &args.out, args.box_type)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let f = File::open(&args.in_path)
        .with_context(|| format!("open container '{}'", args.in_path.display()))?;
    let mut reader = BufReader::new(f);

    let Some(location) = find_box(&mut reader, args.box_type)? else {
        anyhow::bail!(
            "no '{}' box found in '{}'",
            args.box_type,
            args.in_path.display()
        );
    };
    println!(
        "{} box at offset {}: payload {} bytes at offset {}",
        location.box_type, location.box_offset, location.payload_length, location.payload_offset
    );

    let payload = read_payload(&mut reader, &location)?;
    if let Ok(text) = std::str::from_utf8(&payload) {
        println!("{text}");
    }

    if let Some(out) = &args.out {
        std::fs::write(out, &payload)
            .with_context(|| format!("write payload '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}
