//! Storage Pool Reader - reconstruct volumes from storage pool metadata.
//!
//! Metadata regions are files of back-to-back raw records, as carved out of
//! the pool's metadata area.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pool_reader::records::{
    decode_records, PhysicalDiskRecord, SchemaDetector, SlabAllocationRecord, VolumeLayout,
    VolumeRecord,
};
use pool_reader::storage::DiskSource;
use pool_reader::{PoolGeneration, StreamConfig, VolumeStream};
use serde::Serialize;
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pool-reader")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Reconstruct volumes from storage pool metadata",
    long_about = "Decodes storage pool metadata records and reads logical volumes straight from the physical disk."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a region of physical disk records
    Disks {
        /// File holding the raw records
        region: PathBuf,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a region of volume records
    Volumes {
        /// File holding the raw records
        region: PathBuf,

        /// Volume record layout (default: detect)
        #[arg(long, value_enum, default_value = "auto")]
        layout: LayoutArg,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a region of slab allocation records
    Slabs {
        /// File holding the raw records
        region: PathBuf,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a volume's allocated blocks into an output image
    Extract {
        #[command(flatten)]
        volume: VolumeArgs,

        /// Output image (holes are left sparse)
        #[arg(long)]
        output: PathBuf,
    },

    /// Hex dump a byte range of a volume
    Dump {
        #[command(flatten)]
        volume: VolumeArgs,

        /// Volume offset to start at
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Number of bytes to dump
        #[arg(long, default_value = "512")]
        length: u64,
    },
}

#[derive(Args)]
struct VolumeArgs {
    /// Physical disk image or device
    #[arg(long)]
    image: PathBuf,

    /// Byte offset of the pool data area in the image
    #[arg(long, default_value = "0")]
    origin: u64,

    /// Pool generation (legacy or current)
    #[arg(long)]
    generation: PoolGeneration,

    /// Volume record region
    #[arg(long)]
    volumes: PathBuf,

    /// Slab allocation record region
    #[arg(long)]
    slabs: PathBuf,

    /// Ordinal of the volume to read
    #[arg(long)]
    volume: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Auto,
    Legacy,
    Current,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Disks { region, json } => cmd_disks(&region, json),

        Commands::Volumes {
            region,
            layout,
            json,
        } => cmd_volumes(&region, layout, json),

        Commands::Slabs { region, json } => cmd_slabs(&region, json),

        Commands::Extract { volume, output } => cmd_extract(&volume, &output),

        Commands::Dump {
            volume,
            offset,
            length,
        } => cmd_dump(&volume, offset, length),
    }
}

fn read_region(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading record region {}", path.display()))
}

fn print_records<T: Serialize + Display>(records: &[T], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else if records.is_empty() {
        println!("(no records)");
    } else {
        for record in records {
            println!("{}", record);
        }
    }
    Ok(())
}

fn decode_volumes(region: &[u8], layout: LayoutArg) -> pool_reader::Result<Vec<VolumeRecord>> {
    match layout {
        LayoutArg::Auto => {
            let mut detector = SchemaDetector::new();
            decode_records(region, |c| detector.decode_volume(c))
        }
        LayoutArg::Legacy => decode_records(region, |c| VolumeRecord::decode(c, VolumeLayout::Legacy)),
        LayoutArg::Current => {
            decode_records(region, |c| VolumeRecord::decode(c, VolumeLayout::Current))
        }
    }
}

fn cmd_disks(region: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = read_region(region)?;
    let disks = decode_records(&bytes, PhysicalDiskRecord::decode)?;
    print_records(&disks, json)
}

fn cmd_volumes(region: &Path, layout: LayoutArg, json: bool) -> anyhow::Result<()> {
    let bytes = read_region(region)?;
    let volumes = decode_volumes(&bytes, layout)?;
    print_records(&volumes, json)
}

fn cmd_slabs(region: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = read_region(region)?;
    let slabs = decode_records(&bytes, SlabAllocationRecord::decode)?;
    print_records(&slabs, json)
}

fn open_volume(args: &VolumeArgs) -> anyhow::Result<VolumeStream<DiskSource>> {
    let volumes = decode_volumes(&read_region(&args.volumes)?, LayoutArg::Auto)?;
    let slabs = decode_records(&read_region(&args.slabs)?, SlabAllocationRecord::decode)?;

    let Some(volume) = volumes.iter().find(|v| v.number == args.volume) else {
        bail!(
            "volume {} not found ({} volumes in region)",
            args.volume,
            volumes.len()
        );
    };

    let disk = DiskSource::open(&args.image)?;
    let config = StreamConfig::new(args.generation, args.origin);
    let stream = VolumeStream::open(disk, &config, volume, &slabs)
        .with_context(|| format!("opening volume {}", volume))?;

    tracing::info!(
        volume = volume.number,
        length = stream.len(),
        slabs = stream.map().table().len(),
        "opened volume"
    );
    Ok(stream)
}

fn cmd_extract(args: &VolumeArgs, output: &Path) -> anyhow::Result<()> {
    let mut stream = open_volume(args)?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(output)
        .with_context(|| format!("creating {}", output.display()))?;
    file.set_len(stream.len())?;

    let written = stream.copy_to(&mut file, |done, total| {
        if total > 0 {
            eprint!("\rExtracting: {:>6.2}%", done as f64 * 100.0 / total as f64);
        }
        Ok(())
    })?;
    eprintln!();

    println!(
        "Wrote {} allocated bytes of a {} byte volume to {}",
        written,
        stream.len(),
        output.display()
    );

    Ok(())
}

fn cmd_dump(args: &VolumeArgs, offset: u64, length: u64) -> anyhow::Result<()> {
    let mut stream = open_volume(args)?;
    if offset >= stream.len() {
        bail!("offset {} is past the end of the volume ({} bytes)", offset, stream.len());
    }

    let length = length.min(stream.len() - offset) as usize;
    let mut buf = vec![0u8; length];
    stream.seek(SeekFrom::Start(offset))?;
    let read = stream.read_span(&mut buf, 0, length)?;

    let mut out = io::stdout().lock();
    for (i, line) in buf[..read].chunks(16).enumerate() {
        let ascii: String = line
            .iter()
            .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
            .collect();
        writeln!(
            out,
            "{:016x}  {:<32}  {}",
            offset + (i * 16) as u64,
            hex::encode(line),
            ascii
        )?;
    }

    Ok(())
}
