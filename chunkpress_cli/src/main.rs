use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;

use chunkpress_codecs::{codec_by_id, codec_from_config};
use chunkpress_core::format::HEADER_SIZE;
use chunkpress_core::{
    AdvisorPolicy, ArchiveHeader, ArchiveReader, ArchiveWriter, ChunkpressConfig, CodecKind,
    CompressionEngine, EngineConfig, MetricsTotals,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "chunkpress",
    about = "Adaptive chunk compression for backup payloads: pack, restore, inspect, and probe",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command that compresses.
#[derive(clap::Args)]
struct EngineArgs {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Codec to use: deflate | rle | zstd | lz4
    #[arg(short, long)]
    codec: Option<CodecKind>,
    /// Codec level (deflate 0-9, zstd 1-22)
    #[arg(long)]
    level: Option<u32>,
    /// Raw bytes per chunk
    #[arg(short = 's', long)]
    chunk_size: Option<u32>,
    /// Advisor policy: size_threshold | sampled_entropy
    #[arg(long)]
    policy: Option<AdvisorPolicy>,
    /// Chunks smaller than this are never compressed
    #[arg(long)]
    min_size: Option<usize>,
    /// Required fractional saving before a compressed chunk is kept
    #[arg(long)]
    min_savings: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a file into a chunk archive
    Compress {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Destination archive
        output: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Restore the original bytes from a chunk archive
    Restore {
        /// Source archive
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Print header metadata and chunk index statistics
    Inspect {
        /// Archive to inspect
        file: PathBuf,
        /// Print per-chunk details
        #[arg(long)]
        chunks: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Restore a single chunk by index
    ReadChunk {
        /// Archive
        file: PathBuf,
        /// Zero-based chunk index
        #[arg(short, long)]
        index: u64,
        /// Write raw bytes to a file instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the engine over a file in memory and report what it would store
    Probe {
        /// File to probe
        input: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
        /// Print per-chunk metrics
        #[arg(long)]
        chunks: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn resolve_config(args: &EngineArgs) -> anyhow::Result<ChunkpressConfig> {
    let mut config = match &args.config {
        Some(path) => ChunkpressConfig::load(path)?,
        None => ChunkpressConfig::default(),
    };
    if let Some(kind) = args.codec {
        if kind != config.codec.kind {
            config.codec.level = None;
        }
        config.codec.kind = kind;
    }
    if let Some(level) = args.level {
        config.codec.level = Some(level);
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(policy) = args.policy {
        config.engine.advisor.policy = policy;
    }
    if let Some(min_size) = args.min_size {
        config.engine.advisor.min_size = min_size;
    }
    if let Some(min_savings) = args.min_savings {
        config.engine.min_savings = min_savings;
    }
    config.validate()?;
    Ok(config)
}

fn build_engine(config: &ChunkpressConfig) -> CompressionEngine {
    CompressionEngine::new(codec_from_config(&config.codec), &config.engine)
}

/// Open an archive with the codec named in its own header.
fn open_archive(path: &Path) -> anyhow::Result<ArchiveReader> {
    let codec_id = {
        let mut f = File::open(path).with_context(|| format!("opening archive {:?}", path))?;
        let mut buf = [0u8; HEADER_SIZE as usize];
        f.read_exact(&mut buf)
            .with_context(|| format!("reading header of {:?}", path))?;
        ArchiveHeader::from_bytes(&buf)?.codec_id
    };
    let engine = CompressionEngine::new(codec_by_id(codec_id)?, &EngineConfig::default());
    ArchiveReader::open(path, engine)
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn throughput(bytes: u64, secs: f64) -> String {
    if secs > 0.0 {
        format!("{}/s", human_bytes((bytes as f64 / secs) as u64))
    } else {
        "n/a".to_string()
    }
}

fn print_totals(totals: &MetricsTotals) {
    eprintln!("  chunks      : {}", totals.operations);
    eprintln!("  compressed  : {}", totals.compressed_operations);
    eprintln!("  raw size    : {}", human_bytes(totals.original_bytes));
    eprintln!("  stored size : {}", human_bytes(totals.stored_bytes));
    eprintln!("  ratio       : {:.4}", totals.overall_ratio());
    eprintln!("  saved       : {}", human_bytes(totals.bytes_saved()));
}

/// Feed `input` to `sink` in pieces of at most `piece` bytes.
fn pump(input: &Path, piece: usize, mut sink: impl FnMut(&[u8]) -> anyhow::Result<()>) -> anyhow::Result<()> {
    let mut src: Box<dyn Read> = if input.to_str() == Some("-") {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(input).with_context(|| format!("opening input file {:?}", input))?;
        Box::new(BufReader::new(file))
    };
    let mut buf = vec![0u8; piece.max(1)];
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        sink(&buf[..n])?;
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: PathBuf, args: EngineArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let engine = build_engine(&config);
    info!(
        "codec={} level={:?} chunk_size={} policy={} min_size={} min_savings={}",
        config.codec.kind,
        config.codec.level,
        config.chunk_size,
        config.engine.advisor.policy,
        config.engine.advisor.min_size,
        config.engine.min_savings
    );

    let mut writer = ArchiveWriter::create(&output, engine, config.chunk_size)
        .with_context(|| format!("creating archive {:?}", output))?;

    let t0 = Instant::now();
    pump(&input, config.chunk_size as usize, |piece| writer.write(piece))?;
    let summary = writer.finish()?;
    let elapsed = t0.elapsed();

    let archive_size = std::fs::metadata(&output)?.len();
    eprintln!("  codec       : {}", config.codec.kind);
    eprintln!("  chunk size  : {}", human_bytes(config.chunk_size as u64));
    print_totals(&summary.totals);
    eprintln!("  archive     : {}", human_bytes(archive_size));
    eprintln!(
        "  throughput  : {}",
        throughput(summary.totals.original_bytes, elapsed.as_secs_f64())
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_restore(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let mut reader = open_archive(&input)?;

    let mut dst: Box<dyn Write> = if output.to_str() == Some("-") {
        Box::new(io::stdout().lock())
    } else {
        Box::new(
            File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
        )
    };

    let t0 = Instant::now();
    let mut totals = MetricsTotals::default();
    for idx in 0..reader.chunk_count() {
        let (chunk, metrics) = reader
            .read_chunk_with_metrics(idx)
            .with_context(|| format!("restoring {:?}", input))?;
        totals.record(&metrics);
        dst.write_all(&chunk)?;
    }
    dst.flush()?;

    let elapsed = t0.elapsed();
    eprintln!("  chunks      : {}", totals.operations);
    eprintln!("  decoded     : {}", totals.compressed_operations);
    eprintln!("  raw size    : {}", human_bytes(totals.original_bytes));
    eprintln!(
        "  throughput  : {}",
        throughput(totals.original_bytes, elapsed.as_secs_f64())
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_chunks: bool, as_json: bool) -> anyhow::Result<()> {
    let reader = open_archive(&file)?;
    let h = &reader.header;
    let compressed = reader.entries().iter().filter(|e| e.is_compressed()).count();

    if as_json {
        let mut doc = json!({
            "version": h.version,
            "codec_id": h.codec_id,
            "chunk_size": h.chunk_size,
            "chunk_count": h.chunk_count,
            "flags": h.flags,
            "compressed_chunks": compressed,
            "raw_size": reader.raw_size(),
            "stored_size": reader.stored_size(),
            "compression_ratio": reader.compression_ratio(),
        });
        if show_chunks {
            doc["chunks"] = reader
                .entries()
                .iter()
                .map(|e| {
                    json!({
                        "offset": e.offset,
                        "stored_len": e.stored_len,
                        "raw_len": e.raw_len,
                        "checksum": format!("{:016x}", e.checksum),
                        "compressed": e.is_compressed(),
                    })
                })
                .collect();
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("=== chunkpress archive: {:?} ===", file);
    println!("  version     : {}", h.version);
    println!("  codec id    : {}", h.codec_id);
    println!("  chunk size  : {}", human_bytes(h.chunk_size as u64));
    println!("  chunks      : {} ({} compressed)", h.chunk_count, compressed);
    println!("  flags       : {:#018x}", h.flags);
    println!("  raw size    : {}", human_bytes(reader.raw_size()));
    println!("  stored size : {}", human_bytes(reader.stored_size()));
    println!("  ratio       : {:.4}", reader.compression_ratio());

    if show_chunks {
        println!();
        println!(
            "  {:>6}  {:>12}  {:>12}  {:>12}  {:>5}  {:>16}",
            "chunk", "offset", "stored", "raw", "comp", "checksum"
        );
        for (i, e) in reader.entries().iter().enumerate() {
            println!(
                "  {:>6}  {:>12}  {:>12}  {:>12}  {:>5}  {:016x}",
                i,
                e.offset,
                human_bytes(e.stored_len as u64),
                human_bytes(e.raw_len as u64),
                if e.is_compressed() { "yes" } else { "no" },
                e.checksum
            );
        }
    }
    Ok(())
}

fn run_read_chunk(file: PathBuf, index: u64, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut reader = open_archive(&file)?;
    let entry = reader
        .entries()
        .get(index as usize)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("chunk index {} out of range (total {})", index, reader.chunk_count()))?;

    eprintln!(
        "seeking to chunk {} (offset {}, {}, {})...",
        index,
        entry.offset,
        human_bytes(entry.stored_len as u64),
        if entry.is_compressed() { "compressed" } else { "raw" }
    );

    let t0 = Instant::now();
    let raw = reader.read_chunk(index)?;
    eprintln!(
        "  restored {} in {:.3}ms",
        human_bytes(raw.len() as u64),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    match output {
        Some(path) => {
            std::fs::write(&path, &raw)?;
            eprintln!("  written to {:?}", path);
        }
        None => print_hex_preview(index, &raw),
    }
    Ok(())
}

fn print_hex_preview(index: u64, raw: &[u8]) {
    let preview = &raw[..raw.len().min(256)];
    println!("--- chunk {} ({} bytes, first {} shown) ---", index, raw.len(), preview.len());
    for (i, row) in preview.chunks(16).enumerate() {
        let hex: String = row.iter().map(|b| format!("{:02x} ", b)).collect();
        let text: String = row
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("  {:04x}  {:<48}  |{}|", i * 16, hex, text);
    }
    if raw.len() > 256 {
        println!("  ... ({} bytes remaining not shown)", raw.len() - 256);
    }
}

fn run_probe(input: PathBuf, args: EngineArgs, show_chunks: bool, as_json: bool) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let engine = build_engine(&config);
    let chunk_size = config.chunk_size as usize;

    let mut totals = MetricsTotals::default();
    let mut per_chunk = Vec::new();
    let mut pending: Vec<u8> = Vec::with_capacity(chunk_size);

    let mut probe_chunk = |chunk: &[u8], totals: &mut MetricsTotals| -> anyhow::Result<()> {
        let packed = engine.compress_with_metrics(chunk);
        let restored = engine
            .decompress_with_metrics(&packed.data, packed.metrics.compression_used)
            .with_context(|| format!("chunk {} failed to decode", totals.operations))?;
        if restored.data != chunk {
            anyhow::bail!("chunk {} did not round-trip", totals.operations);
        }
        let mut metrics = packed.metrics;
        metrics.decompression_time_ms = restored.metrics.decompression_time_ms;
        totals.record(&metrics);
        if show_chunks {
            per_chunk.push(metrics);
        }
        Ok(())
    };

    pump(&input, chunk_size, |piece| {
        let mut piece = piece;
        while !piece.is_empty() {
            let take = (chunk_size - pending.len()).min(piece.len());
            pending.extend_from_slice(&piece[..take]);
            piece = &piece[take..];
            if pending.len() == chunk_size {
                probe_chunk(&pending, &mut totals)?;
                pending.clear();
            }
        }
        Ok(())
    })?;
    if !pending.is_empty() {
        probe_chunk(&pending, &mut totals)?;
    }

    if as_json {
        let mut doc = json!({
            "codec": config.codec.kind.name(),
            "chunk_size": config.chunk_size,
            "policy": config.engine.advisor.policy,
            "totals": totals,
            "overall_ratio": totals.overall_ratio(),
        });
        if show_chunks {
            doc["chunks"] = serde_json::to_value(&per_chunk)?;
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("=== probe: {:?} with {} ===", input, config.codec.kind);
    if show_chunks {
        println!(
            "  {:>6}  {:>12}  {:>12}  {:>5}  {:>8}  {:>8}",
            "chunk", "raw", "stored", "comp", "ratio", "ms"
        );
        for (i, m) in per_chunk.iter().enumerate() {
            println!(
                "  {:>6}  {:>12}  {:>12}  {:>5}  {:>8.4}  {:>8}",
                i,
                human_bytes(m.original_size as u64),
                human_bytes(m.compressed_size as u64),
                if m.compression_used { "yes" } else { "no" },
                m.compression_ratio,
                m.compression_time_ms
            );
        }
    }
    print_totals(&totals);
    println!("  round trip  : ok");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Compress {
            input,
            output,
            engine,
        } => run_compress(input, output, engine),
        Commands::Restore { input, output } => run_restore(input, output),
        Commands::Inspect { file, chunks, json } => run_inspect(file, chunks, json),
        Commands::ReadChunk {
            file,
            index,
            output,
        } => run_read_chunk(file, index, output),
        Commands::Probe {
            input,
            engine,
            chunks,
            json,
        } => run_probe(input, engine, chunks, json),
    }
}
