use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use minivsfs_core::{FormatManager, FormatOptions, FormatReport, InjectOptions};
use minivsfs_filesystems::{verify_image, Image, MiniVsfsFormatter, MiniVsfsInjector};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "minivsfs", version)]
#[command(about = "Create MiniVSFS images and add files to them", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh image containing only the root directory
    Format {
        /// Output image path
        #[arg(long)]
        image: PathBuf,
        /// Image size in KiB (180-4096, multiple of 4)
        #[arg(long)]
        size_kib: u64,
        /// Number of inodes (128-512)
        #[arg(long)]
        inodes: u64,
        /// Print the layout without writing the image
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy an image, adding one file to its root directory
    Inject {
        /// Source image
        #[arg(long)]
        input: PathBuf,
        /// Destination image (may equal the source)
        #[arg(long)]
        output: PathBuf,
        /// File to add
        #[arg(long)]
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check checksums, bitmaps, and the root directory of an image
    Verify {
        /// Image to check
        #[arg(long)]
        image: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version print to stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Returns `Ok(false)` when the command ran but the result is a failure
/// (a verification that found errors).
fn run(command: Commands) -> anyhow::Result<bool> {
    let manager = FormatManager::new(Arc::new(MiniVsfsFormatter), Arc::new(MiniVsfsInjector));
    debug!("minivsfs {}", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Format {
            image,
            size_kib,
            inodes,
            dry_run,
            json,
        } => {
            let options = FormatOptions::new(size_kib, inodes);
            if dry_run {
                let report = manager.simulate_format(&options)?;
                print_report(&report, json, print_layout)?;
            } else {
                let report = manager.execute_format(&image, &options)?;
                print_report(&report, json, |r| {
                    println!("MiniVSFS created: {}", image.display());
                    println!("Size: {} KiB ({} blocks)", r.options.size_kib, r.total_blocks);
                    println!("Inodes: {}", r.options.inode_count);
                })?;
            }
        }
        Commands::Inject {
            input,
            output,
            file,
            json,
        } => {
            let options = InjectOptions { input, output, file };
            let report = manager.execute_inject(&options)?;
            print_report(&report, json, |r| {
                println!("Successfully added '{}' to filesystem", r.name);
                println!("  Inode: {}", r.inode);
                println!("  Size: {} bytes in {} block(s) {:?}", r.size_bytes, r.blocks.len(), r.blocks);
            })?;
        }
        Commands::Verify { image, json } => {
            let parsed = Image::open(&image)
                .with_context(|| format!("cannot verify {}", image.display()))?;
            let report = verify_image(&parsed);
            print_report(&report, json, |r| {
                println!("Image: {}", image.display());
                println!("  Built: {}", r.stats.built_at);
                println!("  Inodes: {} of {} used", r.stats.inodes_used, r.stats.inodes_total);
                println!(
                    "  Data blocks: {} of {} used",
                    r.stats.data_blocks_used, r.stats.data_blocks_total
                );
                println!("  Files: {}", r.stats.files);
                for warning in &r.warnings {
                    println!("  warning: {}", warning);
                }
                for error in &r.errors {
                    println!("  error: {}", error);
                }
                println!("{}", if r.is_valid { "OK" } else { "CORRUPTED" });
            })?;
            return Ok(report.is_valid);
        }
    }

    Ok(true)
}

fn print_report<T: Serialize>(report: &T, json: bool, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        text(report);
    }
    Ok(())
}

fn print_layout(report: &FormatReport) {
    println!(
        "Layout for {} KiB, {} inodes ({} blocks):",
        report.options.size_kib, report.options.inode_count, report.total_blocks
    );
    for region in &report.regions {
        println!(
            "  {:<12} blocks {:>4}..{:<4} ({} blocks)",
            region.name,
            region.start,
            region.start + region.blocks,
            region.blocks
        );
    }
}
