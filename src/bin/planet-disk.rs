//! Planet Disk CLI
//!
//! Replays the fragmentation, versioning, backup and collapse scenario against
//! an in-memory disk.

use anyhow::Context;
use clap::{Parser, Subcommand};
use planet_disk::{Digest, Disk, DiskBuilder, DiskConfig, SystemClock};
use std::path::PathBuf;
use tracing::{info, warn};

const SERVER_LOG: &str = "C:/ProgramFiles/Teddy_Server/logs/teddy_server_log.txt";
const SERVER_SCRIPT: &str = "C:/ProgramFiles/Teddy_Server/teddy_server.py";
const SERVER_CONFIG: &str = "C:/ProgramFiles/Teddy_Server/config/settings.ini";

const LOG_PAYLOAD: &[u8] =
    b"LOG_START. Server (teddy_server) received command: Connect. Status: OK. Disconnect.";

#[derive(Parser, Debug)]
#[command(name = "planet-disk")]
#[command(about = "Sector allocation model: fragmentation, compaction, commit/rollback, collapse")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full disk scenario and log each step
    Demo {
        /// TOML configuration file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fragment size for the fragmented log file
        #[arg(short, long, default_value = "10")]
        fragment_size: usize,

        /// Author recorded on commits
        #[arg(short, long, default_value = "admin")]
        author: String,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Demo {
            config,
            fragment_size,
            author,
        } => {
            let builder = match config {
                Some(path) => DiskBuilder::from_file(&path)
                    .with_context(|| format!("loading configuration from {:?}", path))?,
                None => DiskBuilder::new(),
            };
            let mut disk = builder.build()?;
            run_demo(&mut disk, fragment_size, &author)?;
        }
        Command::Config => {
            print!("{}", DiskConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}

fn run_demo(disk: &mut Disk, fragment_size: usize, author: &str) -> anyhow::Result<()> {
    let clock = SystemClock;

    info!("Step 1: install");
    disk.write(SERVER_SCRIPT, b"# Teddy Server v1.0.0")?;
    disk.write(SERVER_CONFIG, b"version=1.0.0\nport=8080")?;

    info!("Step 2: fragmented write");
    let fragmented = disk.fragment_write(SERVER_LOG, LOG_PAYLOAD, fragment_size)?;
    info!(
        "{} placed on {} sectors with {} breaks: {:?}",
        SERVER_LOG,
        fragmented.len(),
        fragmented.fragment_count(),
        fragmented.addresses()
    );

    info!("Step 3: defragment");
    let compacted = disk.defragment(SERVER_LOG)?;
    info!("{} now occupies {:?}", SERVER_LOG, compacted.addresses());
    anyhow::ensure!(
        disk.read(SERVER_LOG)? == LOG_PAYLOAD,
        "defragmentation changed the log contents"
    );

    info!("Step 4: commit an update");
    let legacy = Digest::of_payload(&disk.read(SERVER_SCRIPT)?);
    let update = disk.commit(
        SERVER_SCRIPT,
        b"# Teddy Server v1.1.0",
        author,
        "Update Teddy Server to v1.1.0",
        &clock,
    )?;
    info!("Legacy digest {}, update digest {}", legacy.short(), update.short());

    info!("Step 5: rollback");
    disk.rollback(SERVER_SCRIPT, &legacy)?;
    info!(
        "{} restored: {}",
        SERVER_SCRIPT,
        String::from_utf8_lossy(&disk.read(SERVER_SCRIPT)?)
    );

    info!("Step 6: backup");
    let report = disk.backup(&[SERVER_SCRIPT, SERVER_CONFIG], &clock)?;
    for (file, sector) in &report.placements {
        info!("Backed up {} to sector {}", file, sector);
    }

    info!("Step 7: collapse");
    let collapse = disk.collapse();
    warn!(
        "Allocation table lost: {} files unmounted, critical sectors {:?} zeroed",
        collapse.files_unmounted, collapse.sectors_zeroed
    );
    for file in [SERVER_SCRIPT, SERVER_CONFIG, SERVER_LOG] {
        info!("{} reachable: {}", file, disk.exists(file));
    }

    info!("Step 8: restore from backup");
    for file in [SERVER_SCRIPT, SERVER_CONFIG] {
        let extents = disk.restore_backup(file)?;
        info!("{} re-mounted at {:?}", file, extents.addresses());
    }

    println!("{}", serde_json::to_string_pretty(&disk.stats())?);
    Ok(())
}
