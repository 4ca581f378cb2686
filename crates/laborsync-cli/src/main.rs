//! LaborSync CLI
//!
//! Thin wrapper around laborsync-core functions for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Import a session from a JSON export
//! laborsync session import session.json
//!
//! # Show the stored session
//! laborsync session show
//!
//! # Produce a share URL for the stored session
//! laborsync share link
//!
//! # Produce a share URL including settings marked shareable
//! laborsync share link --include-settings
//!
//! # Render the snapshot as a QR code SVG
//! laborsync share qr --out snapshot.svg
//!
//! # Publish the snapshot to a relay and get a short code
//! laborsync share relay --relay-url https://relay.example.com
//!
//! # Inspect a URL, short code, or raw snapshot without saving
//! laborsync preview "blue-tiger-42" --relay-url https://relay.example.com
//!
//! # Receive a snapshot and store it locally
//! laborsync receive "https://contractions.app/#snapshot=..."
//!
//! # Exercise the full offer/answer handshake over an in-process pair
//! laborsync peer loopback
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use laborsync_core::codec::filter_by_categories;
use laborsync_core::peer::{
    accept_offer, create_memory_pair, create_offer, DataChannel, MemoryProfile, PeerConfig,
};
use laborsync_core::snapshot::QR_CHAR_BUDGET;
use laborsync_core::{
    classify_share_input, compress_session, decompress_session, fits_qr, preview, snapshot_url,
    DecompressedSnapshot, RelayClient, SessionData, SettingsPatch, ShareInput, SnapshotError,
    Storage,
};

/// LaborSync - labor session sharing
#[derive(Parser)]
#[command(name = "laborsync")]
#[command(version = "0.1.0")]
#[command(about = "LaborSync - labor session sharing")]
#[command(
    long_about = "Compress labor tracking sessions into shareable snapshots: URLs, QR codes, relay short codes, and direct peer-to-peer transfer."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.laborsync/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Share the stored session
    Share {
        #[command(subcommand)]
        action: ShareAction,
    },

    /// Decode a snapshot and store the session locally
    Receive {
        /// Share URL, relay short code, or raw snapshot text
        input: String,

        /// Relay base URL, required when the input is a short code
        #[arg(long)]
        relay_url: Option<String>,

        /// Show what the snapshot contains without storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect a snapshot without storing anything
    Preview {
        /// Share URL, relay short code, or raw snapshot text
        input: String,

        /// Relay base URL, required when the input is a short code
        #[arg(long)]
        relay_url: Option<String>,
    },

    /// Peer-to-peer connection tools
    Peer {
        #[command(subcommand)]
        action: PeerAction,
    },

    /// Local session management
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum ShareAction {
    /// Print a share URL for the stored session
    Link {
        /// Include settings marked shareable in the snapshot
        #[arg(long)]
        include_settings: bool,
    },

    /// Render the snapshot as an SVG QR code
    Qr {
        /// Include settings marked shareable in the snapshot
        #[arg(long)]
        include_settings: bool,

        /// Minimum image dimension in pixels
        #[arg(long, default_value_t = 300)]
        size: u32,

        /// Write the SVG here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Publish the snapshot to a relay and print the short code
    Relay {
        /// Include settings marked shareable in the snapshot
        #[arg(long)]
        include_settings: bool,

        /// Relay base URL
        #[arg(long)]
        relay_url: String,
    },
}

#[derive(Subcommand)]
enum PeerAction {
    /// Run host and guest over an in-process endpoint pair and
    /// transfer the stored session across the data channel
    Loopback,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Import a session from a JSON file
    Import {
        /// Path to a session JSON export
        file: PathBuf,
    },

    /// Export the stored session as JSON
    Export {
        /// Write here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print a summary of the stored session
    Show,

    /// Delete the stored session
    Clear {
        /// Also delete stored settings
        #[arg(long)]
        all: bool,
    },

    /// Write session and settings as one backup document
    Backup {
        /// Write here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Restore a backup document, replacing session and settings
    Restore {
        /// Path to a backup file
        file: PathBuf,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (~/.laborsync/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".laborsync")
        .join("data")
}

fn open_storage(data_dir: &std::path::Path) -> Result<Storage> {
    Storage::new(data_dir.join("laborsync.redb"))
        .with_context(|| format!("failed to open storage in {}", data_dir.display()))
}

fn load_stored_session(storage: &Storage) -> Result<SessionData> {
    storage
        .load_session()?
        .context("no stored session; run `laborsync session import` first")
}

/// Build the settings fragment that travels with a snapshot, or `None`
/// when nothing is marked shareable.
fn shared_settings(storage: &Storage, include: bool) -> Result<Option<SettingsPatch>> {
    if !include {
        return Ok(None);
    }
    let patch = storage.load_settings()?;
    let prefs = match &patch.sharing_preferences {
        Some(prefs) => prefs.clone(),
        None => return Ok(None),
    };
    let shared = filter_by_categories(&patch, &prefs);
    if shared.is_empty() {
        Ok(None)
    } else {
        Ok(Some(shared))
    }
}

fn print_preview(snapshot: &DecompressedSnapshot) {
    let summary = preview(&snapshot.session, snapshot.shared_settings.as_ref());

    println!("Snapshot (format v{}):", snapshot.version);
    println!(
        "  Contractions: {} ({} completed)",
        summary.contraction_count, summary.completed_count
    );
    println!("  Events: {}", summary.event_count);
    if let Some(range) = &summary.time_range {
        println!("  Time range: {}", range);
    }
    if let Some(started) = summary.session_started {
        println!("  Session started: {}", started.to_rfc3339());
    }
    if summary.included_categories.is_empty() {
        println!("  Settings: none included");
    } else {
        let names: Vec<&str> = summary
            .included_categories
            .iter()
            .map(|c| c.as_str())
            .collect();
        println!("  Settings: {}", names.join(", "));
    }
}

/// Resolve a URL, short code, or raw paste down to a decoded snapshot.
async fn resolve_input(input: &str, relay_url: Option<&str>) -> Result<DecompressedSnapshot> {
    let classified =
        classify_share_input(input).context("input is not a share URL, short code, or snapshot")?;

    let compressed = match classified {
        ShareInput::Url(code) | ShareInput::Raw(code) => code,
        ShareInput::Code(short_code) => {
            let relay_url =
                relay_url.context("input is a relay short code; pass --relay-url to fetch it")?;
            let client = RelayClient::new(relay_url);
            client.fetch(&short_code).await?
        }
    };

    Ok(decompress_session(&compressed)?)
}

async fn run_loopback(session: SessionData) -> Result<()> {
    let (host_endpoint, guest_endpoint) =
        create_memory_pair(MemoryProfile::default(), MemoryProfile::default());
    let config = PeerConfig::default();

    let pending = create_offer(host_endpoint, config.clone()).await?;
    println!(
        "Offer: {} chars, {} ICE candidates",
        pending.offer_code.len(),
        pending.ice_result.candidate_count
    );

    let accepted = accept_offer(guest_endpoint, &pending.offer_code, config).await?;
    println!("Answer: {} chars", accepted.answer_code.len());

    let answer_code = accepted.answer_code.clone();
    let guest = tokio::spawn(async move { accepted.wait_for_connection().await });
    let host = pending.wait_for_answer(&answer_code).await?;

    let payload = compress_session(&session, None)?;
    host.channel().send(payload.as_bytes()).await?;

    let guest = guest.await.context("guest task panicked")??;
    let received = guest
        .channel()
        .recv()
        .await?
        .ok_or_else(|| SnapshotError::PeerChannel("channel closed before snapshot arrived".into()))?;
    let text = String::from_utf8(received).context("peer sent non-UTF-8 data")?;
    let snapshot = decompress_session(&text)?;

    println!(
        "Transferred {} contractions over the data channel",
        snapshot.session.contractions.len()
    );

    host.close();
    guest.close();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    match cli.command {
        Commands::Share { action } => {
            let storage = open_storage(&data_dir)?;
            let session = load_stored_session(&storage)?;

            match action {
                ShareAction::Link { include_settings } => {
                    let settings = shared_settings(&storage, include_settings)?;
                    let code = compress_session(&session, settings.as_ref())?;
                    println!("{}", snapshot_url(&code));
                }

                ShareAction::Qr {
                    include_settings,
                    size,
                    out,
                } => {
                    let settings = shared_settings(&storage, include_settings)?;
                    let code = compress_session(&session, settings.as_ref())?;
                    if !fits_qr(&code) {
                        bail!(
                            "snapshot is {} chars, too large for a scannable QR code ({} max); \
                             use `share relay` instead",
                            code.len(),
                            QR_CHAR_BUDGET
                        );
                    }
                    let svg = laborsync_core::qr::snapshot_qr_svg(&code, size)?;
                    match out {
                        Some(path) => {
                            std::fs::write(&path, svg)
                                .with_context(|| format!("failed to write {}", path.display()))?;
                            println!("Wrote QR code to {}", path.display());
                        }
                        None => println!("{}", svg),
                    }
                }

                ShareAction::Relay {
                    include_settings,
                    relay_url,
                } => {
                    let settings = shared_settings(&storage, include_settings)?;
                    let code = compress_session(&session, settings.as_ref())?;
                    let client = RelayClient::new(relay_url);
                    let short_code = client.publish(&code).await?;
                    println!("{}", short_code);
                    println!("(codes expire 5 minutes after creation)");
                }
            }
        }

        Commands::Receive {
            input,
            relay_url,
            dry_run,
        } => {
            let snapshot = resolve_input(&input, relay_url.as_deref()).await?;
            print_preview(&snapshot);

            if dry_run {
                return Ok(());
            }

            let storage = open_storage(&data_dir)?;
            storage.save_session(&snapshot.session)?;
            if let Some(incoming) = &snapshot.shared_settings {
                let mut local = storage.load_settings()?;
                incoming.overlay(&mut local);
                storage.save_settings(&local)?;
            }
            println!("Stored session in {}", data_dir.display());
        }

        Commands::Preview { input, relay_url } => {
            let snapshot = resolve_input(&input, relay_url.as_deref()).await?;
            print_preview(&snapshot);
        }

        Commands::Peer { action } => match action {
            PeerAction::Loopback => {
                let storage = open_storage(&data_dir)?;
                let session = load_stored_session(&storage)?;
                run_loopback(session).await?;
            }
        },

        Commands::Session { action } => {
            let storage = open_storage(&data_dir)?;

            match action {
                SessionAction::Import { file } => {
                    let raw = std::fs::read_to_string(&file)
                        .with_context(|| format!("failed to read {}", file.display()))?;
                    let session: SessionData = serde_json::from_str(&raw)
                        .with_context(|| format!("{} is not a session export", file.display()))?;
                    storage.save_session(&session)?;
                    println!(
                        "Imported session with {} contractions",
                        session.contractions.len()
                    );
                }

                SessionAction::Export { out } => {
                    let session = load_stored_session(&storage)?;
                    let json = serde_json::to_string_pretty(&session)?;
                    match out {
                        Some(path) => {
                            std::fs::write(&path, json)
                                .with_context(|| format!("failed to write {}", path.display()))?;
                            println!("Exported session to {}", path.display());
                        }
                        None => println!("{}", json),
                    }
                }

                SessionAction::Show => {
                    let session = load_stored_session(&storage)?;
                    let snapshot = DecompressedSnapshot {
                        session,
                        shared_settings: None,
                        version: 2,
                    };
                    print_preview(&snapshot);
                }

                SessionAction::Clear { all } => {
                    if all {
                        storage.clear_all()?;
                        println!("Cleared stored session and settings");
                    } else {
                        storage.clear_session()?;
                        println!("Cleared stored session");
                    }
                }

                SessionAction::Backup { out } => {
                    let backup = storage.export_backup()?;
                    match out {
                        Some(path) => {
                            std::fs::write(&path, backup)
                                .with_context(|| format!("failed to write {}", path.display()))?;
                            println!("Wrote backup to {}", path.display());
                        }
                        None => println!("{}", backup),
                    }
                }

                SessionAction::Restore { file } => {
                    let raw = std::fs::read_to_string(&file)
                        .with_context(|| format!("failed to read {}", file.display()))?;
                    storage.import_backup(&raw)?;
                    println!("Restored backup from {}", file.display());
                }
            }
        }
    }

    Ok(())
}
