use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use profilesync::config::{config_file_path, load_or_default, save, workspace_root};

fn main() -> Result<()> {
    fs::create_dir_all(workspace_root()?)?;
    let args = CliArgs::parse()?;
    let config_path = config_file_path()?;
    let mut config = load_or_default()?;
    let mut changed = !config_path.exists();

    if let Some(ms) = args.quiescence_ms {
        if config.debounce.quiescence_ms != ms {
            config.debounce.quiescence_ms = ms;
            changed = true;
        }
    }
    if let Some(persist) = args.persist_journal {
        if config.journal.persist != persist {
            config.journal.persist = persist;
            changed = true;
        }
    }

    if changed {
        save(&config)?;
        println!("Sync settings recorded at {}", config_path.display());
    } else {
        println!("Sync settings already configured.");
    }

    Ok(())
}

struct CliArgs {
    quiescence_ms: Option<u64>,
    persist_journal: Option<bool>,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut quiescence_ms = None;
        let mut persist_journal = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiescence-ms" => {
                    let value = args
                        .next()
                        .context("Expected a millisecond value after --quiescence-ms")?;
                    let ms = value
                        .parse::<u64>()
                        .with_context(|| format!("'{value}' is not a number of milliseconds"))?;
                    quiescence_ms = Some(ms);
                }
                "--persist-journal" => persist_journal = Some(true),
                "--no-persist-journal" => persist_journal = Some(false),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument '{other}'. Run with --help for usage instructions."
                    ));
                }
            }
        }
        Ok(Self {
            quiescence_ms,
            persist_journal,
        })
    }
}

fn print_usage() {
    println!("ProfileSync setup");
    println!("Writes debounce and journal settings to config.toml.");
    println!("Usage: cargo run --bin setup -- [options]");
    println!("Options:");
    println!("  --quiescence-ms <ms>    Quiet period before an edit is saved (default: 1000)");
    println!("  --persist-journal       Mirror sync events to sync_events.jsonl");
    println!("  --no-persist-journal    Keep sync events in memory only");
}
