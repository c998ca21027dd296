//! CLI for administering Postfix configuration.
//!
//! # Usage
//!
//! ```bash
//! # Read configuration values
//! postconf-rs get mydomain mydestination
//!
//! # Write configuration values
//! postconf-rs set mydomain=example.com
//!
//! # Show what drifted from the declared baselines
//! postconf-rs audit
//!
//! # Re-apply a module's baseline
//! postconf-rs repair submission
//!
//! # Full text report of all audits
//! postconf-rs report
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use postconf_rs::audit::{self, Diagnosis, DiagnosisStatus};
use postconf_rs::config::{Config, LogFormat};
use postconf_rs::error::ConfError;
use postconf_rs::lock::LockRegistry;
use postconf_rs::postconf::{ConfigStore, PostconfRunner};

const AUDIT_MODULES: [&str; 3] = ["domain", "spam", "submission"];

#[derive(Parser)]
#[command(name = "postconf-rs")]
#[command(about = "Administer Postfix configuration safely", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one or more configuration values
    Get {
        /// Configuration keys
        keys: Vec<String>,
    },
    /// Write one or more configuration values
    Set {
        /// key=value pairs
        pairs: Vec<String>,
    },
    /// Diff the live configuration against the declared baselines
    Audit {
        /// Audit a single module instead of all of them
        #[arg(long)]
        module: Option<String>,
        /// Emit the diagnoses as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-apply a module's baseline configuration
    Repair {
        /// Module name (see `audit`)
        module: String,
    },
    /// Print a text report of all audits
    Report,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if std::path::Path::new(&cli.config).exists() {
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    };

    init_logging(&config);

    let runner = Arc::new(PostconfRunner::new(
        &config.postconf.program,
        Duration::from_secs(config.postconf.timeout_secs),
    ));
    let locks = Arc::new(LockRegistry::new(&config.postconf.lock_dir));
    let store = ConfigStore::new(runner, locks);

    match cli.command {
        Commands::Get { keys } => {
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            for (key, value) in store.get_many(&key_refs).await? {
                println!("{} = {}", key, value);
            }
        }
        Commands::Set { pairs } => {
            let mut kv_map = std::collections::BTreeMap::new();
            for pair in &pairs {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    ConfError::InvalidFormat(format!("expected key=value, got {:?}", pair))
                })?;
                kv_map.insert(key.to_string(), value.to_string());
            }
            store.set_many(&kv_map).await?;
            info!("{} value(s) set", kv_map.len());
        }
        Commands::Audit { module, json } => {
            let modules: Vec<&str> = match &module {
                Some(name) => vec![check_module_name(name)?],
                None => AUDIT_MODULES.to_vec(),
            };

            let mut diagnoses = Vec::new();
            for name in modules {
                diagnoses.push(run_module_check(&store, &config, name).await);
            }
            diagnoses.sort_by_key(Diagnosis::sorting_key);

            if json {
                println!("{}", serde_json::to_string_pretty(&diagnoses)?);
            } else {
                for diagnosis in &diagnoses {
                    print_diagnosis(diagnosis);
                }
            }
        }
        Commands::Repair { module } => {
            let name = check_module_name(&module)?;
            let diagnosis = run_module_check(&store, &config, name).await;

            match diagnosis.status {
                DiagnosisStatus::Ok => {
                    println!("{}: nothing to repair", diagnosis.title);
                    return Ok(());
                }
                DiagnosisStatus::Critical => {
                    print_diagnosis(&diagnosis);
                    return Err(Box::new(ConfError::NotRepairable(diagnosis.title))
                        as Box<dyn std::error::Error>);
                }
                DiagnosisStatus::Failed => {}
            }

            print_diagnosis(&diagnosis);
            match name {
                "domain" => {
                    audit::domain::apply(&store, &config.domains.primary, &config.all_domains())
                        .await?
                }
                "spam" => audit::spam::apply(&store).await?,
                "submission" => audit::submission::apply(&store).await?,
                _ => unreachable!("module name already checked"),
            }

            // The repair ran outside the observation lock, so only a fresh
            // audit can tell whether the configuration is clean now.
            let fresh = run_module_check(&store, &config, name).await;
            println!("{}: {} after repair", fresh.title, fresh.status);
        }
        Commands::Report => {
            let mut report = String::new();
            report.push_str("Postfix configuration report\n");
            report.push_str(&"=".repeat(60));
            report.push_str("\n\n");

            for name in AUDIT_MODULES {
                let diagnosis = run_module_check(&store, &config, name).await;
                report.push_str(&format!("[{}] {}\n", diagnosis.status, diagnosis.title));
                for finding in &diagnosis.findings {
                    report.push_str(&format!("  {}\n", finding));
                }
                for (key, value) in &diagnosis.advice {
                    report.push_str(&format!("  would set {} = {}\n", key, value));
                }
                report.push('\n');
            }

            print!("{}", report);
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let level: Level = config.logging.level.parse().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Pretty => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .pretty()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
        LogFormat::Compact => {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("Failed to set tracing subscriber");
        }
    }
}

fn check_module_name(name: &str) -> Result<&'static str, ConfError> {
    AUDIT_MODULES
        .iter()
        .find(|m| **m == name)
        .copied()
        .ok_or_else(|| ConfError::Config(format!("unknown audit module: {}", name)))
}

async fn run_module_check(store: &ConfigStore, config: &Config, name: &str) -> Diagnosis {
    match name {
        "domain" => audit::domain::check(store, &config.domains.primary, &config.all_domains()).await,
        "spam" => audit::spam::check(store).await,
        "submission" => audit::submission::check(store).await,
        _ => unreachable!("module name already checked"),
    }
}

fn print_diagnosis(diagnosis: &Diagnosis) {
    match diagnosis.status {
        DiagnosisStatus::Ok => println!("{}: ok", diagnosis.title),
        DiagnosisStatus::Failed => {
            println!("{}: drift detected", diagnosis.title);
            for finding in &diagnosis.findings {
                println!("  {}", finding);
            }
            for (key, value) in &diagnosis.advice {
                println!("  would set {} = {}", key, value);
            }
        }
        DiagnosisStatus::Critical => {
            println!("{}: could not verify", diagnosis.title);
            for finding in &diagnosis.findings {
                println!("  {}", finding);
            }
        }
    }
}
