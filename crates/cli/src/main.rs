// eurostock CLI - windshield Eurocode capture and inventory reconciliation

mod capture;
mod exit_codes;
mod inventory;
mod prefixes;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use eurostock_config::Settings;
use eurostock_io::Store;
use eurostock_recon::{classify, extract_codes, resolve, Category, EurocodeError, Role};

use exit_codes::{store_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "eurostock")]
#[command(about = "Windshield Eurocode capture and inventory reconciliation")]
#[command(version)]
struct Cli {
    /// Settings file (default: platform config dir)
    #[arg(long, global = true, env = "EUROSTOCK_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite store, overriding the settings file
    #[arg(long, global = true, env = "EUROSTOCK_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the Eurocodes found in OCR text
    #[command(after_help = "\
Examples:
  eurostock extract '#2448AGNMV1B *7293AGAMV'
  cat scan.txt | eurostock extract --json")]
    Extract {
        /// Text to scan (omit to read stdin)
        text: Option<String>,

        /// Output a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Resolve a code's prefix to a vehicle brand/model
    #[command(after_help = "\
Examples:
  eurostock resolve 2448AGNMV1B
  eurostock resolve '*7293AGAMV' --json")]
    Resolve {
        code: String,

        #[arg(long)]
        json: bool,
    },

    /// Print the stock category of one or more codes
    Classify {
        #[arg(required = true)]
        codes: Vec<String>,
    },

    /// Resolve one OCR capture and save it as a record
    #[command(after_help = "\
Examples:
  eurostock capture --user ana --location LOJA1 --text '6340AGAV1C'
  eurostock capture --user ana --text '2448AGNMV1B *7293AGAMV' --pick 2
  eurostock capture --user ana --guess scan.json --dry-run --json")]
    Capture(capture::CaptureArgs),

    /// Per-code inventory summaries for a user's records
    #[command(after_help = "\
Examples:
  eurostock inventory --user ana
  eurostock inventory --user ana --category oem --json
  eurostock inventory --user gil --role manager --for ana --csv stock.csv
  eurostock inventory --user ana --csv - --records")]
    Inventory(inventory::InventoryArgs),

    /// Category totals (standard / complementary / oem)
    Totals(inventory::TotalsArgs),

    /// Manage the prefix → vehicle table
    #[command(subcommand)]
    Prefixes(prefixes::PrefixCommands),
}

/// Resolved settings plus the store location for this invocation.
pub struct Env {
    pub settings: Settings,
    pub db_path: PathBuf,
}

impl Env {
    fn load(config: Option<PathBuf>, db: Option<PathBuf>) -> Result<Self, CliError> {
        let settings = match config {
            Some(path) => Settings::load_from(&path).map_err(|e| CliError {
                code: EXIT_CONFIG,
                message: e.to_string(),
                hint: Some(format!("default location is {}", Settings::config_path().display())),
            })?,
            None => Settings::load(),
        };
        let db_path = db.unwrap_or_else(|| settings.database_path());
        Ok(Self { settings, db_path })
    }

    pub fn open_store(&self) -> Result<Store, CliError> {
        Store::open(&self.db_path).map_err(|e| CliError {
            code: store_exit_code(&e),
            message: format!("cannot open store {}: {e}", self.db_path.display()),
            hint: None,
        })
    }
}

type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Install the subscriber before settings load so their warnings are kept.
/// Returns a handle when `EUROSTOCK_LOG` is unset and the filter may follow
/// the settings' `log_level`.
fn init_logging() -> Option<LogHandle> {
    let from_env = EnvFilter::try_from_env("EUROSTOCK_LOG").ok();
    let follows_settings = from_env.is_none();
    let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("warn")));

    // stdout carries command output; diagnostics go to stderr
    let console = fmt::layer().with_writer(io::stderr).with_target(false);
    let installed = tracing_subscriber::registry().with(filter).with(console).try_init().is_ok();

    (installed && follows_settings).then_some(handle)
}

fn apply_log_level(handle: Option<LogHandle>, level: &str) {
    if let Some(handle) = handle {
        let _ = handle.reload(EnvFilter::new(level));
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log = init_logging();

    let result = Env::load(cli.config, cli.db).and_then(|env| {
        apply_log_level(log, &env.settings.log_level);
        run(cli.command, &env)
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, env: &Env) -> Result<(), CliError> {
    match command {
        Commands::Extract { text, json } => cmd_extract(text, json),
        Commands::Resolve { code, json } => cmd_resolve(env, code, json),
        Commands::Classify { codes } => cmd_classify(codes),
        Commands::Capture(args) => capture::cmd_capture(env, args),
        Commands::Inventory(args) => inventory::cmd_inventory(env, args),
        Commands::Totals(args) => inventory::cmd_totals(env, args),
        Commands::Prefixes(cmd) => prefixes::cmd_prefixes(env, cmd),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn store(err: eurostock_io::StoreError) -> Self {
        Self { code: store_exit_code(&err), message: err.to_string(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}

pub fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>()
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}

// ---------------------------------------------------------------------------
// extract / resolve / classify
// ---------------------------------------------------------------------------

fn cmd_extract(text: Option<String>, json: bool) -> Result<(), CliError> {
    let text = match text {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::args(format!("cannot read stdin: {e}")))?;
            buf
        }
    };

    let codes = extract_codes(&text);
    if json {
        return print_json(&codes);
    }
    for code in &codes {
        println!("{code}");
    }
    if codes.is_empty() {
        eprintln!("no eurocode found");
    }
    Ok(())
}

fn cmd_resolve(env: &Env, code: String, json: bool) -> Result<(), CliError> {
    let store = env.open_store()?;
    let code = code.trim().to_uppercase();

    let resolution = match resolve(&store, &code) {
        Ok(r) => r,
        Err(EurocodeError::InvalidCodeFormat { .. }) => {
            tracing::warn!(%code, "no 4-digit prefix; reporting as unknown");
            eurostock_recon::VehicleResolution::unknown()
        }
        Err(e) => return Err(CliError { code: exit_codes::EXIT_STORE, message: e.to_string(), hint: None }),
    };

    if json {
        let out = serde_json::json!({
            "code": code,
            "label": resolution.label(),
            "resolution": resolution,
            "category": classify(&code),
        });
        return print_json(&out);
    }

    println!(
        "{}\t{}\t{}",
        code,
        resolution.label().unwrap_or_else(|| "(unknown vehicle)".to_string()),
        resolution.confidence.as_str()
    );
    Ok(())
}

fn cmd_classify(codes: Vec<String>) -> Result<(), CliError> {
    for code in codes {
        println!("{}\t{}", code.trim().to_uppercase(), classify(&code));
    }
    Ok(())
}
