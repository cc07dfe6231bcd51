// prefixes command - maintain the prefix → vehicle table

use std::path::{Path, PathBuf};

use clap::Subcommand;

use eurostock_io::csv::{read_file_as_utf8, read_prefix_file, PrefixImport};
use eurostock_recon::StaticPrefixTable;

use crate::{print_json, CliError, Env};

#[derive(Subcommand)]
pub enum PrefixCommands {
    /// Load mappings from a CSV (prefix,brand[,model]) or TOML file
    #[command(after_help = "\
Examples:
  eurostock prefixes import vehicles.csv
  eurostock prefixes import vehicles.toml

Existing prefixes are overwritten. Rows with a bad prefix or no brand
are skipped and listed on stderr.")]
    Import { file: PathBuf },

    /// Print the current table
    List {
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_prefixes(env: &Env, cmd: PrefixCommands) -> Result<(), CliError> {
    match cmd {
        PrefixCommands::Import { file } => cmd_import(env, &file),
        PrefixCommands::List { json } => cmd_list(env, json),
    }
}

fn cmd_import(env: &Env, file: &Path) -> Result<(), CliError> {
    let import = load_import(file)?;
    for skipped in &import.skipped {
        eprintln!("skipped line {}: {}", skipped.line, skipped.reason);
    }
    if import.rows.is_empty() {
        return Err(CliError::args(format!("no usable mappings in {}", file.display())));
    }

    let mut store = env.open_store()?;
    let written = store.upsert_prefixes(&import.rows).map_err(CliError::store)?;
    let total = store.prefix_count().map_err(CliError::store)?;
    println!("imported {written} prefixes ({} skipped, {total} in table)", import.skipped.len());
    Ok(())
}

fn load_import(file: &Path) -> Result<PrefixImport, CliError> {
    let is_toml = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if !is_toml {
        return read_prefix_file(file).map_err(|e| {
            CliError::store(e).with_hint("expected a header row naming 'prefix' and 'brand'")
        });
    }

    let content = read_file_as_utf8(file).map_err(CliError::store)?;
    let table = StaticPrefixTable::from_toml(&content)
        .map_err(|e| CliError::args(format!("{}: {e}", file.display())))?;
    Ok(PrefixImport {
        rows: table.iter().map(|(p, m)| (p.clone(), m.clone())).collect(),
        skipped: Vec::new(),
    })
}

fn cmd_list(env: &Env, json: bool) -> Result<(), CliError> {
    let store = env.open_store()?;
    let table = store.prefix_table().map_err(CliError::store)?;

    if json {
        let rows: Vec<_> = table
            .iter()
            .map(|(prefix, mapping)| {
                serde_json::json!({
                    "prefix": prefix,
                    "brand": mapping.brand,
                    "model": mapping.model,
                })
            })
            .collect();
        return print_json(&rows);
    }

    if table.is_empty() {
        eprintln!("prefix table is empty");
        return Ok(());
    }
    for (prefix, mapping) in table.iter() {
        println!("{}\t{}\t{}", prefix, mapping.brand, mapping.model.as_deref().unwrap_or(""));
    }
    Ok(())
}
