// inventory / totals commands - per-code summaries and category rollups

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;

use eurostock_io::csv::{write_records, write_summaries};
use eurostock_recon::{
    authorize, build_report, category_rollup, Caller, Category, InventoryReport, Role, Scope,
    UserId,
};

use crate::exit_codes::scope_exit_code;
use crate::{parse_category, parse_role, print_json, CliError, Env};

#[derive(Args)]
pub struct InventoryArgs {
    /// Caller's user id
    #[arg(long, env = "EUROSTOCK_USER")]
    pub user: String,

    /// Caller's role: operator, manager or admin
    #[arg(long, value_parser = parse_role, default_value = "operator")]
    pub role: Role,

    /// Read another user's records (manager/admin only)
    #[arg(long = "for", value_name = "USER")]
    pub target: Option<String>,

    /// Only codes of one category: standard, complementary or oem
    #[arg(long, value_parser = parse_category)]
    pub category: Option<Category>,

    #[arg(long, conflicts_with = "csv")]
    pub json: bool,

    /// Export as CSV to a file ("-" for stdout)
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Export one row per capture instead of per code
    #[arg(long, requires = "csv")]
    pub records: bool,
}

#[derive(Args)]
pub struct TotalsArgs {
    /// Caller's user id
    #[arg(long, env = "EUROSTOCK_USER")]
    pub user: String,

    /// Caller's role: operator, manager or admin
    #[arg(long, value_parser = parse_role, default_value = "operator")]
    pub role: Role,

    /// Read another user's totals (manager/admin only)
    #[arg(long = "for", value_name = "USER")]
    pub target: Option<String>,

    #[arg(long)]
    pub json: bool,
}

/// Resolve whose records to read, enforcing the caller's role.
fn scoped_user(user: &str, role: Role, target: Option<&str>) -> Result<UserId, CliError> {
    let caller = Caller { user: UserId::new(user.trim()), role };
    let scope = match target.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Scope::User(UserId::new(t)),
        None => Scope::Own,
    };
    authorize(&caller, &scope).map_err(|e| CliError {
        code: scope_exit_code(&e),
        message: e.to_string(),
        hint: None,
    })
}

pub fn cmd_inventory(env: &Env, args: InventoryArgs) -> Result<(), CliError> {
    let user = scoped_user(&args.user, args.role, args.target.as_deref())?;
    let store = env.open_store()?;

    if let Some(path) = &args.csv {
        if args.records {
            let records = store.records_for(&user, args.category).map_err(CliError::store)?;
            return export_csv(path, |out| write_records(out, &records));
        }
        let report = load_report(env, &store, &user, args.category)?;
        return export_csv(path, |out| write_summaries(out, &report.summaries));
    }

    let report = load_report(env, &store, &user, args.category)?;
    if args.json {
        return print_json(&report);
    }
    print_table(&report);
    Ok(())
}

pub fn cmd_totals(env: &Env, args: TotalsArgs) -> Result<(), CliError> {
    let user = scoped_user(&args.user, args.role, args.target.as_deref())?;
    let store = env.open_store()?;
    let records = store.records_for(&user, None).map_err(CliError::store)?;
    let totals = category_rollup(&records);

    if args.json {
        let out = serde_json::json!({
            "user": user,
            "totals": totals,
        });
        return print_json(&out);
    }

    for category in Category::ALL {
        println!("{:<14}{:>6}", category.as_str(), totals.count(category));
    }
    println!("{:<14}{:>6}", "total", totals.total);
    Ok(())
}

/// Summaries honour the category filter; totals always cover every record.
fn load_report(
    env: &Env,
    store: &eurostock_io::Store,
    user: &UserId,
    category: Option<Category>,
) -> Result<InventoryReport, CliError> {
    let records = store.records_for(user, None).map_err(CliError::store)?;
    let options = env.settings.aggregate_options(category);
    Ok(build_report(user, &records, &options))
}

fn export_csv<F>(path: &Path, write: F) -> Result<(), CliError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), eurostock_io::StoreError>,
{
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        return write(&mut lock).map_err(CliError::store);
    }

    let mut file = File::create(path)
        .map_err(|e| CliError::args(format!("cannot create {}: {e}", path.display())))?;
    write(&mut file).map_err(CliError::store)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn print_table(report: &InventoryReport) {
    if report.summaries.is_empty() {
        eprintln!("no records for {}", report.meta.user);
        return;
    }

    let code_width = report.summaries.iter().map(|s| s.code.len()).max().unwrap_or(4).max(4);
    println!("{:<code_width$}  {:>4}  {:<14}  {:<24}  LOCATIONS", "CODE", "QTY", "CATEGORY", "VEHICLE");
    for s in &report.summaries {
        let locations = s.locations.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        println!(
            "{:<code_width$}  {:>4}  {:<14}  {:<24}  {}",
            s.code,
            s.total_quantity,
            s.category.as_str(),
            s.vehicle_label.as_deref().unwrap_or("-"),
            locations
        );
    }
    println!();
    println!(
        "{} units, {} codes (standard {}, complementary {}, oem {})",
        report.total_units(),
        report.summaries.len(),
        report.totals.standard,
        report.totals.complementary,
        report.totals.oem
    );
}
