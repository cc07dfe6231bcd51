// capture command - one OCR scan to one stored record

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Args;

use eurostock_recon::model::Code;
use eurostock_recon::{
    CaptureContext, OcrGuess, OcrInput, Operator, ScriptedChoice, ScriptedOperator, Selection,
    UserId,
};

use crate::exit_codes::capture_exit_code;
use crate::{print_json, CliError, Env};

#[derive(Args)]
pub struct CaptureArgs {
    /// Operator capturing the scan
    #[arg(long, env = "EUROSTOCK_USER")]
    pub user: String,

    /// Storage location (default: settings `default_location`)
    #[arg(long)]
    pub location: Option<String>,

    /// Raw OCR text
    #[arg(long, conflicts_with = "text_file")]
    pub text: Option<String>,

    /// File holding the raw OCR text
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// JSON guess from the OCR service ({"text", "eurocode", "brand", "model"})
    #[arg(long)]
    pub guess: Option<PathBuf>,

    /// Pick the Nth candidate (1-based) when several codes are found
    #[arg(long, conflicts_with_all = ["decline", "cancel"])]
    pub pick: Option<usize>,

    /// Decline every candidate (saves a codeless record if allowed)
    #[arg(long, conflicts_with = "cancel")]
    pub decline: bool,

    /// Cancel if a choice is needed
    #[arg(long)]
    pub cancel: bool,

    /// Accept a record without a code when none is found
    #[arg(long)]
    pub confirm_codeless: bool,

    /// Resolve and print, but do not save
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub json: bool,
}

pub fn cmd_capture(env: &Env, args: CaptureArgs) -> Result<(), CliError> {
    let input = read_input(&args)?;
    let location = args.location.clone().or_else(|| env.settings.default_location.clone());
    let context = CaptureContext::begin(UserId::new(args.user.trim()), location, input);

    let store = env.open_store()?;
    let policy = env.settings.codeless_records;

    let found = context.candidates().len();
    let scripted = match (args.pick, args.decline, args.cancel) {
        (Some(0), _, _) => return Err(CliError::args("--pick is 1-based")),
        (Some(n), _, _) if found > 1 && n > found => {
            return Err(CliError::args(format!("--pick {n} but only {found} codes found"))
                .with_hint(format!("choose 1-{found}")));
        }
        (Some(n), _, _) => Some(ScriptedChoice::Pick(n - 1)),
        (None, true, _) => Some(ScriptedChoice::Decline),
        (None, false, true) => Some(ScriptedChoice::Cancel),
        (None, false, false) => None,
    };

    let result = match scripted {
        Some(choice) => {
            let mut op = ScriptedOperator::new(choice).confirming_codeless(args.confirm_codeless);
            context.resolve(&store, &mut op, policy)
        }
        None => {
            let stdin = io::stdin();
            let mut op = TerminalOperator::new(stdin.lock(), io::stderr())
                .with_codeless_answer(args.confirm_codeless.then_some(true));
            context.resolve(&store, &mut op, policy)
        }
    };

    let outcome = result.map_err(|e| {
        let err = CliError { code: capture_exit_code(&e), message: e.to_string(), hint: None };
        match e {
            eurostock_recon::CaptureError::NoCodeFound if !args.confirm_codeless => {
                err.with_hint("pass --confirm-codeless to save the scan without a code")
            }
            _ => err,
        }
    })?;

    let mut record = outcome.record;
    if !args.dry_run {
        record.id = Some(store.append_record(&record).map_err(CliError::store)?);
    }

    if args.json {
        let out = serde_json::json!({
            "saved": !args.dry_run,
            "record": record,
            "resolution": outcome.resolution,
        });
        return print_json(&out);
    }

    let vehicle = outcome.resolution.label().unwrap_or_else(|| "(unknown vehicle)".to_string());
    let status = if args.dry_run { "dry run" } else { "saved" };
    println!(
        "{}\t{}\t{}\t{}",
        record.code.as_deref().unwrap_or("(no code)"),
        vehicle,
        record.category,
        status
    );
    Ok(())
}

fn read_input(args: &CaptureArgs) -> Result<OcrInput, CliError> {
    let raw_text = match (&args.text, &args.text_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?,
        (None, None) => String::new(),
    };

    let guess = match &args.guess {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?;
            let guess = OcrGuess::from_json(&content)
                .map_err(|e| CliError::args(format!("invalid OCR guess {}: {e}", path.display())))?;
            Some(guess)
        }
        None => None,
    };

    if raw_text.trim().is_empty() && guess.is_none() {
        return Err(CliError::args("nothing to capture")
            .with_hint("pass --text, --text-file or --guess"));
    }

    let input = OcrInput::text(raw_text);
    Ok(match guess {
        Some(g) => input.with_guess(g),
        None => input,
    })
}

// ---------------------------------------------------------------------------
// Interactive operator
// ---------------------------------------------------------------------------

/// Prompts on `output` and reads answers from `input`. End of input cancels.
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
    confirm_codeless: Option<bool>,
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output, confirm_codeless: None }
    }

    /// Pre-answer the codeless prompt. `None` asks.
    pub fn with_codeless_answer(mut self, answer: Option<bool>) -> Self {
        self.confirm_codeless = answer;
        self
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn select(&mut self, candidates: &[Code]) -> Selection {
        let _ = writeln!(self.output, "Several Eurocodes found:");
        for (i, code) in candidates.iter().enumerate() {
            let _ = writeln!(self.output, "  {}) {}", i + 1, code);
        }

        loop {
            let _ = write!(self.output, "Choose 1-{}, n = none, c = cancel: ", candidates.len());
            let _ = self.output.flush();

            let Some(answer) = self.read_line() else {
                return Selection::Cancelled;
            };
            match answer.to_lowercase().as_str() {
                "n" | "none" => return Selection::Declined,
                "c" | "cancel" => return Selection::Cancelled,
                other => match other.parse::<usize>() {
                    Ok(n) if (1..=candidates.len()).contains(&n) => {
                        return Selection::Selected(candidates[n - 1].clone());
                    }
                    _ => {
                        let _ = writeln!(self.output, "'{answer}' is not a valid choice");
                    }
                },
            }
        }
    }

    fn confirm_codeless(&mut self, raw_text: &str) -> bool {
        if let Some(answer) = self.confirm_codeless {
            return answer;
        }
        let preview: String = raw_text.chars().take(60).collect();
        let _ = writeln!(self.output, "No Eurocode found in: {preview}");
        let _ = write!(self.output, "Save without a code? [y/N]: ");
        let _ = self.output.flush();
        matches!(self.read_line().as_deref(), Some("y" | "Y" | "yes"))
    }
}
