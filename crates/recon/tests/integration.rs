use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use eurostock_recon::{
    aggregate_records, build_report, AggregateOptions, CaptureContext, CaptureError, Category,
    CodelessPolicy, Confidence, OcrInput, Operator, RawRecord, ScriptedChoice, ScriptedOperator,
    Selection, StaticPrefixTable, UserId,
};
use eurostock_recon::model::Code;

fn prefix_table() -> StaticPrefixTable {
    StaticPrefixTable::from_toml(
        r#"
[prefixes]
"2448" = { brand = "BMW" }
"6340" = { brand = "Opel", model = "Astra" }
"7293" = { brand = "Renault", model = "Clio" }
"#,
    )
    .unwrap()
}

/// Capture `text` at `location` and return the record, as the store would see it.
fn capture(text: &str, location: &str, op: &mut impl Operator) -> Result<RawRecord, CaptureError> {
    CaptureContext::begin(UserId::new("ana"), Some(location.into()), OcrInput::text(text))
        .at(Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap())
        .resolve(&prefix_table(), op, CodelessPolicy::Confirm)
        .map(|outcome| outcome.record)
}

// -------------------------------------------------------------------------
// Capture → aggregate
// -------------------------------------------------------------------------

#[test]
fn captures_reconcile_into_per_code_summaries() {
    let mut op = ScriptedOperator::new(ScriptedChoice::Cancel);
    let records = vec![
        capture("EUROCODE 6340AGAV1C", "LOJA1", &mut op).unwrap(),
        capture("6340agav1c sekurit", "LOJA2", &mut op).unwrap(),
        capture("#6340AGAV1C", "LOJA1", &mut op).unwrap(),
    ];
    assert_eq!(op.prompts, 0);

    let summaries = aggregate_records(&records, &AggregateOptions::default());
    assert_eq!(summaries.len(), 2);

    let standard = summaries.iter().find(|s| s.code == "6340AGAV1C").unwrap();
    assert_eq!(standard.total_quantity, 2);
    assert_eq!(standard.category, Category::Standard);
    assert_eq!(standard.vehicle_label.as_deref(), Some("Opel Astra"));
    assert_eq!(
        standard.locations,
        BTreeSet::from(["LOJA1".to_string(), "LOJA2".to_string()])
    );

    let complementary = summaries.iter().find(|s| s.code == "#6340AGAV1C").unwrap();
    assert_eq!(complementary.total_quantity, 1);
    assert_eq!(complementary.category, Category::Complementary);
    assert_eq!(complementary.locations, BTreeSet::from(["LOJA1".to_string()]));
}

#[test]
fn ambiguous_capture_uses_operator_choice() {
    let mut op = ScriptedOperator::new(ScriptedChoice::Pick(1));
    let record = capture("2448AGNMV1B / *7293AGAMV", "LOJA1", &mut op).unwrap();
    assert_eq!(op.prompts, 1);
    assert_eq!(record.code.as_deref(), Some("*7293AGAMV"));
    assert_eq!(record.category, Category::Oem);
    assert_eq!(record.vehicle_brand.as_deref(), Some("Renault"));
}

/// Answers with a code that was never offered.
struct RogueOperator;

impl Operator for RogueOperator {
    fn select(&mut self, _candidates: &[Code]) -> Selection {
        Selection::Selected(Code::parse("9999ZZZ").unwrap())
    }

    fn confirm_codeless(&mut self, _raw_text: &str) -> bool {
        false
    }
}

#[test]
fn selection_outside_candidates_is_rejected() {
    let err = capture("2448AGNMV1B 7293AGAMV", "LOJA1", &mut RogueOperator).unwrap_err();
    assert_eq!(err, CaptureError::InvalidSelection("9999ZZZ".into()));
}

#[test]
fn cancelled_capture_leaves_inventory_untouched() {
    let mut op = ScriptedOperator::new(ScriptedChoice::Cancel);
    let mut records = vec![capture("2448AGNMV1B", "LOJA1", &mut op).unwrap()];
    let before = aggregate_records(&records, &AggregateOptions::default());

    if let Ok(r) = capture("2448AGNMV1B 7293AGAMV", "LOJA1", &mut op) {
        records.push(r);
    }
    let after = aggregate_records(&records, &AggregateOptions::default());
    assert_eq!(before, after);
}

#[test]
fn unknown_prefix_still_produces_record() {
    let mut op = ScriptedOperator::new(ScriptedChoice::Cancel);
    let outcome = CaptureContext::begin(UserId::new("ana"), None, OcrInput::text("0000ABC"))
        .resolve(&prefix_table(), &mut op, CodelessPolicy::Confirm)
        .unwrap();
    assert_eq!(outcome.resolution.confidence, Confidence::Unknown);
    assert_eq!(outcome.resolution.label(), None);
    assert_eq!(outcome.record.code.as_deref(), Some("0000ABC"));
}

#[test]
fn report_is_stable_across_runs() {
    let mut op = ScriptedOperator::new(ScriptedChoice::Cancel);
    let records: Vec<_> = ["6340AGAV1C", "#6340AGAV1C", "*2448AGN", "6340AGAV1C"]
        .iter()
        .map(|t| capture(t, "LOJA1", &mut op).unwrap())
        .collect();
    let user = UserId::new("ana");
    let a = build_report(&user, &records, &AggregateOptions::default());
    let b = build_report(&user, &records, &AggregateOptions::default());
    assert_eq!(
        serde_json::to_string(&a.summaries).unwrap(),
        serde_json::to_string(&b.summaries).unwrap()
    );
    assert_eq!(a.totals, b.totals);
    assert_eq!(a.totals.oem, 1);
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

fn arb_code() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("—".to_string())),
        Just(Some(String::new())),
        r"[#*]?[0-9]{4}[A-Z][A-Z0-9]{0,4}".prop_map(Some),
    ]
}

fn arb_record() -> impl Strategy<Value = RawRecord> {
    (arb_code(), prop::option::of("LOJA[1-4]")).prop_map(|(code, location)| RawRecord {
        id: None,
        raw_text: code.clone().unwrap_or_default(),
        code,
        vehicle_brand: None,
        vehicle_model: None,
        captured_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        location,
        captured_by: UserId::new("ana"),
        category: Category::Standard,
    })
}

/// Words that never hold a 4-digit run followed by a letter at a word boundary.
fn arb_codeless_word() -> impl Strategy<Value = String> {
    prop_oneof![
        r"[a-zA-Z]{1,8}",
        r"[0-9]{1,3}",
        r"[0-9]{4}",
        r"[0-9]{5,9}",
        r"[0-9]{5,9}[A-Z]{1,3}",
        r"[#*][0-9]{1,3}[A-Z]{1,3}",
        r"[a-zA-Z]{1,3}[0-9]{4}[A-Z]{1,3}",
        r"[0-9]{1,3}[A-Za-z][0-9]{1,3}",
    ]
}

proptest! {
    #[test]
    fn text_without_anchored_runs_has_no_codes(
        words in prop::collection::vec(arb_codeless_word(), 0..12),
        sep in prop_oneof![Just(" "), Just("\n"), Just(", "), Just(" / ")],
    ) {
        let text = words.join(sep);
        prop_assert!(eurostock_recon::extract_codes(&text).is_empty(), "found a code in {:?}", text);
    }

    #[test]
    fn quantities_sum_to_identified_records(records in prop::collection::vec(arb_record(), 0..40)) {
        let summaries = aggregate_records(&records, &AggregateOptions::default());
        let identified = records
            .iter()
            .filter(|r| r.code.as_deref().is_some_and(|c| !c.is_empty() && c != "—"))
            .count();
        let total: usize = summaries.iter().map(|s| s.total_quantity).sum();
        prop_assert_eq!(total, identified);
    }

    #[test]
    fn aggregation_is_idempotent(records in prop::collection::vec(arb_record(), 0..40)) {
        let opts = AggregateOptions::default();
        prop_assert_eq!(aggregate_records(&records, &opts), aggregate_records(&records, &opts));
    }

    #[test]
    fn extraction_finds_every_spaced_code(codes in prop::collection::vec(r"[#*]?[0-9]{4}[A-Z][A-Z0-9]{0,5}", 1..6)) {
        let text = codes.join(" ");
        let found: Vec<String> = eurostock_recon::extract_codes(&text)
            .into_iter()
            .map(Code::into_string)
            .collect();
        let mut expected: Vec<String> = Vec::new();
        for c in &codes {
            if !expected.contains(c) {
                expected.push(c.clone());
            }
        }
        prop_assert_eq!(found, expected);
    }
}
