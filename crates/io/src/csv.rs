// Prefix table import and inventory export

use std::io::Write;
use std::path::Path;

use eurostock_recon::{InventorySummary, Prefix, PrefixMapping, RawRecord};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// A row that could not become a prefix mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the source file (header = line 1).
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PrefixImport {
    pub rows: Vec<(Prefix, PrefixMapping)>,
    pub skipped: Vec<SkippedRow>,
}

pub fn read_prefix_file(path: &Path) -> Result<PrefixImport, StoreError> {
    let content = read_file_as_utf8(path)?;
    parse_prefix_csv(&content)
}

/// Parse `prefix,brand,model` rows. A header naming the columns is required;
/// `model` is optional. Bad rows are skipped and reported, not fatal.
pub fn parse_prefix_csv(content: &str) -> Result<PrefixImport, StoreError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };
    let prefix_col = column("prefix")
        .ok_or_else(|| StoreError::Import("missing 'prefix' column".into()))?;
    let brand_col =
        column("brand").ok_or_else(|| StoreError::Import("missing 'brand' column".into()))?;
    let model_col = column("model");

    let mut import = PrefixImport::default();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result?;
        let raw_prefix = record.get(prefix_col).unwrap_or("");
        let brand = record.get(brand_col).unwrap_or("");
        let model = model_col
            .and_then(|c| record.get(c))
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let Some(prefix) = Prefix::parse(raw_prefix) else {
            import.skipped.push(SkippedRow {
                line,
                reason: format!("'{raw_prefix}' is not a 4-digit prefix"),
            });
            continue;
        };
        if brand.is_empty() {
            import.skipped.push(SkippedRow { line, reason: format!("prefix {prefix}: empty brand") });
            continue;
        }
        import.rows.push((prefix, PrefixMapping { brand: brand.to_string(), model }));
    }

    if !import.skipped.is_empty() {
        tracing::warn!(skipped = import.skipped.len(), "prefix import skipped rows");
    }
    Ok(import)
}

const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Pick the delimiter that splits the header into the most fields while
/// keeping the same field count on the following lines. Prefix tables saved
/// by spreadsheets in Portuguese locales use `;`. Ties and single-column
/// files fall back to `,`.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    DELIMITERS
        .into_iter()
        .map(|delim| {
            let fields = field_count(header, delim);
            let agreeing = sample.iter().filter(|l| field_count(l, delim) == fields).count();
            let score = if fields > 1 { fields * agreeing } else { 0 };
            (delim, score)
        })
        .fold((b',', 0), |best, next| if next.1 > best.1 { next } else { best })
        .0
}

/// Fields on one line, ignoring delimiters inside double quotes.
fn field_count(line: &str, delim: u8) -> usize {
    let mut quoted = false;
    let mut fields = 1;
    for byte in line.bytes() {
        match byte {
            b'"' => quoted = !quoted,
            b if b == delim && !quoted => fields += 1,
            _ => {}
        }
    }
    fields
}

/// Read a text file. Bytes that are not UTF-8 are decoded as Windows-1252,
/// which is what Excel writes for accented brand names ("Citroën").
pub fn read_file_as_utf8(path: &Path) -> Result<String, StoreError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| {
        tracing::debug!(path = %path.display(), "not UTF-8, decoding as Windows-1252");
        encoding_rs::WINDOWS_1252.decode(e.as_bytes()).0.into_owned()
    }))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// One row per code: `Code, Brand, Vehicle, Quantity, Locations, Category`.
pub fn write_summaries<W: Write>(out: W, summaries: &[InventorySummary]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Code", "Brand", "Vehicle", "Quantity", "Locations", "Category"])?;
    for s in summaries {
        let locations = s.locations.iter().map(String::as_str).collect::<Vec<_>>().join("; ");
        writer.write_record([
            s.code.as_str(),
            s.brand.as_deref().unwrap_or(""),
            s.vehicle_label.as_deref().unwrap_or(""),
            s.total_quantity.to_string().as_str(),
            locations.as_str(),
            s.category.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// One row per capture: `Code, Brand, Vehicle, Location, Date`.
pub fn write_records<W: Write>(out: W, records: &[RawRecord]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Code", "Brand", "Vehicle", "Location", "Date"])?;
    for r in records {
        writer.write_record([
            r.code.as_deref().unwrap_or(""),
            r.vehicle_brand.as_deref().unwrap_or(""),
            r.vehicle_label().unwrap_or_default().as_str(),
            r.location.as_deref().unwrap_or(""),
            r.captured_at.format("%Y-%m-%d %H:%M").to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use eurostock_recon::{aggregate_records, AggregateOptions, Category, UserId};
    use std::io::Write as _;

    #[test]
    fn parse_comma_with_optional_model() {
        let import = parse_prefix_csv("prefix,brand,model\n2448,BMW,\n7293,Renault,Clio\n").unwrap();
        assert!(import.skipped.is_empty());
        assert_eq!(import.rows.len(), 2);
        assert_eq!(import.rows[0].1.model, None);
        assert_eq!(import.rows[1].1.model.as_deref(), Some("Clio"));
    }

    #[test]
    fn parse_semicolon_and_header_case() {
        let import = parse_prefix_csv("Prefix;Brand\n6340;Opel\n").unwrap();
        assert_eq!(import.rows.len(), 1);
        assert_eq!(import.rows[0].0.as_str(), "6340");
    }

    #[test]
    fn bad_rows_are_reported() {
        let import = parse_prefix_csv("prefix,brand\n244,BMW\n2448,\nABCD,Fiat\n7293,Renault\n").unwrap();
        assert_eq!(import.rows.len(), 1);
        let lines: Vec<usize> = import.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
    }

    #[test]
    fn delimiter_follows_the_header() {
        assert_eq!(sniff_delimiter("prefix;brand;model\n2448;BMW;\n"), b';');
        assert_eq!(sniff_delimiter("prefix\tbrand\n6340\tOpel\n"), b'\t');
        assert_eq!(sniff_delimiter("\nprefix,brand\n6340,Opel\n"), b',');
        // A quoted comma does not make a semicolon file comma-separated.
        assert_eq!(sniff_delimiter("prefix;brand\n6340;\"Opel, GM\"\n"), b';');
        assert_eq!(sniff_delimiter("prefix\n2448\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn missing_brand_column_is_an_error() {
        assert!(matches!(parse_prefix_csv("prefix,model\n2448,X5\n"), Err(StoreError::Import(_))));
    }

    #[test]
    fn windows_1252_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "Citro\xebn" in Windows-1252
        file.write_all(b"prefix;brand\n8011;Citro\xebn\n").unwrap();
        let import = read_prefix_file(file.path()).unwrap();
        assert_eq!(import.rows[0].1.brand, "Citroën");
    }

    fn record(code: &str, location: &str) -> RawRecord {
        RawRecord {
            id: None,
            code: Some(code.into()),
            raw_text: code.into(),
            vehicle_brand: Some("Opel".into()),
            vehicle_model: Some("Astra".into()),
            captured_at: Utc.with_ymd_and_hms(2026, 2, 1, 8, 5, 0).unwrap(),
            location: Some(location.into()),
            captured_by: UserId::new("ana"),
            category: Category::Standard,
        }
    }

    #[test]
    fn summaries_csv() {
        let records = vec![record("6340AGAV1C", "LOJA2"), record("6340AGAV1C", "LOJA1")];
        let summaries = aggregate_records(&records, &AggregateOptions::default());
        let mut out = Vec::new();
        write_summaries(&mut out, &summaries).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Code,Brand,Vehicle,Quantity,Locations,Category\n6340AGAV1C,Opel,Opel Astra,2,LOJA1; LOJA2,standard\n"
        );
    }

    #[test]
    fn records_csv() {
        let mut out = Vec::new();
        write_records(&mut out, &[record("#6340AGAV1C", "LOJA1")]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Code,Brand,Vehicle,Location,Date\n#6340AGAV1C,Opel,Opel Astra,LOJA1,2026-02-01 08:05\n"
        );
    }
}
