use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{EurocodeError, LookupError};
use crate::model::{Code, Confidence, Prefix, PrefixMapping, ResolutionSource, VehicleResolution};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Keyed lookup `prefix → {brand, model}` owned outside the engine.
///
/// A miss is `Ok(None)`. `Err` is reserved for the backend itself failing.
pub trait PrefixSource {
    fn lookup(&self, prefix: &Prefix) -> Result<Option<PrefixMapping>, LookupError>;
}

impl<T: PrefixSource + ?Sized> PrefixSource for &T {
    fn lookup(&self, prefix: &Prefix) -> Result<Option<PrefixMapping>, LookupError> {
        (**self).lookup(prefix)
    }
}

/// In-memory prefix table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPrefixTable {
    entries: BTreeMap<Prefix, PrefixMapping>,
}

#[derive(Deserialize)]
struct PrefixTableFile {
    #[serde(default)]
    prefixes: BTreeMap<String, PrefixMapping>,
}

impl StaticPrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a mapping. Empty model strings are stored as `None`.
    pub fn insert(&mut self, prefix: Prefix, mut mapping: PrefixMapping) {
        mapping.model = mapping.model.filter(|m| !m.trim().is_empty());
        self.entries.insert(prefix, mapping);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &PrefixMapping)> {
        self.entries.iter()
    }

    /// Parse a TOML table of the form:
    ///
    /// ```toml
    /// [prefixes]
    /// "2448" = { brand = "BMW" }
    /// "7293" = { brand = "Renault", model = "Clio" }
    /// ```
    pub fn from_toml(input: &str) -> Result<Self, EurocodeError> {
        let file: PrefixTableFile =
            toml::from_str(input).map_err(|e| EurocodeError::PrefixTable(e.to_string()))?;
        let mut table = Self::new();
        for (key, mapping) in file.prefixes {
            let prefix = Prefix::parse(&key).ok_or_else(|| {
                EurocodeError::PrefixTable(format!("'{key}' is not a 4-digit prefix"))
            })?;
            if mapping.brand.trim().is_empty() {
                return Err(EurocodeError::PrefixTable(format!("prefix {key}: brand is empty")));
            }
            table.insert(prefix, mapping);
        }
        Ok(table)
    }
}

impl FromIterator<(Prefix, PrefixMapping)> for StaticPrefixTable {
    fn from_iter<I: IntoIterator<Item = (Prefix, PrefixMapping)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (prefix, mapping) in iter {
            table.insert(prefix, mapping);
        }
        table
    }
}

impl PrefixSource for StaticPrefixTable {
    fn lookup(&self, prefix: &Prefix) -> Result<Option<PrefixMapping>, LookupError> {
        Ok(self.entries.get(prefix).cloned())
    }
}

/// Read-mostly table shared between concurrent pipelines.
///
/// [`replace`](Self::replace) swaps the whole table; lookups that start after
/// the swap see the new data, in-flight ones may still see the old.
#[derive(Debug, Clone, Default)]
pub struct SharedPrefixTable {
    inner: Arc<RwLock<StaticPrefixTable>>,
}

impl SharedPrefixTable {
    pub fn new(table: StaticPrefixTable) -> Self {
        Self { inner: Arc::new(RwLock::new(table)) }
    }

    pub fn replace(&self, table: StaticPrefixTable) {
        let len = table.len();
        *self.inner.write() = table;
        tracing::info!(entries = len, "prefix table replaced");
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl PrefixSource for SharedPrefixTable {
    fn lookup(&self, prefix: &Prefix) -> Result<Option<PrefixMapping>, LookupError> {
        self.inner.read().lookup(prefix)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Strip the marker, take the first four characters, and look them up.
///
/// A non-digit prefix is `InvalidCodeFormat`; callers are expected to
/// downgrade that to [`VehicleResolution::unknown`] rather than abort.
pub fn resolve<S: PrefixSource + ?Sized>(
    source: &S,
    code: &str,
) -> Result<VehicleResolution, EurocodeError> {
    let invalid = || EurocodeError::InvalidCodeFormat { code: code.to_string() };
    let unmarked = code.trim().trim_start_matches(['#', '*']);
    let head = unmarked.get(..4).ok_or_else(invalid)?;
    let prefix = Prefix::parse(head).ok_or_else(invalid)?;
    Ok(lookup_vehicle(source, &prefix)?)
}

/// Resolve an extracted code. Its prefix is valid by construction, so only
/// the source itself can fail.
pub fn resolve_code<S: PrefixSource + ?Sized>(
    source: &S,
    code: &Code,
) -> Result<VehicleResolution, LookupError> {
    lookup_vehicle(source, &code.prefix())
}

fn lookup_vehicle<S: PrefixSource + ?Sized>(
    source: &S,
    prefix: &Prefix,
) -> Result<VehicleResolution, LookupError> {
    Ok(match source.lookup(prefix)? {
        Some(mapping) => VehicleResolution {
            brand: Some(mapping.brand).filter(|b| !b.trim().is_empty()),
            model: mapping.model.filter(|m| !m.trim().is_empty()),
            confidence: Confidence::High,
            source: ResolutionSource::PrefixTable,
        },
        None => VehicleResolution::unknown(),
    })
}

/// Fill the empty fields of `seed` from `resolved`. Never overwrites a value
/// the seed already carries.
pub fn enrich(seed: VehicleResolution, resolved: VehicleResolution) -> VehicleResolution {
    let seeded = has_text(&seed.brand) || has_text(&seed.model);
    if !seeded {
        return resolved;
    }
    VehicleResolution {
        brand: if has_text(&seed.brand) { seed.brand } else { resolved.brand },
        model: if has_text(&seed.model) { seed.model } else { resolved.model },
        confidence: resolved.confidence,
        source: ResolutionSource::OcrFreeText,
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> StaticPrefixTable {
        [
            (Prefix::parse("2448").unwrap(), PrefixMapping { brand: "BMW".into(), model: None }),
            (
                Prefix::parse("7293").unwrap(),
                PrefixMapping { brand: "Renault".into(), model: Some("Clio".into()) },
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn hit_brand_only() {
        let r = resolve(&table(), "2448AGNMV1B").unwrap();
        assert_eq!(r.brand.as_deref(), Some("BMW"));
        assert_eq!(r.model, None);
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.source, ResolutionSource::PrefixTable);
        assert_eq!(r.label().as_deref(), Some("BMW"));
    }

    #[test]
    fn hit_with_model_and_marker() {
        let r = resolve(&table(), "*7293AGAMV").unwrap();
        assert_eq!(r.label().as_deref(), Some("Renault Clio"));
    }

    #[test]
    fn miss_is_unknown_not_error() {
        let r = resolve(&table(), "0000ABC").unwrap();
        assert_eq!(r, VehicleResolution::unknown());
        assert_eq!(r.label(), None);
    }

    #[test]
    fn bad_prefix_is_invalid_format() {
        for code in ["", "#", "24A8XX", "244", "—"] {
            assert!(matches!(
                resolve(&table(), code),
                Err(EurocodeError::InvalidCodeFormat { .. })
            ));
        }
    }

    #[test]
    fn enrich_keeps_existing_guess() {
        let seed = VehicleResolution {
            brand: Some("Mini".into()),
            model: None,
            confidence: Confidence::Unknown,
            source: ResolutionSource::OcrFreeText,
        };
        let resolved = VehicleResolution {
            brand: Some("BMW".into()),
            model: Some("X5".into()),
            confidence: Confidence::High,
            source: ResolutionSource::PrefixTable,
        };
        let out = enrich(seed, resolved);
        assert_eq!(out.brand.as_deref(), Some("Mini"));
        assert_eq!(out.model.as_deref(), Some("X5"));
        assert_eq!(out.source, ResolutionSource::OcrFreeText);
    }

    #[test]
    fn enrich_without_seed_is_resolution() {
        let resolved = resolve(&table(), "2448AGN").unwrap();
        assert_eq!(enrich(VehicleResolution::unknown(), resolved.clone()), resolved);
    }

    #[test]
    fn toml_table() {
        let t = StaticPrefixTable::from_toml(
            r#"
[prefixes]
"2448" = { brand = "BMW" }
"7293" = { brand = "Renault", model = "" }
"#,
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        let r = resolve(&t, "7293AGAMV").unwrap();
        assert_eq!(r.model, None);
    }

    #[test]
    fn toml_rejects_bad_keys() {
        let err = StaticPrefixTable::from_toml("[prefixes]\n\"244\" = { brand = \"BMW\" }\n");
        assert!(matches!(err, Err(EurocodeError::PrefixTable(_))));
    }

    #[test]
    fn shared_table_sees_replacement() {
        let shared = SharedPrefixTable::new(StaticPrefixTable::new());
        assert_eq!(resolve(&shared, "2448AGN").unwrap().confidence, Confidence::Unknown);
        shared.replace(table());
        assert_eq!(resolve(&shared, "2448AGN").unwrap().confidence, Confidence::High);
    }

    #[test]
    fn extracted_codes_resolve_by_prefix() {
        let code = Code::parse("*7293agamv").unwrap();
        let r = resolve_code(&table(), &code).unwrap();
        assert_eq!(r.label().as_deref(), Some("Renault Clio"));
        assert_eq!(r, resolve(&table(), code.as_str()).unwrap());
    }
}
