use crate::touchpoint::TouchpointId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

static FLOAT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
});
static INT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+").unwrap());

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported dataset format: {0} (expected .csv or .json)")]
    UnsupportedFormat(PathBuf),
}

/// A per-record value as it appears in the input files. Numbers may arrive as
/// strings, and anything may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Lenient float parse: the longest numeric prefix of a string counts,
    /// anything else is `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(value) => (!value.is_nan()).then_some(*value),
            Self::Text(text) => parse_float_prefix(text),
        }
    }

    /// Lenient integer parse: numbers truncate, strings use their leading
    /// integer digits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Null => None,
            Self::Number(value) => value.is_finite().then(|| value.trunc() as i64),
            Self::Text(text) => {
                let found = INT_PREFIX_RE.find(text.trim_start())?;
                found.as_str().parse::<i64>().ok()
            }
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

fn parse_float_prefix(text: &str) -> Option<f64> {
    let found = FLOAT_PREFIX_RE.find(text.trim_start())?;
    let token = found.as_str();
    let (sign, digits) = match token.as_bytes().first() {
        Some(b'-') => (-1.0, &token[1..]),
        Some(b'+') => (1.0, &token[1..]),
        _ => (1.0, token),
    };
    if digits == "Infinity" {
        return Some(sign * f64::INFINITY);
    }
    digits.parse::<f64>().ok().map(|value| sign * value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub from: TouchpointId,
    pub to: TouchpointId,
    pub frequency: RawValue,
}

impl TransitionRecord {
    pub fn new(from: TouchpointId, to: TouchpointId, frequency: RawValue) -> Self {
        Self {
            from,
            to,
            frequency,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct NameEntry {
    #[serde(rename = "Id")]
    id: u32,
    #[serde(rename = "Name")]
    name: String,
}

/// One row of the transition-statistics table, keyed by `M<from>>M<to>`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransitionStats {
    pub transition: String,
    pub classified_frequency: RawValue,
    pub unclassified_frequency: RawValue,
    pub conversion: RawValue,
    pub cl_avg_time: RawValue,
    pub ncl_avg_time: RawValue,
}

impl TransitionStats {
    /// Substituted for reduced edges that have no statistics row.
    pub fn placeholder() -> Self {
        let unknown = RawValue::text("?");
        Self {
            transition: String::new(),
            classified_frequency: RawValue::Number(0.0),
            unclassified_frequency: unknown.clone(),
            conversion: unknown.clone(),
            cl_avg_time: unknown.clone(),
            ncl_avg_time: unknown,
        }
    }
}

pub fn stats_key(from: TouchpointId, to: TouchpointId, conversion_alias: u32) -> String {
    format!(
        "M{}>M{}",
        from.stats_key_id(conversion_alias),
        to.stats_key_id(conversion_alias)
    )
}

/// Static input of the pipeline: weighted transitions plus the two lookup
/// tables used to annotate the reduced graph.
#[derive(Debug, Clone, Default)]
pub struct TransitionDataset {
    pub records: Vec<TransitionRecord>,
    names: HashMap<u32, String>,
    stats: HashMap<String, TransitionStats>,
}

impl TransitionDataset {
    pub fn new(records: Vec<TransitionRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        for (id, name) in names {
            self.names.entry(id).or_insert_with(|| name.into());
        }
        self
    }

    pub fn with_stats<I>(mut self, stats: I) -> Self
    where
        I: IntoIterator<Item = TransitionStats>,
    {
        for row in stats {
            self.stats.entry(row.transition.clone()).or_insert(row);
        }
        self
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn stats(&self, from: TouchpointId, to: TouchpointId, conversion_alias: u32) -> Option<&TransitionStats> {
        self.stats.get(&stats_key(from, to, conversion_alias))
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn stats_count(&self) -> usize {
        self.stats.len()
    }

    pub fn load(
        triples: &Path,
        names: Option<&Path>,
        stats: Option<&Path>,
    ) -> Result<Self, DatasetError> {
        let mut dataset = Self::new(load_triples(triples)?);
        if let Some(path) = names {
            let contents = read_file(path)?;
            let entries: Vec<NameEntry> = parse_json(path, &contents)?;
            dataset = dataset.with_names(entries.into_iter().map(|entry| (entry.id, entry.name)));
        }
        if let Some(path) = stats {
            let contents = read_file(path)?;
            let rows: Vec<TransitionStats> = parse_json(path, &contents)?;
            dataset = dataset.with_stats(rows);
        }
        debug!(
            records = dataset.records.len(),
            names = dataset.name_count(),
            stats = dataset.stats_count(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}

pub fn load_triples(path: &Path) -> Result<Vec<TransitionRecord>, DatasetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => {
            let contents = read_file(path)?;
            parse_triples_csv(&contents).map_err(|source| DatasetError::Csv {
                path: path.to_path_buf(),
                source,
            })
        }
        Some("json") => {
            let contents = read_file(path)?;
            let rows: Vec<serde_json::Value> = parse_json(path, &contents)?;
            Ok(parse_triples_rows(rows))
        }
        _ => Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// CSV triples with a `from,to,frequency` header row.
pub fn parse_triples_csv(contents: &str) -> Result<Vec<TransitionRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());
    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let ids = (
            row.get(0).and_then(TouchpointId::from_token),
            row.get(1).and_then(TouchpointId::from_token),
        );
        let (Some(from), Some(to)) = ids else {
            warn!(row = idx + 1, "skipping transition row with invalid touchpoint ids");
            continue;
        };
        let frequency = match row.get(2) {
            Some(text) if !text.is_empty() => RawValue::text(text),
            _ => RawValue::Null,
        };
        records.push(TransitionRecord::new(from, to, frequency));
    }
    Ok(records)
}

/// JSON triples as `[from, to, frequency]` arrays. A leading header row is
/// recognised by its non-id endpoints and dropped.
pub fn parse_triples_rows(rows: Vec<serde_json::Value>) -> Vec<TransitionRecord> {
    let mut records = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        let serde_json::Value::Array(mut cells) = row else {
            warn!(row = idx, "skipping transition row that is not an array");
            continue;
        };
        cells.resize(3, serde_json::Value::Null);
        let frequency = serde_json::from_value::<RawValue>(cells[2].take()).unwrap_or_default();
        let from = serde_json::from_value::<TouchpointId>(cells[0].take());
        let to = serde_json::from_value::<TouchpointId>(cells[1].take());
        let (Ok(from), Ok(to)) = (from, to) else {
            if idx > 0 {
                warn!(row = idx, "skipping transition row with invalid touchpoint ids");
            }
            continue;
        };
        records.push(TransitionRecord::new(from, to, frequency));
    }
    records
}

fn read_file(path: &Path) -> Result<String, DatasetError> {
    std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, contents: &str) -> Result<T, DatasetError> {
    serde_json::from_str(contents).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}
