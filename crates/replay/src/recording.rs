//! Recorded datasets.
//!
//! Two textual shapes share one separator line, and a file may hold several
//! separated groups which are merged by tick on read:
//!
//! ```text
//! ---START OUTPUT---
//! Ticks,X,Y,Z
//! 0,0.01,-0.02,0.99
//! 200000,0.02,-0.01,1.01
//! ```
//!
//! or a JSON object keyed by tick: `{"0":{"x":0.01,...},"200000":{...}}`.

use std::collections::BTreeMap;
use std::path::Path;

use contracts::{ContractError, Location, Quaternion, Tick, Vec3};
use fusion_engine::SampleBuffer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::session::ReplaySession;

/// Written before every group
pub const DATA_SPACER: &str = "\n---START OUTPUT---\n\r";

const SPACER_MARKER: &str = "---START OUTPUT---";

/// Recording file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Csv,
    Json,
}

impl RecordFormat {
    /// Choose by file extension
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(ContractError::RecordingFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Row-oriented text form of a value, without the leading tick column.
pub trait CsvRecord: Sized {
    /// Header line including the `Ticks` column
    const HEADER: &'static str;

    fn to_csv(&self) -> String;

    fn from_csv(fields: &[&str]) -> Result<Self, String>;
}

fn parse_field(name: &str, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| format!("{name}: {e} ({raw:?})"))
}

fn parse_optional(name: &str, raw: &str) -> Result<Option<f64>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_field(name, raw).map(Some)
}

fn expect_fields(fields: &[&str], n: usize) -> Result<(), String> {
    if fields.len() != n {
        return Err(format!("expected {n} value columns, found {}", fields.len()));
    }
    Ok(())
}

fn fmt_optional(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl CsvRecord for Vec3 {
    const HEADER: &'static str = "Ticks,X,Y,Z";

    fn to_csv(&self) -> String {
        format!("{},{},{}", self.x, self.y, self.z)
    }

    fn from_csv(fields: &[&str]) -> Result<Self, String> {
        expect_fields(fields, 3)?;
        Ok(Vec3::new(
            parse_field("X", fields[0])?,
            parse_field("Y", fields[1])?,
            parse_field("Z", fields[2])?,
        ))
    }
}

impl CsvRecord for Quaternion {
    const HEADER: &'static str = "Ticks,X,Y,Z,W";

    fn to_csv(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.z, self.w)
    }

    fn from_csv(fields: &[&str]) -> Result<Self, String> {
        expect_fields(fields, 4)?;
        Ok(Quaternion::new(
            parse_field("X", fields[0])?,
            parse_field("Y", fields[1])?,
            parse_field("Z", fields[2])?,
            parse_field("W", fields[3])?,
        ))
    }
}

impl CsvRecord for Location {
    const HEADER: &'static str =
        "Ticks,Latitude,Longitude,Altitude,Course,Speed,VerticalAccuracy";

    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.latitude,
            self.longitude,
            self.altitude,
            fmt_optional(self.course),
            fmt_optional(self.speed),
            fmt_optional(self.vertical_accuracy),
        )
    }

    fn from_csv(fields: &[&str]) -> Result<Self, String> {
        expect_fields(fields, 6)?;
        Ok(Location {
            latitude: parse_field("Latitude", fields[0])?,
            longitude: parse_field("Longitude", fields[1])?,
            altitude: parse_field("Altitude", fields[2])?,
            course: parse_optional("Course", fields[3])?,
            speed: parse_optional("Speed", fields[4])?,
            vertical_accuracy: parse_optional("VerticalAccuracy", fields[5])?,
        })
    }
}

/// Heading in degrees
impl CsvRecord for f64 {
    const HEADER: &'static str = "Ticks,Value";

    fn to_csv(&self) -> String {
        self.to_string()
    }

    fn from_csv(fields: &[&str]) -> Result<Self, String> {
        expect_fields(fields, 1)?;
        parse_field("Value", fields[0])
    }
}

/// Ordered `tick → value` dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording<T> {
    samples: BTreeMap<Tick, T>,
}

impl<T> Default for Recording<T> {
    fn default() -> Self {
        Self {
            samples: BTreeMap::new(),
        }
    }
}

impl<T> From<BTreeMap<Tick, T>> for Recording<T> {
    fn from(samples: BTreeMap<Tick, T>) -> Self {
        Self { samples }
    }
}

impl<T> FromIterator<(Tick, T)> for Recording<T> {
    fn from_iter<I: IntoIterator<Item = (Tick, T)>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl<T> Recording<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; an existing value at the same tick is replaced.
    pub fn insert(&mut self, tick: Tick, value: T) {
        self.samples.insert(tick, value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tick, &T)> {
        self.samples.iter().map(|(t, v)| (*t, v))
    }

    /// First and last tick
    pub fn span(&self) -> Option<(Tick, Tick)> {
        let first = *self.samples.first_key_value()?.0;
        let last = *self.samples.last_key_value()?.0;
        Some((first, last))
    }

    pub fn into_map(self) -> BTreeMap<Tick, T> {
        self.samples
    }

    pub fn into_session(self) -> ReplaySession<T> {
        ReplaySession::new(self.samples)
    }
}

impl<T: Clone> Recording<T> {
    /// Capture a channel's buffered input
    pub fn from_buffer(buffer: &SampleBuffer<T>) -> Self {
        buffer.iter().map(|(t, v)| (t, v.clone())).collect()
    }
}

impl<T: CsvRecord> Recording<T> {
    /// Parse row-oriented text. Malformed rows are skipped with a warning.
    pub fn parse_csv(text: &str) -> Self {
        let mut samples = BTreeMap::new();
        let mut skipped = 0usize;

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim_matches(|c| c == '\r' || c == ' ' || c == '\t');
            if line.is_empty() || line == SPACER_MARKER || line.starts_with("Ticks") {
                continue;
            }

            let mut fields = line.split(',');
            let tick = fields.next().unwrap_or_default().trim().parse::<Tick>();
            let rest: Vec<&str> = fields.collect();

            let parsed = tick
                .map_err(|e| format!("Ticks: {e}"))
                .and_then(|tick| T::from_csv(&rest).map(|v| (tick, v)));
            match parsed {
                Ok((tick, value)) => {
                    samples.insert(tick, value);
                }
                Err(message) => {
                    skipped += 1;
                    warn!(line = idx + 1, %message, "skipping malformed recording row");
                }
            }
        }

        debug!(rows = samples.len(), skipped, "parsed csv recording");
        Self { samples }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(DATA_SPACER);
        out.push_str(T::HEADER);
        out.push('\n');
        for (tick, value) in &self.samples {
            out.push_str(&tick.to_string());
            out.push(',');
            out.push_str(&value.to_csv());
            out.push('\n');
        }
        out
    }
}

impl<T: DeserializeOwned> Recording<T> {
    /// Parse one or more separated JSON objects keyed by tick.
    pub fn parse_json(text: &str) -> Result<Self, ContractError> {
        let mut samples = BTreeMap::new();
        for chunk in text.split(SPACER_MARKER) {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let group: BTreeMap<Tick, T> = serde_json::from_str(chunk)
                .map_err(|e| ContractError::recording_parse(e.line(), e.to_string()))?;
            samples.extend(group);
        }
        Ok(Self { samples })
    }
}

impl<T: Serialize> Recording<T> {
    pub fn to_json(&self) -> Result<String, ContractError> {
        let body = serde_json::to_string(&self.samples)
            .map_err(|e| ContractError::Other(format!("recording serialize: {e}")))?;
        Ok(format!("{DATA_SPACER}{body}"))
    }
}

impl<T: CsvRecord + Serialize + DeserializeOwned> Recording<T> {
    pub fn parse(format: RecordFormat, text: &str) -> Result<Self, ContractError> {
        match format {
            RecordFormat::Csv => Ok(Self::parse_csv(text)),
            RecordFormat::Json => Self::parse_json(text),
        }
    }

    pub fn to_text(&self, format: RecordFormat) -> Result<String, ContractError> {
        match format {
            RecordFormat::Csv => Ok(self.to_csv()),
            RecordFormat::Json => self.to_json(),
        }
    }

    /// Load a recording, choosing the format by extension.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let format = RecordFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let recording = Self::parse(format, &text)?;
        debug!(path = %path.display(), samples = recording.len(), "loaded recording");
        Ok(recording)
    }

    /// Write a recording, choosing the format by extension.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ContractError> {
        let path = path.as_ref();
        let format = RecordFormat::from_path(path)?;
        std::fs::write(path, self.to_text(format)?)?;
        Ok(())
    }
}
