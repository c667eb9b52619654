//! Daily logbook library.
//! One YAML file per day holds three lists: work in progress, work accomplished and a backlog.
//! Each new day is derived from the latest one (open work carries forward, dated backlog
//! entries activate once their date arrives), and the accomplished lists of several days can be
//! folded into a single summary document.

pub mod core {
    use indexmap::IndexMap;
    use serde_yaml::Value;

    /* ------------------------------ Labels ------------------------------ */

    pub const ACCOMPLISHED_LABEL: &str = "Accomplished";
    pub const BACKLOG_LABEL: &str = "Backlog";
    pub const IN_PROGRESS_LABEL: &str = "In progress";
    /// Deprecated open-work key; folded into the in-progress list on load.
    pub const LEGACY_TODO_KEY: &str = "TODO";

    /// Which set of block labels a directory of day files uses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Schema {
        /// `In progress` / `Accomplished` / `Backlog`, promoted items go to the front verbatim.
        #[default]
        Gtd,
        /// `TODO` / `Accomplished` / `Backlog`, promoted items lose their date and go to the end.
        Logbook,
    }

    impl Schema {
        pub fn open_label(self) -> &'static str {
            match self {
                Schema::Gtd => IN_PROGRESS_LABEL,
                Schema::Logbook => LEGACY_TODO_KEY,
            }
        }

        /// Labels in on-disk order.
        pub fn labels(self) -> [&'static str; 3] {
            [self.open_label(), ACCOMPLISHED_LABEL, BACKLOG_LABEL]
        }

        pub fn sorts_backlog(self) -> bool {
            matches!(self, Schema::Gtd)
        }
    }

    /* ------------------------------ Entities ------------------------------ */

    /// A single list entry: plain text, or a one-key mapping whose key is the display text.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Item {
        Text(String),
        Annotated { text: String, payload: Value },
    }

    impl Item {
        /// Display text, used for every comparison and sort.
        pub fn text(&self) -> &str {
            match self {
                Item::Text(text) | Item::Annotated { text, .. } => text,
            }
        }
    }

    impl From<&str> for Item {
        fn from(text: &str) -> Self {
            Item::Text(text.to_string())
        }
    }

    impl From<String> for Item {
        fn from(text: String) -> Self {
            Item::Text(text)
        }
    }

    /// One day's log. All three lists are always present once loaded.
    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct DayRecord {
        pub in_progress: Vec<Item>,
        pub accomplished: Vec<Item>,
        pub backlog: Vec<Item>,
        /// Top-level keys outside the schema, in file order. Never written back.
        pub extra: IndexMap<String, Value>,
    }

    /// Sort by display text, case-sensitive, stable.
    pub fn sort_by_text(items: &mut [Item]) {
        items.sort_by(|a, b| a.text().cmp(b.text()));
    }

    /// Date string (`YYYY-MM-DD`) → that day's accomplished items, oldest day first.
    pub type Summary = IndexMap<String, Vec<Item>>;
}

pub mod error {
    use std::{io, path::Path, path::PathBuf};

    /// Failures while turning YAML text into records (or back).
    #[derive(Debug, thiserror::Error)]
    pub enum CodecError {
        #[error("invalid YAML: {0}")]
        Yaml(#[from] serde_yaml::Error),
        #[error("top-level document must be a mapping")]
        NotAMapping,
        #[error("top-level key {0} is not a scalar")]
        InvalidKey(String),
        #[error("{field:?} must be a list, found a {found}")]
        InvalidField { field: String, found: &'static str },
        #[error("{field:?} holds an entry that is neither text nor a single-key mapping")]
        InvalidItem { field: String },
    }

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("number of days must be greater than 0 (got {0})")]
        InvalidCount(i64),
        #[error("decoding {path:?}: {source}")]
        Decode {
            path: PathBuf,
            #[source]
            source: CodecError,
        },
        #[error(transparent)]
        Encode(#[from] CodecError),
        #[error("{action} {path:?}: {source}")]
        Io {
            action: &'static str,
            path: PathBuf,
            #[source]
            source: io::Error,
        },
        #[error("launching editor {program:?}: {source}")]
        Editor {
            program: String,
            #[source]
            source: io::Error,
        },
    }

    impl Error {
        pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
            Error::Io {
                action,
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub type Result<T, E = Error> = std::result::Result<T, E>;
}

pub mod diagnostics {
    //! Components report progress through a sink they are handed at construction.
    //! Nothing is global: the default sink drops every message, the binary wires in `tracing`.

    use std::{fmt, sync::Arc};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Debug,
        Warn,
    }

    pub trait DiagnosticSink: Send + Sync {
        fn emit(&self, level: Level, message: fmt::Arguments<'_>);
    }

    #[derive(Debug, Default)]
    pub struct NoopSink;

    impl DiagnosticSink for NoopSink {
        fn emit(&self, _level: Level, _message: fmt::Arguments<'_>) {}
    }

    /// Forwards to the `tracing` macros.
    #[derive(Debug, Default)]
    pub struct TracingSink;

    impl DiagnosticSink for TracingSink {
        fn emit(&self, level: Level, message: fmt::Arguments<'_>) {
            match level {
                Level::Debug => tracing::debug!("{message}"),
                Level::Warn => tracing::warn!("{message}"),
            }
        }
    }

    /// Cheap-to-clone handle around a sink.
    #[derive(Clone)]
    pub struct Diagnostics {
        sink: Arc<dyn DiagnosticSink>,
    }

    impl Diagnostics {
        pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
            Self { sink }
        }

        pub fn noop() -> Self {
            Self::new(Arc::new(NoopSink))
        }

        pub fn tracing() -> Self {
            Self::new(Arc::new(TracingSink))
        }

        pub fn debug(&self, message: fmt::Arguments<'_>) {
            self.sink.emit(Level::Debug, message);
        }

        pub fn warn(&self, message: fmt::Arguments<'_>) {
            self.sink.emit(Level::Warn, message);
        }
    }

    impl Default for Diagnostics {
        fn default() -> Self {
            Self::noop()
        }
    }

    impl fmt::Debug for Diagnostics {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Diagnostics").finish_non_exhaustive()
        }
    }

    /// Collects messages in memory; lets tests assert on what a component reported.
    #[cfg(test)]
    #[derive(Debug, Default)]
    pub(crate) struct MemorySink {
        pub(crate) lines: std::sync::Mutex<Vec<(Level, String)>>,
    }

    #[cfg(test)]
    impl MemorySink {
        pub(crate) fn messages(&self, level: Level) -> Vec<String> {
            self.lines
                .lock()
                .expect("sink lock")
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    #[cfg(test)]
    impl DiagnosticSink for MemorySink {
        fn emit(&self, level: Level, message: fmt::Arguments<'_>) {
            self.lines
                .lock()
                .expect("sink lock")
                .push((level, message.to_string()));
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn memory_sink_keeps_levels_apart() {
            let sink = Arc::new(MemorySink::default());
            let diagnostics = Diagnostics::new(sink.clone());
            diagnostics.debug(format_args!("looking in {}", "/tmp"));
            diagnostics.warn(format_args!("odd file"));

            assert_eq!(sink.messages(Level::Debug), vec!["looking in /tmp"]);
            assert_eq!(sink.messages(Level::Warn), vec!["odd file"]);
        }

        #[test]
        fn default_handle_is_silent() {
            let diagnostics = Diagnostics::default();
            diagnostics.debug(format_args!("dropped"));
            assert!(format!("{diagnostics:?}").starts_with("Diagnostics"));
        }
    }
}

pub mod dates {
    //! `YYYY-MM-DD` tokens as they appear in file names and backlog entries, parsed with `nom`.
    //! The grammar only checks shape; calendar validity is left to chrono.

    use chrono::NaiveDate;
    use nom::{
        IResult,
        bytes::complete::take_while_m_n,
        character::complete::char,
        combinator::recognize,
        sequence::{delimited, tuple},
    };

    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    type PResult<'a, T> = IResult<&'a str, T>;

    pub(crate) fn date_token(i: &str) -> PResult<'_, &str> {
        recognize(tuple((
            digits(4),
            char('-'),
            digits(2),
            char('-'),
            digits(2),
        )))(i)
    }

    fn digits<'a>(count: usize) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
        take_while_m_n(count, count, |c: char| c.is_ascii_digit())
    }

    fn to_date(token: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(token, DATE_FORMAT).ok()
    }

    /// Leading `YYYY-MM-DD`; returns the rest of the text and the date.
    pub fn leading_date(text: &str) -> Option<(&str, NaiveDate)> {
        let (rest, token) = date_token(text).ok()?;
        Some((rest, to_date(token)?))
    }

    /// Leading `[YYYY-MM-DD]`; returns the rest of the text (untrimmed) and the date.
    pub fn bracketed_date(text: &str) -> Option<(&str, NaiveDate)> {
        let (rest, token) = delimited(char('['), date_token, char(']'))(text).ok()?;
        Some((rest, to_date(token)?))
    }

    pub fn format_date(date: NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(y, m, d).unwrap()
        }

        #[test]
        fn bracketed_date_splits_prefix() {
            let (rest, date) = bracketed_date("[2017-04-01] call the bank").expect("dated");
            assert_eq!(date, ymd(2017, 4, 1));
            assert_eq!(rest, " call the bank");
        }

        #[test]
        fn bracketed_date_rejects_impossible_dates() {
            assert!(bracketed_date("[2017-02-30] nope").is_none());
            assert!(bracketed_date("[2017-13-01] nope").is_none());
        }

        #[test]
        fn bracketed_date_requires_exact_shape() {
            assert!(bracketed_date("call the bank").is_none());
            assert!(bracketed_date("[2017-4-01] short month").is_none());
            assert!(bracketed_date("[2017-04-01 unclosed").is_none());
            assert!(bracketed_date(" [2017-04-01] leading space").is_none());
        }

        #[test]
        fn leading_date_ignores_suffix() {
            let (rest, date) = leading_date("2020-01-31-logbook.yaml").expect("date");
            assert_eq!(date, ymd(2020, 1, 31));
            assert_eq!(rest, "-logbook.yaml");
            assert!(leading_date("summary.yaml").is_none());
        }
    }
}

pub mod codec {
    //! YAML ⇄ `DayRecord`.
    //!
    //! Decoding never fails for absent or blank input (it yields an empty record). Structural
    //! problems in a present document are errors: files written by this crate are trusted.
    //! Encoding writes three labelled blocks in a fixed order; an empty block is the bare label
    //! followed by a blank line, which keeps hand-editing pleasant.

    use crate::core::*;
    use crate::error::{CodecError, Error, Result};
    use serde_yaml::{Mapping, Value};
    use std::{fs, io, path::Path};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DecodeOptions {
        /// Fold the deprecated `TODO` block into the in-progress list.
        pub migrate_legacy_todo: bool,
    }

    impl Default for DecodeOptions {
        fn default() -> Self {
            Self {
                migrate_legacy_todo: true,
            }
        }
    }

    /* ------------------------------ Decode ------------------------------ */

    pub fn decode(text: Option<&str>, schema: Schema) -> Result<DayRecord, CodecError> {
        decode_with(text, schema, DecodeOptions::default())
    }

    /// Decode without the legacy migration.
    pub fn decode_raw(text: Option<&str>, schema: Schema) -> Result<DayRecord, CodecError> {
        decode_with(
            text,
            schema,
            DecodeOptions {
                migrate_legacy_todo: false,
            },
        )
    }

    pub fn decode_with(
        text: Option<&str>,
        schema: Schema,
        opts: DecodeOptions,
    ) -> Result<DayRecord, CodecError> {
        let mut record = DayRecord::default();
        let Some(mapping) = load_mapping(text)? else {
            return Ok(record);
        };

        let mut legacy = Vec::new();
        for (key, value) in mapping {
            let key = key_text(&key)?;
            let slot = if key == schema.open_label() {
                Some(&mut record.in_progress)
            } else if key == ACCOMPLISHED_LABEL {
                Some(&mut record.accomplished)
            } else if key == BACKLOG_LABEL {
                Some(&mut record.backlog)
            } else {
                None
            };
            match slot {
                Some(slot) => *slot = items_from_value(&key, value)?,
                None => {
                    // Migration: the old open-work block joins the current one.
                    if opts.migrate_legacy_todo && key == LEGACY_TODO_KEY {
                        legacy = items_from_value(&key, value.clone())?;
                    }
                    record.extra.insert(key, value);
                }
            }
        }
        record.in_progress.extend(legacy);
        Ok(record)
    }

    /// Read back a summary document. No canonical blocks are filled in.
    pub fn decode_summary(text: Option<&str>) -> Result<Summary, CodecError> {
        let mut summary = Summary::new();
        let Some(mapping) = load_mapping(text)? else {
            return Ok(summary);
        };
        for (key, value) in mapping {
            let key = key_text(&key)?;
            let items = items_from_value(&key, value)?;
            summary.insert(key, items);
        }
        Ok(summary)
    }

    fn load_mapping(text: Option<&str>) -> Result<Option<Mapping>, CodecError> {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };
        match serde_yaml::from_str::<Value>(text)? {
            Value::Null => Ok(None),
            Value::Mapping(mapping) => Ok(Some(mapping)),
            _ => Err(CodecError::NotAMapping),
        }
    }

    fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn key_text(key: &Value) -> Result<String, CodecError> {
        scalar_text(key).ok_or_else(|| CodecError::InvalidKey(format!("{key:?}")))
    }

    fn kind_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Sequence(_) => "list",
            Value::Mapping(_) => "mapping",
            Value::Tagged(_) => "tagged value",
        }
    }

    fn items_from_value(field: &str, value: Value) -> Result<Vec<Item>, CodecError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|entry| item_from_value(field, entry))
                .collect(),
            other => Err(CodecError::InvalidField {
                field: field.to_string(),
                found: kind_name(&other),
            }),
        }
    }

    fn item_from_value(field: &str, value: Value) -> Result<Item, CodecError> {
        if let Some(text) = scalar_text(&value) {
            return Ok(Item::Text(text));
        }
        if let Value::Mapping(mapping) = value {
            if mapping.len() == 1 {
                if let Some((key, payload)) = mapping.into_iter().next() {
                    if let Some(text) = scalar_text(&key) {
                        return Ok(Item::Annotated { text, payload });
                    }
                }
            }
        }
        Err(CodecError::InvalidItem {
            field: field.to_string(),
        })
    }

    /* ------------------------------ Encode ------------------------------ */

    pub fn encode(record: &DayRecord, schema: Schema) -> Result<String, CodecError> {
        let mut backlog = record.backlog.clone();
        if schema.sorts_backlog() {
            sort_by_text(&mut backlog);
        }

        let [open, accomplished, backlog_label] = schema.labels();
        let mut out = String::new();
        write_block(&mut out, open, &record.in_progress)?;
        write_block(&mut out, accomplished, &record.accomplished)?;
        write_block(&mut out, backlog_label, &backlog)?;
        Ok(out)
    }

    pub fn encode_summary(summary: &Summary) -> Result<String, CodecError> {
        let mut out = String::new();
        for (day, items) in summary {
            out.push_str(day);
            out.push_str(":\n");
            out.push_str(&dump_items(items)?);
            out.push('\n');
        }
        Ok(out)
    }

    fn write_block(out: &mut String, label: &str, items: &[Item]) -> Result<(), CodecError> {
        out.push_str(label);
        out.push_str(":\n");
        if items.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&dump_items(items)?);
        }
        out.push('\n');
        Ok(())
    }

    fn dump_items(items: &[Item]) -> Result<String, CodecError> {
        let seq = Value::Sequence(items.iter().map(item_to_value).collect());
        Ok(serde_yaml::to_string(&seq)?)
    }

    fn item_to_value(item: &Item) -> Value {
        match item {
            Item::Text(text) => Value::String(text.clone()),
            Item::Annotated { text, payload } => {
                let mut mapping = Mapping::new();
                mapping.insert(Value::String(text.clone()), payload.clone());
                Value::Mapping(mapping)
            }
        }
    }

    /* ------------------------------ Files ------------------------------ */

    /// Load a day file; a missing file is an empty record.
    pub fn read_day_file(path: &Path, schema: Schema) -> Result<DayRecord> {
        let text = read_optional(path)?;
        decode(text.as_deref(), schema).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_summary_file(path: &Path) -> Result<Summary> {
        let text = read_optional(path)?;
        decode_summary(text.as_deref()).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_optional(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io("reading", path, err)),
        }
    }

}

pub mod locator {
    //! Finds day files (`YYYY-MM-DD-logbook.yaml`) in a directory.
    //! The zero-padded date prefix makes lexicographic order chronological.

    use crate::dates::{date_token, format_date, leading_date};
    use crate::diagnostics::Diagnostics;
    use crate::error::{Error, Result};
    use chrono::NaiveDate;
    use nom::{IResult, bytes::complete::tag, combinator::eof, sequence::tuple};
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    pub const DAY_FILE_SUFFIX: &str = "-logbook.yaml";

    pub fn day_file_name(date: NaiveDate) -> String {
        format!("{}{}", format_date(date), DAY_FILE_SUFFIX)
    }

    pub fn is_day_file_name(name: &str) -> bool {
        let parsed: IResult<&str, _> = tuple((date_token, tag(DAY_FILE_SUFFIX), eof))(name);
        parsed.is_ok()
    }

    /// Date at the start of the basename of `path`, if any.
    pub fn date_of(path: impl AsRef<Path>) -> Option<NaiveDate> {
        let name = path.as_ref().file_name()?.to_str()?;
        leading_date(name).map(|(_, date)| date)
    }

    #[derive(Debug, Clone)]
    pub struct FileLocator {
        directory: PathBuf,
        diagnostics: Diagnostics,
    }

    impl FileLocator {
        pub fn new(directory: impl Into<PathBuf>, diagnostics: Diagnostics) -> Self {
            Self {
                directory: directory.into(),
                diagnostics,
            }
        }

        pub fn directory(&self) -> &Path {
            &self.directory
        }

        pub fn day_file_path(&self, date: NaiveDate) -> PathBuf {
            self.directory.join(day_file_name(date))
        }

        /// Every day file, oldest first. Creates the directory when it is missing.
        pub fn day_files(&self) -> Result<Vec<PathBuf>> {
            self.ensure_directory()?;
            self.diagnostics
                .debug(format_args!("looking for day files in {:?}", self.directory));

            let entries = fs::read_dir(&self.directory)
                .map_err(|err| Error::io("listing", &self.directory, err))?;
            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|err| Error::io("listing", &self.directory, err))?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if is_day_file_name(name) {
                    self.diagnostics
                        .debug(format_args!("found file matching pattern: {name}"));
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names
                .into_iter()
                .map(|name| self.directory.join(name))
                .collect())
        }

        /// The latest `n` day files, oldest first. `n` must be at least 1.
        pub fn latest_n(&self, n: usize) -> Result<Vec<PathBuf>> {
            if n == 0 {
                return Err(Error::InvalidCount(0));
            }
            let mut files = self.day_files()?;
            let latest = files.split_off(files.len().saturating_sub(n));
            if latest.is_empty() {
                self.diagnostics.debug(format_args!("no files found"));
            }
            Ok(latest)
        }

        pub fn latest(&self) -> Result<Option<PathBuf>> {
            Ok(self.latest_n(1)?.pop())
        }

        fn ensure_directory(&self) -> Result<()> {
            if !self.directory.exists() {
                self.diagnostics
                    .debug(format_args!("creating {:?}", self.directory));
                fs::create_dir_all(&self.directory)
                    .map_err(|err| Error::io("creating", &self.directory, err))?;
            }
            Ok(())
        }
    }

}

pub mod rollover {
    //! Derives today's day file from the latest one.
    //!
    //! - Accomplished starts empty.
    //! - Open work carries forward as-is.
    //! - Backlog entries shaped `[YYYY-MM-DD] text` activate once the date is today or earlier;
    //!   everything else (including unparseable dates) stays in the backlog.

    use crate::codec::{encode, read_day_file};
    use crate::core::*;
    use crate::dates::bracketed_date;
    use crate::diagnostics::Diagnostics;
    use crate::error::{Error, Result};
    use crate::locator::FileLocator;
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RolloverOutcome {
        Created(PathBuf),
        /// Today's file was already there; nothing was written.
        AlreadyExists(PathBuf),
    }

    impl RolloverOutcome {
        pub fn path(&self) -> &Path {
            match self {
                RolloverOutcome::Created(path) | RolloverOutcome::AlreadyExists(path) => path,
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct RolloverEngine {
        locator: FileLocator,
        schema: Schema,
        diagnostics: Diagnostics,
    }

    impl RolloverEngine {
        pub fn new(
            directory: impl Into<PathBuf>,
            schema: Schema,
            diagnostics: Diagnostics,
        ) -> Self {
            Self {
                locator: FileLocator::new(directory, diagnostics.clone()),
                schema,
                diagnostics,
            }
        }

        pub fn today_path(&self, today: NaiveDate) -> PathBuf {
            self.locator.day_file_path(today)
        }

        /// Create today's file unless it exists. Safe to call repeatedly.
        pub fn roll_over(&self, today: NaiveDate) -> Result<RolloverOutcome> {
            let target = self.today_path(today);
            let latest = self.locator.latest()?;
            if latest.as_deref() == Some(target.as_path()) || target.exists() {
                self.diagnostics
                    .debug(format_args!("{:?} already created", target));
                return Ok(RolloverOutcome::AlreadyExists(target));
            }

            let previous = match &latest {
                Some(path) => {
                    self.diagnostics
                        .debug(format_args!("rolling over from {:?}", path));
                    read_day_file(path, self.schema)?
                }
                None => DayRecord::default(),
            };

            let next = next_day(previous, today, self.schema);
            let text = encode(&next, self.schema)?;
            fs::write(&target, text).map_err(|err| Error::io("writing", &target, err))?;
            self.diagnostics.debug(format_args!(
                "wrote {:?} ({} in progress, {} in backlog)",
                target,
                next.in_progress.len(),
                next.backlog.len()
            ));
            Ok(RolloverOutcome::Created(target))
        }
    }

    /// The text after a backlog entry's date, when that date is `today` or earlier.
    pub fn due_remainder(text: &str, today: NaiveDate) -> Option<&str> {
        let (rest, date) = bracketed_date(text)?;
        (date <= today).then_some(rest)
    }

    /// Pure part of the rollover: yesterday's record in, today's record out.
    pub fn next_day(previous: DayRecord, today: NaiveDate, schema: Schema) -> DayRecord {
        let DayRecord {
            mut in_progress,
            backlog,
            ..
        } = previous;

        let mut kept = Vec::with_capacity(backlog.len());
        for item in backlog {
            let Some(rest) = due_remainder(item.text(), today).map(str::trim) else {
                kept.push(item);
                continue;
            };
            match schema {
                // Each promotion goes to the front, so several land in reverse scan order.
                Schema::Gtd => in_progress.insert(0, item),
                Schema::Logbook => in_progress.push(Item::Text(rest.to_string())),
            }
        }

        DayRecord {
            in_progress,
            accomplished: Vec::new(),
            backlog: kept,
            extra: IndexMap::new(),
        }
    }

}

pub mod summary {
    //! Folds the accomplished lists of the latest N day files into one document.

    use crate::codec::{encode_summary, read_day_file};
    use crate::core::*;
    use crate::dates::format_date;
    use crate::diagnostics::Diagnostics;
    use crate::error::{Error, Result};
    use crate::locator::{FileLocator, date_of};
    use std::{fs, path::PathBuf};

    pub const SUMMARY_FILE_NAME: &str = "summary.yaml";
    pub const NO_DATA_PLACEHOLDER: &str = "N/A - No Data";
    pub const DEFAULT_SUMMARY_DAYS: i64 = 5;

    #[derive(Debug, Clone)]
    pub struct SummaryAggregator {
        locator: FileLocator,
        schema: Schema,
        diagnostics: Diagnostics,
    }

    impl SummaryAggregator {
        pub fn new(
            directory: impl Into<PathBuf>,
            schema: Schema,
            diagnostics: Diagnostics,
        ) -> Self {
            Self {
                locator: FileLocator::new(directory, diagnostics.clone()),
                schema,
                diagnostics,
            }
        }

        pub fn summary_path(&self) -> PathBuf {
            self.locator.directory().join(SUMMARY_FILE_NAME)
        }

        /// Build the summary in memory. Keys come from file names, not file contents.
        pub fn build(&self, n_days: i64) -> Result<Summary> {
            let count = usize::try_from(n_days)
                .ok()
                .filter(|n| *n > 0)
                .ok_or(Error::InvalidCount(n_days))?;

            let mut summary = Summary::new();
            for path in self.locator.latest_n(count)? {
                let Some(date) = date_of(&path) else {
                    self.diagnostics
                        .warn(format_args!("skipping {:?}: not a calendar date", path));
                    continue;
                };
                let record = read_day_file(&path, self.schema)?;
                let mut accomplished = record.accomplished;
                if accomplished.is_empty() {
                    accomplished.push(Item::from(NO_DATA_PLACEHOLDER));
                }
                summary.insert(format_date(date), accomplished);
            }
            Ok(summary)
        }

        /// Write the summary of the last `n_days` day files, replacing any previous one.
        pub fn summarize(&self, n_days: i64) -> Result<PathBuf> {
            let summary = self.build(n_days)?;
            let text = encode_summary(&summary)?;
            let path = self.summary_path();
            fs::write(&path, text).map_err(|err| Error::io("writing", &path, err))?;
            self.diagnostics
                .debug(format_args!("summarized {} days into {:?}", summary.len(), path));
            Ok(path)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::codec::read_summary_file;
        use std::path::Path;

        fn seed_days(dir: &Path, count: u32) {
            for day in 1..=count {
                let name = format!("2017-01-{day:02}-logbook.yaml");
                let body = format!("In progress:\n\nAccomplished:\n- did {day}\n\nBacklog:\n\n");
                fs::write(dir.join(name), body).expect("seed day");
            }
        }

        #[test]
        fn five_days_become_five_keys() {
            let tmp = tempfile::tempdir().expect("tempdir");
            seed_days(tmp.path(), 5);
            let aggregator = SummaryAggregator::new(tmp.path(), Schema::Gtd, Diagnostics::noop());

            let path = aggregator.summarize(5).expect("summarize");
            assert_eq!(path, tmp.path().join(SUMMARY_FILE_NAME));

            let summary = read_summary_file(&path).expect("read summary");
            let keys: Vec<_> = summary.keys().cloned().collect();
            assert_eq!(
                keys,
                vec!["2017-01-01", "2017-01-02", "2017-01-03", "2017-01-04", "2017-01-05"]
            );
            for (idx, items) in summary.values().enumerate() {
                assert_eq!(items, &vec![Item::from(format!("did {}", idx + 1))]);
            }
            for label in Schema::Gtd.labels() {
                assert!(!summary.contains_key(label));
            }
        }

        #[test]
        fn empty_day_gets_the_placeholder() {
            let tmp = tempfile::tempdir().expect("tempdir");
            seed_days(tmp.path(), 1);
            fs::write(tmp.path().join("2017-01-02-logbook.yaml"), "Accomplished:\n")
                .expect("empty day");
            let aggregator = SummaryAggregator::new(tmp.path(), Schema::Gtd, Diagnostics::noop());

            let summary = aggregator.build(5).expect("build");
            assert_eq!(summary["2017-01-01"], vec![Item::from("did 1")]);
            assert_eq!(summary["2017-01-02"], vec![Item::from(NO_DATA_PLACEHOLDER)]);
        }

        #[test]
        fn only_the_latest_days_are_used() {
            let tmp = tempfile::tempdir().expect("tempdir");
            seed_days(tmp.path(), 5);
            let aggregator = SummaryAggregator::new(tmp.path(), Schema::Gtd, Diagnostics::noop());

            let summary = aggregator.build(2).expect("build");
            let keys: Vec<_> = summary.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["2017-01-04", "2017-01-05"]);
        }

        #[test]
        fn non_positive_day_counts_write_nothing() {
            let tmp = tempfile::tempdir().expect("tempdir");
            let dir = tmp.path().join("backlog");
            let aggregator = SummaryAggregator::new(&dir, Schema::Gtd, Diagnostics::noop());

            for n in [0, -3] {
                let err = aggregator.summarize(n).expect_err("invalid count");
                assert!(matches!(err, Error::InvalidCount(got) if got == n));
            }
            assert!(!dir.exists());
        }

        #[test]
        fn previous_summary_is_replaced() {
            let tmp = tempfile::tempdir().expect("tempdir");
            seed_days(tmp.path(), 3);
            let aggregator = SummaryAggregator::new(tmp.path(), Schema::Gtd, Diagnostics::noop());
            fs::write(aggregator.summary_path(), "1999-01-01:\n- stale\n").expect("stale");

            let path = aggregator.summarize(1).expect("summarize");
            let summary = read_summary_file(&path).expect("read");
            assert_eq!(summary.len(), 1);
            assert_eq!(summary["2017-01-03"], vec![Item::from("did 3")]);
        }

        #[test]
        fn directory_without_day_files_gives_an_empty_summary() {
            let tmp = tempfile::tempdir().expect("tempdir");
            let aggregator = SummaryAggregator::new(tmp.path(), Schema::Gtd, Diagnostics::noop());

            let path = aggregator.summarize(5).expect("summarize");
            assert_eq!(fs::read_to_string(path).expect("read"), "");
        }
    }
}

pub mod config {
    use crate::core::Schema;
    use std::path::PathBuf;

    pub const DIRECTORY_ENV: &str = "GTD_DIRECTORY";
    pub const EDITOR_ENV: &str = "EDITOR";

    /// `~/.gtd/backlog`, or a relative `.gtd/backlog` when no home directory is known.
    pub fn default_directory() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_default()
            .join(".gtd")
            .join("backlog")
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Config {
        pub directory: PathBuf,
        pub editor: Option<String>,
        pub schema: Schema,
    }

    impl Config {
        pub fn new(directory: Option<PathBuf>, editor: Option<String>, schema: Schema) -> Self {
            Self {
                directory: directory.unwrap_or_else(default_directory),
                editor: editor.filter(|e| !e.trim().is_empty()),
                schema,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn blank_editor_counts_as_missing() {
            let config = Config::new(Some("/tmp/x".into()), Some("  ".into()), Schema::Gtd);
            assert_eq!(config.editor, None);
            assert_eq!(config.directory, PathBuf::from("/tmp/x"));
        }

        #[test]
        fn directory_defaults_under_home() {
            let config = Config::new(None, Some("vim".into()), Schema::Logbook);
            assert!(config.directory.ends_with(".gtd/backlog"));
            assert_eq!(config.editor.as_deref(), Some("vim"));
        }
    }
}

pub mod editor {
    //! Opens a file in the user's editor and waits for it to exit.

    use crate::diagnostics::Diagnostics;
    use crate::error::{Error, Result};
    use std::{path::Path, process::Command};

    pub const MISSING_EDITOR_NOTICE: &str = "No editor was chosen. Please, define the environment \
         variable \"EDITOR\" or just use the -e option to specify it.";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EditorOutcome {
        Opened,
        NotConfigured,
    }

    /// `editor` may carry arguments (`"code --wait"`); the file path is appended last.
    pub fn open(
        editor: Option<&str>,
        path: &Path,
        diagnostics: &Diagnostics,
    ) -> Result<EditorOutcome> {
        let mut words = editor.unwrap_or_default().split_whitespace();
        let Some(program) = words.next() else {
            return Ok(EditorOutcome::NotConfigured);
        };

        diagnostics.debug(format_args!("opening {:?} with {program}", path));
        let status = Command::new(program)
            .args(words)
            .arg(path)
            .status()
            .map_err(|source| Error::Editor {
                program: program.to_string(),
                source,
            })?;
        if !status.success() {
            diagnostics.warn(format_args!("{program} exited with {status}"));
        }
        Ok(EditorOutcome::Opened)
    }

}

pub use codec::{decode, decode_raw, decode_summary, encode, encode_summary};
pub use crate::core::{DayRecord, Item, Schema, Summary};
pub use diagnostics::Diagnostics;
pub use error::{CodecError, Error, Result};
pub use locator::{FileLocator, date_of};
pub use rollover::{RolloverEngine, RolloverOutcome};
pub use summary::SummaryAggregator;
