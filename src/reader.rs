use std::fs;
use std::path::{Path, PathBuf};

use biblatex::{Pair, RawBibliography, RawChunk};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::types::BibRecord;

const BIB_EXTENSION: &str = "bib";

/// Entries gathered from a directory, plus the files that could not be parsed.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub records: Vec<BibRecord>,
    pub files_read: usize,
    pub skipped: Vec<AppError>,
}

/// Read every `.bib` file directly inside `dir`.
///
/// A file that fails to parse is logged and skipped; only an unreadable
/// directory is an error.
pub fn read_directory(dir: &Path) -> Result<ReadOutcome> {
    let mut outcome = ReadOutcome::default();
    for path in list_bib_files(dir)? {
        match read_file(&path) {
            Ok(records) => {
                info!(file = %path.display(), entries = records.len(), "importing file");
                outcome.files_read += 1;
                outcome.records.extend(records);
            }
            Err(err) => {
                warn!("{err}, skipping");
                outcome.skipped.push(err);
            }
        }
    }
    Ok(outcome)
}

fn list_bib_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_err = |source| AppError::Read { path: dir.to_path_buf(), source };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && has_bib_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_bib_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BIB_EXTENSION))
}

/// Parse a single bibliography file into records.
pub fn read_file(path: &Path) -> Result<Vec<BibRecord>> {
    let text = fs::read_to_string(path).map_err(|e| AppError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_bibliography(&text).map_err(|message| AppError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse BibTeX source text into one record per entry, in file order.
///
/// Entries sharing a citation key are all kept. Field values keep the text
/// as written; `@string` macros defined in the file are substituted, any
/// other bare name (`month = jan`) is kept as the name itself.
pub fn parse_bibliography(text: &str) -> std::result::Result<Vec<BibRecord>, String> {
    let raw = RawBibliography::parse(text).map_err(|e| e.to_string())?;
    let records = raw
        .entries
        .iter()
        .map(|entry| {
            let entry = &entry.v;
            let mut record = BibRecord::new(entry.key.v, entry.kind.v.to_ascii_lowercase());
            for field in &entry.fields {
                record = record.with_field(field.key.v, field_text(field, &raw.abbreviations));
            }
            record
        })
        .collect();
    Ok(records)
}

fn field_text(field: &Pair<'_>, abbreviations: &[Pair<'_>]) -> String {
    let mut out = String::new();
    for chunk in &field.value.v {
        match chunk.v {
            RawChunk::Normal(text) => out.push_str(text),
            RawChunk::Abbreviation(name) => match lookup(abbreviations, name) {
                Some(definition) => out.push_str(&chunks_text(definition)),
                None => out.push_str(name),
            },
        }
    }
    out
}

fn lookup<'a, 's>(abbreviations: &'a [Pair<'s>], name: &str) -> Option<&'a Pair<'s>> {
    abbreviations
        .iter()
        .rev()
        .find(|pair| pair.key.v.eq_ignore_ascii_case(name))
}

// Macros referenced inside a macro definition stay as their names.
fn chunks_text(definition: &Pair<'_>) -> String {
    definition
        .value
        .v
        .iter()
        .map(|chunk| match chunk.v {
            RawChunk::Normal(text) | RawChunk::Abbreviation(text) => text,
        })
        .collect()
}
