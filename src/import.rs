use tracing::{debug, error, info};

use crate::error::{AppError, Result};
use crate::keywords::normalize_keywords;
use crate::store::{EntryTx, Store};
use crate::types::{ArticleStatus, BibRecord, ImportSummary, NewArticle};

const AUTHOR_SEPARATOR: &str = " and ";

/// What one entry contributed to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOutcome {
    pub article_id: i64,
    pub status: ArticleStatus,
    pub author_links: usize,
    pub keyword_links: usize,
}

/// Import every record, one transaction per entry.
///
/// A failing entry is rolled back and counted in `summary.failed`; with
/// `fail_fast` the first failure is returned instead.
pub fn import_records(
    store: &mut Store,
    records: &[BibRecord],
    fail_fast: bool,
    summary: &mut ImportSummary,
) -> Result<()> {
    for record in records {
        summary.entries += 1;
        match import_entry(store, record) {
            Ok(outcome) => {
                summary.imported += 1;
                if outcome.status == ArticleStatus::Duplicated {
                    summary.duplicated += 1;
                }
                summary.author_links += outcome.author_links;
                summary.keyword_links += outcome.keyword_links;
            }
            Err(err) if fail_fast => return Err(err),
            Err(err) => {
                error!("{err}: {}", source_message(&err));
                summary.failed += 1;
            }
        }
    }
    info!(
        imported = summary.imported,
        duplicated = summary.duplicated,
        failed = summary.failed,
        "articles inserted and linked with authors, journals and keywords"
    );
    Ok(())
}

/// Upsert one entry and its journal, authors and keywords atomically.
pub fn import_entry(store: &mut Store, record: &BibRecord) -> Result<EntryOutcome> {
    let write_err = |source| AppError::Write {
        key: record.key.clone(),
        source,
    };
    let tx = store.entry().map_err(write_err)?;
    let outcome = write_entry(&tx, record).map_err(write_err)?;
    tx.commit().map_err(write_err)?;
    debug!(
        key = %record.key,
        entry_type = %record.entry_type,
        article_id = outcome.article_id,
        status = %outcome.status,
        "entry imported"
    );
    Ok(outcome)
}

fn write_entry(tx: &EntryTx<'_>, record: &BibRecord) -> rusqlite::Result<EntryOutcome> {
    let journal_id = match record.text("journal") {
        Some(name) => Some(tx.upsert_journal(name)?),
        None => None,
    };

    let status = match record.text("doi") {
        Some(doi) if tx.find_article_by_doi(doi)?.is_some() => ArticleStatus::Duplicated,
        _ => ArticleStatus::Unclassified,
    };

    let article = NewArticle::from_record(record, journal_id, status);
    let article_id = tx.insert_article(&article)?;

    let mut author_links = 0;
    if let Some(authors) = record.text("author") {
        for name in split_authors(authors) {
            let author_id = tx.upsert_author(name)?;
            if tx.link_author(article_id, author_id)? {
                author_links += 1;
            }
        }
    }

    let mut keyword_links = 0;
    if let Some(raw) = record.text("keywords") {
        for keyword in normalize_keywords(raw) {
            let keyword_id = tx.upsert_keyword(&keyword)?;
            if tx.link_keyword(article_id, keyword_id)? {
                keyword_links += 1;
            }
        }
    }

    Ok(EntryOutcome {
        article_id,
        status,
        author_links,
        keyword_links,
    })
}

/// Author names separated by a literal ` and `, trimmed, blanks dropped.
pub fn split_authors(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(AUTHOR_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn source_message(err: &AppError) -> String {
    std::error::Error::source(err)
        .map(|s| s.to_string())
        .unwrap_or_default()
}
