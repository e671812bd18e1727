use std::fmt::Write as _;

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::types::{ArticleStatus, CountRow, DetailedReport, Report};

const STATUS_SQL: &str = "
    SELECT status, COUNT(*) AS total
    FROM articles
    GROUP BY status
    ORDER BY total DESC, status ASC";

const DOCUMENT_TYPE_SQL: &str = "
    SELECT document_type, COUNT(*) AS total
    FROM articles
    WHERE status <> ?1
    GROUP BY document_type
    ORDER BY total DESC, document_type ASC";

const JOURNAL_SQL: &str = "
    SELECT j.name, COUNT(a.id) AS total
    FROM journals j
    JOIN articles a ON j.id = a.journal_id
    GROUP BY j.name
    ORDER BY total DESC, j.name ASC";

const AUTHOR_SQL: &str = "
    SELECT au.name, COUNT(aa.article_id) AS total
    FROM authors au
    JOIN article_authors aa ON au.id = aa.author_id
    GROUP BY au.name
    ORDER BY total DESC, au.name ASC";

const PUBLISHER_SQL: &str = "
    SELECT publisher, COUNT(*) AS total
    FROM articles
    WHERE publisher IS NOT NULL AND publisher <> ''
    GROUP BY publisher
    ORDER BY total DESC, publisher ASC";

// Ascending: least-used keywords first.
const KEYWORD_SQL: &str = "
    SELECT k.keyword, COUNT(ak.article_id) AS total
    FROM keywords k
    JOIN article_keywords ak ON k.id = ak.keyword_id
    JOIN articles a ON ak.article_id = a.id
    WHERE a.status <> ?1
    GROUP BY k.keyword
    ORDER BY total ASC, k.keyword ASC";

/// Aggregate the article table. Read-only.
pub fn build_report(conn: &Connection, detailed: bool) -> Result<Report> {
    collect(conn, detailed).map_err(AppError::Report)
}

fn collect(conn: &Connection, detailed: bool) -> rusqlite::Result<Report> {
    let total = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
    let duplicated = ArticleStatus::Duplicated.as_str();
    let detail = if detailed {
        Some(DetailedReport {
            by_journal: grouped(conn, JOURNAL_SQL, None)?,
            by_author: grouped(conn, AUTHOR_SQL, None)?,
            by_publisher: grouped(conn, PUBLISHER_SQL, None)?,
            by_keyword: grouped(conn, KEYWORD_SQL, Some(duplicated))?,
        })
    } else {
        None
    };
    Ok(Report {
        total,
        by_status: grouped(conn, STATUS_SQL, None)?,
        by_document_type: grouped(conn, DOCUMENT_TYPE_SQL, Some(duplicated))?,
        detail,
    })
}

fn grouped(
    conn: &Connection,
    sql: &str,
    excluded: Option<&str>,
) -> rusqlite::Result<Vec<CountRow>> {
    let mut stmt = conn.prepare(sql)?;
    let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<CountRow> {
        Ok(CountRow {
            label: row.get(0)?,
            count: row.get(1)?,
        })
    };
    match excluded {
        Some(status) => stmt.query_map(params![status], map)?.collect(),
        None => stmt.query_map([], map)?.collect(),
    }
}

/// Render the report as the fixed-width console tables.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nTotal records: {}", report.total);
    render_table(&mut out, "Total articles by status:", "Status", 20, &report.by_status);
    render_table(
        &mut out,
        "Document type and total articles (Excluding Duplicates):",
        "Document Type",
        30,
        &report.by_document_type,
    );
    if let Some(detail) = &report.detail {
        render_table(&mut out, "Journals and total articles:", "Journal", 30, &detail.by_journal);
        render_table(&mut out, "Authors and total articles:", "Author", 30, &detail.by_author);
        render_table(&mut out, "Publishers and total articles:", "Publisher", 30, &detail.by_publisher);
        render_table(
            &mut out,
            "Keywords and total articles (excluding duplicates):",
            "Keyword",
            30,
            &detail.by_keyword,
        );
    }
    out
}

fn render_table(out: &mut String, title: &str, heading: &str, width: usize, rows: &[CountRow]) {
    let _ = writeln!(out, "\n{title}");
    let _ = writeln!(out, "{heading:<width$} {:<20}", "Total Articles");
    let _ = writeln!(out, "{}", "-".repeat(width + 20));
    for row in rows {
        let label = row.label.as_deref().unwrap_or("(none)");
        let _ = writeln!(out, "{label:<width$} {:<20}", row.count);
    }
}

pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.map_err(AppError::Render)
}
