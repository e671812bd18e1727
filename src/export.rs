use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::info;

use crate::error::AppError;

const EXPORT_SQL: &str = "SELECT * FROM articles ORDER BY status, id";

/// Write every article row to a CSV spreadsheet, header first. NULLs become empty cells.
pub fn export_articles(conn: &Connection, path: &Path) -> crate::error::Result<usize> {
    let rows = write_csv(conn, path).map_err(|source| AppError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), rows, "spreadsheet written");
    Ok(rows)
}

fn write_csv(conn: &Connection, path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut stmt = conn.prepare(EXPORT_SQL)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    writer.write_record(&columns)?;

    let mut rows = stmt.query([])?;
    let mut written = 0;
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            record.push(cell_text(row.get_ref(idx)?));
        }
        writer.write_record(&record)?;
        written += 1;
    }
    writer.flush().context("Failed to flush spreadsheet")?;
    Ok(written)
}

fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::import_records;
    use crate::schema;
    use crate::store::Store;
    use crate::types::{BibRecord, ImportSummary};

    #[test]
    fn writes_header_and_rows_in_status_order() {
        let conn = schema::open(":memory:").unwrap();
        schema::initialize(&conn, false).unwrap();
        let mut store = Store::new(conn);
        let records = [
            BibRecord::new("first", "article")
                .with_field("doi", "10.1/x")
                .with_field("year", "2020")
                .with_field("title", "Commas, quoted"),
            BibRecord::new("second", "article").with_field("doi", "10.1/x"),
        ];
        let mut summary = ImportSummary::default();
        import_records(&mut store, &records, false, &mut summary).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles_data.csv");
        let rows = export_articles(store.conn(), &path).unwrap();
        assert_eq!(rows, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "id");
        assert_eq!(&headers[1], "bibtex_id");
        assert_eq!(headers.len(), 23);
        let status_col = headers.iter().position(|h| h == "status").unwrap();
        let year_col = headers.iter().position(|h| h == "year").unwrap();
        let title_col = headers.iter().position(|h| h == "title").unwrap();

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        // "Duplicated" sorts before "Unclassified".
        assert_eq!(&records[0][1], "second");
        assert_eq!(&records[0][status_col], "Duplicated");
        assert_eq!(&records[0][year_col], "");
        assert_eq!(&records[1][status_col], "Unclassified");
        assert_eq!(&records[1][year_col], "2020");
        assert_eq!(&records[1][title_col], "Commas, quoted");
    }

    #[test]
    fn unwritable_path_is_an_export_error() {
        let conn = schema::open(":memory:").unwrap();
        schema::initialize(&conn, false).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = export_articles(&conn, &path).unwrap_err();
        assert!(matches!(err, AppError::Export { .. }));
    }
}
