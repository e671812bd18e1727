use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use crate::error::{AppError, Result};
use crate::types::ArticleStatus;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Children before parents so foreign keys never dangle mid-drop.
const DROP_TABLES: &str = "
    DROP TABLE IF EXISTS article_keywords;
    DROP TABLE IF EXISTS keywords;
    DROP TABLE IF EXISTS article_authors;
    DROP TABLE IF EXISTS authors;
    DROP TABLE IF EXISTS articles;
    DROP TABLE IF EXISTS journals;
";

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS journals (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS authors (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY,
        bibtex_id TEXT,
        journal_id INTEGER REFERENCES journals(id),
        title TEXT,
        year INTEGER,
        volume TEXT,
        number TEXT,
        pages TEXT,
        abstract TEXT,
        keywords TEXT,
        doi TEXT,
        issn TEXT,
        month TEXT,
        status TEXT NOT NULL DEFAULT 'Unclassified' CHECK (status IN ({statuses})),
        publisher TEXT,
        eissn TEXT,
        isbn TEXT,
        language TEXT,
        conference TEXT,
        address TEXT,
        pubmed_id TEXT,
        document_type TEXT,
        degree TEXT
    );

    CREATE INDEX IF NOT EXISTS articles_doi ON articles(doi);

    CREATE TABLE IF NOT EXISTS article_authors (
        article_id INTEGER NOT NULL REFERENCES articles(id),
        author_id INTEGER NOT NULL REFERENCES authors(id),
        PRIMARY KEY (article_id, author_id)
    );

    CREATE TABLE IF NOT EXISTS keywords (
        id INTEGER PRIMARY KEY,
        keyword TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS article_keywords (
        article_id INTEGER NOT NULL REFERENCES articles(id),
        keyword_id INTEGER NOT NULL REFERENCES keywords(id),
        PRIMARY KEY (article_id, keyword_id)
    );
";

/// Open (or create) the database file. `:memory:` gives a private in-memory database.
pub fn open(path: &str) -> Result<Connection> {
    let connect = || -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    };
    connect().map_err(|source| AppError::Connection {
        path: path.to_string(),
        source,
    })
}

pub fn reset(conn: &Connection) -> Result<()> {
    conn.execute_batch(DROP_TABLES).map_err(AppError::Schema)?;
    info!("existing tables dropped");
    Ok(())
}

pub fn create(conn: &Connection) -> Result<()> {
    let statuses = ArticleStatus::ALL
        .iter()
        .map(|status| format!("'{status}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let ddl = CREATE_TABLES.replace("{statuses}", &statuses);
    conn.execute_batch(&ddl).map_err(AppError::Schema)?;
    info!("tables ready");
    Ok(())
}

/// Prepare the schema, dropping old tables first unless `keep_existing`.
pub fn initialize(conn: &Connection, keep_existing: bool) -> Result<()> {
    if !keep_existing {
        reset(conn)?;
    }
    create(conn)
}
