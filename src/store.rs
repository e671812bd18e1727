use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::types::NewArticle;

/// Database session owning the connection for the whole run.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction covering one entry's insert-and-link sequence.
    pub fn entry(&mut self) -> rusqlite::Result<EntryTx<'_>> {
        Ok(EntryTx { tx: self.conn.transaction()? })
    }
}

/// Writes for a single bibliography entry. Dropping without `commit` rolls back.
pub struct EntryTx<'a> {
    tx: Transaction<'a>,
}

impl EntryTx<'_> {
    pub fn commit(self) -> rusqlite::Result<()> {
        self.tx.commit()
    }

    pub fn upsert_journal(&self, name: &str) -> rusqlite::Result<i64> {
        upsert_name(&self.tx, "journals", "name", name)
    }

    pub fn upsert_author(&self, name: &str) -> rusqlite::Result<i64> {
        upsert_name(&self.tx, "authors", "name", name)
    }

    pub fn upsert_keyword(&self, keyword: &str) -> rusqlite::Result<i64> {
        upsert_name(&self.tx, "keywords", "keyword", keyword)
    }

    /// Id of any article already stored under this DOI.
    pub fn find_article_by_doi(&self, doi: &str) -> rusqlite::Result<Option<i64>> {
        self.tx
            .query_row(
                "SELECT id FROM articles WHERE doi = ?1 LIMIT 1",
                params![doi],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn insert_article(&self, article: &NewArticle) -> rusqlite::Result<i64> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO articles (
                bibtex_id, journal_id, title, year, volume, number, pages, abstract,
                keywords, doi, issn, month, status, publisher, eissn, isbn, language,
                conference, address, pubmed_id, document_type, degree
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
            )
            RETURNING id",
        )?;
        stmt.query_row(
            params![
                article.bibtex_id,
                article.journal_id,
                article.title,
                article.year,
                article.volume,
                article.number,
                article.pages,
                article.abstract_text,
                article.keywords,
                article.doi,
                article.issn,
                article.month,
                article.status.as_str(),
                article.publisher,
                article.eissn,
                article.isbn,
                article.language,
                article.conference,
                article.address,
                article.pubmed_id,
                article.document_type,
                article.degree,
            ],
            |row| row.get(0),
        )
    }

    /// Returns whether a new link row was written.
    pub fn link_author(&self, article_id: i64, author_id: i64) -> rusqlite::Result<bool> {
        let inserted = self.tx.execute(
            "INSERT INTO article_authors (article_id, author_id) VALUES (?1, ?2)
             ON CONFLICT DO NOTHING",
            params![article_id, author_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn link_keyword(&self, article_id: i64, keyword_id: i64) -> rusqlite::Result<bool> {
        let inserted = self.tx.execute(
            "INSERT INTO article_keywords (article_id, keyword_id) VALUES (?1, ?2)
             ON CONFLICT DO NOTHING",
            params![article_id, keyword_id],
        )?;
        Ok(inserted > 0)
    }
}

/// Insert-or-return-existing in one statement. The no-op update makes
/// `RETURNING` yield the id of the row that already holds `value`.
fn upsert_name(tx: &Transaction, table: &str, column: &str, value: &str) -> rusqlite::Result<i64> {
    let sql = format!(
        "INSERT INTO {table} ({column}) VALUES (?1)
         ON CONFLICT ({column}) DO UPDATE SET {column} = excluded.{column}
         RETURNING id"
    );
    tx.prepare_cached(&sql)?
        .query_row(params![value], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::types::{ArticleStatus, BibRecord};

    fn store() -> Store {
        let conn = schema::open(":memory:").unwrap();
        schema::initialize(&conn, false).unwrap();
        Store::new(conn)
    }

    fn count(store: &Store, sql: &str) -> i64 {
        store.conn().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn upsert_returns_same_id_for_same_name() {
        let mut store = store();
        let tx = store.entry().unwrap();
        let first = tx.upsert_author("Doe, J.").unwrap();
        let again = tx.upsert_author("Doe, J.").unwrap();
        let other = tx.upsert_author("Roe, R.").unwrap();
        tx.commit().unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM authors"), 2);
    }

    #[test]
    fn journals_and_keywords_are_idempotent_too() {
        let mut store = store();
        let tx = store.entry().unwrap();
        assert_eq!(
            tx.upsert_journal("Nature").unwrap(),
            tx.upsert_journal("Nature").unwrap()
        );
        assert_eq!(
            tx.upsert_keyword("rust").unwrap(),
            tx.upsert_keyword("rust").unwrap()
        );
        tx.commit().unwrap();
        assert_eq!(count(&store, "SELECT COUNT(*) FROM journals"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM keywords"), 1);
    }

    #[test]
    fn links_are_written_once() {
        let mut store = store();
        let tx = store.entry().unwrap();
        let record = BibRecord::new("k", "article");
        let article = NewArticle::from_record(&record, None, ArticleStatus::Unclassified);
        let article_id = tx.insert_article(&article).unwrap();
        let author_id = tx.upsert_author("Doe, J.").unwrap();
        let keyword_id = tx.upsert_keyword("alpha").unwrap();

        assert!(tx.link_author(article_id, author_id).unwrap());
        assert!(!tx.link_author(article_id, author_id).unwrap());
        assert!(tx.link_keyword(article_id, keyword_id).unwrap());
        assert!(!tx.link_keyword(article_id, keyword_id).unwrap());
        tx.commit().unwrap();

        assert_eq!(count(&store, "SELECT COUNT(*) FROM article_authors"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM article_keywords"), 1);
    }

    #[test]
    fn uncommitted_entry_rolls_back() {
        let mut store = store();
        {
            let tx = store.entry().unwrap();
            tx.upsert_journal("Gone").unwrap();
        }
        assert_eq!(count(&store, "SELECT COUNT(*) FROM journals"), 0);
    }

    #[test]
    fn finds_article_by_doi() {
        let mut store = store();
        let tx = store.entry().unwrap();
        let record = BibRecord::new("k", "article").with_field("doi", "10.1/x");
        let article = NewArticle::from_record(&record, None, ArticleStatus::Unclassified);
        let id = tx.insert_article(&article).unwrap();

        assert_eq!(tx.find_article_by_doi("10.1/x").unwrap(), Some(id));
        assert_eq!(tx.find_article_by_doi("10.1/y").unwrap(), None);
    }
}
