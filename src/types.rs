use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One entry read from a bibliography file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibRecord {
    /// Citation key, e.g. `doe2020` in `@article{doe2020, ...}`.
    pub key: String,
    pub entry_type: String,
    /// Field name (lowercase) to raw text value.
    pub fields: BTreeMap<String, String>,
}

impl BibRecord {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed field value, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Curation state of an article. Import only assigns `Unclassified` and
/// `Duplicated`; the other two are set during manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArticleStatus {
    Accepted,
    Rejected,
    Unclassified,
    Duplicated,
}

impl ArticleStatus {
    pub const ALL: [ArticleStatus; 4] = [
        ArticleStatus::Accepted,
        ArticleStatus::Rejected,
        ArticleStatus::Unclassified,
        ArticleStatus::Duplicated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Accepted => "Accepted",
            ArticleStatus::Rejected => "Rejected",
            ArticleStatus::Unclassified => "Unclassified",
            ArticleStatus::Duplicated => "Duplicated",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub bibtex_id: String,
    pub journal_id: Option<i64>,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub volume: Option<String>,
    pub number: Option<String>,
    pub pages: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Option<String>,
    pub doi: Option<String>,
    pub issn: Option<String>,
    pub month: Option<String>,
    pub status: ArticleStatus,
    pub publisher: Option<String>,
    pub eissn: Option<String>,
    pub isbn: Option<String>,
    pub language: Option<String>,
    pub conference: Option<String>,
    pub address: Option<String>,
    pub pubmed_id: Option<String>,
    pub document_type: Option<String>,
    pub degree: Option<String>,
}

impl NewArticle {
    pub fn from_record(
        record: &BibRecord,
        journal_id: Option<i64>,
        status: ArticleStatus,
    ) -> Self {
        let field = |name: &str| record.text(name).map(str::to_string);
        Self {
            bibtex_id: record.key.clone(),
            journal_id,
            title: field("title"),
            year: parse_year(record.get("year")),
            volume: field("volume"),
            number: field("number"),
            pages: field("pages"),
            abstract_text: field("abstract"),
            keywords: field("keywords"),
            doi: field("doi"),
            issn: field("issn"),
            month: field("month"),
            status,
            publisher: field("publisher"),
            eissn: field("eissn"),
            isbn: field("isbn"),
            language: field("language"),
            conference: field("conference"),
            address: field("address"),
            pubmed_id: field("pubmed_id"),
            document_type: field("document_type"),
            degree: field("degree"),
        }
    }
}

/// A year is kept only when the raw value is made of ASCII digits alone.
pub fn parse_year(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Counters for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub files_read: usize,
    pub files_skipped: usize,
    pub entries: usize,
    pub imported: usize,
    pub duplicated: usize,
    pub failed: usize,
    pub author_links: usize,
    pub keyword_links: usize,
}

/// One line of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub label: Option<String>,
    pub count: i64,
}

#[cfg(test)]
impl CountRow {
    pub fn new(label: &str, count: i64) -> Self {
        Self { label: Some(label.to_string()), count }
    }
}

/// Aggregated view of the article table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub total: i64,
    pub by_status: Vec<CountRow>,
    pub by_document_type: Vec<CountRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailedReport>,
}

/// Extra breakdowns shown with `--detailed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedReport {
    pub by_journal: Vec<CountRow>,
    pub by_author: Vec<CountRow>,
    pub by_publisher: Vec<CountRow>,
    pub by_keyword: Vec<CountRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("2020"), Some(2020))]
    #[case(Some("circa 2020"), None)]
    #[case(Some(""), None)]
    #[case(Some(" 2020"), None)]
    #[case(None, None)]
    fn year_requires_digits_only(#[case] raw: Option<&str>, #[case] expected: Option<i64>) {
        assert_eq!(parse_year(raw), expected);
    }

    #[test]
    fn status_text_matches_schema_values() {
        assert_eq!(ArticleStatus::Duplicated.to_string(), "Duplicated");
        assert_eq!(ArticleStatus::Unclassified.as_str(), "Unclassified");
    }

    #[test]
    fn blank_fields_become_absent() {
        let record = BibRecord::new("k1", "article")
            .with_field("title", "  A Title ")
            .with_field("doi", "   ")
            .with_field("year", "1999");
        let article = NewArticle::from_record(&record, Some(7), ArticleStatus::Unclassified);
        assert_eq!(article.bibtex_id, "k1");
        assert_eq!(article.journal_id, Some(7));
        assert_eq!(article.title.as_deref(), Some("A Title"));
        assert_eq!(article.doi, None);
        assert_eq!(article.year, Some(1999));
        assert_eq!(article.publisher, None);
    }
}
