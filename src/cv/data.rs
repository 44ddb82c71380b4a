//! Document tables and the merged screening dataset.
//!
//! Two CSV tables go in: documents that have already been screened and a
//! larger candidate export. Candidates whose normalized title is already in
//! the screened table are dropped as duplicates, documents without text are
//! dropped from both, and the survivors are concatenated and shuffled.

use super::config::ColumnsConfig;
use super::error::{Error, Result};
use csv::{ReaderBuilder, StringRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").expect("valid regex"));

/// Strip non-word characters and lowercase, so titles compare across sources.
pub fn normalize_title(title: &str) -> String {
    NON_WORD.replace_all(title, "").to_lowercase()
}

/// One row of the merged dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Candidate identifier, if the source table has one
    pub id: Option<String>,
    pub title: String,
    /// Normalized title used for deduplication
    pub title_key: String,
    /// Feature text (the abstract)
    pub text: String,
    /// Raw cell per [`Dataset::label_columns`] entry. Cells are only parsed
    /// once a column is used as a target.
    pub labels: Vec<String>,
    /// `Some(true)` for screened rows, `Some(false)` for the candidate pool.
    /// `None` when the screened table left the flag blank; such rows are in
    /// neither set.
    pub seen: Option<bool>,
}

/// The merged, shuffled collection of screened and candidate documents.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub documents: Vec<Document>,
    /// Non-structural columns of the screened table, in header order
    pub label_columns: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rows flagged as screened.
    pub fn seen_rows(&self) -> Vec<usize> {
        self.rows_where(|doc| doc.seen == Some(true))
    }

    /// Rows explicitly flagged as unseen, i.e. the candidate pool.
    pub fn unseen_rows(&self) -> Vec<usize> {
        self.rows_where(|doc| doc.seen == Some(false))
    }

    pub fn rows_where(&self, pred: impl Fn(&Document) -> bool) -> Vec<usize> {
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| pred(doc))
            .map(|(row, _)| row)
            .collect()
    }

    /// Position of a label column.
    pub fn label_column(&self, name: &str) -> Option<usize> {
        self.label_columns.iter().position(|c| c == name)
    }

    /// Parsed value of label column `idx` in `row`; `None` when the cell is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLabel`] if the cell is neither a number nor a
    /// boolean literal.
    pub fn label(&self, row: usize, idx: usize) -> Result<Option<f64>> {
        parse_label(&self.label_columns[idx], &self.documents[row].labels[idx])
    }

    pub fn texts(&self, rows: &[usize]) -> Vec<String> {
        rows.iter()
            .map(|&row| self.documents[row].text.clone())
            .collect()
    }

    pub fn ids(&self, rows: &[usize]) -> Vec<String> {
        rows.iter()
            .map(|&row| self.documents[row].id.clone().unwrap_or_default())
            .collect()
    }
}

/// A CSV table held as raw string records.
struct RawTable {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl RawTable {
    fn read(path: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(RawTable {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    fn find(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.find(column).ok_or_else(|| Error::MissingColumn {
            column: column.to_string(),
            path: self.path.clone(),
        })
    }
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Read a label cell. Empty cells are missing; anything else must be a number
/// or a boolean literal.
pub fn parse_label(column: &str, raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Ok(Some(1.0));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Ok(Some(0.0));
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| Error::InvalidLabel {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Read the seen flag. 1 is screened and 0 is a candidate; a blank or any
/// other number leaves the row out of both sets.
fn parse_seen(column: &str, raw: &str) -> Result<Option<bool>> {
    Ok(match parse_label(column, raw)? {
        Some(v) if v == 1.0 => Some(true),
        Some(v) if v == 0.0 => Some(false),
        _ => None,
    })
}

/// Load the screened table. Returns its documents (those without text already
/// dropped) and its label columns.
///
/// Label cells are kept as raw text, so metadata columns such as authors or
/// keywords never have to parse as numbers.
pub fn load_labelled(path: &Path, columns: &ColumnsConfig) -> Result<(Vec<Document>, Vec<String>)> {
    let table = RawTable::read(path)?;
    let text_idx = table.require(&columns.text)?;
    let title_idx = table.require(&columns.title)?;
    let id_idx = table.find(&columns.id);
    let seen_idx = table.find(&columns.seen);

    let label_idx: Vec<(usize, String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !columns.is_structural(name))
        .map(|(i, name)| (i, name.clone()))
        .collect();

    let mut unflagged = 0usize;
    let mut documents = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let text = cell(record, text_idx);
        if !has_text(text) {
            continue;
        }
        let labels = label_idx
            .iter()
            .map(|(i, _)| cell(record, *i).to_string())
            .collect();
        // Screened rows count as seen unless the table says otherwise
        let seen = match seen_idx {
            Some(i) => parse_seen(&columns.seen, cell(record, i))?,
            None => Some(true),
        };
        if seen.is_none() {
            unflagged += 1;
        }
        let title = cell(record, title_idx).to_string();
        documents.push(Document {
            id: id_idx
                .map(|i| cell(record, i).to_string())
                .filter(|id| !id.is_empty()),
            title_key: normalize_title(&title),
            title,
            text: text.to_string(),
            labels,
            seen,
        });
    }

    if unflagged > 0 {
        tracing::warn!(
            path = %path.display(),
            rows = unflagged,
            "screened rows without a seen flag are neither trained on nor predicted"
        );
    }

    Ok((documents, label_idx.into_iter().map(|(_, name)| name).collect()))
}

/// Load the candidate table, skipping titles already present in `known` and
/// documents without text. Every candidate is unseen.
pub fn load_candidates(
    path: &Path,
    columns: &ColumnsConfig,
    known: &HashSet<String>,
    n_labels: usize,
) -> Result<Vec<Document>> {
    let table = RawTable::read(path)?;
    let id_idx = table.require(&columns.id)?;
    let title_idx = table.require(&columns.title)?;
    let text_idx = table.require(&columns.text)?;

    let mut duplicates = 0usize;
    let mut documents = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let title = cell(record, title_idx).to_string();
        let title_key = normalize_title(&title);
        if !title_key.is_empty() && known.contains(&title_key) {
            duplicates += 1;
            continue;
        }
        let text = cell(record, text_idx);
        if !has_text(text) {
            continue;
        }
        documents.push(Document {
            id: Some(cell(record, id_idx).to_string()),
            title,
            title_key,
            text: text.to_string(),
            labels: vec![String::new(); n_labels],
            seen: Some(false),
        });
    }

    tracing::debug!(
        path = %path.display(),
        kept = documents.len(),
        duplicates,
        "loaded candidates"
    );
    Ok(documents)
}

/// Optional sample sizes applied before concatenation.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub labelled: usize,
    pub candidates: usize,
}

/// Merge screened and candidate documents into one shuffled dataset.
pub fn assemble<R: Rng + ?Sized>(
    mut labelled: Vec<Document>,
    mut candidates: Vec<Document>,
    label_columns: Vec<String>,
    sampling: Option<Sampling>,
    rng: &mut R,
) -> Dataset {
    if let Some(sampling) = sampling {
        labelled.shuffle(rng);
        labelled.truncate(sampling.labelled);
        candidates.shuffle(rng);
        candidates.truncate(sampling.candidates);
    }

    let mut documents = labelled;
    documents.append(&mut candidates);
    documents.shuffle(rng);

    Dataset {
        documents,
        label_columns,
    }
}

/// Load both tables and build the merged dataset.
pub fn load_data<R: Rng + ?Sized>(
    labelled_path: &Path,
    candidate_path: &Path,
    columns: &ColumnsConfig,
    sampling: Option<Sampling>,
    rng: &mut R,
) -> Result<Dataset> {
    let (labelled, label_columns) = load_labelled(labelled_path, columns)?;
    let known: HashSet<String> = labelled
        .iter()
        .map(|doc| doc.title_key.clone())
        .filter(|key| !key.is_empty())
        .collect();
    let candidates = load_candidates(candidate_path, columns, &known, label_columns.len())?;

    tracing::info!(
        labelled = labelled.len(),
        candidates = candidates.len(),
        label_columns = label_columns.len(),
        "loaded documents"
    );

    Ok(assemble(labelled, candidates, label_columns, sampling, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Deep Learning: A Survey!"), "deeplearningasurvey");
        assert_eq!(normalize_title("  Über-Größe (2nd ed.) "), "übergröße2nded");
        assert_eq!(normalize_title("snake_case kept"), "snake_casekept");
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("y", "1").unwrap(), Some(1.0));
        assert_eq!(parse_label("y", "0.0").unwrap(), Some(0.0));
        assert_eq!(parse_label("y", "True").unwrap(), Some(1.0));
        assert_eq!(parse_label("y", "").unwrap(), None);
        assert_eq!(parse_label("y", "NaN").unwrap(), None);
        assert!(matches!(
            parse_label("y", "maybe"),
            Err(Error::InvalidLabel { .. })
        ));
    }

    #[test]
    fn test_labelled_drops_missing_text() {
        let file = csv_file(
            "title,abstract,seen,INCLUDE,topic_a\n\
             First,some text,1,1,0\n\
             Second,,1,1,1\n\
             Third,more text,0,,\n",
        );
        let (docs, label_columns) =
            load_labelled(file.path(), &ColumnsConfig::default()).unwrap();

        assert_eq!(label_columns, vec!["INCLUDE", "topic_a"]);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].labels, vec!["1", "0"]);
        assert_eq!(docs[0].seen, Some(true));
        assert_eq!(docs[1].seen, Some(false));
        assert_eq!(docs[1].labels, vec!["", ""]);
    }

    #[test]
    fn test_seen_defaults_to_true_without_column() {
        let file = csv_file("title,abstract,y\nA,text,1\n");
        let (docs, _) = load_labelled(file.path(), &ColumnsConfig::default()).unwrap();
        assert_eq!(docs[0].seen, Some(true));
    }

    #[test]
    fn test_metadata_columns_are_not_parsed() {
        let file = csv_file(
            "title,abstract,authors,year,seen,INCLUDE\n\
             A,text a,Smith J.,2021,1,1\n\
             B,text b,\"Doe, A.; Roe, B.\",n.d.,1,0\n",
        );
        let (docs, label_columns) =
            load_labelled(file.path(), &ColumnsConfig::default()).unwrap();
        assert_eq!(label_columns, vec!["authors", "year", "INCLUDE"]);
        assert_eq!(docs[1].labels[0], "Doe, A.; Roe, B.");

        let ds = Dataset {
            documents: docs,
            label_columns,
        };
        assert_eq!(ds.label(0, 2).unwrap(), Some(1.0));
        assert!(matches!(
            ds.label(0, 0),
            Err(Error::InvalidLabel { ref column, .. }) if column == "authors"
        ));
    }

    #[test]
    fn test_blank_seen_rows_are_in_neither_set() {
        let labelled = csv_file(
            "title,abstract,seen,INCLUDE\n\
             Screened,text a,1,1\n\
             Pending,text b,,1\n\
             Rejected later,text c,0,0\n",
        );
        let candidates = csv_file("id,title,abstract\nW1,New,new text\n");
        let mut rng = StdRng::seed_from_u64(5);
        let ds = load_data(
            labelled.path(),
            candidates.path(),
            &ColumnsConfig::default(),
            None,
            &mut rng,
        )
        .unwrap();

        let titles = |rows: Vec<usize>| {
            let mut t: Vec<String> = rows.iter().map(|&r| ds.documents[r].title.clone()).collect();
            t.sort();
            t
        };
        assert_eq!(titles(ds.seen_rows()), vec!["Screened"]);
        assert_eq!(titles(ds.unseen_rows()), vec!["New", "Rejected later"]);
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn test_missing_required_column() {
        let file = csv_file("title,body\nA,text\n");
        let err = load_labelled(file.path(), &ColumnsConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "abstract"));
    }

    #[test]
    fn test_duplicate_candidates_are_excluded() {
        let labelled = csv_file(
            "title,abstract,seen,y\n\
             A Study of Things,text a,1,1\n\
             Orphan Title,,1,0\n",
        );
        let candidates = csv_file(
            "id,title,abstract\n\
             W1,a study of things!,dup text\n\
             W2,Something New,new text\n\
             W3,Orphan title,orphan text\n\
             W4,No Abstract,\n",
        );
        let mut rng = StdRng::seed_from_u64(1);
        let ds = load_data(
            labelled.path(),
            candidates.path(),
            &ColumnsConfig::default(),
            None,
            &mut rng,
        )
        .unwrap();

        let mut ids: Vec<String> = ds.ids(&ds.unseen_rows());
        ids.sort();
        // W3 survives: its twin in the screened table had no abstract
        assert_eq!(ids, vec!["W2", "W3"]);
        assert_eq!(ds.seen_rows().len(), 1);
        assert_eq!(ds.len(), 3);
        assert!(ds.documents.iter().all(|d| d.labels.len() == 1));
        assert!(ds.documents.iter().all(|d| d.seen.is_some()));
    }

    #[test]
    fn test_sampling_caps_both_sources() {
        let doc = |seen: bool| Document {
            id: None,
            title: String::new(),
            title_key: String::new(),
            text: "t".into(),
            labels: vec![],
            seen: Some(seen),
        };
        let labelled = vec![doc(true); 8];
        let candidates = vec![doc(false); 6];
        let mut rng = StdRng::seed_from_u64(3);
        let ds = assemble(
            labelled,
            candidates,
            vec![],
            Some(Sampling {
                labelled: 5,
                candidates: 10,
            }),
            &mut rng,
        );
        assert_eq!(ds.seen_rows().len(), 5);
        assert_eq!(ds.unseen_rows().len(), 6);
    }
}
