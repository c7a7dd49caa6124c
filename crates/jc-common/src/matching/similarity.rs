use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use super::stop_words::is_stop_word;

pub const DEFAULT_MAX_FEATURES: usize = 1000;

/// Words of two or more word characters
static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// TF-IDF over a small in-memory corpus, unigrams and bigrams.
///
/// Stop words are removed before n-grams are formed. The vocabulary keeps the
/// `max_features` terms with the highest corpus-wide count (ties alphabetical); idf is
/// smoothed (`ln((1 + n) / (1 + df)) + 1`) and every row is L2-normalized.
#[derive(Debug, Clone, Copy)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FEATURES)
    }
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features: max_features.max(1),
        }
    }

    /// Terms of one document, in order of appearance.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = RE_TOKEN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|word| !is_stop_word(word))
            .collect();

        let bigrams = words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
        words
            .iter()
            .map(|word| word.to_string())
            .chain(bigrams)
            .collect()
    }

    /// Dense L2-normalized rows, one per document, over a shared vocabulary.
    ///
    /// `None` when no document contributes a single term.
    pub fn fit_transform(&self, documents: &[&str]) -> Option<Vec<Vec<f64>>> {
        let term_counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|doc| {
                let mut counts = HashMap::new();
                for term in self.analyze(doc) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        // BTreeMap so that ties fall back to alphabetical order
        let mut corpus_counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for counts in &term_counts {
            for (term, count) in counts {
                let entry = corpus_counts.entry(term.as_str()).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }
        if corpus_counts.is_empty() {
            return None;
        }

        let mut ranked: Vec<(&str, usize, usize)> = corpus_counts
            .into_iter()
            .map(|(term, (total, df))| (term, total, df))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_features);
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let n_docs = documents.len() as f64;
        let vocabulary: Vec<(&str, f64)> = ranked
            .into_iter()
            .map(|(term, _, df)| (term, ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0))
            .collect();

        let rows = term_counts
            .iter()
            .map(|counts| {
                let mut row: Vec<f64> = vocabulary
                    .iter()
                    .map(|(term, idf)| counts.get(*term).copied().unwrap_or(0) as f64 * idf)
                    .collect();
                let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|x| *x /= norm);
                }
                row
            })
            .collect();

        Some(rows)
    }
}

/// Cosine similarity of two equally sized vectors; 0.0 for zero vectors or a length mismatch.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "vector dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Free-text similarity of a job text and a candidate profile text.
///
/// Either side empty, or nothing left after stop-word removal, scores 0.
pub fn calculate_text_similarity(job_text: &str, candidate_text: &str, max_features: usize) -> f64 {
    if job_text.trim().is_empty() || candidate_text.trim().is_empty() {
        return 0.0;
    }

    let vectorizer = TfidfVectorizer::new(max_features);
    let Some(rows) = vectorizer.fit_transform(&[job_text, candidate_text]) else {
        return 0.0;
    };

    match rows.as_slice() {
        [job, candidate] => cosine_similarity(job, candidate),
        _ => 0.0,
    }
}
