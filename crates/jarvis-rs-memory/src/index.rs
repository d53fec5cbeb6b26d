//! In-memory vector index over the record log.
//!
//! The index is an exact (brute-force) nearest-neighbor structure ranked by
//! **cosine similarity**, the metric used for both writes and queries. Norms
//! are computed once at insert time. Entries keep their insertion position,
//! which breaks similarity ties oldest-first so rankings are total and
//! repeatable. An empty index is a normal state and answers every search with
//! an empty result.

use crate::error::MemoryError;
use crate::model::Record;
use std::cmp::Ordering;

/// Compute the cosine similarity between two equal-length vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Two zero vectors are identical (`1.0`);
/// a zero vector against any other scores `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    similarity_from_parts(dot, l2_norm(a), l2_norm(b))
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn similarity_from_parts(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 && norm_b == 0.0 {
        1.0
    } else if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

struct IndexEntry {
    record: Record,
    norm: f32,
}

/// A search hit borrowed from the index.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// Matching record.
    pub record: &'a Record,
    /// Insertion position (0 = oldest).
    pub position: usize,
    /// Cosine similarity to the query vector.
    pub similarity: f32,
}

/// Append-only cosine-similarity index of records.
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    /// Vector dimension accepted by this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a record. Rejects vectors of the wrong dimension.
    pub fn insert(&mut self, record: Record) -> Result<(), MemoryError> {
        self.check_dimension(&record.vector)?;
        let norm = l2_norm(&record.vector);
        self.entries.push(IndexEntry { record, norm });
        Ok(())
    }

    /// Drop every entry at or after `len`, restoring an earlier state.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// All records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter().map(|entry| &entry.record)
    }

    /// Return up to `limit` records accepted by `predicate`, ranked by
    /// similarity to `query` (highest first, ties oldest-first).
    pub fn search<F>(
        &self,
        query: &[f32],
        limit: usize,
        mut predicate: F,
    ) -> Result<Vec<Hit<'_>>, MemoryError>
    where
        F: FnMut(&Record) -> bool,
    {
        self.check_dimension(query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query_norm = l2_norm(query);
        let mut hits: Vec<Hit<'_>> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| predicate(&entry.record))
            .map(|(position, entry)| {
                let dot: f32 = entry.record.vector.iter().zip(query).map(|(x, y)| x * y).sum();
                Hit {
                    record: &entry.record,
                    position,
                    similarity: similarity_from_parts(dot, entry.norm, query_norm),
                }
            })
            .collect();
        if hits.len() > limit {
            hits.select_nth_unstable_by(limit - 1, rank);
            hits.truncate(limit);
        }
        hits.sort_by(rank);
        Ok(hits)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), MemoryError> {
        if vector.len() != self.dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn rank(a: &Hit<'_>, b: &Hit<'_>) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then(a.position.cmp(&b.position))
}

#[cfg(test)]
mod tests {
    use super::{VectorIndex, cosine_similarity};
    use crate::{MemoryError, Record, Role, Scope};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(text: &str, vector: Vec<f32>) -> Record {
        Record {
            id: Uuid::new_v4(),
            text: text.to_string(),
            vector,
            scope: Scope::new("u", "s", "p").expect("scope"),
            role: Role::Human,
            timestamp: Utc::now(),
        }
    }

    fn texts(hits: &[super::Hit<'_>]) -> Vec<String> {
        hits.iter().map(|hit| hit.record.text.clone()).collect()
    }

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_and_zero_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn zero_vectors_match_each_other() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 1.0);

        let mut index = VectorIndex::new(2);
        index.insert(record("older", vec![1.0, 0.0])).expect("insert");
        index.insert(record("blank", vec![0.0, 0.0])).expect("insert");
        let hits = index.search(&[0.0, 0.0], 1, |_| true).expect("search");
        assert_eq!(texts(&hits), vec!["blank"]);
    }

    #[test]
    fn empty_index_returns_empty_result() {
        let index = VectorIndex::new(3);
        let hits = index.search(&[1.0, 0.0, 0.0], 5, |_| true).expect("search");
        assert!(hits.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn search_ranks_by_similarity() {
        let mut index = VectorIndex::new(2);
        index.insert(record("far", vec![0.0, 1.0])).expect("insert");
        index.insert(record("near", vec![1.0, 0.1])).expect("insert");
        index.insert(record("mid", vec![1.0, 1.0])).expect("insert");

        let hits = index.search(&[1.0, 0.0], 2, |_| true).expect("search");
        assert_eq!(texts(&hits), vec!["near", "mid"]);
        assert_eq!(hits[0].position, 1);
    }

    #[test]
    fn ties_break_oldest_first() {
        let mut index = VectorIndex::new(2);
        for name in ["a", "b", "c", "d"] {
            index.insert(record(name, vec![1.0, 1.0])).expect("insert");
        }
        let hits = index.search(&[1.0, 1.0], 3, |_| true).expect("search");
        assert_eq!(texts(&hits), vec!["a", "b", "c"]);
    }

    #[test]
    fn predicate_filters_before_truncation() {
        let mut index = VectorIndex::new(2);
        index.insert(record("skip-1", vec![1.0, 0.0])).expect("insert");
        index.insert(record("skip-2", vec![1.0, 0.0])).expect("insert");
        index.insert(record("keep", vec![0.0, 1.0])).expect("insert");

        let hits = index
            .search(&[1.0, 0.0], 1, |record| record.text == "keep")
            .expect("search");
        assert_eq!(texts(&hits), vec!["keep"]);
    }

    #[test]
    fn insert_rejects_wrong_dimension() {
        let mut index = VectorIndex::new(3);
        let err = index.insert(record("bad", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn truncate_restores_earlier_length() {
        let mut index = VectorIndex::new(1);
        index.insert(record("a", vec![1.0])).expect("insert");
        index.insert(record("b", vec![1.0])).expect("insert");
        index.truncate(1);
        assert_eq!(index.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(), vec!["a"]);
    }
}
