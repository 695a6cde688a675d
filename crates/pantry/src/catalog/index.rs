//! Fuzzy lookup over the catalog.
//!
//! The resolver talks to a [`CatalogIndex`] rather than the table so an
//! indexed structure can replace the linear scan. Any replacement must keep
//! the scoring of [`bigram_jaccard`].

use std::collections::HashSet;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::catalog_repo;
use crate::error::Result;
use crate::model::Category;

/// A catalog entry with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub master_id: String,
    pub canonical_name: String,
    pub category: Category,
    pub score: f64,
}

pub trait CatalogIndex: Send + Sync {
    /// Entries scoring strictly above `floor` against `normalized`, in any order.
    fn candidates(
        &self,
        conn: &Connection,
        normalized: &str,
        floor: f64,
    ) -> Result<Vec<ScoredCandidate>>;
}

/// Scores every catalog row on each call. Fine for a household catalog of a
/// few thousand entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearScanIndex;

impl CatalogIndex for LinearScanIndex {
    fn candidates(
        &self,
        conn: &Connection,
        normalized: &str,
        floor: f64,
    ) -> Result<Vec<ScoredCandidate>> {
        let candidates = catalog_repo::list_masters(conn)?
            .into_iter()
            .filter_map(|master| {
                let score = bigram_jaccard(normalized, &master.canonical_name.to_lowercase());
                (score > floor).then(|| ScoredCandidate {
                    master_id: master.id,
                    canonical_name: master.canonical_name,
                    category: master.category,
                    score,
                })
            })
            .collect();
        Ok(candidates)
    }
}

fn bigrams(value: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = value.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Jaccard similarity of the character-bigram sets of `a` and `b`.
///
/// A string shorter than two characters has no bigrams; an empty union
/// scores 0.
pub fn bigram_jaccard(a: &str, b: &str) -> f64 {
    let left = bigrams(a);
    let right = bigrams(b);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}
