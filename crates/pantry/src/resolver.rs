//! Ingredient resolution: raw name → catalog entry.
//!
//! Priority order is exact slug, learned alias, then bigram-Jaccard fuzzy
//! match. Ambiguous and unknown outcomes are ordinary results; the caller is
//! expected to ask the user.

use std::cmp::Ordering;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::catalog::{normalize_name, slugify, CatalogIndex, LinearScanIndex, ScoredCandidate};
use crate::config::Thresholds;
use crate::db::catalog_repo;
use crate::error::Result;
use crate::model::Category;

pub const ALIAS_CONFIDENCE: f64 = 0.95;
const MAX_FUZZY_ALTERNATIVES: usize = 3;
const MAX_AMBIGUOUS_ALTERNATIVES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Alias,
    Fuzzy,
    Ambiguous,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub match_type: MatchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    pub confidence: f64,
    pub alternatives: Vec<ScoredCandidate>,
}

impl Resolution {
    fn unknown() -> Self {
        Self {
            match_type: MatchType::Unknown,
            master_id: None,
            canonical_name: None,
            confidence: 0.0,
            alternatives: Vec::new(),
        }
    }

    /// Whether the resolution names a single ingredient.
    pub fn is_resolved(&self) -> bool {
        self.master_id.is_some()
    }
}

pub struct Resolver {
    index: Box<dyn CatalogIndex>,
    candidate_floor: f64,
    match_floor: f64,
}

impl Resolver {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self::with_index(thresholds, Box::new(LinearScanIndex))
    }

    pub fn with_index(thresholds: &Thresholds, index: Box<dyn CatalogIndex>) -> Self {
        Self {
            index,
            candidate_floor: thresholds.fuzzy_candidate_floor,
            match_floor: thresholds.fuzzy_match_floor,
        }
    }

    pub fn resolve(
        &self,
        conn: &Connection,
        raw_name: &str,
        category_hint: Option<Category>,
    ) -> Result<Resolution> {
        let normalized = normalize_name(raw_name);
        if normalized.is_empty() {
            return Ok(Resolution::unknown());
        }

        let slug = slugify(&normalized);
        if let Some(master) = catalog_repo::find_master(conn, &slug)? {
            return Ok(Resolution {
                match_type: MatchType::Exact,
                master_id: Some(master.id),
                canonical_name: Some(master.canonical_name),
                confidence: 1.0,
                alternatives: Vec::new(),
            });
        }

        if let Some(alias) = catalog_repo::find_alias(conn, &normalized)? {
            if let Some(master) = catalog_repo::find_master(conn, &alias.master_id)? {
                return Ok(Resolution {
                    match_type: MatchType::Alias,
                    master_id: Some(master.id),
                    canonical_name: Some(master.canonical_name),
                    confidence: ALIAS_CONFIDENCE,
                    alternatives: Vec::new(),
                });
            }
        }

        let mut candidates = self
            .index
            .candidates(conn, &normalized, self.candidate_floor)?;
        rank_candidates(&mut candidates, category_hint);

        let resolution = classify(candidates, self.match_floor);
        tracing::debug!(
            raw = %normalized,
            match_type = ?resolution.match_type,
            confidence = resolution.confidence,
            "fuzzy resolution"
        );
        Ok(resolution)
    }
}

/// Orders by score, then hinted category first, then name.
fn rank_candidates(candidates: &mut [ScoredCandidate], category_hint: Option<Category>) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let a_hint = Some(a.category) == category_hint;
                let b_hint = Some(b.category) == category_hint;
                b_hint.cmp(&a_hint)
            })
            .then_with(|| a.canonical_name.cmp(&b.canonical_name))
    });
}

/// Turns ranked fuzzy candidates into a resolution.
///
/// Accepts the best candidate only if it scores strictly above
/// `match_floor`.
pub fn classify(ranked: Vec<ScoredCandidate>, match_floor: f64) -> Resolution {
    let Some(best) = ranked.first() else {
        return Resolution::unknown();
    };

    if best.score > match_floor {
        let best = best.clone();
        return Resolution {
            match_type: MatchType::Fuzzy,
            master_id: Some(best.master_id),
            canonical_name: Some(best.canonical_name),
            confidence: best.score,
            alternatives: ranked
                .into_iter()
                .skip(1)
                .take(MAX_FUZZY_ALTERNATIVES)
                .collect(),
        };
    }

    if ranked.len() >= 2 {
        return Resolution {
            match_type: MatchType::Ambiguous,
            master_id: None,
            canonical_name: None,
            confidence: best.score,
            alternatives: ranked.into_iter().take(MAX_AMBIGUOUS_ALTERNATIVES).collect(),
        };
    }

    Resolution::unknown()
}
