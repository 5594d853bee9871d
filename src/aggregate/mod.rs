//! Folding of unit results into the global state and ranking derivation
//!
//! Folding runs single-threaded after every unit has reported, so the state
//! here is never shared between workers.

use crate::unit::{Classification, VolatilityResult};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Ranking depth used when none is configured
pub const DEFAULT_RANKING_SIZE: usize = 3;

/// All successfully processed instruments, split by zero / nonzero volatility
///
/// An identifier lives in exactly one of the two parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    non_zero: HashMap<String, f64>,
    zero: HashSet<String>,
    duplicates: Vec<String>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of results; arrival order only matters for duplicates
    pub fn fold<I>(results: I) -> Self
    where
        I: IntoIterator<Item = VolatilityResult>,
    {
        results.into_iter().fold(Self::new(), |mut state, result| {
            state.insert(result);
            state
        })
    }

    /// Add one result; a repeated identifier replaces the earlier entry
    pub fn insert(&mut self, result: VolatilityResult) {
        let classification = result.classify();
        let instrument_id = result.instrument_id;

        let previous_non_zero = self.non_zero.remove(&instrument_id).is_some();
        let previous_zero = self.zero.remove(&instrument_id);
        if previous_non_zero || previous_zero {
            warn!(
                "Instrument {} reported more than once; keeping the last result",
                instrument_id
            );
            self.duplicates.push(instrument_id.clone());
        }

        match classification {
            Classification::Zero => {
                self.zero.insert(instrument_id);
            }
            Classification::NonZero(value) => {
                self.non_zero.insert(instrument_id, value);
            }
        }
    }

    pub fn non_zero(&self) -> &HashMap<String, f64> {
        &self.non_zero
    }

    pub fn zero(&self) -> &HashSet<String> {
        &self.zero
    }

    /// Identifiers that were folded more than once
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.non_zero.len() + self.zero.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Derive the ranking view with `depth` entries at each end
    pub fn ranking(&self, depth: usize) -> Ranking {
        Ranking::derive(self, depth)
    }
}

/// One instrument line of the ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedInstrument {
    pub instrument_id: String,
    pub volatility: f64,
}

/// Read-only view of the extremes of an [`AggregateState`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    /// Highest volatilities, descending
    pub max: Vec<RankedInstrument>,
    /// Lowest volatilities, still descending
    pub min: Vec<RankedInstrument>,
    /// Zero-volatility identifiers, ascending
    pub zero: Vec<String>,
}

/// Volatility descending, then identifier ascending
fn by_volatility_desc(a: &RankedInstrument, b: &RankedInstrument) -> Ordering {
    b.volatility
        .total_cmp(&a.volatility)
        .then_with(|| a.instrument_id.cmp(&b.instrument_id))
}

impl Ranking {
    pub fn derive(state: &AggregateState, depth: usize) -> Self {
        let mut sorted: Vec<RankedInstrument> = state
            .non_zero
            .iter()
            .map(|(id, vol)| RankedInstrument {
                instrument_id: id.clone(),
                volatility: *vol,
            })
            .collect();
        sorted.sort_by(by_volatility_desc);

        let max = sorted.iter().take(depth).cloned().collect();
        let min = sorted[sorted.len().saturating_sub(depth)..].to_vec();

        let mut zero: Vec<String> = state.zero.iter().cloned().collect();
        zero.sort();

        Self { max, min, zero }
    }
}
