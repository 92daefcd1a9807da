use rand::Rng;

use crate::error::{Error, Result};
use crate::weights::WeightTable;

/// Weighted choice over the weight table using cumulative boundaries.
///
/// `boundaries[i]` is the sum of weights `0..=i`. A draw `r` in `[0, total)`
/// selects the first index whose boundary is greater than `r`, so zero-weight
/// entries are never chosen and a draw of 0 lands on the first positive weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedSelector {
    boundaries: Vec<u64>,
    total: u64,
}

impl WeightedSelector {
    pub fn new(table: &WeightTable) -> Result<Self> {
        let mut boundaries = Vec::with_capacity(table.entries().len());
        let mut acc = 0u64;
        for e in table.entries() {
            acc = acc
                .checked_add(e.weight)
                .ok_or_else(|| Error::InvalidWeights("total weight overflows u64".to_string()))?;
            boundaries.push(acc);
        }

        if acc == 0 {
            return Err(Error::InvalidWeights(
                "total weight must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            boundaries,
            total: acc,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn boundaries(&self) -> &[u64] {
        &self.boundaries
    }

    /// Index into the weight table (and registry) for one draw.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index_for(rng.gen_range(0..self.total))
    }

    /// Index selected by the draw `r`; `r` must be below `total()`.
    pub fn index_for(&self, r: u64) -> usize {
        self.boundaries
            .partition_point(|&b| b <= r)
            .min(self.boundaries.len().saturating_sub(1))
    }
}
