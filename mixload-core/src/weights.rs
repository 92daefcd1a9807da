use crate::config::WeightConfig;
use crate::error::{Error, Result};
use crate::profile::ProfileRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightEntry {
    pub profile: String,
    pub weight: u64,
}

/// Effective weights, aligned with the registry's profile order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightTable {
    entries: Vec<WeightEntry>,
}

impl WeightTable {
    /// Each profile's default weight.
    pub fn defaults(registry: &ProfileRegistry) -> Self {
        Self {
            entries: registry
                .all()
                .iter()
                .map(|p| WeightEntry {
                    profile: p.name().to_string(),
                    weight: p.weight(),
                })
                .collect(),
        }
    }

    /// Defaults with `config` applied; every override must name a registered profile.
    pub fn resolve(registry: &ProfileRegistry, config: &WeightConfig) -> Result<Self> {
        let mut table = Self::defaults(registry);

        for (name, weight) in &config.overrides {
            let field = format!("weights.{name}");
            let entry = table
                .entries
                .iter_mut()
                .find(|e| e.profile == *name)
                .ok_or_else(|| {
                    Error::invalid(
                        field.clone(),
                        format!(
                            "names an unknown profile (known: {})",
                            registry.names().collect::<Vec<_>>().join(", ")
                        ),
                    )
                })?;

            entry.weight = u64::try_from(*weight)
                .map_err(|_| Error::invalid(field, format!("must be >= 0 (got {weight})")))?;
        }

        match table.total() {
            Some(0) => Err(Error::invalid(
                "weights",
                "must not all be zero (total weight is 0)",
            )),
            None => Err(Error::invalid("weights", "total weight overflows u64")),
            Some(_) => Ok(table),
        }
    }

    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    pub fn get(&self, profile: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.profile == profile)
            .map(|e| e.weight)
    }

    /// `None` if the sum does not fit in a `u64`.
    pub fn total(&self) -> Option<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |acc, e| acc.checked_add(e.weight))
    }
}
