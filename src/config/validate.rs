//! Config validation logic.
//! Unit names must be usable as folder names under the destination, sources must
//! be absolute and disjoint.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::{Component, Path};
use tracing::debug;

use super::types::Config;
use crate::utils::path_is_within;

/// True when `name` is exactly one normal path component.
fn is_single_component(name: &str) -> bool {
    let mut comps = Path::new(name).components();
    matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None))
}

impl Config {
    /// Validate units and destination settings. Does not touch the filesystem
    /// beyond resolving existing symlinks.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.name.trim().is_empty() {
                bail!("unit with source '{}' has an empty name", unit.source.display());
            }
            if !is_single_component(&unit.name) {
                bail!("unit name '{}' must be a single folder name", unit.name);
            }
            if !seen.insert(unit.name.as_str()) {
                bail!("unit name '{}' is configured more than once", unit.name);
            }
            if !unit.source.is_absolute() {
                bail!(
                    "unit '{}' source must be an absolute path: '{}'",
                    unit.name,
                    unit.source.display()
                );
            }
        }

        for (i, a) in self.units.iter().enumerate() {
            for b in &self.units[i + 1..] {
                if path_is_within(&a.source, &b.source) || path_is_within(&b.source, &a.source) {
                    bail!(
                        "unit sources overlap: '{}' ({}) and '{}' ({})",
                        a.name,
                        a.source.display(),
                        b.name,
                        b.source.display()
                    );
                }
            }
        }

        if !is_single_component(&self.destination_subdir) {
            bail!(
                "destination_subdir '{}' must be a single folder name",
                self.destination_subdir
            );
        }

        debug!(units = self.units.len(), "config validated");
        Ok(())
    }
}
