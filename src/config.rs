use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::atom::field::MAX_POS;
use crate::uid::IsolatedUidMap;

/// Top-level configuration for the merge tool.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Static isolated uid assignments.
    #[serde(default)]
    pub isolated_uids: Vec<IsolatedUidConfig>,

    /// Per-atom merge settings.
    #[serde(default)]
    pub atoms: Vec<AtomConfig>,
}

/// One isolated uid and the host app it runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IsolatedUidConfig {
    pub isolated: i32,
    pub host: i32,
}

/// Merge settings for a pulled atom.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AtomConfig {
    /// Atom tag.
    pub tag: i32,

    /// Depth-0 positions summed when duplicate records are merged.
    #[serde(default)]
    pub additive_fields: BTreeSet<i32>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            isolated_uids: Vec::new(),
            atoms: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        Self::from_yaml(&data).with_context(|| format!("loading config file {}", path.display()))
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data).context("parsing config")?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        let mut seen_isolated = HashSet::new();
        for mapping in &self.isolated_uids {
            if mapping.isolated < 0 || mapping.host < 0 {
                bail!(
                    "isolated uid mapping {} -> {} has a negative uid",
                    mapping.isolated,
                    mapping.host
                );
            }
            if mapping.isolated == mapping.host {
                bail!("uid {} cannot be its own host", mapping.isolated);
            }
            if !seen_isolated.insert(mapping.isolated) {
                bail!("isolated uid {} is assigned more than once", mapping.isolated);
            }
        }

        let mut seen_tags = HashSet::new();
        for atom in &self.atoms {
            if atom.tag <= 0 {
                bail!("atom tag must be positive, got {}", atom.tag);
            }
            if !seen_tags.insert(atom.tag) {
                bail!("atom {} is configured more than once", atom.tag);
            }
            for pos in &atom.additive_fields {
                if !(1..=MAX_POS).contains(pos) {
                    bail!(
                        "atom {}: additive field {pos} is outside 1..={MAX_POS}",
                        atom.tag
                    );
                }
            }
        }

        Ok(())
    }

    /// Additive field positions of every configured atom, keyed by tag.
    pub fn additive_fields_by_tag(&self) -> BTreeMap<i32, BTreeSet<i32>> {
        self.atoms
            .iter()
            .map(|atom| (atom.tag, atom.additive_fields.clone()))
            .collect()
    }

    /// Build the isolated uid table from the static assignments.
    pub fn uid_map(&self) -> IsolatedUidMap {
        self.isolated_uids
            .iter()
            .map(|m| (m.isolated, m.host))
            .collect()
    }
}
