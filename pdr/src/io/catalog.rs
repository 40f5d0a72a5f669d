//! Task and persona catalogs.
//!
//! Two catalogs ship embedded in the binary (`writing`, `software`); anything
//! else is read from a TOML file with the same layout.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::types::{Persona, Task};

const WRITING_CATALOG: &str = include_str!("../../catalog/writing.toml");
const SOFTWARE_CATALOG: &str = include_str!("../../catalog/software.toml");

pub const BUILTIN_NAMES: [&str; 2] = ["writing", "software"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub personas: Vec<Persona>,
    pub tasks: Vec<Task>,
}

/// A parsed catalog plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    /// Builtin name or file path.
    pub source: String,
    /// SHA-256 of the raw TOML, hex encoded.
    pub sha256: String,
}

impl Catalog {
    pub fn parse(raw: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(raw).context("parse catalog toml")?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<()> {
        if self.personas.is_empty() {
            bail!("catalog must define at least one persona");
        }
        if self.tasks.is_empty() {
            bail!("catalog must define at least one task");
        }
        let mut seen = HashSet::new();
        for persona in &self.personas {
            if persona.name.trim().is_empty() {
                bail!("persona name must be non-empty");
            }
            if !seen.insert(persona.name.as_str()) {
                bail!("duplicate persona name {:?}", persona.name);
            }
        }
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                bail!("task name must be non-empty");
            }
            if !seen.insert(task.name.as_str()) {
                bail!("duplicate task name {:?}", task.name);
            }
            if task.target_spec.trim().is_empty() {
                bail!("task {}: target_spec must be non-empty", task.name);
            }
            let (min, max) = task.rubric.word_count_range;
            if min > max {
                bail!("task {}: word_count_range min {min} exceeds max {max}", task.name);
            }
            if task.rubric.must_include.iter().any(|s| s.trim().is_empty()) {
                bail!("task {}: must_include entries must be non-empty", task.name);
            }
        }
        Ok(())
    }

    pub fn task(&self, name: &str) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| anyhow!("unknown task {name:?}"))
    }

    /// Restrict to the named personas and tasks; an empty filter keeps everything.
    ///
    /// Catalog order is preserved. Unknown names are an error.
    pub fn select(&self, personas: &[String], tasks: &[String]) -> Result<Catalog> {
        Ok(Catalog {
            personas: filter_named(&self.personas, personas, "persona", |p| &p.name)?,
            tasks: filter_named(&self.tasks, tasks, "task", |t| &t.name)?,
        })
    }
}

fn filter_named<T: Clone>(
    items: &[T],
    wanted: &[String],
    kind: &str,
    name: impl Fn(&T) -> &String,
) -> Result<Vec<T>> {
    if wanted.is_empty() {
        return Ok(items.to_vec());
    }
    for w in wanted {
        if !items.iter().any(|item| name(item) == w) {
            bail!("unknown {kind} {w:?}");
        }
    }
    Ok(items
        .iter()
        .filter(|item| wanted.contains(name(item)))
        .cloned()
        .collect())
}

pub fn builtin_source(name: &str) -> Option<&'static str> {
    match name {
        "writing" => Some(WRITING_CATALOG),
        "software" => Some(SOFTWARE_CATALOG),
        _ => None,
    }
}

/// Resolve `--catalog`: a builtin name, otherwise a path to a TOML file.
pub fn load_catalog(spec: &str) -> Result<LoadedCatalog> {
    let raw = match builtin_source(spec) {
        Some(raw) => raw.to_string(),
        None => {
            let path = Path::new(spec);
            fs::read_to_string(path).with_context(|| format!("read catalog {}", path.display()))?
        }
    };
    let catalog = Catalog::parse(&raw).with_context(|| format!("load catalog {spec}"))?;
    debug!(
        source = spec,
        personas = catalog.personas.len(),
        tasks = catalog.tasks.len(),
        "catalog loaded"
    );
    Ok(LoadedCatalog {
        catalog,
        source: spec.to_string(),
        sha256: sha256_hex(raw.as_bytes()),
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
