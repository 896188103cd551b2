//! Registry files.
//!
//! A registry file declares labeled layers, constraints and named orders:
//!
//! ```toml
//! [layers.ICE]
//! ice = "more"
//!
//! [layers.SUGAR]
//! sugar = "full"
//!
//! [[constraints]]
//! kind = "mutually_exclusive"
//! labels = ["ICE", "SUGAR"]
//!
//! [[orders]]
//! name = "sweet"
//! labels = ["SUGAR"]
//! ```
//!
//! Layers keep their file order, which fixes the traversal order of
//! `exhaustive`.

use anyhow::{Context, Result};
use lazy_pattern_core::sourcing::{
    Constraint, ConstraintSet, DependencyConstraint, EventSourcer, LayerRegistry,
    MutuallyExclusiveConstraint, OccurrenceConstraint,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Sourcer over string labels and JSON effects.
pub type JsonSourcer = EventSourcer<String, Value>;

/// On-disk registry layout.
#[derive(Debug, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub layers: toml::Table,

    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,

    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

/// One `[[constraints]]` entry.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintSpec {
    MutuallyExclusive {
        labels: Vec<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Occurrence {
        labels: Vec<String>,
        #[serde(default)]
        min: usize,
        /// Unbounded when absent
        #[serde(default)]
        max: Option<usize>,
        #[serde(default)]
        name: Option<String>,
    },
    Dependency {
        labels: Vec<String>,
        trailing: Vec<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl ConstraintSpec {
    fn build(self) -> Result<Box<dyn Constraint<String>>> {
        let constraint: Box<dyn Constraint<String>> = match self {
            Self::MutuallyExclusive { labels, name } => {
                let mut constraint = MutuallyExclusiveConstraint::new(labels);
                if let Some(name) = name {
                    constraint = constraint.named(name);
                }
                Box::new(constraint)
            }
            Self::Occurrence {
                labels,
                min,
                max,
                name,
            } => {
                let mut constraint =
                    OccurrenceConstraint::new(labels, min, max.unwrap_or(usize::MAX))?;
                if let Some(name) = name {
                    constraint = constraint.named(name);
                }
                Box::new(constraint)
            }
            Self::Dependency {
                labels,
                trailing,
                name,
            } => {
                let mut constraint = DependencyConstraint::new(labels, trailing)?;
                if let Some(name) = name {
                    constraint = constraint.named(name);
                }
                Box::new(constraint)
            }
        };
        Ok(constraint)
    }
}

/// One `[[orders]]` entry.
#[derive(Debug, Deserialize)]
pub struct OrderSpec {
    pub name: String,
    pub labels: Vec<String>,
}

/// Parse registry TOML into a sourcer.
pub fn parse(contents: &str) -> Result<JsonSourcer> {
    let file: RegistryFile = toml::from_str(contents).context("Invalid registry file")?;

    let mut registry = LayerRegistry::new();
    for (label, effect) in file.layers {
        let effect = serde_json::to_value(effect)
            .with_context(|| format!("Layer {} is not JSON-compatible", label))?;
        registry.insert(label, effect);
    }

    let constraints = file
        .constraints
        .into_iter()
        .map(ConstraintSpec::build)
        .collect::<Result<ConstraintSet<String>>>()?;

    let mut sourcer = EventSourcer::with_constraints(registry, constraints)?;
    for order in file.orders {
        let name = order.name.clone();
        sourcer
            .register(order.name, order.labels)
            .with_context(|| format!("Order {} cannot be registered", name))?;
    }

    tracing::debug!(
        layers = sourcer.len(),
        constraints = sourcer.constraints().len(),
        "Registry loaded"
    );

    Ok(sourcer)
}

/// Read and parse a registry file.
pub fn load(path: &Path) -> Result<JsonSourcer> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&contents).with_context(|| format!("Failed to load {}", path.display()))
}
