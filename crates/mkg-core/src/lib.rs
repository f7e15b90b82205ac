//! MKG Core - Domain models, schema, and shared types
//!
//! This crate defines the core abstractions used throughout the MKG system:
//! - Annotated documents (entity spans, relation edges, categories)
//! - Fact-tuples and their content-addressed identity
//! - Graph records (nodes, edges) produced by synthesis
//! - The annotation schema (entity/relation labels, numeric kinds)
//! - Common error types
//! - Configuration management

pub mod config;
pub mod fact;
pub mod schema;

pub use config::{AppConfig, ConfigError, InputConfig, LoggingConfig, OutputConfig, SynthesisConfig};
pub use fact::{content_hash, FactTuple, Leaf, Term};
pub use schema::{NumericKind, PopulationKind, RawAttribute};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for MKG operations
#[derive(Error, Debug)]
pub enum MkgError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MkgError>;

// ============================================================================
// Annotation Categories
// ============================================================================

/// Annotation schema a document was labeled with.
///
/// The folder tag of a document selects exactly one category, and the
/// category selects the structural rule used to turn its entities and
/// relations into fact-tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ZhuYaoChengFen")]
    Ingredients,
    #[serde(rename = "ShiYingZheng")]
    Indications,
    #[serde(rename = "BuLiangFanYing")]
    AdverseReactions,
    #[serde(rename = "YaoWuXiangHuZuoYong")]
    Interactions,
    #[serde(rename = "JinJi")]
    Contraindications,
    #[serde(rename = "YunFuJiBuRuQiFuNvYongYao")]
    PregnancyAndNursing,
    #[serde(rename = "ErTongYongYao")]
    Children,
    #[serde(rename = "LaoRenYongYao")]
    Elderly,
    #[serde(rename = "YongFaYongLiang")]
    Dosage,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Ingredients,
        Self::Indications,
        Self::AdverseReactions,
        Self::Interactions,
        Self::Contraindications,
        Self::PregnancyAndNursing,
        Self::Children,
        Self::Elderly,
        Self::Dosage,
    ];

    /// Folder tag used by the annotation corpus
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Ingredients => "ZhuYaoChengFen",
            Self::Indications => "ShiYingZheng",
            Self::AdverseReactions => "BuLiangFanYing",
            Self::Interactions => "YaoWuXiangHuZuoYong",
            Self::Contraindications => "JinJi",
            Self::PregnancyAndNursing => "YunFuJiBuRuQiFuNvYongYao",
            Self::Children => "ErTongYongYao",
            Self::Elderly => "LaoRenYongYao",
            Self::Dosage => "YongFaYongLiang",
        }
    }

    /// Resolve a folder tag
    pub fn from_folder(folder: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.folder() == folder)
    }

    /// Drug-root relation that facts of this category hang from
    pub fn fact_group(&self) -> FactGroup {
        match self {
            Self::Ingredients => FactGroup::Ingredient,
            Self::Indications => FactGroup::Treatment,
            Self::AdverseReactions => FactGroup::AdverseReaction,
            Self::Interactions => FactGroup::Interaction,
            Self::Contraindications
            | Self::PregnancyAndNursing
            | Self::Children
            | Self::Elderly => FactGroup::Usage,
            Self::Dosage => FactGroup::Dosage,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.folder())
    }
}

/// Relation linking a drug root to a synthesized fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactGroup {
    Ingredient,
    Treatment,
    Function,
    AdverseReaction,
    Interaction,
    Usage,
    Dosage,
}

impl FactGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingredient => "成分",
            Self::Treatment => "治疗",
            Self::Function => "功用",
            Self::AdverseReaction => "不良反应",
            Self::Interaction => "相互作用",
            Self::Usage => "使用",
            Self::Dosage => "用药",
        }
    }
}

impl std::fmt::Display for FactGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Annotated Documents
// ============================================================================

/// Typed span produced by the upstream sequence labeler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Identifier, unique within the owning document only
    #[serde(default)]
    pub id: String,

    /// Entity type label (e.g. "病症", "用药剂量")
    #[serde(rename = "type")]
    pub kind: String,

    /// Surface text
    pub value: String,

    #[serde(default)]
    pub start: usize,

    #[serde(default)]
    pub end: usize,
}

/// Typed directed edge produced by the upstream relation classifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    #[serde(default)]
    pub id: String,

    /// Relation label (e.g. "诱因", "使用")
    #[serde(rename = "type")]
    pub kind: String,

    /// Subject entity id (same document)
    pub subject: String,

    /// Object entity id (same document)
    pub object: String,
}

/// One annotated section of a drug leaflet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Category folder tag
    pub folder: String,

    /// Drug ids this section belongs to
    #[serde(default)]
    pub file: Vec<String>,

    /// Entity spans keyed by id
    #[serde(default)]
    pub entity: BTreeMap<String, EntitySpan>,

    /// Relation edges keyed by id
    #[serde(default)]
    pub relation: BTreeMap<String, RelationEdge>,
}

impl Document {
    /// Create an empty document for a category
    pub fn new(category: Category) -> Self {
        Self {
            folder: category.folder().to_string(),
            ..Default::default()
        }
    }

    /// Attach the document to a drug
    pub fn with_file(mut self, drug_id: impl Into<String>) -> Self {
        self.file.push(drug_id.into());
        self
    }

    /// Add an entity span
    pub fn with_entity(
        mut self,
        id: impl Into<String>,
        kind: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let value = value.into();
        let end = value.chars().count();
        self.entity.insert(
            id.clone(),
            EntitySpan {
                id,
                kind: kind.into(),
                value,
                start: 0,
                end,
            },
        );
        self
    }

    /// Add a relation edge
    pub fn with_relation(
        mut self,
        id: impl Into<String>,
        kind: impl Into<String>,
        subject: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        let id = id.into();
        self.relation.insert(
            id.clone(),
            RelationEdge {
                id,
                kind: kind.into(),
                subject: subject.into(),
                object: object.into(),
            },
        );
        self
    }

    /// Category selected by the folder tag
    pub fn category(&self) -> Option<Category> {
        Category::from_folder(&self.folder)
    }
}

// ============================================================================
// Graph Records
// ============================================================================

/// Entity row of the synthesized graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphNode {
    /// Content hash, or the drug id for drug roots
    pub id: String,

    /// Node label
    pub kind: String,

    /// Display value (quantity record JSON for numeric kinds)
    pub value: String,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Relation row of the synthesized graph; identity is the whole triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub subject: String,
    pub object: String,
    pub kind: String,
}

impl GraphEdge {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            kind: kind.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
