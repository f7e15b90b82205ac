//! Synthesis pipeline
//!
//! Matches every document (in parallel), accumulates facts per drug and
//! group, normalizes every numeric entity of the corpus once, and writes the
//! result into a single [`KnowledgeGraph`].

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mkg_core::{Document, FactGroup, FactTuple, SynthesisConfig};

use crate::corpus::RawCatalog;
use crate::graph::KnowledgeGraph;
use crate::matcher::{AnnotationIndex, CategoryMatcher, MatchedFacts};
use crate::quantity::QuantityTable;

// ============================================================================
// Report
// ============================================================================

/// Summary of one synthesis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// Documents read
    pub documents: usize,
    /// Documents whose folder tag names no category
    pub skipped_documents: usize,
    /// Relations with an endpoint missing from their document
    pub dangling_relations: usize,
    /// Distinct drug ids referenced by documents
    pub drugs: usize,
    /// Drugs without a cleaned product record
    pub missing_raw_records: usize,
    /// Distinct facts per drug-root relation, summed over drugs
    pub facts: BTreeMap<FactGroup, usize>,
    /// Distinct (numeric kind, text) pairs normalized
    pub quantity_records: usize,
    pub entities: usize,
    pub relations: usize,
}

impl SynthesisReport {
    pub fn total_facts(&self) -> usize {
        self.facts.values().sum()
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Match outcome of one document
#[derive(Debug, Clone, Default)]
pub struct DocumentFacts {
    /// `None` when the folder tag names no category
    pub facts: Option<MatchedFacts>,
    pub dangling: usize,
}

pub fn match_one(document: &Document) -> DocumentFacts {
    let index = AnnotationIndex::new(document);
    let facts = document
        .category()
        .map(|category| category.matcher()(&index));
    DocumentFacts {
        facts,
        dangling: index.dangling(),
    }
}

/// Match every document, in input order
pub fn match_corpus(documents: &[Document], parallel: bool) -> Vec<DocumentFacts> {
    if parallel {
        documents.par_iter().map(match_one).collect()
    } else {
        documents.iter().map(match_one).collect()
    }
}

/// Facts of each drug, by group
pub type DrugFacts<'a> = BTreeMap<&'a str, MatchedFacts>;

fn accumulate<'a>(
    documents: &'a [Document],
    matched: Vec<DocumentFacts>,
    report: &mut SynthesisReport,
) -> DrugFacts<'a> {
    let mut drugs: DrugFacts<'a> = BTreeMap::new();

    for (document, outcome) in documents.iter().zip(matched) {
        report.dangling_relations += outcome.dangling;

        for drug_id in &document.file {
            drugs.entry(drug_id.as_str()).or_default();
        }

        let Some(facts) = outcome.facts else {
            warn!(folder = %document.folder, "Skipping document with unknown folder tag");
            report.skipped_documents += 1;
            continue;
        };

        for drug_id in &document.file {
            let groups = drugs.entry(drug_id.as_str()).or_default();
            for (group, group_facts) in &facts {
                groups
                    .entry(*group)
                    .or_insert_with(BTreeSet::new)
                    .extend(group_facts.iter().cloned());
            }
        }
    }

    drugs
}

// ============================================================================
// Synthesis
// ============================================================================

fn build_graph(
    drugs: &DrugFacts<'_>,
    raw: &RawCatalog,
    quantities: &QuantityTable,
    report: &mut SynthesisReport,
) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();

    for (&drug_id, groups) in drugs {
        let name = match raw.name(drug_id) {
            Some(name) => name,
            None => {
                warn!(drug_id = %drug_id, "No cleaned product record; using the drug id as name");
                report.missing_raw_records += 1;
                drug_id
            }
        };
        graph.add_drug_root(drug_id, name);
        if let Some(record) = raw.get(drug_id) {
            graph.add_raw_attributes(drug_id, record);
        }

        for (group, facts) in groups {
            for fact in facts {
                graph.add_fact(drug_id, group.as_str(), fact);
            }
            *report.facts.entry(*group).or_insert(0) += facts.len();
        }
    }

    graph.finalize(quantities);
    graph
}

fn run(documents: &[Document], raw: &RawCatalog, parallel: bool) -> (KnowledgeGraph, SynthesisReport) {
    let mut report = SynthesisReport {
        documents: documents.len(),
        ..Default::default()
    };

    let matched = match_corpus(documents, parallel);
    let drugs = accumulate(documents, matched, &mut report);
    report.drugs = drugs.len();
    debug!(drugs = report.drugs, "Accumulated facts per drug");

    let quantities = QuantityTable::from_documents(documents, parallel);
    report.quantity_records = quantities.len();
    for (label, count) in quantities.counts_by_label() {
        debug!(label, count, "Normalized numeric entities");
    }

    let graph = build_graph(&drugs, raw, &quantities, &mut report);
    let stats = graph.stats();
    report.entities = stats.nodes;
    report.relations = stats.edges;

    (graph, report)
}

/// Synthesize the knowledge graph of a corpus
pub fn synthesize(
    documents: &[Document],
    raw: &RawCatalog,
    config: &SynthesisConfig,
) -> (KnowledgeGraph, SynthesisReport) {
    info!(
        documents = documents.len(),
        raw_records = raw.len(),
        parallel = config.parallel,
        "Starting graph synthesis"
    );

    let pool = match config.threads {
        Some(threads) if config.parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(threads, error = %e, "Falling back to the global thread pool");
                    None
                }
            }
        }
        _ => None,
    };

    let (graph, report) = match pool {
        Some(pool) => pool.install(|| run(documents, raw, config.parallel)),
        None => run(documents, raw, config.parallel),
    };

    info!(
        drugs = report.drugs,
        facts = report.total_facts(),
        entities = report.entities,
        relations = report.relations,
        skipped = report.skipped_documents,
        "Graph synthesis complete"
    );

    (graph, report)
}

/// Matched facts of every document, for inspection
pub fn document_facts(documents: &[Document], parallel: bool) -> Vec<Option<MatchedFacts>> {
    match_corpus(documents, parallel)
        .into_iter()
        .map(|outcome| outcome.facts)
        .collect()
}

/// Flatten matched facts into `(group, fact)` pairs
pub fn flatten(facts: &MatchedFacts) -> impl Iterator<Item = (FactGroup, &FactTuple)> + '_ {
    facts
        .iter()
        .flat_map(|(group, set)| set.iter().map(move |fact| (*group, fact)))
}

// ============================================================================
// Tests
// ============================================================================
