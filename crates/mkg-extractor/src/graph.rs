//! Graph Synthesizer
//!
//! Materializes drug roots, raw product attributes and matched fact-tuples
//! as a content-addressed node arena plus a deduplicated edge list.

use std::collections::{HashMap, HashSet};

use mkg_core::schema::{entity, raw_attribute, GENERIC_NAME_KEY};
use mkg_core::{FactTuple, GraphEdge, GraphNode, Leaf, NumericKind, Term};
use tracing::debug;

use crate::corpus::RawRecord;
use crate::quantity::QuantityTable;

/// Node and edge totals of a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub drugs: usize,
}

/// Knowledge graph under construction.
///
/// Nodes are keyed by id with insert-if-absent semantics, so the first
/// payload seen for an id is kept. Edges are unique by their full
/// `(subject, object, type)` triple and keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_index: HashSet<GraphEdge>,
    drugs: usize,
    finalized: bool,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless its id is already present; true when inserted
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Insert an edge unless the same triple exists; true when inserted
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if !self.edge_index.insert(edge.clone()) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Drug root `(drug_id, 药品, generic name)`
    pub fn add_drug_root(&mut self, drug_id: &str, name: &str) {
        if self.add_node(GraphNode::new(drug_id, entity::DRUG_ROOT, name)) {
            self.drugs += 1;
        }
    }

    /// One leaf fact per recognized key of a cleaned product record
    pub fn add_raw_attributes(&mut self, drug_id: &str, record: &RawRecord) {
        for (key, value) in record {
            if key == GENERIC_NAME_KEY {
                continue;
            }
            let Some(attribute) = raw_attribute(key) else {
                continue;
            };
            let fact = FactTuple::Leaf(Leaf::new(attribute.node_type, value));
            self.add_fact(drug_id, attribute.relation, &fact);
        }
    }

    /// Node for a term stored under `id`; a qualified term also gets its
    /// attribute node and edge
    fn add_term(&mut self, id: &str, term: &Term) {
        let head = term.head();
        self.add_node(GraphNode::new(id, &head.kind, &head.value));

        if let Term::Qualified { relation, tail, .. } = term {
            let tail_id = tail.id();
            self.add_node(GraphNode::new(&tail_id, &tail.kind, &tail.value));
            self.add_edge(GraphEdge::new(id, tail_id, relation));
        }
    }

    /// Attach a fact to a drug root; returns the fact node id
    pub fn add_fact(&mut self, drug_id: &str, relation: &str, fact: &FactTuple) -> String {
        let fact_id = fact.id();
        self.add_edge(GraphEdge::new(drug_id, &fact_id, relation));

        match fact {
            FactTuple::Leaf(leaf) => {
                self.add_node(GraphNode::new(&fact_id, &leaf.kind, &leaf.value));
            }
            FactTuple::Compound { subject, branches } => {
                self.add_term(&fact_id, subject);
                for branch in branches {
                    let object_id = branch.object.id();
                    self.add_term(&object_id, &branch.object);
                    self.add_edge(GraphEdge::new(&fact_id, object_id, &branch.relation));
                }
            }
        }

        fact_id
    }

    /// Publish numeric node values as quantity record JSON and make every
    /// value comma-free. Runs once; later calls are no-ops.
    pub fn finalize(&mut self, quantities: &QuantityTable) {
        if self.finalized {
            return;
        }

        let mut normalized = 0;
        for node in &mut self.nodes {
            if let Some(kind) = NumericKind::from_node_label(&node.kind) {
                node.value = match quantities.get(kind, &node.value) {
                    Some(record) => record.to_json(),
                    None => crate::quantity::normalize(kind, &node.value).to_json(),
                };
                normalized += 1;
            }
            if node.value.contains(',') {
                node.value = node.value.replace(',', "，");
            }
        }

        debug!(normalized, nodes = self.nodes.len(), "Finalized graph values");
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains_edge(&self, edge: &GraphEdge) -> bool {
        self.edge_index.contains(edge)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            drugs: self.drugs,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
