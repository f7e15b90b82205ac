//! Graph export
//!
//! Writes the bulk-import tables: `entity.csv` (`:ID,:LABEL,name`) and
//! `relation.csv` (`:START_ID,:END_ID,:TYPE`). Values are written as-is;
//! finalization has already replaced every `,` with `，`.

use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use mkg_core::{GraphEdge, GraphNode, MkgError, Result};

use crate::graph::KnowledgeGraph;

pub const ENTITY_HEADER: [&str; 3] = [":ID", ":LABEL", "name"];
pub const RELATION_HEADER: [&str; 3] = [":START_ID", ":END_ID", ":TYPE"];

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> MkgError + '_ {
    move |source| MkgError::Io {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

fn write_rows<I>(path: &Path, header: [&str; 3], rows: I) -> Result<usize>
where
    I: IntoIterator<Item = [String; 3]>,
{
    // Values never carry `,`, so rows go out unquoted
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_path(path)
        .map_err(csv_error(path))?;

    writer.write_record(header).map_err(csv_error(path))?;
    let mut count = 0;
    for row in rows {
        writer.write_record(&row).map_err(csv_error(path))?;
        count += 1;
    }
    writer.flush().map_err(|source| MkgError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(count)
}

pub fn write_entities(path: &Path, nodes: &[GraphNode]) -> Result<usize> {
    let rows = nodes
        .iter()
        .map(|n| [n.id.clone(), n.kind.clone(), n.value.clone()]);
    write_rows(path, ENTITY_HEADER, rows)
}

pub fn write_relations(path: &Path, edges: &[GraphEdge]) -> Result<usize> {
    let rows = edges
        .iter()
        .map(|e| [e.subject.clone(), e.object.clone(), e.kind.clone()]);
    write_rows(path, RELATION_HEADER, rows)
}

/// Write both tables; returns the (entity, relation) row counts
pub fn write_graph(
    graph: &KnowledgeGraph,
    entity_path: &Path,
    relation_path: &Path,
) -> Result<(usize, usize)> {
    let entities = write_entities(entity_path, graph.nodes())?;
    let relations = write_relations(relation_path, graph.edges())?;
    Ok((entities, relations))
}
