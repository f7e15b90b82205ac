//! MKG Extractor - Knowledge graph synthesis pipeline
//!
//! Turns NER/RE-annotated leaflet sections into a drug knowledge graph:
//! - numeric entity normalization (canonicalizer, numerals, units, ranges)
//! - per-category fact matching and fact combination
//! - content-addressed graph synthesis and CSV export

pub mod canonical;
pub mod combine;
pub mod corpus;
pub mod export;
pub mod graph;
pub mod matcher;
pub mod numeral;
pub mod pipeline;
pub mod quantity;
pub mod range;
pub mod span;
pub mod unit;

pub use canonical::canonicalize;
pub use combine::combine;
pub use corpus::{read_corpus, RawCatalog, RawRecord};
pub use export::write_graph;
pub use graph::{GraphStats, KnowledgeGraph};
pub use matcher::{match_document, AnnotationIndex, CategoryMatcher, MatchedFacts};
pub use numeral::{extract_numerals, parse_numeral, Numeral};
pub use pipeline::{synthesize, SynthesisReport};
pub use quantity::{normalize, Measurement, QuantityRecord, QuantityTable};
pub use range::Limit;
