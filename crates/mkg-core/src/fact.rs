//! Fact-tuples and content-addressed identity
//!
//! A fact-tuple is the nested `(subject, relation, object)` structure a
//! document contributes before it is materialized as graph nodes. Its
//! identity is the MD5 digest of the in-order concatenation of every label
//! and value it contains, so the same fact observed in two documents always
//! lands on the same node.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Hex-encoded MD5 digest of a canonical serialization
pub fn content_hash(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// `(type, value)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Leaf {
    pub kind: String,
    pub value: String,
}

impl Leaf {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Leaf whose value repeats its label (synthetic population nodes)
    pub fn labelled(label: &str) -> Self {
        Self::new(label, label)
    }

    fn write_canonical(&self, out: &mut String) {
        out.push_str(&self.kind);
        out.push_str(&self.value);
    }

    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    pub fn id(&self) -> String {
        content_hash(&self.canonical())
    }
}

impl std::fmt::Display for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.kind, self.value)
    }
}

/// A leaf, optionally qualified by exactly one attribute edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Leaf(Leaf),
    Qualified {
        head: Leaf,
        relation: String,
        tail: Leaf,
    },
}

impl Term {
    pub fn qualified(head: Leaf, relation: impl Into<String>, tail: Leaf) -> Self {
        Self::Qualified {
            head,
            relation: relation.into(),
            tail,
        }
    }

    /// The node this term materializes as
    pub fn head(&self) -> &Leaf {
        match self {
            Self::Leaf(leaf) => leaf,
            Self::Qualified { head, .. } => head,
        }
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            Self::Leaf(leaf) => leaf.write_canonical(out),
            Self::Qualified {
                head,
                relation,
                tail,
            } => {
                head.write_canonical(out);
                out.push_str(relation);
                tail.write_canonical(out);
            }
        }
    }

    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    pub fn id(&self) -> String {
        content_hash(&self.canonical())
    }
}

impl From<Leaf> for Term {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(leaf) => write!(f, "{leaf}"),
            Self::Qualified {
                head,
                relation,
                tail,
            } => write!(f, "({head}, {relation}, {tail})"),
        }
    }
}

/// One `relation -> object` step hanging off a compound subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Branch {
    pub relation: String,
    pub object: Term,
}

impl Branch {
    pub fn new(relation: impl Into<String>, object: impl Into<Term>) -> Self {
        Self {
            relation: relation.into(),
            object: object.into(),
        }
    }
}

/// A synthesized fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactTuple {
    Leaf(Leaf),
    Compound { subject: Term, branches: Vec<Branch> },
}

impl FactTuple {
    /// `(subject, relation, object)`
    pub fn edge(
        subject: impl Into<Term>,
        relation: impl Into<String>,
        object: impl Into<Term>,
    ) -> Self {
        Self::Compound {
            subject: subject.into(),
            branches: vec![Branch::new(relation, object)],
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Subject position as a term (a bare leaf fact is its own subject)
    pub fn subject(&self) -> Term {
        match self {
            Self::Leaf(leaf) => Term::Leaf(leaf.clone()),
            Self::Compound { subject, .. } => subject.clone(),
        }
    }

    pub fn branches(&self) -> &[Branch] {
        match self {
            Self::Leaf(_) => &[],
            Self::Compound { branches, .. } => branches,
        }
    }

    /// Append branches; a leaf becomes a compound rooted at itself
    pub fn extended(&self, more: &[Branch]) -> Self {
        if more.is_empty() {
            return self.clone();
        }
        let mut branches = self.branches().to_vec();
        branches.extend_from_slice(more);
        Self::Compound {
            subject: self.subject(),
            branches,
        }
    }

    /// In-order concatenation of every label and value
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        match self {
            Self::Leaf(leaf) => leaf.write_canonical(&mut out),
            Self::Compound { subject, branches } => {
                subject.write_canonical(&mut out);
                for branch in branches {
                    out.push_str(&branch.relation);
                    branch.object.write_canonical(&mut out);
                }
            }
        }
        out
    }

    /// Node id of the fact root
    pub fn id(&self) -> String {
        content_hash(&self.canonical())
    }
}

impl From<Leaf> for FactTuple {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl std::fmt::Display for FactTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(leaf) => write!(f, "{leaf}"),
            Self::Compound { subject, branches } => {
                write!(f, "({subject}")?;
                for branch in branches {
                    write!(f, ", {}, {}", branch.relation, branch.object)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_content_hash_is_md5_hex() {
        assert_eq!(content_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(content_hash("").len(), 32);
    }

    #[test]
    fn test_canonical_concatenates_in_order() {
        let fact = FactTuple::edge(
            Leaf::new("建议", "禁用"),
            "特殊人群",
            Term::qualified(Leaf::labelled("老人"), "年龄信息", Leaf::new("年龄", "65岁以上")),
        );

        assert_eq!(fact.canonical(), "建议禁用特殊人群老人老人年龄信息年龄65岁以上");
    }

    #[test]
    fn test_extended_leaf_becomes_compound() {
        let dose = FactTuple::Leaf(Leaf::new("用药剂量", "一次1片"));
        let more = [Branch::new("频率", Leaf::new("用药频率", "一日3次"))];
        let combined = dose.extended(&more);

        assert!(!combined.is_leaf());
        assert_eq!(combined.branches().len(), 1);
        assert_eq!(combined.subject().head().value, "一次1片");
        assert_eq!(dose.extended(&[]), dose);
    }

    #[test]
    fn test_display_mirrors_tuple_layout() {
        let fact = FactTuple::edge(Leaf::new("病症", "头痛"), "几率", Leaf::new("发生率", "罕见"));
        assert_eq!(fact.to_string(), "((病症, 头痛), 几率, (发生率, 罕见))");
    }

    proptest! {
        #[test]
        fn prop_identical_structure_same_id(kind in "[a-z]{1,6}", value in "[a-z0-9]{0,8}", rel in "[a-z]{1,4}") {
            let a = FactTuple::edge(Leaf::new(&kind, &value), &rel, Leaf::new(&kind, &value));
            let b = FactTuple::edge(Leaf::new(&kind, &value), &rel, Leaf::new(&kind, &value));
            prop_assert_eq!(a.id(), b.id());
            prop_assert_eq!(a.id().len(), 32);
        }
    }
}
