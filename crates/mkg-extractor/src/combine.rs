//! Fact Combiner
//!
//! Merges two fact sets matched for the same subject (for instance the
//! `几率` and `方案` children of one adverse reaction) into one set.

use std::collections::BTreeSet;

use mkg_core::FactTuple;

fn is_bare_leaf(facts: &BTreeSet<FactTuple>) -> bool {
    facts.len() == 1 && facts.iter().all(FactTuple::is_leaf)
}

/// Combine the fact sets of one subject.
///
/// An empty side yields the other side; a side holding only the bare subject
/// leaf yields the other side. Otherwise every fact of `a` is extended with
/// the branches of every fact of `b`.
pub fn combine(a: &BTreeSet<FactTuple>, b: &BTreeSet<FactTuple>) -> BTreeSet<FactTuple> {
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }
    if is_bare_leaf(a) {
        return b.clone();
    }
    if is_bare_leaf(b) {
        return a.clone();
    }

    a.iter()
        .flat_map(|left| b.iter().map(move |right| left.extended(right.branches())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkg_core::Leaf;

    fn disease() -> Leaf {
        Leaf::new("病症", "皮疹")
    }

    fn set(facts: impl IntoIterator<Item = FactTuple>) -> BTreeSet<FactTuple> {
        facts.into_iter().collect()
    }

    #[test]
    fn test_empty_side_yields_other() {
        let a = set([FactTuple::Leaf(disease())]);
        assert_eq!(combine(&a, &BTreeSet::new()), a);
        assert_eq!(combine(&BTreeSet::new(), &a), a);
    }

    #[test]
    fn test_bare_leaf_side_yields_other() {
        let leaf = set([FactTuple::Leaf(disease())]);
        let rate = set([FactTuple::edge(disease(), "几率", Leaf::new("发生率", "罕见"))]);

        assert_eq!(combine(&leaf, &rate), rate);
        assert_eq!(combine(&rate, &leaf), rate);
        assert_eq!(combine(&leaf, &leaf), leaf);
    }

    #[test]
    fn test_cartesian_product_appends_branches() {
        let rates = set([
            FactTuple::edge(disease(), "几率", Leaf::new("发生率", "罕见")),
            FactTuple::edge(disease(), "几率", Leaf::new("发生率", "偶见")),
        ]);
        let regimens = set([FactTuple::edge(disease(), "方案", Leaf::new("用药方案", "停药"))]);

        let combined = combine(&rates, &regimens);
        assert_eq!(combined.len(), 2);
        for fact in &combined {
            assert_eq!(fact.branches().len(), 2);
            assert_eq!(fact.branches()[1].relation, "方案");
            assert_eq!(fact.subject().head(), &disease());
        }
    }
}
