//! Triple Matcher
//!
//! Turns the entities and relations of one annotated document into
//! fact-tuples. Each [`Category`] carries its own structural rule; the rule
//! is selected once per document through [`CategoryMatcher::matcher`].
//!
//! Two conventions hold across all rules:
//! - an entity that is the object of any relation in the document is never
//!   used as a root
//! - children are selected by the *type* of the object entity, not by the
//!   relation label the annotator chose

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use mkg_core::fact::Branch;
use mkg_core::schema::{entity, relation, POPULATION_ATTRIBUTES};
use mkg_core::{Category, Document, EntitySpan, FactGroup, FactTuple, Leaf, PopulationKind, Term};

use crate::combine::combine;

/// Fact-tuples of one document, by drug-root relation
pub type MatchedFacts = BTreeMap<FactGroup, BTreeSet<FactTuple>>;

/// Structural rule of one category
pub type MatchFn = fn(&AnnotationIndex<'_>) -> MatchedFacts;

const CAUSE_TYPES: [&str; 6] = [
    entity::DISEASE,
    entity::POISONING,
    entity::INJURY,
    entity::PATHOGEN,
    entity::CHEMICAL,
    entity::SURGERY,
];

// ============================================================================
// Annotation Index
// ============================================================================

/// A resolved relation endpoint
#[derive(Debug, Clone, Copy)]
pub struct Link<'a> {
    /// Relation label
    pub relation: &'a str,
    /// Id of the entity on the far end
    pub id: &'a str,
    pub entity: &'a EntitySpan,
}

/// Adjacency view over one document
#[derive(Debug)]
pub struct AnnotationIndex<'a> {
    document: &'a Document,
    subjects: HashSet<&'a str>,
    objects: HashSet<&'a str>,
    outgoing: HashMap<&'a str, Vec<Link<'a>>>,
    incoming: HashMap<&'a str, Vec<Link<'a>>>,
    dangling: usize,
}

impl<'a> AnnotationIndex<'a> {
    pub fn new(document: &'a Document) -> Self {
        let mut index = Self {
            document,
            subjects: HashSet::new(),
            objects: HashSet::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            dangling: 0,
        };

        for edge in document.relation.values() {
            index.subjects.insert(edge.subject.as_str());
            index.objects.insert(edge.object.as_str());

            let (Some((subject_id, subject)), Some((object_id, object))) = (
                document.entity.get_key_value(&edge.subject),
                document.entity.get_key_value(&edge.object),
            ) else {
                index.dangling += 1;
                continue;
            };

            index.outgoing.entry(subject_id).or_default().push(Link {
                relation: &edge.kind,
                id: object_id,
                entity: object,
            });
            index.incoming.entry(object_id).or_default().push(Link {
                relation: &edge.kind,
                id: subject_id,
                entity: subject,
            });
        }

        index
    }

    /// Entities in id order
    pub fn entities(&self) -> impl Iterator<Item = (&'a str, &'a EntitySpan)> + 'a {
        self.document.entity.iter().map(|(id, e)| (id.as_str(), e))
    }

    /// Entities of any of the given types
    pub fn entities_of<'t>(
        &self,
        types: &'t [&'t str],
    ) -> impl Iterator<Item = (&'a str, &'a EntitySpan)> + 't
    where
        'a: 't,
    {
        self.entities()
            .filter(move |(_, e)| types.contains(&e.kind.as_str()))
    }

    /// The entity is the subject of some relation
    pub fn is_subject(&self, id: &str) -> bool {
        self.subjects.contains(id)
    }

    /// The entity is the object of some relation
    pub fn is_object(&self, id: &str) -> bool {
        self.objects.contains(id)
    }

    pub fn outgoing(&self, id: &str) -> &[Link<'a>] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, id: &str) -> &[Link<'a>] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relations with an endpoint missing from the entity map
    pub fn dangling(&self) -> usize {
        self.dangling
    }
}

// ============================================================================
// Building Blocks
// ============================================================================

pub fn leaf(entity: &EntitySpan) -> Leaf {
    Leaf::new(&entity.kind, &entity.value)
}

/// Every entity of the given types as a leaf fact
pub fn match_drug_object(index: &AnnotationIndex<'_>, types: &[&str]) -> BTreeSet<FactTuple> {
    index
        .entities_of(types)
        .map(|(_, e)| FactTuple::Leaf(leaf(e)))
        .collect()
}

/// Root entities of `subject_type` with their children of `object_types`.
///
/// A root without matching children is kept as its own leaf fact.
pub fn match_triple<'a>(
    index: &AnnotationIndex<'a>,
    subject_type: &str,
    object_types: &[&str],
    relation: &str,
) -> BTreeMap<&'a str, BTreeSet<FactTuple>> {
    index
        .entities()
        .filter(|(id, e)| e.kind == subject_type && !index.is_object(id))
        .map(|(id, subject)| {
            let children: BTreeSet<Leaf> = index
                .outgoing(id)
                .iter()
                .filter(|link| object_types.contains(&link.entity.kind.as_str()))
                .map(|link| leaf(link.entity))
                .collect();

            let facts = if children.is_empty() {
                BTreeSet::from([FactTuple::Leaf(leaf(subject))])
            } else {
                children
                    .into_iter()
                    .map(|child| FactTuple::edge(leaf(subject), relation, child))
                    .collect()
            };
            (id, facts)
        })
        .collect()
}

/// Node label of a population attribute (时期 is published as 时长)
fn attribute_label(kind: &str) -> &str {
    if kind == entity::PERIOD {
        entity::DURATION
    } else {
        kind
    }
}

/// Descriptors of every population entity, by entity id.
///
/// Each attached 性别/年龄/体重/时期 attribute yields one qualified
/// descriptor; an entity without attributes yields the bare label.
pub fn population_descriptors<'a>(index: &AnnotationIndex<'a>) -> BTreeMap<&'a str, BTreeSet<Term>> {
    index
        .entities()
        .filter_map(|(id, e)| PopulationKind::from_entity_type(&e.kind).map(|p| (id, p)))
        .map(|(id, population)| {
            let head = Leaf::labelled(population.label());
            let qualified: BTreeSet<Term> = index
                .outgoing(id)
                .iter()
                .filter(|link| POPULATION_ATTRIBUTES.contains(&link.entity.kind.as_str()))
                .map(|link| {
                    let tail = Leaf::new(attribute_label(&link.entity.kind), &link.entity.value);
                    Term::qualified(head.clone(), link.relation, tail)
                })
                .collect();

            let descriptors = if qualified.is_empty() {
                BTreeSet::from([Term::Leaf(head)])
            } else {
                qualified
            };
            (id, descriptors)
        })
        .collect()
}

fn general_population() -> Term {
    Term::Leaf(Leaf::labelled(PopulationKind::General.label()))
}

/// 建议 entities that are no relation's subject
fn advice_roots<'a>(index: &AnnotationIndex<'a>) -> Vec<(&'a str, &'a EntitySpan)> {
    index
        .entities_of(&[entity::ADVICE])
        .filter(|(id, _)| !index.is_subject(id))
        .collect()
}

fn grouped(group: FactGroup, facts: BTreeSet<FactTuple>) -> MatchedFacts {
    let mut matched = MatchedFacts::new();
    if !facts.is_empty() {
        matched.insert(group, facts);
    }
    matched
}

// ============================================================================
// Category Rules
// ============================================================================

fn ingredients(index: &AnnotationIndex<'_>) -> MatchedFacts {
    let facts = match_drug_object(index, &[entity::DRUG, entity::EXCIPIENT]);
    grouped(FactGroup::Ingredient, facts)
}

fn indications(index: &AnnotationIndex<'_>) -> MatchedFacts {
    let causes = match_triple(index, entity::DISEASE, &CAUSE_TYPES, relation::CAUSE);
    let mut matched = grouped(FactGroup::Treatment, causes.into_values().flatten().collect());

    let functions = match_drug_object(index, &[entity::FUNCTION]);
    if !functions.is_empty() {
        matched.insert(FactGroup::Function, functions);
    }
    matched
}

fn adverse_reactions(index: &AnnotationIndex<'_>) -> MatchedFacts {
    let rates = match_triple(index, entity::DISEASE, &[entity::INCIDENCE], relation::RATE);
    let regimens = match_triple(index, entity::DISEASE, &[entity::REGIMEN], relation::REGIMEN);
    let none = BTreeSet::new();

    let facts = rates
        .iter()
        .flat_map(|(id, rate)| combine(rate, regimens.get(id).unwrap_or(&none)))
        .collect();
    grouped(FactGroup::AdverseReaction, facts)
}

fn interactions(index: &AnnotationIndex<'_>) -> MatchedFacts {
    let facts = match_drug_object(index, &[entity::DRUG, entity::DRUG_CLASS]);
    grouped(FactGroup::Interaction, facts)
}

fn contraindications(index: &AnnotationIndex<'_>) -> MatchedFacts {
    let descriptors = population_descriptors(index);
    let mut facts = BTreeSet::new();

    for (advice_id, advice) in advice_roots(index) {
        let advice = leaf(advice);
        for link in index.incoming(advice_id) {
            let subject = link.entity;
            match subject.kind.as_str() {
                entity::DISEASE => {
                    facts.insert(FactTuple::edge(
                        advice.clone(),
                        relation::CONTRAINDICATED_DISEASE,
                        leaf(subject),
                    ));
                }
                entity::FOOD => {
                    facts.insert(FactTuple::edge(
                        advice.clone(),
                        relation::FOOD_AVOIDANCE,
                        leaf(subject),
                    ));
                }
                _ => {
                    for descriptor in descriptors.get(link.id).into_iter().flatten() {
                        facts.insert(FactTuple::edge(
                            advice.clone(),
                            relation::POPULATION,
                            descriptor.clone(),
                        ));
                    }
                }
            }
        }
    }

    grouped(FactGroup::Usage, facts)
}

/// Advice for a special population; unlinked advice applies to `defaults`
fn special_population(index: &AnnotationIndex<'_>, defaults: &[PopulationKind]) -> MatchedFacts {
    let descriptors = population_descriptors(index);
    let mut facts = BTreeSet::new();

    for (advice_id, advice) in advice_roots(index) {
        let advice = leaf(advice);

        // A dangling subject still links the advice
        if !index.is_object(advice_id) {
            for population in defaults {
                facts.insert(FactTuple::edge(
                    advice.clone(),
                    relation::POPULATION,
                    Leaf::labelled(population.label()),
                ));
            }
            continue;
        }

        for link in index.incoming(advice_id) {
            for descriptor in descriptors.get(link.id).into_iter().flatten() {
                facts.insert(FactTuple::edge(
                    advice.clone(),
                    relation::POPULATION,
                    descriptor.clone(),
                ));
            }
        }
    }

    grouped(FactGroup::Usage, facts)
}

fn pregnancy_and_nursing(index: &AnnotationIndex<'_>) -> MatchedFacts {
    special_population(index, &[PopulationKind::Pregnant, PopulationKind::Nursing])
}

fn children(index: &AnnotationIndex<'_>) -> MatchedFacts {
    special_population(index, &[PopulationKind::Child])
}

fn elderly(index: &AnnotationIndex<'_>) -> MatchedFacts {
    special_population(index, &[PopulationKind::Elderly])
}

/// Relation hanging a standalone administration entity off 普通患者
fn administration_relation(kind: &str) -> Option<&'static str> {
    match kind {
        entity::ROUTE => Some(relation::ROUTE),
        entity::FREQUENCY => Some(relation::FREQUENCY),
        entity::COURSE => Some(relation::COURSE),
        _ => None,
    }
}

fn dosage(index: &AnnotationIndex<'_>) -> MatchedFacts {
    let routes = match_triple(index, entity::DOSE, &[entity::ROUTE], relation::ROUTE);
    let frequencies = match_triple(index, entity::DOSE, &[entity::FREQUENCY], relation::FREQUENCY);
    let courses = match_triple(index, entity::DOSE, &[entity::COURSE], relation::COURSE);
    let descriptors = population_descriptors(index);
    let none = BTreeSet::new();
    let mut facts = BTreeSet::new();

    for (dose_id, route) in &routes {
        let regimens = combine(
            &combine(route, frequencies.get(dose_id).unwrap_or(&none)),
            courses.get(dose_id).unwrap_or(&none),
        );

        let mut populations: Vec<Term> = index
            .outgoing(dose_id)
            .iter()
            .filter(|link| PopulationKind::from_entity_type(&link.entity.kind).is_some())
            .flat_map(|link| descriptors.get(link.id).into_iter().flatten().cloned())
            .collect();
        if populations.is_empty() {
            populations.push(general_population());
        }

        for population in &populations {
            for regimen in &regimens {
                let dose = Branch::new(relation::DOSE, regimen.subject());
                let fact = FactTuple::Compound {
                    subject: population.clone(),
                    branches: vec![dose],
                };
                facts.insert(fact.extended(regimen.branches()));
            }
        }
    }

    for (id, e) in index.entities() {
        if index.is_object(id) {
            continue;
        }
        if let Some(relation) = administration_relation(&e.kind) {
            facts.insert(FactTuple::edge(general_population(), relation, leaf(e)));
        }
    }

    grouped(FactGroup::Dosage, facts)
}

// ============================================================================
// Dispatch
// ============================================================================

/// Structural rule selection per category
pub trait CategoryMatcher {
    fn matcher(&self) -> MatchFn;
}

impl CategoryMatcher for Category {
    fn matcher(&self) -> MatchFn {
        match self {
            Self::Ingredients => ingredients,
            Self::Indications => indications,
            Self::AdverseReactions => adverse_reactions,
            Self::Interactions => interactions,
            Self::Contraindications => contraindications,
            Self::PregnancyAndNursing => pregnancy_and_nursing,
            Self::Children => children,
            Self::Elderly => elderly,
            Self::Dosage => dosage,
        }
    }
}

/// Match one document; `None` when its folder tag names no category
pub fn match_document(document: &Document) -> Option<MatchedFacts> {
    let category = document.category()?;
    let index = AnnotationIndex::new(document);
    Some(category.matcher()(&index))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(document: &Document, group: FactGroup) -> BTreeSet<FactTuple> {
        match_document(document)
            .unwrap()
            .remove(&group)
            .unwrap_or_default()
    }

    #[test]
    fn test_ingredient_leaf() {
        let doc = Document::new(Category::Ingredients)
            .with_file("d1")
            .with_entity("T1", "药物", "阿司匹林");

        let matched = match_document(&doc).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(
            matched[&FactGroup::Ingredient],
            BTreeSet::from([FactTuple::Leaf(Leaf::new("药物", "阿司匹林"))])
        );
    }

    #[test]
    fn test_unknown_folder() {
        let mut doc = Document::new(Category::Ingredients);
        doc.folder = "XiaoShouQuDao".to_string();
        assert!(match_document(&doc).is_none());
    }

    #[test]
    fn test_indications_split_treatment_and_function() {
        let doc = Document::new(Category::Indications)
            .with_entity("T1", "病症", "肺炎")
            .with_entity("T2", "微生物", "肺炎链球菌")
            .with_entity("T3", "病症", "发热")
            .with_entity("T4", "功能主治", "清热解毒")
            .with_relation("R1", "诱因", "T1", "T2");

        let treatment = facts(&doc, FactGroup::Treatment);
        assert_eq!(treatment.len(), 2);
        assert!(treatment.contains(&FactTuple::edge(
            Leaf::new("病症", "肺炎"),
            "诱因",
            Leaf::new("微生物", "肺炎链球菌"),
        )));
        assert!(treatment.contains(&FactTuple::Leaf(Leaf::new("病症", "发热"))));

        let function = facts(&doc, FactGroup::Function);
        assert_eq!(function, BTreeSet::from([FactTuple::Leaf(Leaf::new("功能主治", "清热解毒"))]));
    }

    #[test]
    fn test_consumed_subject_is_not_a_root() {
        // T2 is a 病症 but also the object of R1, so only T1 roots a fact
        let doc = Document::new(Category::Indications)
            .with_entity("T1", "病症", "肺炎")
            .with_entity("T2", "病症", "感染")
            .with_relation("R1", "诱因", "T1", "T2");

        let treatment = facts(&doc, FactGroup::Treatment);
        assert_eq!(treatment.len(), 1);
        assert_eq!(treatment.iter().next().unwrap().subject().head().value, "肺炎");
    }

    #[test]
    fn test_children_selected_by_object_type() {
        let doc = Document::new(Category::AdverseReactions)
            .with_entity("T1", "病症", "皮疹")
            .with_entity("T2", "发生率", "罕见")
            .with_entity("T3", "用药方案", "停药")
            .with_relation("R1", "其他", "T1", "T2")
            .with_relation("R2", "方案", "T1", "T3");

        let reactions = facts(&doc, FactGroup::AdverseReaction);
        assert_eq!(reactions.len(), 1);
        let fact = reactions.iter().next().unwrap();
        let relations: Vec<&str> = fact.branches().iter().map(|b| b.relation.as_str()).collect();
        assert_eq!(relations, vec!["几率", "方案"]);
    }

    #[test]
    fn test_contraindication_population_compound() {
        let doc = Document::new(Category::Contraindications)
            .with_entity("T1", "建议", "禁用")
            .with_entity("T2", "老人", "老年患者")
            .with_relation("R1", "使用", "T2", "T1");

        let usage = facts(&doc, FactGroup::Usage);
        assert_eq!(
            usage,
            BTreeSet::from([FactTuple::edge(
                Leaf::new("建议", "禁用"),
                "特殊人群",
                Leaf::new("老人", "老人"),
            )])
        );
    }

    #[test]
    fn test_contraindication_disease_food_and_qualified_population() {
        let doc = Document::new(Category::Contraindications)
            .with_entity("T1", "建议", "禁用")
            .with_entity("T2", "病症", "哮喘")
            .with_entity("T3", "食物", "酒")
            .with_entity("T4", "老人", "老年患者")
            .with_entity("T5", "年龄", "65岁以上")
            .with_relation("R1", "使用", "T2", "T1")
            .with_relation("R2", "使用", "T3", "T1")
            .with_relation("R3", "使用", "T4", "T1")
            .with_relation("R4", "年龄信息", "T4", "T5");

        let usage = facts(&doc, FactGroup::Usage);
        let advice = Leaf::new("建议", "禁用");
        assert_eq!(usage.len(), 3);
        assert!(usage.contains(&FactTuple::edge(advice.clone(), "禁忌病症", Leaf::new("病症", "哮喘"))));
        assert!(usage.contains(&FactTuple::edge(advice.clone(), "同服忌口", Leaf::new("食物", "酒"))));
        assert!(usage.contains(&FactTuple::edge(
            advice,
            "特殊人群",
            Term::qualified(Leaf::labelled("老人"), "年龄信息", Leaf::new("年龄", "65岁以上")),
        )));
    }

    #[test]
    fn test_special_population_defaults() {
        let pregnancy = Document::new(Category::PregnancyAndNursing).with_entity("T1", "建议", "慎用");
        let usage = facts(&pregnancy, FactGroup::Usage);
        let labels: BTreeSet<String> = usage
            .iter()
            .map(|f| f.branches()[0].object.head().value.clone())
            .collect();
        assert_eq!(labels, BTreeSet::from(["孕妇".to_string(), "哺乳期妇女".to_string()]));

        let children = Document::new(Category::Children).with_entity("T1", "建议", "慎用");
        let usage = facts(&children, FactGroup::Usage);
        assert_eq!(
            usage,
            BTreeSet::from([FactTuple::edge(Leaf::new("建议", "慎用"), "特殊人群", Leaf::labelled("儿童"))])
        );
    }

    #[test]
    fn test_period_attribute_published_as_duration() {
        let doc = Document::new(Category::PregnancyAndNursing)
            .with_entity("T1", "建议", "禁用")
            .with_entity("T2", "妊娠", "妊娠期妇女")
            .with_entity("T3", "时期", "前3个月")
            .with_relation("R1", "使用", "T2", "T1")
            .with_relation("R2", "时期信息", "T2", "T3");

        let usage = facts(&doc, FactGroup::Usage);
        let fact = usage.iter().next().unwrap();
        match &fact.branches()[0].object {
            Term::Qualified { head, tail, .. } => {
                assert_eq!(head, &Leaf::labelled("孕妇"));
                assert_eq!(tail, &Leaf::new("时长", "前3个月"));
            }
            other => panic!("expected qualified descriptor, got {other}"),
        }
    }

    #[test]
    fn test_dosage_nests_regimen_under_population() {
        let doc = Document::new(Category::Dosage)
            .with_entity("T1", "用药剂量", "一次1片")
            .with_entity("T2", "给药途径", "口服")
            .with_entity("T3", "用药频率", "一日3次")
            .with_entity("T4", "小孩", "儿童")
            .with_relation("R1", "方式", "T1", "T2")
            .with_relation("R2", "频率", "T1", "T3")
            .with_relation("R3", "人群", "T1", "T4");

        let dosage = facts(&doc, FactGroup::Dosage);
        assert_eq!(dosage.len(), 1);
        let fact = dosage.iter().next().unwrap();
        assert_eq!(fact.subject(), Term::Leaf(Leaf::labelled("儿童")));
        let relations: Vec<&str> = fact.branches().iter().map(|b| b.relation.as_str()).collect();
        assert_eq!(relations, vec!["剂量", "方式", "频率"]);
        assert_eq!(fact.branches()[0].object.head(), &Leaf::new("用药剂量", "一次1片"));
    }

    #[test]
    fn test_dosage_qualified_population_full_regimen() {
        let doc = Document::new(Category::Dosage)
            .with_entity("T1", "用药剂量", "一次1片")
            .with_entity("T2", "给药途径", "口服")
            .with_entity("T3", "用药频率", "一日3次")
            .with_entity("T4", "用药疗程", "7天")
            .with_entity("T5", "小孩", "儿童")
            .with_entity("T6", "体重", "20kg以下")
            .with_entity("T7", "给药途径", "外用")
            .with_relation("R1", "方式", "T1", "T2")
            .with_relation("R2", "频率", "T1", "T3")
            .with_relation("R3", "疗程", "T1", "T4")
            .with_relation("R4", "人群", "T1", "T5")
            .with_relation("R5", "体重信息", "T5", "T6");

        let child = Term::qualified(Leaf::labelled("儿童"), "体重信息", Leaf::new("体重", "20kg以下"));
        let regimen = FactTuple::Compound {
            subject: child,
            branches: vec![
                Branch::new("剂量", Leaf::new("用药剂量", "一次1片")),
                Branch::new("方式", Leaf::new("给药途径", "口服")),
                Branch::new("频率", Leaf::new("用药频率", "一日3次")),
                Branch::new("疗程", Leaf::new("用药疗程", "7天")),
            ],
        };
        let topical = FactTuple::edge(
            Leaf::labelled("普通患者"),
            "方式",
            Leaf::new("给药途径", "外用"),
        );

        assert_eq!(facts(&doc, FactGroup::Dosage), BTreeSet::from([regimen, topical]));
    }

    #[test]
    fn test_dosage_defaults_to_general_population() {
        let doc = Document::new(Category::Dosage)
            .with_entity("T1", "用药剂量", "一次1片")
            .with_entity("T2", "用药疗程", "7天");

        let dosage = facts(&doc, FactGroup::Dosage);
        let general = Leaf::labelled("普通患者");
        assert_eq!(
            dosage,
            BTreeSet::from([
                FactTuple::edge(general.clone(), "剂量", Leaf::new("用药剂量", "一次1片")),
                FactTuple::edge(general, "疗程", Leaf::new("用药疗程", "7天")),
            ])
        );
    }

    #[test]
    fn test_dangling_relations_are_skipped() {
        let doc = Document::new(Category::Contraindications)
            .with_entity("T1", "建议", "禁用")
            .with_relation("R1", "使用", "T9", "T1");

        let index = AnnotationIndex::new(&doc);
        assert_eq!(index.dangling(), 1);
        assert!(index.incoming("T1").is_empty());
        assert!(index.is_subject("T9"));
        assert!(facts(&doc, FactGroup::Usage).is_empty());
    }

    #[test]
    fn test_dangling_subject_blocks_population_default() {
        let doc = Document::new(Category::Elderly)
            .with_entity("T1", "建议", "慎用")
            .with_relation("R1", "使用", "T9", "T1");

        assert!(AnnotationIndex::new(&doc).is_object("T1"));
        assert!(facts(&doc, FactGroup::Usage).is_empty());
    }
}
