//! Annotation schema
//!
//! Entity and relation labels emitted by the upstream NER/RE models, the
//! labels synthesized by the graph builder, and the raw (non-annotated)
//! product attributes attached directly to drug roots.

use serde::{Deserialize, Serialize};

/// Entity type labels
pub mod entity {
    pub const DRUG: &str = "药物";
    pub const EXCIPIENT: &str = "辅料";
    pub const DRUG_CLASS: &str = "药物类别";
    pub const DISEASE: &str = "病症";
    pub const FUNCTION: &str = "功能主治";
    pub const POISONING: &str = "中毒";
    pub const INJURY: &str = "受伤";
    pub const PATHOGEN: &str = "微生物";
    pub const CHEMICAL: &str = "化学物质";
    pub const SURGERY: &str = "手术";
    pub const INCIDENCE: &str = "发生率";
    pub const REGIMEN: &str = "用药方案";
    pub const FOOD: &str = "食物";
    pub const ADVICE: &str = "建议";
    pub const SEX: &str = "性别";
    pub const AGE: &str = "年龄";
    pub const WEIGHT: &str = "体重";
    pub const PERIOD: &str = "时期";
    pub const ROUTE: &str = "给药途径";
    pub const DOSE: &str = "用药剂量";
    pub const FREQUENCY: &str = "用药频率";
    pub const COURSE: &str = "用药疗程";

    /// Graph label of a synthesized drug root
    pub const DRUG_ROOT: &str = "药品";
    /// Graph label 时期 attributes are published under
    pub const DURATION: &str = "时长";
}

/// Relation labels
pub mod relation {
    pub const CAUSE: &str = "诱因";
    pub const RATE: &str = "几率";
    pub const REGIMEN: &str = "方案";
    pub const CONTRAINDICATED_DISEASE: &str = "禁忌病症";
    pub const FOOD_AVOIDANCE: &str = "同服忌口";
    pub const POPULATION: &str = "特殊人群";
    pub const DOSE: &str = "剂量";
    pub const ROUTE: &str = "方式";
    pub const FREQUENCY: &str = "频率";
    pub const COURSE: &str = "疗程";
}

/// Patient subgroup entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PopulationKind {
    General,
    Elderly,
    Child,
    PlanningPregnancy,
    Pregnant,
    Childbirth,
    Nursing,
}

impl PopulationKind {
    pub const ALL: [PopulationKind; 7] = [
        Self::General,
        Self::Elderly,
        Self::Child,
        Self::PlanningPregnancy,
        Self::Pregnant,
        Self::Childbirth,
        Self::Nursing,
    ];

    /// Entity type emitted by the annotator
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::General => "普通患者",
            Self::Elderly => "老人",
            Self::Child => "小孩",
            Self::PlanningPregnancy => "计划妊娠",
            Self::Pregnant => "妊娠",
            Self::Childbirth => "生产",
            Self::Nursing => "哺乳",
        }
    }

    /// Node label of the synthesized population descriptor
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "普通患者",
            Self::Elderly => "老人",
            Self::Child => "儿童",
            Self::PlanningPregnancy => "计划妊娠妇女",
            Self::Pregnant => "孕妇",
            Self::Childbirth => "产妇",
            Self::Nursing => "哺乳期妇女",
        }
    }

    pub fn from_entity_type(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.entity_type() == kind)
    }
}

/// Attribute types that qualify a population descriptor
pub const POPULATION_ATTRIBUTES: [&str; 4] =
    [entity::SEX, entity::AGE, entity::WEIGHT, entity::PERIOD];

/// Entity types whose text is normalized into a quantity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumericKind {
    Weight,
    Age,
    Period,
    Course,
    Dose,
    Frequency,
}

impl NumericKind {
    pub const ALL: [NumericKind; 6] = [
        Self::Weight,
        Self::Age,
        Self::Period,
        Self::Course,
        Self::Dose,
        Self::Frequency,
    ];

    /// Entity type emitted by the annotator
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::Weight => entity::WEIGHT,
            Self::Age => entity::AGE,
            Self::Period => entity::PERIOD,
            Self::Course => entity::COURSE,
            Self::Dose => entity::DOSE,
            Self::Frequency => entity::FREQUENCY,
        }
    }

    /// Label the kind carries once materialized as a graph node
    pub fn node_label(&self) -> &'static str {
        match self {
            Self::Period => entity::DURATION,
            other => other.entity_type(),
        }
    }

    pub fn from_entity_type(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.entity_type() == kind)
    }

    pub fn from_node_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.node_label() == label)
    }

    /// Time-like kinds whose calendar units fold into days
    pub fn converts_to_days(&self) -> bool {
        matches!(self, Self::Age | Self::Period | Self::Course)
    }

    /// Units routed into the `dimension` partition of the quantity record
    pub fn dimension_units(&self) -> &'static [&'static str] {
        match self {
            Self::Dose => &["次", "月", "周", "日", "天", "d", "小时", "h", "分钟", "m"],
            Self::Frequency => &["月", "周", "日", "天", "d", "小时", "h", "分钟", "m"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for NumericKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.entity_type())
    }
}

/// Product attribute taken verbatim from the cleaned leaflet record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute {
    /// Key in the cleaned record
    pub key: &'static str,
    /// Relation from the drug root
    pub relation: &'static str,
    /// Label of the attribute node
    pub node_type: &'static str,
}

/// Key holding the generic name; becomes the drug root value
pub const GENERIC_NAME_KEY: &str = "通用名称";

/// Key holding the regulatory approval number; hashed into the drug id
pub const APPROVAL_NUMBER_KEY: &str = "批准文号";

pub const RAW_ATTRIBUTES: [RawAttribute; 9] = [
    RawAttribute { key: "商品名称", relation: "商品名", node_type: "商品名称" },
    RawAttribute { key: "汉语拼音", relation: "拼音", node_type: "汉语拼音" },
    RawAttribute { key: "批准文号", relation: "批号", node_type: "批准文号" },
    RawAttribute { key: "生产企业", relation: "生产商", node_type: "企业" },
    RawAttribute { key: "性状", relation: "药物性状", node_type: "性状" },
    RawAttribute { key: "贮藏", relation: "储藏方法", node_type: "储藏" },
    RawAttribute { key: "有效期", relation: "保质期", node_type: "有效期" },
    RawAttribute { key: "类别", relation: "药物类别", node_type: "类别" },
    RawAttribute { key: "处方类型", relation: "处方类型", node_type: "类型" },
];

pub fn raw_attribute(key: &str) -> Option<&'static RawAttribute> {
    RAW_ATTRIBUTES.iter().find(|a| a.key == key)
}
