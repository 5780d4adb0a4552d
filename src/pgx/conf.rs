//! Fixed pharmacogenomic configuration data (CPIC-aligned lookup tables).
//!
//! All tables are closed over the six target genes and six supported drugs.
//! They are plain constant data and may be shared freely between threads.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString};

/// The guideline source cited in results.
pub const GUIDELINE_SOURCE: &str = "CPIC";

/// The pharmacogenes that the parser retains variants for.
#[derive(
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    strum::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Gene {
    Cyp2d6,
    Cyp2c19,
    Cyp2c9,
    Slco1b1,
    Tpmt,
    Dpyd,
}

/// Activity scores of known alleles per gene.
///
/// Alleles not listed here are assumed to have normal function.
const CYP2D6_SCORES: &[(&str, f64)] = &[
    ("*1", 1.0),
    ("*2", 1.0),
    ("*4", 0.0),
    ("*5", 0.0),
    ("*6", 0.0),
    ("*10", 0.5),
    ("*17", 0.5),
    ("*41", 0.5),
    ("*1xN", 2.0),
    ("*2xN", 2.0),
];
const CYP2C19_SCORES: &[(&str, f64)] = &[("*1", 1.0), ("*2", 0.0), ("*3", 0.0), ("*17", 1.5)];
const CYP2C9_SCORES: &[(&str, f64)] = &[("*1", 1.0), ("*2", 0.5), ("*3", 0.5)];
const SLCO1B1_SCORES: &[(&str, f64)] = &[("*1", 1.0), ("*5", 0.5), ("*15", 0.5), ("*17", 0.5)];
const TPMT_SCORES: &[(&str, f64)] = &[
    ("*1", 1.0),
    ("*2", 0.0),
    ("*3A", 0.0),
    ("*3B", 0.0),
    ("*3C", 0.0),
];
const DPYD_SCORES: &[(&str, f64)] = &[
    ("*1", 1.0),
    ("*2A", 0.0),
    ("c.1679T>G", 0.5),
    ("c.2846A>T", 0.5),
];

impl Gene {
    /// The allele to activity score table of the gene.
    pub fn activity_scores(&self) -> &'static [(&'static str, f64)] {
        match self {
            Gene::Cyp2d6 => CYP2D6_SCORES,
            Gene::Cyp2c19 => CYP2C19_SCORES,
            Gene::Cyp2c9 => CYP2C9_SCORES,
            Gene::Slco1b1 => SLCO1B1_SCORES,
            Gene::Tpmt => TPMT_SCORES,
            Gene::Dpyd => DPYD_SCORES,
        }
    }
}

/// Drugs with a risk guideline.
#[derive(
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    strum::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Drug {
    Codeine,
    Warfarin,
    Clopidogrel,
    Simvastatin,
    Azathioprine,
    Fluorouracil,
}

impl Drug {
    /// Comma-separated list of all supported drugs.
    pub fn supported_list() -> String {
        Drug::iter().join(", ")
    }

    /// The gene driving the drug's risk classification.
    pub fn primary_gene(&self) -> Gene {
        match self {
            Drug::Codeine => Gene::Cyp2d6,
            // simplified to the primary gene, VKORC1 is not considered
            Drug::Warfarin => Gene::Cyp2c9,
            Drug::Clopidogrel => Gene::Cyp2c19,
            Drug::Simvastatin => Gene::Slco1b1,
            Drug::Azathioprine => Gene::Tpmt,
            Drug::Fluorouracil => Gene::Dpyd,
        }
    }

    /// Risk label for the given phenotype.
    pub fn risk_label(&self, phenotype: Phenotype) -> RiskLabel {
        use Phenotype::*;
        use RiskLabel::*;

        match (self, phenotype) {
            (_, Phenotype::Unknown) => RiskLabel::Unknown,
            (_, Nm) => Safe,
            (Drug::Codeine, Pm) => Ineffective,
            (Drug::Codeine, Im) => AdjustDosage,
            (Drug::Codeine, Rm | Um) => Toxic,
            (Drug::Clopidogrel, Pm) => Ineffective,
            (Drug::Clopidogrel, Im) => AdjustDosage,
            (Drug::Warfarin, Pm | Im) => AdjustDosage,
            (Drug::Simvastatin | Drug::Azathioprine | Drug::Fluorouracil, Pm) => Toxic,
            (Drug::Simvastatin | Drug::Azathioprine | Drug::Fluorouracil, Im) => AdjustDosage,
            (_, Rm | Um) => Safe,
        }
    }

    /// Clinical recommendation text for the given phenotype.
    pub fn recommendation(&self, phenotype: Phenotype) -> &'static str {
        use Phenotype::*;

        const LABEL_DOSAGE: &str = "Use label-recommended dosage.";
        const GENETIC_TESTING: &str = "Use with caution. Consider genetic testing.";

        match (self, phenotype) {
            (Drug::Codeine, Pm) => {
                "Avoid codeine. Use alternative analgesic (e.g., morphine, non-opioid)."
            }
            (Drug::Codeine, Im) => "Use label-recommended dosage. Monitor for reduced efficacy.",
            (Drug::Codeine, Nm) => LABEL_DOSAGE,
            (Drug::Codeine, Rm) => {
                "Avoid codeine due to increased risk of toxicity. Use alternative."
            }
            (Drug::Codeine, Um) => "Avoid codeine due to high risk of toxicity. Use alternative.",
            (Drug::Codeine, Unknown) => GENETIC_TESTING,

            (Drug::Clopidogrel, Pm) => {
                "Alternative antiplatelet therapy recommended (e.g., prasugrel, ticagrelor)."
            }
            (Drug::Clopidogrel, Im) => {
                "Consider alternative antiplatelet or increased dose per guidelines."
            }
            (Drug::Clopidogrel, Nm | Rm | Um) => LABEL_DOSAGE,
            (Drug::Clopidogrel, Unknown) => GENETIC_TESTING,

            (Drug::Warfarin, Pm) => "Reduce initial dose by 25-50%. Monitor INR closely.",
            (Drug::Warfarin, Im) => "Reduce initial dose by 10-25%. Monitor INR closely.",
            (Drug::Warfarin, Nm | Rm | Um) => "Use standard dosing protocol. Monitor INR.",
            (Drug::Warfarin, Unknown) => "Use standard dosing. Monitor INR closely.",

            (Drug::Simvastatin, Pm) => {
                "Avoid simvastatin or use lowest dose. Consider alternative statin."
            }
            (Drug::Simvastatin, Im) => "Reduce dose or consider alternative statin.",
            (Drug::Simvastatin, Nm | Rm | Um) => LABEL_DOSAGE,
            (Drug::Simvastatin, Unknown) => "Use with caution. Monitor for myopathy.",

            (Drug::Azathioprine, Pm) => {
                "Reduce dose to 10% of standard. Monitor closely for toxicity."
            }
            (Drug::Azathioprine, Im) => {
                "Reduce dose to 30-70% of standard. Monitor blood counts."
            }
            (Drug::Azathioprine, Nm | Rm | Um) => LABEL_DOSAGE,
            (Drug::Azathioprine, Unknown) => GENETIC_TESTING,

            (Drug::Fluorouracil, Pm) => "Avoid fluorouracil. High risk of severe toxicity.",
            (Drug::Fluorouracil, Im) => {
                "Reduce dose by 50% or consider alternative. Monitor closely."
            }
            (Drug::Fluorouracil, Nm | Rm | Um) => LABEL_DOSAGE,
            (Drug::Fluorouracil, Unknown) => GENETIC_TESTING,
        }
    }

    /// Alternative therapies, in order of preference.
    pub fn alternatives(&self) -> &'static [&'static str] {
        match self {
            Drug::Codeine => &["Morphine", "Hydromorphone", "Oxycodone", "Tramadol"],
            Drug::Clopidogrel => &["Prasugrel", "Ticagrelor"],
            Drug::Warfarin => &["Apixaban", "Rivaroxaban", "Dabigatran"],
            Drug::Simvastatin => &["Pravastatin", "Rosuvastatin", "Atorvastatin"],
            Drug::Azathioprine => &["Mycophenolate", "Methotrexate"],
            Drug::Fluorouracil => &["Capecitabine (with caution)", "Raltitrexed"],
        }
    }

    /// Drug-specific mechanism sentence used by the template explanation.
    pub fn mechanism(&self, gene: Gene, phenotype: Phenotype) -> String {
        match self {
            Drug::Codeine => format!(
                "{gene} converts codeine to morphine (active form). {phenotype} metabolizers \
                 may experience altered pain relief."
            ),
            Drug::Warfarin => format!(
                "{gene} metabolizes warfarin. {phenotype} status affects dosing requirements \
                 and bleeding risk."
            ),
            Drug::Clopidogrel => format!(
                "{gene} activates clopidogrel to its active form. {phenotype} metabolizers may \
                 have reduced antiplatelet effect."
            ),
            Drug::Simvastatin => format!(
                "{gene} transporter affects simvastatin uptake. {phenotype} status influences \
                 myopathy risk."
            ),
            Drug::Azathioprine => format!(
                "{gene} metabolizes azathioprine. {phenotype} metabolizers have altered \
                 toxicity risk."
            ),
            Drug::Fluorouracil => format!(
                "{gene} metabolizes fluorouracil. {phenotype} status significantly affects \
                 toxicity risk."
            ),
        }
    }
}

/// Metabolizer phenotype call.
#[derive(
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    strum::Display,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub enum Phenotype {
    /// Poor metabolizer
    #[serde(rename = "PM")]
    #[strum(serialize = "PM")]
    Pm,
    /// Intermediate metabolizer
    #[serde(rename = "IM")]
    #[strum(serialize = "IM")]
    Im,
    /// Normal metabolizer
    #[serde(rename = "NM")]
    #[strum(serialize = "NM")]
    Nm,
    /// Rapid metabolizer
    #[serde(rename = "RM")]
    #[strum(serialize = "RM")]
    Rm,
    /// Ultrarapid metabolizer
    #[serde(rename = "UM")]
    #[strum(serialize = "UM")]
    Um,
    /// Not enough information
    #[default]
    Unknown,
}

/// Risk classification of a drug for a patient.
#[derive(
    Serialize, Deserialize, EnumIter, strum::Display, PartialEq, Eq, Hash, Debug, Clone, Copy,
)]
pub enum RiskLabel {
    Safe,
    #[serde(rename = "Adjust Dosage")]
    #[strum(serialize = "Adjust Dosage")]
    AdjustDosage,
    Toxic,
    Ineffective,
    Unknown,
}

impl RiskLabel {
    pub fn severity(&self) -> Severity {
        match self {
            RiskLabel::Safe => Severity::None,
            RiskLabel::AdjustDosage => Severity::Moderate,
            RiskLabel::Toxic => Severity::High,
            RiskLabel::Ineffective => Severity::Moderate,
            RiskLabel::Unknown => Severity::Low,
        }
    }
}

/// Severity tier of a risk label.
#[derive(Serialize, Deserialize, strum::Display, PartialEq, Eq, Hash, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    None,
    Moderate,
    High,
    Low,
    Unknown,
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::{Drug, Gene, Phenotype, RiskLabel, Severity};

    #[rstest]
    #[case("CYP2D6", Gene::Cyp2d6)]
    #[case("CYP2C19", Gene::Cyp2c19)]
    #[case("CYP2C9", Gene::Cyp2c9)]
    #[case("SLCO1B1", Gene::Slco1b1)]
    #[case("TPMT", Gene::Tpmt)]
    #[case("DPYD", Gene::Dpyd)]
    fn gene_names(#[case] name: &str, #[case] gene: Gene) {
        assert_eq!(Gene::from_str(name).ok(), Some(gene));
        assert_eq!(gene.to_string(), name);
        assert_eq!(serde_json::to_string(&gene).unwrap(), format!("\"{name}\""));
    }

    #[test]
    fn gene_names_are_case_sensitive() {
        assert!(Gene::from_str("cyp2d6").is_err());
        assert!(Gene::from_str("VKORC1").is_err());
    }

    #[rstest]
    #[case(Drug::Codeine, Gene::Cyp2d6)]
    #[case(Drug::Warfarin, Gene::Cyp2c9)]
    #[case(Drug::Clopidogrel, Gene::Cyp2c19)]
    #[case(Drug::Simvastatin, Gene::Slco1b1)]
    #[case(Drug::Azathioprine, Gene::Tpmt)]
    #[case(Drug::Fluorouracil, Gene::Dpyd)]
    fn primary_gene(#[case] drug: Drug, #[case] gene: Gene) {
        assert_eq!(drug.primary_gene(), gene);
    }

    #[rstest]
    #[case(Drug::Codeine, Phenotype::Pm, RiskLabel::Ineffective)]
    #[case(Drug::Codeine, Phenotype::Im, RiskLabel::AdjustDosage)]
    #[case(Drug::Codeine, Phenotype::Nm, RiskLabel::Safe)]
    #[case(Drug::Codeine, Phenotype::Rm, RiskLabel::Toxic)]
    #[case(Drug::Codeine, Phenotype::Um, RiskLabel::Toxic)]
    #[case(Drug::Clopidogrel, Phenotype::Pm, RiskLabel::Ineffective)]
    #[case(Drug::Clopidogrel, Phenotype::Im, RiskLabel::AdjustDosage)]
    #[case(Drug::Clopidogrel, Phenotype::Um, RiskLabel::Safe)]
    #[case(Drug::Warfarin, Phenotype::Pm, RiskLabel::AdjustDosage)]
    #[case(Drug::Warfarin, Phenotype::Im, RiskLabel::AdjustDosage)]
    #[case(Drug::Warfarin, Phenotype::Rm, RiskLabel::Safe)]
    #[case(Drug::Simvastatin, Phenotype::Pm, RiskLabel::Toxic)]
    #[case(Drug::Simvastatin, Phenotype::Im, RiskLabel::AdjustDosage)]
    #[case(Drug::Azathioprine, Phenotype::Pm, RiskLabel::Toxic)]
    #[case(Drug::Azathioprine, Phenotype::Rm, RiskLabel::Safe)]
    #[case(Drug::Fluorouracil, Phenotype::Pm, RiskLabel::Toxic)]
    #[case(Drug::Fluorouracil, Phenotype::Im, RiskLabel::AdjustDosage)]
    fn risk_matrix(#[case] drug: Drug, #[case] phenotype: Phenotype, #[case] label: RiskLabel) {
        assert_eq!(drug.risk_label(phenotype), label);
    }

    #[test]
    fn unknown_phenotype_is_unknown_risk_for_every_drug() {
        for drug in Drug::iter() {
            assert_eq!(drug.risk_label(Phenotype::Unknown), RiskLabel::Unknown);
            assert_eq!(drug.risk_label(Phenotype::Nm), RiskLabel::Safe);
        }
    }

    #[rstest]
    #[case(RiskLabel::Safe, Severity::None)]
    #[case(RiskLabel::AdjustDosage, Severity::Moderate)]
    #[case(RiskLabel::Toxic, Severity::High)]
    #[case(RiskLabel::Ineffective, Severity::Moderate)]
    #[case(RiskLabel::Unknown, Severity::Low)]
    fn severity_of_label(#[case] label: RiskLabel, #[case] severity: Severity) {
        assert_eq!(label.severity(), severity);
    }

    #[test]
    fn string_forms() {
        assert_eq!(RiskLabel::AdjustDosage.to_string(), "Adjust Dosage");
        assert_eq!(
            serde_json::to_string(&RiskLabel::AdjustDosage).unwrap(),
            "\"Adjust Dosage\""
        );
        assert_eq!(serde_json::to_string(&Severity::None).unwrap(), "\"none\"");
        assert_eq!(Phenotype::Pm.to_string(), "PM");
        assert_eq!(Phenotype::Unknown.to_string(), "Unknown");
        assert_eq!(Drug::from_str("FLUOROURACIL").ok(), Some(Drug::Fluorouracil));
    }

    #[test]
    fn activity_tables() {
        assert!(Gene::Cyp2d6.activity_scores().contains(&("*1xN", 2.0)));
        assert!(Gene::Cyp2c19.activity_scores().contains(&("*17", 1.5)));
        assert!(Gene::Dpyd.activity_scores().contains(&("c.1679T>G", 0.5)));
        for gene in Gene::iter() {
            assert!(gene.activity_scores().contains(&("*1", 1.0)));
        }
    }

    #[test]
    fn recommendations_and_alternatives() {
        assert_eq!(
            Drug::Warfarin.recommendation(Phenotype::Pm),
            "Reduce initial dose by 25-50%. Monitor INR closely."
        );
        assert_eq!(
            Drug::Simvastatin.recommendation(Phenotype::Unknown),
            "Use with caution. Monitor for myopathy."
        );
        assert_eq!(Drug::Clopidogrel.alternatives(), &["Prasugrel", "Ticagrelor"]);
    }
}
