//! Mapping of drug and phenotype to a risk classification.

use std::str::FromStr;

use serde::Serialize;

use crate::pgx::conf::{Drug, Phenotype, RiskLabel, Severity};

/// Recommendation for drugs without a guideline.
pub const NO_GUIDELINE: &str = "No guideline available for this drug.";

/// Risk classification with recommendation for one drug.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub risk_label: RiskLabel,
    pub severity: Severity,
    pub recommendation: String,
    pub alternatives: Vec<String>,
}

impl RiskAssessment {
    /// Assessment for a drug that has no guideline.
    pub fn no_guideline() -> Self {
        Self {
            risk_label: RiskLabel::Unknown,
            severity: Severity::Unknown,
            recommendation: NO_GUIDELINE.to_string(),
            alternatives: Vec::new(),
        }
    }

    /// Assessment of a supported drug.
    pub fn for_drug(drug: Drug, phenotype: Phenotype) -> Self {
        let risk_label = drug.risk_label(phenotype);
        Self {
            risk_label,
            severity: risk_label.severity(),
            recommendation: drug.recommendation(phenotype).to_string(),
            alternatives: drug
                .alternatives()
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Assess the risk of `drug` (upper-case name) for a patient with `phenotype`.
pub fn assess_risk(drug: &str, phenotype: Phenotype) -> RiskAssessment {
    match Drug::from_str(drug) {
        Ok(drug) => RiskAssessment::for_drug(drug, phenotype),
        Err(_) => RiskAssessment::no_guideline(),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::{assess_risk, RiskAssessment};
    use crate::pgx::conf::{Phenotype, RiskLabel, Severity};

    #[test]
    fn codeine_poor_metabolizer() {
        assert_eq!(
            assess_risk("CODEINE", Phenotype::Pm),
            RiskAssessment {
                risk_label: RiskLabel::Ineffective,
                severity: Severity::Moderate,
                recommendation: String::from(
                    "Avoid codeine. Use alternative analgesic (e.g., morphine, non-opioid)."
                ),
                alternatives: vec![
                    String::from("Morphine"),
                    String::from("Hydromorphone"),
                    String::from("Oxycodone"),
                    String::from("Tramadol"),
                ],
            }
        );
    }

    #[rstest]
    #[case("WARFARIN", Phenotype::Unknown, RiskLabel::Unknown, Severity::Low)]
    #[case("SIMVASTATIN", Phenotype::Pm, RiskLabel::Toxic, Severity::High)]
    #[case("CLOPIDOGREL", Phenotype::Rm, RiskLabel::Safe, Severity::None)]
    #[case("AZATHIOPRINE", Phenotype::Im, RiskLabel::AdjustDosage, Severity::Moderate)]
    fn labels_and_severity(
        #[case] drug: &str,
        #[case] phenotype: Phenotype,
        #[case] label: RiskLabel,
        #[case] severity: Severity,
    ) {
        let assessment = assess_risk(drug, phenotype);
        assert_eq!(assessment.risk_label, label);
        assert_eq!(assessment.severity, severity);
    }

    #[test]
    fn unknown_phenotype_recommendation() {
        assert_eq!(
            assess_risk("WARFARIN", Phenotype::Unknown).recommendation,
            "Use standard dosing. Monitor INR closely."
        );
    }

    #[rstest]
    #[case("ASPIRIN")]
    #[case("codeine")]
    #[case("")]
    fn unknown_drug_for_every_phenotype(#[case] drug: &str) {
        for phenotype in Phenotype::iter() {
            let assessment = assess_risk(drug, phenotype);
            assert_eq!(assessment, RiskAssessment::no_guideline());
            assert_eq!(assessment.severity, Severity::Unknown);
            assert!(assessment.alternatives.is_empty());
        }
    }
}
