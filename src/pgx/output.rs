//! Data structures for writing the assessment results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pgx::{
    conf::{Gene, Phenotype, RiskLabel, Severity, GUIDELINE_SOURCE},
    explain::Explanation,
    risk::RiskAssessment,
};

/// Round to two decimals for display.
///
/// Rounds the exact binary value (`0.825` is stored below the half-way point
/// and becomes `0.82`) rather than the inexact product `value * 100`.
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Confidence tier of an assessment.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.8 {
            ConfidenceLevel::High
        } else if confidence > 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Risk part of a result.
#[derive(Serialize, Debug, Clone, PartialEq, derive_new::new)]
pub struct RiskSummary {
    pub risk_label: RiskLabel,
    /// Confidence rounded to two decimals.
    pub confidence_score: f64,
    pub severity: Severity,
}

/// Citation of a detected variant.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct DetectedVariant {
    pub rsid: String,
    pub gene: Gene,
    /// The star allele, empty if not annotated.
    pub allele: String,
}

/// Gene-level pharmacogenomic profile.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct PharmacogenomicProfile {
    pub primary_gene: Gene,
    pub diplotype: String,
    pub phenotype: Phenotype,
    pub detected_variants: Vec<DetectedVariant>,
}

/// Recommendation part of a result.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ClinicalRecommendation {
    pub guideline_source: String,
    pub recommendation: String,
    pub alternative_drugs: Vec<String>,
}

impl From<RiskAssessment> for ClinicalRecommendation {
    fn from(assessment: RiskAssessment) -> Self {
        Self {
            guideline_source: GUIDELINE_SOURCE.to_string(),
            recommendation: assessment.recommendation,
            alternative_drugs: assessment.alternatives,
        }
    }
}

/// Quality information on the result.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct QualityMetrics {
    pub vcf_parsing_success: bool,
    pub missing_annotations: bool,
    pub confidence_level: ConfidenceLevel,
}

/// The assessment of one requested drug.
///
/// Results for unsupported drugs only carry `error` and `risk_assessment`.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DrugAssessmentResult {
    pub patient_id: String,
    pub drug: String,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub risk_assessment: RiskSummary,
    pub pharmacogenomic_profile: Option<PharmacogenomicProfile>,
    pub clinical_recommendation: Option<ClinicalRecommendation>,
    pub llm_generated_explanation: Option<Explanation>,
    pub quality_metrics: Option<QualityMetrics>,
}

impl DrugAssessmentResult {
    /// Result for a drug that could not be assessed.
    pub fn failed(patient_id: &str, drug: &str, error: String) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            drug: drug.to_string(),
            timestamp: Utc::now(),
            error: Some(error),
            risk_assessment: RiskSummary::new(RiskLabel::Unknown, 0.0, Severity::Unknown),
            pharmacogenomic_profile: None,
            clinical_recommendation: None,
            llm_generated_explanation: None,
            quality_metrics: None,
        }
    }
}

/// One result for a single requested drug, a list otherwise.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum BatchOutput {
    Single(Box<DrugAssessmentResult>),
    Many(Vec<DrugAssessmentResult>),
}

impl From<Vec<DrugAssessmentResult>> for BatchOutput {
    fn from(mut results: Vec<DrugAssessmentResult>) -> Self {
        if results.len() == 1 {
            BatchOutput::Single(Box::new(results.remove(0)))
        } else {
            BatchOutput::Many(results)
        }
    }
}
