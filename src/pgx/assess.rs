//! Assembly of per-drug assessments from parsed variants.

use std::str::FromStr;

use chrono::Utc;
use indexmap::IndexMap;

use crate::{
    err::AssessError,
    pgx::{
        conf::{Drug, Gene, Phenotype},
        explain::{explain, ExplainedVariant, Explainer, ExplanationRequest},
        output::{
            round2, ClinicalRecommendation, ConfidenceLevel, DetectedVariant,
            DrugAssessmentResult, PharmacogenomicProfile, QualityMetrics, RiskSummary,
        },
        phenotype::infer_phenotype,
        risk::RiskAssessment,
        vcf::{ParseResult, VariantRecord},
    },
};

/// Diplotype shown when no star allele is known.
pub const UNKNOWN_DIPLOTYPE: &str = "Unknown";
/// Allele assumed on the chromosome without a detected star allele.
pub const WILD_TYPE_ALLELE: &str = "*1";
/// Confidence when the primary gene has no variants.
pub const NO_VARIANT_CONFIDENCE: f64 = 0.5;
/// Lower bound of confidence when variants were found.
pub const MIN_VARIANT_CONFIDENCE: f64 = 0.7;
/// Upper bound of confidence.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Variants of each gene, in file order.
pub type GeneVariantGroup<'a> = IndexMap<Gene, Vec<&'a VariantRecord>>;

/// Group `variants` by gene.
pub fn group_by_gene(variants: &[VariantRecord]) -> GeneVariantGroup<'_> {
    let mut result = GeneVariantGroup::new();
    for variant in variants {
        result.entry(variant.gene).or_default().push(variant);
    }
    result
}

/// Build the diplotype string from the first two alleles.
///
/// A single allele is paired with the wild type.
pub fn diplotype<S: AsRef<str>>(alleles: &[S]) -> String {
    match alleles {
        [] => UNKNOWN_DIPLOTYPE.to_string(),
        [single] => format!("{}/{}", single.as_ref(), WILD_TYPE_ALLELE),
        [first, second, ..] => format!("{}/{}", first.as_ref(), second.as_ref()),
    }
}

/// Mean `quality` of `variants`, 0 if empty.
pub fn mean_quality(variants: &[&VariantRecord]) -> f64 {
    if variants.is_empty() {
        0.0
    } else {
        variants.iter().map(|v| v.quality).sum::<f64>() / variants.len() as f64
    }
}

/// Confidence of a call given the variants of its gene.
pub fn confidence(variants: &[&VariantRecord]) -> f64 {
    if variants.is_empty() {
        NO_VARIANT_CONFIDENCE
    } else {
        MAX_CONFIDENCE.min(MIN_VARIANT_CONFIDENCE + (mean_quality(variants) / 100.0) * 0.25)
    }
}

/// Genotype-derived call for one gene.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneCall {
    pub gene: Gene,
    pub diplotype: String,
    pub phenotype: Phenotype,
    pub confidence: f64,
    pub detected_variants: Vec<DetectedVariant>,
}

impl GeneCall {
    /// Call `gene` from its variant records.
    ///
    /// The diplotype uses the first two star alleles, the phenotype all of them.
    pub fn from_variants(gene: Gene, variants: &[&VariantRecord]) -> Self {
        let star_alleles = variants
            .iter()
            .map(|v| v.star_allele.as_str())
            .filter(|allele| !allele.is_empty())
            .collect::<Vec<_>>();

        Self {
            gene,
            diplotype: diplotype(&star_alleles),
            phenotype: infer_phenotype(&gene.to_string(), &star_alleles),
            confidence: confidence(variants),
            detected_variants: variants
                .iter()
                .map(|v| {
                    DetectedVariant::new(v.reference_id.clone(), v.gene, v.star_allele.clone())
                })
                .collect(),
        }
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }
}

/// Generate a fresh patient identifier.
pub fn generate_patient_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("PATIENT_{}", hex[..8].to_ascii_uppercase())
}

/// State shared by all drugs of one request.
pub struct Batch<'a> {
    patient_id: String,
    groups: GeneVariantGroup<'a>,
    missing_annotations: bool,
    explainer: Option<&'a dyn Explainer>,
}

impl<'a> Batch<'a> {
    /// Prepare assessment of `parsed` with a new patient identifier.
    pub fn new(parsed: &'a ParseResult, explainer: Option<&'a dyn Explainer>) -> Self {
        Self::with_patient_id(generate_patient_id(), parsed, explainer)
    }

    pub fn with_patient_id(
        patient_id: String,
        parsed: &'a ParseResult,
        explainer: Option<&'a dyn Explainer>,
    ) -> Self {
        Self {
            patient_id,
            groups: group_by_gene(&parsed.variants),
            missing_annotations: parsed.missing_annotations,
            explainer,
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Assess all `drugs` in order; unsupported drugs get an inline error result.
    pub fn assess_all<S: AsRef<str>>(&self, drugs: &[S]) -> Vec<DrugAssessmentResult> {
        drugs
            .iter()
            .map(|drug| {
                let drug = drug.as_ref();
                self.assess(drug).unwrap_or_else(|e| {
                    tracing::warn!("could not assess {:?}: {}", drug, e);
                    DrugAssessmentResult::failed(&self.patient_id, drug, e.to_string())
                })
            })
            .collect()
    }

    /// Assess a single drug given by its upper-case name.
    pub fn assess(&self, drug_name: &str) -> Result<DrugAssessmentResult, AssessError> {
        let drug = Drug::from_str(drug_name)
            .map_err(|_| AssessError::UnsupportedDrug(drug_name.to_string()))?;
        let gene = drug.primary_gene();
        let variants = self.groups.get(&gene).map(Vec::as_slice).unwrap_or_default();

        let call = GeneCall::from_variants(gene, variants);
        let risk = RiskAssessment::for_drug(drug, call.phenotype);
        tracing::debug!(
            "{}: {} {} ({}) -> {} (confidence {:.3})",
            drug,
            gene,
            &call.diplotype,
            call.phenotype,
            risk.risk_label,
            call.confidence
        );

        let explanation = explain(
            self.explainer,
            &ExplanationRequest {
                patient_id: self.patient_id.clone(),
                drug,
                risk_label: risk.risk_label,
                phenotype: call.phenotype,
                variants: variants.iter().map(|&v| ExplainedVariant::from(v)).collect(),
                gene,
            },
        );

        Ok(DrugAssessmentResult {
            patient_id: self.patient_id.clone(),
            drug: drug.to_string(),
            timestamp: Utc::now(),
            error: None,
            risk_assessment: RiskSummary::new(
                risk.risk_label,
                round2(call.confidence),
                risk.severity,
            ),
            quality_metrics: Some(QualityMetrics::new(
                true,
                self.missing_annotations,
                call.confidence_level(),
            )),
            clinical_recommendation: Some(ClinicalRecommendation::from(risk)),
            llm_generated_explanation: Some(explanation),
            pharmacogenomic_profile: Some(PharmacogenomicProfile::new(
                gene,
                call.diplotype,
                call.phenotype,
                call.detected_variants,
            )),
        })
    }
}
