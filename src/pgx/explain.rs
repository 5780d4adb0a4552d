//! Narrative explanations of an assessment.
//!
//! A remote text-generation service (OpenAI-style chat completion endpoint) is
//! tried first.  Whenever it is not configured, there are no variants to
//! explain, or the call fails, the deterministic [`TemplateExplainer`] is used
//! instead.  Fields missing from an otherwise successful response are filled
//! in individually.

use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    err::ExplainError,
    pgx::{
        conf::{Drug, Gene, Phenotype, RiskLabel},
        vcf::VariantRecord,
    },
};

/// Credential value shipped in example environment files.
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

/// Settings for the remote explanation service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExplainerConf {
    /// URL of the chat completion endpoint.
    pub endpoint: String,
    /// Name of the model to request.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    /// Timeout for the whole request in seconds.
    pub timeout_secs: u64,
}

impl Default for ExplainerConf {
    fn default() -> Self {
        Self {
            endpoint: String::from("https://api.openai.com/v1/chat/completions"),
            model: String::from("gpt-3.5-turbo"),
            temperature: 0.2,
            max_tokens: 800,
            top_p: 0.9,
            timeout_secs: 30,
        }
    }
}

/// A variant as passed to the explanation service.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplainedVariant {
    pub rsid: String,
    pub gene: Gene,
    pub star_allele: String,
    pub chrom: String,
    pub pos: u64,
    pub quality: f64,
}

impl From<&VariantRecord> for ExplainedVariant {
    fn from(record: &VariantRecord) -> Self {
        Self {
            rsid: record.reference_id.clone(),
            gene: record.gene,
            star_allele: record.star_allele.clone(),
            chrom: record.chromosome.clone(),
            pos: record.position,
            quality: record.quality,
        }
    }
}

/// Input of the explanation service.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    pub patient_id: String,
    pub drug: Drug,
    pub risk_label: RiskLabel,
    pub phenotype: Phenotype,
    pub variants: Vec<ExplainedVariant>,
    pub gene: Gene,
}

impl ExplanationRequest {
    /// Comma-separated rsIDs of the variants, `None` if there are none.
    fn variant_list(&self) -> Option<String> {
        if self.variants.is_empty() {
            None
        } else {
            Some(self.variants.iter().map(|v| v.rsid.as_str()).join(", "))
        }
    }
}

/// The complete narrative explanation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Explanation {
    pub summary: String,
    pub mechanism: String,
    pub variant_impact: String,
}

/// A possibly incomplete explanation as returned by a service.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialExplanation {
    pub summary: Option<String>,
    pub mechanism: Option<String>,
    #[serde(alias = "variantImpact")]
    pub variant_impact: Option<String>,
}

/// The fields of an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExplanationField {
    Summary,
    Mechanism,
    VariantImpact,
}

/// Strategy for producing explanations.
pub trait Explainer {
    /// Produce an explanation for `request`.
    fn explain(&self, request: &ExplanationRequest) -> Result<PartialExplanation, ExplainError>;
}

/// Offline, deterministic explanation from text templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExplainer;

impl TemplateExplainer {
    /// Complete explanation used when the remote service is not used.
    pub fn explanation(&self, request: &ExplanationRequest) -> Explanation {
        let ExplanationRequest {
            drug,
            risk_label,
            phenotype,
            gene,
            ..
        } = request;
        Explanation {
            summary: format!(
                "Genetic analysis reveals {phenotype} phenotype for {gene}, classifying {drug} \
                 risk as {risk_label}. This assessment is based on {} detected variant(s) that \
                 affect drug metabolism and clinical response.",
                request.variants.len()
            ),
            mechanism: drug.mechanism(*gene, *phenotype),
            variant_impact: format!(
                "Variants identified: {}. These genetic variations in {gene} modify enzyme \
                 activity, leading to the {phenotype} metabolizer classification and \
                 corresponding {risk_label} risk profile for {drug} therapy.",
                request
                    .variant_list()
                    .unwrap_or_else(|| String::from("none detected"))
            ),
        }
    }

    /// Replacement for a single field missing from a service response.
    pub fn field(&self, field: ExplanationField, request: &ExplanationRequest) -> String {
        let ExplanationRequest {
            drug,
            risk_label,
            phenotype,
            gene,
            ..
        } = request;
        match field {
            ExplanationField::Summary => format!(
                "Patient has {phenotype} phenotype for {gene}, resulting in {risk_label} risk \
                 classification for {drug}. Genetic testing detected {} variant(s) affecting \
                 drug metabolism.",
                request.variants.len()
            ),
            ExplanationField::Mechanism => format!(
                "The {gene} gene encodes an enzyme critical for {drug} metabolism. The \
                 patient's {phenotype} phenotype indicates altered enzyme activity, which \
                 affects how the body processes this medication. This can lead to either \
                 reduced drug efficacy or increased risk of adverse effects."
            ),
            ExplanationField::VariantImpact => format!(
                "Detected variants ({}) in {gene} contribute to the {phenotype} metabolizer \
                 status. These genetic variations alter enzyme function, directly impacting \
                 {drug} pharmacokinetics and clinical response.",
                request.variant_list().unwrap_or_else(|| String::from("none"))
            ),
        }
    }
}

impl Explainer for TemplateExplainer {
    fn explain(&self, request: &ExplanationRequest) -> Result<PartialExplanation, ExplainError> {
        let Explanation {
            summary,
            mechanism,
            variant_impact,
        } = self.explanation(request);
        Ok(PartialExplanation {
            summary: Some(summary),
            mechanism: Some(mechanism),
            variant_impact: Some(variant_impact),
        })
    }
}

/// Explanation through a remote chat completion service.
pub struct RemoteExplainer {
    conf: ExplainerConf,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl std::fmt::Debug for RemoteExplainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExplainer")
            .field("conf", &self.conf)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Chat completion request body.
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Serialize, Deserialize, Debug)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str = "You are a clinical pharmacogenomics expert. Provide accurate, \
    evidence-based explanations. Always respond with valid JSON only, no markdown code blocks.";

impl RemoteExplainer {
    /// Construct; empty and placeholder credentials count as missing.
    pub fn new(conf: ExplainerConf, api_key: Option<String>) -> Self {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY);
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(conf.timeout_secs))
            .build();
        Self {
            conf,
            api_key,
            agent,
        }
    }

    /// Whether a credential is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the user prompt for `request`.
    fn prompt(request: &ExplanationRequest) -> String {
        let variants = request
            .variants
            .iter()
            .map(|v| {
                format!(
                    "- {} in {} (star allele: {}, position: chr{}:{}, quality: {})",
                    v.rsid, v.gene, v.star_allele, v.chrom, v.pos, v.quality
                )
            })
            .join("\n");
        format!(
            "Provide a clinical pharmacogenomic risk explanation.\n\n\
             Patient ID: {patient_id}\n\
             Drug: {drug}\n\
             Risk classification: {risk_label}\n\
             Primary gene: {gene}\n\
             Metabolizer phenotype: {phenotype}\n\n\
             Detected variants:\n{variants}\n\n\
             Respond with a JSON object with exactly these keys:\n\
             \"summary\": two to three sentences on the overall risk for this patient;\n\
             \"mechanism\": how the variants change {gene} enzyme function and thereby \
             {drug} metabolism and efficacy;\n\
             \"variant_impact\": the contribution of each variant, cited by rsID, to the \
             phenotype and risk.\n\
             Refer to CPIC guidelines where applicable and do not speculate.",
            patient_id = request.patient_id,
            drug = request.drug,
            risk_label = request.risk_label,
            gene = request.gene,
            phenotype = request.phenotype,
        )
    }
}

impl Explainer for RemoteExplainer {
    fn explain(&self, request: &ExplanationRequest) -> Result<PartialExplanation, ExplainError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ExplainError::MissingCredential)?;
        if request.variants.is_empty() {
            return Err(ExplainError::NoVariants);
        }

        let body = ChatRequest {
            model: &self.conf.model,
            messages: vec![
                ChatMessage {
                    role: String::from("system"),
                    content: String::from(SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: String::from("user"),
                    content: Self::prompt(request),
                },
            ],
            temperature: self.conf.temperature,
            max_tokens: self.conf.max_tokens,
            top_p: self.conf.top_p,
        };

        tracing::debug!(
            "requesting explanation for {} from {}",
            request.drug,
            &self.conf.endpoint
        );
        let response: ChatResponse = self
            .agent
            .post(&self.conf.endpoint)
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_json(&body)
            .map_err(|e| ExplainError::Transport(e.to_string()))?
            .into_json()
            .map_err(|e| ExplainError::Malformed(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ExplainError::Malformed(String::from("no choices in response")))?;
        parse_content(&content)
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(content: &str) -> &str {
    let content = content.trim();
    let inner = if let Some((_, rest)) = content.split_once("```json") {
        rest
    } else if let Some((_, rest)) = content.split_once("```") {
        rest
    } else {
        return content;
    };
    inner.split("```").next().unwrap_or(inner).trim()
}

/// Decode the JSON text content of a service response.
pub fn parse_content(content: &str) -> Result<PartialExplanation, ExplainError> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| ExplainError::Malformed(e.to_string()))
}

/// Produce the explanation for `request`, never failing.
///
/// `service` is skipped when there are no variants; its failures are logged
/// and replaced by the template explanation.
pub fn explain(service: Option<&dyn Explainer>, request: &ExplanationRequest) -> Explanation {
    let template = TemplateExplainer;

    let service = match service {
        Some(service) if !request.variants.is_empty() => service,
        _ => return template.explanation(request),
    };

    match service.explain(request) {
        Ok(partial) => {
            let backfill = |value: Option<String>, field: ExplanationField| match value {
                Some(value) if !value.trim().is_empty() => value,
                _ => {
                    tracing::debug!("backfilling {} of {} explanation", field, request.drug);
                    template.field(field, request)
                }
            };
            Explanation {
                summary: backfill(partial.summary, ExplanationField::Summary),
                mechanism: backfill(partial.mechanism, ExplanationField::Mechanism),
                variant_impact: backfill(partial.variant_impact, ExplanationField::VariantImpact),
            }
        }
        Err(ExplainError::MissingCredential) => template.explanation(request),
        Err(e) => {
            tracing::warn!(
                "explanation service failed for {}, using template: {}",
                request.drug,
                e
            );
            template.explanation(request)
        }
    }
}
