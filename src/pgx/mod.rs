//! Pharmacogenomic risk assessment.
//!
//! The pipeline reads annotated variants (`vcf`), groups them by gene and
//! calls a metabolizer phenotype per gene (`phenotype`), maps drug and
//! phenotype to a risk classification (`risk`), and assembles one result per
//! requested drug (`assess`) including a narrative explanation (`explain`).

pub mod analyze;
pub mod assess;
pub mod conf;
pub mod drugs;
pub mod explain;
pub mod output;
pub mod phenotype;
pub mod risk;
pub mod vcf;
