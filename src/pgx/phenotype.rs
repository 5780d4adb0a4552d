//! Activity-score based metabolizer phenotype inference.

use std::str::FromStr;

use crate::pgx::conf::{Gene, Phenotype};

/// Activity score assumed for alleles missing from a gene's table.
pub const DEFAULT_ACTIVITY_SCORE: f64 = 1.0;

/// Activity score of `allele` in `gene`, falling back to normal function.
pub fn activity_score(gene: Option<Gene>, allele: &str) -> f64 {
    gene.and_then(|gene| {
        gene.activity_scores()
            .iter()
            .find(|(name, _)| *name == allele)
            .map(|(_, score)| *score)
    })
    .unwrap_or(DEFAULT_ACTIVITY_SCORE)
}

/// Map a mean activity score to a phenotype.
pub fn phenotype_for_score(mean: f64) -> Phenotype {
    if mean == 0.0 {
        Phenotype::Pm
    } else if mean < 1.0 {
        Phenotype::Im
    } else if mean == 1.0 {
        Phenotype::Nm
    } else if mean < 2.0 {
        Phenotype::Rm
    } else {
        Phenotype::Um
    }
}

/// Infer the metabolizer phenotype from the star alleles observed for `gene`.
///
/// The gene name is not validated; for unknown genes all alleles count as
/// normal function.  Returns `Phenotype::Unknown` for an empty allele list.
pub fn infer_phenotype<S: AsRef<str>>(gene: &str, alleles: &[S]) -> Phenotype {
    if alleles.is_empty() {
        return Phenotype::Unknown;
    }

    let gene = Gene::from_str(gene).ok();
    let total: f64 = alleles
        .iter()
        .map(|allele| activity_score(gene, allele.as_ref()))
        .sum();
    let mean = total / alleles.len() as f64;
    tracing::trace!(
        "mean activity score for {:?} {:?} is {}",
        gene,
        alleles.iter().map(AsRef::as_ref).collect::<Vec<_>>(),
        mean
    );

    phenotype_for_score(mean)
}
