//! Implementation of the `pgx drugs` sub command.

use clap::Parser;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    common::worker_version,
    pgx::conf::{Drug, Gene, GUIDELINE_SOURCE},
};

/// Command line arguments for `pgx drugs` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "List supported drugs and genes", long_about = None)]
pub struct Args {}

/// A supported drug with its primary gene.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DrugInfo {
    pub drug: Drug,
    pub primary_gene: Gene,
    pub alternative_drugs: Vec<String>,
}

/// Listing of what the worker can assess.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub version: String,
    pub guideline_source: String,
    pub supported_drugs: Vec<DrugInfo>,
    pub supported_genes: Vec<Gene>,
    pub count: usize,
}

impl Listing {
    pub fn build() -> Self {
        let supported_drugs = Drug::iter()
            .map(|drug| DrugInfo {
                drug,
                primary_gene: drug.primary_gene(),
                alternative_drugs: drug.alternatives().iter().map(|s| s.to_string()).collect(),
            })
            .collect::<Vec<_>>();
        Self {
            version: worker_version().to_string(),
            guideline_source: GUIDELINE_SOURCE.to_string(),
            count: supported_drugs.len(),
            supported_drugs,
            supported_genes: Gene::iter().collect(),
        }
    }
}

/// Main entry point for `pgx drugs` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    println!("{}", serde_json::to_string_pretty(&Listing::build())?);
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Listing;

    #[test]
    fn listing() -> Result<(), anyhow::Error> {
        let value = serde_json::to_value(Listing::build())?;

        assert_eq!(value["version"], "x.y.z");
        assert_eq!(value["count"], 6);
        assert_eq!(
            value["supported_genes"],
            serde_json::json!(["CYP2D6", "CYP2C19", "CYP2C9", "SLCO1B1", "TPMT", "DPYD"])
        );
        assert_eq!(value["supported_drugs"][0]["drug"], "CODEINE");
        assert_eq!(value["supported_drugs"][0]["primary_gene"], "CYP2D6");
        assert_eq!(value["supported_drugs"][5]["drug"], "FLUOROURACIL");
        Ok(())
    }

    #[test]
    fn run_prints() -> Result<(), anyhow::Error> {
        super::run(&Default::default(), &super::Args {})
    }
}
