//! Implementation of the `pgx analyze` sub command.

use std::{io::Write, path::Path, time::Instant};

use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use thousands::Separable;

use crate::{
    common::trace_rss_now,
    pgx::{
        assess::Batch,
        conf::Gene,
        explain::{Explainer, ExplainerConf, RemoteExplainer},
        output::BatchOutput,
        vcf,
    },
};

/// Command line arguments for `pgx analyze` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Assess drug risks from a genotype VCF", long_about = None)]
pub struct Args {
    /// Path to the annotated input VCF file.
    #[arg(long, required = true)]
    pub path_vcf: String,
    /// Comma-separated list of drug names, e.g., "codeine,warfarin".
    #[arg(long, required = true)]
    pub drugs: String,
    /// Path to the output JSON file, standard output if omitted.
    #[arg(long)]
    pub path_output: Option<String>,
    /// Path to TOML file with explanation service settings.
    #[arg(long)]
    pub path_conf: Option<String>,
    /// API key for the explanation service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Also assess files without any pharmacogenomic variants.
    #[arg(long, default_value_t = false)]
    pub allow_empty: bool,
}

/// Split, trim, and upper-case the comma-separated drug list.
pub fn parse_drug_list(drugs: &str) -> Result<Vec<String>, anyhow::Error> {
    let result = drugs
        .split(',')
        .map(|drug| drug.trim().to_uppercase())
        .filter(|drug| !drug.is_empty())
        .collect::<Vec<_>>();
    if result.is_empty() {
        anyhow::bail!("No drugs specified");
    }
    Ok(result)
}

/// Load the explanation service settings.
pub fn load_conf(path_conf: Option<&str>) -> Result<ExplainerConf, anyhow::Error> {
    if let Some(path_conf) = path_conf {
        let toml_str = std::fs::read_to_string(path_conf)
            .with_context(|| format!("could not read configuration file {}", path_conf))?;
        toml::from_str(&toml_str)
            .with_context(|| format!("invalid configuration file {}", path_conf))
    } else {
        Ok(ExplainerConf::default())
    }
}

/// Main entry point for `pgx analyze` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!(
        "args = {:?}",
        &Args {
            api_key: args.api_key.as_ref().map(|_| String::from("<redacted>")),
            path_vcf: args.path_vcf.clone(),
            drugs: args.drugs.clone(),
            path_output: args.path_output.clone(),
            path_conf: args.path_conf.clone(),
            allow_empty: args.allow_empty,
        }
    );

    let drugs = parse_drug_list(&args.drugs)?;
    let conf = load_conf(args.path_conf.as_deref())?;
    tracing::debug!("explainer conf = {:?}", &conf);

    if Path::new(&args.path_vcf).extension().and_then(|ext| ext.to_str()) != Some("vcf") {
        anyhow::bail!("Invalid file format. Expected .vcf file: {}", &args.path_vcf);
    }

    tracing::info!("Parsing VCF file...");
    let before_parsing = Instant::now();
    let parsed = vcf::parse_path(&args.path_vcf).context("VCF parsing failed")?;
    tracing::info!(
        "... done parsing {} pharmacogenomic variants in {:?}",
        parsed.total_variants.separate_with_commas(),
        before_parsing.elapsed()
    );
    if parsed.missing_annotations {
        tracing::warn!("some variants lack a STAR annotation");
    }
    if parsed.variants.is_empty() && !args.allow_empty {
        anyhow::bail!(
            "No pharmacogenomic variants found in VCF; VCF must contain variants in genes: {}",
            <Gene as strum::IntoEnumIterator>::iter().join(", ")
        );
    }

    trace_rss_now();

    let remote = RemoteExplainer::new(conf, args.api_key.clone());
    let explainer: Option<&dyn Explainer> = if remote.has_credential() {
        Some(&remote)
    } else {
        tracing::info!("no explanation service credential, using template explanations");
        None
    };

    tracing::info!("Assessing {} drug(s)...", drugs.len());
    let before_assessing = Instant::now();
    let batch = Batch::new(&parsed, explainer);
    let results = batch.assess_all(&drugs);
    tracing::info!(
        "... done assessing drugs for {} in {:?}",
        batch.patient_id(),
        before_assessing.elapsed()
    );

    let output = BatchOutput::from(results);
    if let Some(path_output) = &args.path_output {
        let file = std::fs::File::create(path_output)
            .with_context(|| format!("could not create output file {}", path_output))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &output)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    } else {
        let stdout = std::io::stdout();
        let mut writer = stdout.lock();
        serde_json::to_writer_pretty(&mut writer, &output)?;
        writer.write_all(b"\n")?;
    }

    tracing::info!(
        "All of `pgx analyze` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{load_conf, parse_drug_list, run, Args};
    use crate::pgx::explain::ExplainerConf;

    fn args(path_vcf: &str, drugs: &str, path_output: Option<String>) -> Args {
        Args {
            path_vcf: path_vcf.into(),
            drugs: drugs.into(),
            path_output,
            path_conf: None,
            api_key: None,
            allow_empty: false,
        }
    }

    #[rstest]
    #[case("codeine", &["CODEINE"])]
    #[case(" Codeine , warfarin,,", &["CODEINE", "WARFARIN"])]
    #[case("aspirin,CLOPIDOGREL", &["ASPIRIN", "CLOPIDOGREL"])]
    fn drug_list(#[case] input: &str, #[case] expected: &[&str]) -> Result<(), anyhow::Error> {
        assert_eq!(parse_drug_list(input)?, expected);
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case(" , ,")]
    fn empty_drug_list(#[case] input: &str) {
        assert!(parse_drug_list(input).is_err());
    }

    #[test]
    fn default_conf() -> Result<(), anyhow::Error> {
        assert_eq!(load_conf(None)?, ExplainerConf::default());
        Ok(())
    }

    #[test]
    fn conf_from_file() -> Result<(), anyhow::Error> {
        let conf = load_conf(Some("tests/pgx/explainer.toml"))?;
        assert_eq!(conf.model, "gpt-4o-mini");
        assert_eq!(conf.timeout_secs, 10);
        Ok(())
    }

    #[test]
    fn single_drug_writes_object() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir.join("out.json");
        let args = args(
            "tests/pgx/example.vcf",
            "codeine",
            Some(path_output.to_str().expect("invalid path").into()),
        );

        run(&Default::default(), &args)?;

        let value: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&path_output)?)?;
        assert_eq!(value["drug"], "CODEINE");
        assert_eq!(value["pharmacogenomic_profile"]["diplotype"], "*4/*10");
        assert_eq!(value["pharmacogenomic_profile"]["phenotype"], "IM");
        assert_eq!(value["risk_assessment"]["risk_label"], "Adjust Dosage");
        assert!(value["llm_generated_explanation"]["summary"]
            .as_str()
            .unwrap_or_default()
            .contains("IM phenotype for CYP2D6"));
        Ok(())
    }

    #[test]
    fn multiple_drugs_write_array() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir.join("out.json");
        let args = args(
            "tests/pgx/example.vcf",
            "ASPIRIN,CLOPIDOGREL,FLUOROURACIL",
            Some(path_output.to_str().expect("invalid path").into()),
        );

        run(&Default::default(), &args)?;

        let value: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&path_output)?)?;
        let results = value.as_array().expect("expected array");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["drug"], "ASPIRIN");
        assert!(results[0]["error"].is_string());
        assert_eq!(results[1]["drug"], "CLOPIDOGREL");
        assert_eq!(results[2]["drug"], "FLUOROURACIL");
        assert_eq!(results[2]["pharmacogenomic_profile"]["phenotype"], "IM");
        assert_eq!(results[0]["patient_id"], results[2]["patient_id"]);
        Ok(())
    }

    #[test]
    fn no_target_variants_is_an_error() {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir.join("out.json");
        let mut args = args(
            "tests/pgx/no_target_genes.vcf",
            "WARFARIN",
            Some(path_output.to_str().expect("invalid path").into()),
        );

        assert!(run(&Default::default(), &args).is_err());

        args.allow_empty = true;
        assert!(run(&Default::default(), &args).is_ok());
        let value: serde_json::Value = serde_json::from_reader(
            std::fs::File::open(&path_output).expect("output not written"),
        )
        .expect("invalid JSON");
        assert_eq!(value["pharmacogenomic_profile"]["phenotype"], "Unknown");
        assert_eq!(value["risk_assessment"]["confidence_score"], 0.5);
    }

    #[rstest]
    #[case("tests/pgx/example.txt")]
    #[case("tests/pgx/missing.vcf")]
    fn invalid_input_path(#[case] path: &str) {
        assert!(run(&Default::default(), &args(path, "CODEINE", None)).is_err());
    }

    #[rstest]
    #[case("tests/pgx/missing.vcf", 2)]
    #[case("tests/pgx/example.txt", 1)]
    fn failure_exit_code(#[case] path: &str, #[case] code: u8) {
        let err = run(&Default::default(), &args(path, "CODEINE", None))
            .expect_err("run should fail");
        assert_eq!(
            format!("{:?}", crate::err::exit_code(&err)),
            format!("{:?}", std::process::ExitCode::from(code))
        );
    }
}
