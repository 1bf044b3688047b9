//! `warden validate`: check a policy file without evaluating anything.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use warden_core::{validate_policy, Policy};

#[derive(Args)]
pub struct ValidateArgs {
    /// Policy file (YAML).
    policy: PathBuf,

    /// Print the validation report as JSON.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let policy = Policy::from_yaml_file(&args.policy)
        .with_context(|| format!("loading policy from {}", args.policy.display()))?;

    let validation = validate_policy(&policy);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&validation)?);
    } else {
        for error in &validation.errors {
            println!("error: {}", error);
        }
        for warning in &validation.warnings {
            println!("warning: {}", warning);
        }
        if validation.valid {
            println!(
                "{}: valid ({} rule(s))",
                policy.name,
                policy.rules.len()
            );
        }
    }

    if !validation.valid {
        std::process::exit(1);
    }
    Ok(())
}
