//! `warden evaluate`: run content through a policy and print the verdict.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use warden_core::Policy;
use warden_runtime::providers::ProviderRegistry;
use warden_runtime::{JudgeClient, PolicyOrchestrator, RuntimeConfig};

#[derive(Args)]
pub struct EvaluateArgs {
    /// Policy file (YAML).
    #[arg(short, long)]
    policy: PathBuf,

    /// Content to evaluate. Reads stdin when neither this nor
    /// --content-file is given.
    content: Option<String>,

    /// Read the content from a file instead of the command line.
    #[arg(long, conflicts_with = "content")]
    content_file: Option<PathBuf>,

    /// Runtime configuration file (YAML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Judge provider type.
    #[arg(long, default_value = "mock")]
    provider: String,

    /// Provider configuration as inline JSON.
    #[arg(long, default_value = "{}")]
    provider_config: String,

    /// Evaluate rules one at a time instead of concurrently.
    #[arg(long)]
    sequential: bool,

    /// Print the full verdict as JSON.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: EvaluateArgs) -> anyhow::Result<()> {
    let policy = Policy::from_yaml_file(&args.policy)
        .with_context(|| format!("loading policy from {}", args.policy.display()))?;

    let content = read_content(&args)?;

    let mut runtime_config = match &args.config {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("loading runtime config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if args.sequential {
        runtime_config.parallel = false;
    }

    let provider_config: serde_json::Value = serde_json::from_str(&args.provider_config)
        .context("--provider-config must be valid JSON")?;
    let registry = ProviderRegistry::with_defaults();
    let provider = registry
        .create(&args.provider, &provider_config)
        .with_context(|| format!("creating provider '{}'", args.provider))?;

    let judge = Arc::new(JudgeClient::new(provider, runtime_config.judge));
    let orchestrator = PolicyOrchestrator::builder(judge)
        .policy(policy)
        .parallel(runtime_config.parallel)
        .build();

    let verdict = orchestrator.evaluate(&content).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        println!("{}  {}", verdict.final_verdict, verdict.policy_name);
        if let Some(summary) = &verdict.summary {
            println!(
                "  {} rule(s): {} passed, {} failed, {} uncertain",
                summary.total, summary.passed, summary.failed, summary.uncertain
            );
            println!("  {}", summary.reason);
        }
        if let Some(error) = &verdict.error {
            println!("  error: {}", error);
        }
        for result in &verdict.rule_results {
            println!(
                "  [{:>9}] {} (confidence {:.2}): {}",
                format!("{:?}", result.verdict()).to_uppercase(),
                result.rule_id,
                result.judge.confidence,
                result.judge.reasoning
            );
        }
    }

    if !verdict.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn read_content(args: &EvaluateArgs) -> anyhow::Result<String> {
    if let Some(content) = &args.content {
        return Ok(content.clone());
    }
    if let Some(path) = &args.content_file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading content from {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("reading content from stdin")?;
    if buffer.trim().is_empty() {
        bail!("no content given: pass it as an argument, --content-file, or stdin");
    }
    Ok(buffer)
}
