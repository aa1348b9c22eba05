//! `helm rollout`: one operation across simulated participants

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use helm_coordinator::{DomainController, IdentityTranslator, NeverCancel, TracingMessageHandler};
use helm_core::{HelmConfig, ModelNode, ModelVersion, Operation, PathAddress};
use helm_testkit::{ParticipantScript, SimulatedParticipant};
use helm_transform::TransformerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Arguments of `helm rollout`
#[derive(Args, Debug)]
pub struct RolloutArgs {
    /// Operation name
    #[arg(short, long)]
    operation: String,

    /// Target address, e.g. /subsystem=web
    #[arg(short, long, default_value = "/")]
    address: String,

    /// Operation parameter as name=value; values are read as JSON when they parse
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Participant as name=version
    #[arg(long = "participant", value_name = "NAME=VERSION", required = true)]
    participants: Vec<String>,

    /// Participant that refuses to prepare
    #[arg(long = "fail", value_name = "NAME")]
    failing: Vec<String>,

    /// Simulated prepare latency of every participant
    #[arg(long, default_value = "0")]
    prepare_delay_ms: u64,
}

/// Run the rollout and print the composed outcome as JSON
pub async fn run(args: RolloutArgs, config: HelmConfig) -> Result<()> {
    let operation = build_operation(&args)?;
    let mut controller = DomainController::new(config, Arc::new(TransformerRegistry::new()));

    for spec in &args.participants {
        let (name, version) = parse_participant(spec)?;
        let script = if args.failing.iter().any(|failing| failing == name) {
            ParticipantScript::fail(format!("{name} refused the operation"))
        } else {
            ParticipantScript::prepare()
        };
        let participant = SimulatedParticipant::new(
            name,
            script.with_prepare_delay(Duration::from_millis(args.prepare_delay_ms)),
        );
        controller.add_participant(
            name,
            version,
            Arc::new(participant),
            Arc::new(IdentityTranslator),
        )?;
    }

    info!(
        operation = %operation,
        participants = args.participants.len(),
        "Rolling out"
    );
    let result = controller
        .execute(
            Arc::new(operation),
            Arc::new(TracingMessageHandler),
            Arc::new(NeverCancel),
            |_| Ok(()),
        )
        .await?;

    println!("{}", result.to_json_pretty());
    Ok(())
}

fn build_operation(args: &RolloutArgs) -> Result<Operation> {
    let address: PathAddress = args.address.parse()?;
    let mut operation = Operation::new(&args.operation, address)?;
    for param in &args.params {
        let (name, value) = split_pair(param)?;
        operation = operation.with_param(name, parse_value(value));
    }
    Ok(operation)
}

fn split_pair(text: &str) -> Result<(&str, &str)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{text}'"))?;
    if name.trim().is_empty() {
        bail!("missing name in '{text}'");
    }
    Ok((name.trim(), value))
}

fn parse_participant(text: &str) -> Result<(&str, ModelVersion)> {
    let (name, version) = split_pair(text)?;
    let version = version
        .parse()
        .with_context(|| format!("participant '{name}'"))?;
    Ok((name, version))
}

fn parse_value(text: &str) -> ModelNode {
    ModelNode::parse_json(text).unwrap_or_else(|_| ModelNode::from(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_specs() {
        let (name, version) = parse_participant("s1=1.3.0").unwrap();
        assert_eq!(name, "s1");
        assert_eq!(version, ModelVersion::new(1, 3, 0));

        assert!(parse_participant("s1").is_err());
        assert!(parse_participant("=1.0.0").is_err());
        assert!(parse_participant("s1=one").is_err());
    }

    #[test]
    fn test_param_values_prefer_json() {
        assert_eq!(parse_value("8080"), ModelNode::Int(8080));
        assert_eq!(parse_value("true"), ModelNode::from(true));
        assert_eq!(parse_value("web"), ModelNode::from("web"));
    }
}
