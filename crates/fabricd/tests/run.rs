//! Whole runs against the sample files and a mock controller.

use fabric_compiler::DeviceId;
use fabric_installer::{FlowBatch, MockProgrammer};
use fabric_test::{PipelineSimulator, HOSTS, SB1};
use fabricd::{
    compile_fabric, execute, install, load_inputs, Args, ExitStatus, FabricdConfig, FabricdError,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

fn sample(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../etc")
        .join(name)
}

fn args(topology: PathBuf, config: PathBuf, dry_run: bool) -> Args {
    Args {
        topology,
        config,
        dry_run,
        log_level: "info".to_string(),
    }
}

fn sample_args(dry_run: bool) -> Args {
    args(sample("topology.toml"), sample("fabricd.toml"), dry_run)
}

#[test]
fn test_sample_config_is_valid() {
    let config = FabricdConfig::load_or_default(sample("fabricd.toml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config, FabricdConfig::default());
}

#[tokio::test]
async fn test_dry_run_prints_wire_flows() {
    let mut out = Vec::new();
    let summary = execute(&sample_args(true), &mut out).await.unwrap();

    assert_eq!(summary.pairs, 30);
    assert_eq!(summary.compile_errors, 0);
    assert_eq!(summary.accepted, None);
    assert_eq!(summary.exit_status(), ExitStatus::Clean);

    let text = String::from_utf8(out).unwrap();
    let (json, last_line) = text.trim_end().rsplit_once('\n').unwrap();
    let batch: FlowBatch = serde_json::from_str(json).unwrap();
    assert_eq!(batch.flows.len(), summary.rules);
    assert!(last_line.ends_with("nothing installed"));

    // Four switches, one punt each
    let punts = batch
        .flows
        .iter()
        .filter(|f| f.priority == 42000)
        .count();
    assert_eq!(punts, 4);
}

#[tokio::test]
async fn test_install_through_mock_controller() {
    let mut out = Vec::new();
    let (config, topology) = load_inputs(&sample_args(false)).unwrap();
    let compilation = compile_fabric(&config, &topology, &mut out).unwrap();

    let programmer = Arc::new(MockProgrammer::new());
    let summary = install(&config, programmer.clone(), &compilation, &mut out)
        .await
        .unwrap();

    assert_eq!(summary.accepted, Some(compilation.rules.len()));
    assert_eq!(summary.exit_status(), ExitStatus::Clean);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), compilation.rules.len());
    assert!(text.lines().all(|l| l.starts_with("OK")));

    // What the controller received forwards every pair
    let programmed = programmer.programmed().await;
    assert_eq!(programmed.len(), compilation.rules.len());
    let sim = PipelineSimulator::new(&topology, &programmed);
    for src in HOSTS {
        for dst in HOSTS.iter().filter(|d| **d != src) {
            sim.verify_delivery(src, dst).unwrap();
        }
    }
}

#[tokio::test]
async fn test_rejected_rules_fail_the_run() {
    let mut out = Vec::new();
    let (config, topology) = load_inputs(&sample_args(false)).unwrap();
    let compilation = compile_fabric(&config, &topology, &mut out).unwrap();

    let programmer = Arc::new(MockProgrammer::new().with_rejected_device(DeviceId::new(SB1)));
    let summary = install(&config, programmer, &compilation, &mut out)
        .await
        .unwrap();

    let on_sb1 = compilation
        .rules
        .iter()
        .filter(|r| r.device_id.as_str() == SB1)
        .count();
    assert!(on_sb1 > 0);
    assert_eq!(summary.failed, on_sb1);
    assert_eq!(summary.exit_status(), ExitStatus::Failures);

    let text = String::from_utf8(out).unwrap();
    let failed_lines = text.lines().filter(|l| l.starts_with("FAILED")).count();
    assert_eq!(failed_lines, on_sb1);
}

#[tokio::test]
async fn test_configuration_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let topology = dir.path().join("topology.toml");
    let mut text = std::fs::read_to_string(sample("topology.toml")).unwrap();
    text.push_str(
        "\n[[hosts]]\nname = \"hz1\"\nmac = \"00:00:00:00:09:09\"\nip = \"10.0.10.99\"\nvlan = 10\nswitch = \"sa1\"\n",
    );
    std::fs::write(&topology, text).unwrap();

    let mut out = Vec::new();
    let summary = execute(&args(topology, dir.path().join("absent.toml"), true), &mut out)
        .await
        .unwrap();

    assert_eq!(summary.compile_errors, 1);
    assert_eq!(summary.pairs, 30);
    assert_eq!(summary.exit_status(), ExitStatus::Failures);

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("SKIPPED configuration error in host hz1: no attachment port\n"));
}

#[tokio::test]
async fn test_unusable_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("absent.toml");

    // Missing topology
    let err = execute(&args(absent.clone(), absent.clone(), true), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FabricdError::Io { .. }));
    assert_eq!(err.exit_status(), ExitStatus::UnusableInput);

    // Priority plan that cannot separate routes from bridges
    let config = dir.path().join("fabricd.toml");
    std::fs::write(&config, "[priorities]\nroute = 100\n").unwrap();
    let err = execute(&args(sample("topology.toml"), config, true), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FabricdError::Configuration(_)));
    assert_eq!(err.exit_status(), ExitStatus::UnusableInput);

    // Two hosts on one port
    let topology = dir.path().join("topology.toml");
    let mut text = std::fs::read_to_string(sample("topology.toml")).unwrap();
    text.push_str(
        "\n[[hosts]]\nname = \"hz1\"\nmac = \"00:00:00:00:09:09\"\nip = \"10.0.10.99\"\nvlan = 10\nswitch = \"sa1\"\nport = 2\n",
    );
    std::fs::write(&topology, text).unwrap();
    let err = execute(&args(topology, absent, true), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FabricdError::Topology(_)));
    assert_eq!(err.exit_status(), ExitStatus::UnusableInput);
}
