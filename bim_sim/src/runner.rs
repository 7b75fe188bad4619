//! Scenario runner - drives a real agent against in-memory collaborators.

use crate::context::SimContext;
use crate::scenarios::ScenarioId;

use bim_core::simulator::{FIRST_OFFSET_SECS, SECOND_OFFSET_SECS};
use bim_core::{AgentConfig, AlarmAgent, ReconcilePolicy, APP_ID};
use bim_env::{AgentContext, AlarmRecord, AlarmSnapshot, BusCall, MemorySettings, RecordingBus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Every bus call accepted during the run, in order
    pub calls: Vec<BusCall>,

    /// Published ids at the end of the run
    pub published: Vec<String>,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// A live agent wired to an in-memory store and a recording bus.
pub struct Harness {
    pub context: Arc<SimContext>,
    pub settings: Arc<MemorySettings>,
    pub bus: Arc<RecordingBus>,
    pub agent: AlarmAgent,
    calls: Vec<BusCall>,
}

impl Harness {
    /// Builds an agent over a store holding `initial` (or nothing).
    pub fn new(seed: u64, config: AgentConfig, initial: Option<AlarmSnapshot>) -> Result<Self, String> {
        let context = SimContext::shared(seed);
        let settings = Arc::new(match initial {
            Some(alarms) => MemorySettings::with_alarms(alarms),
            None => MemorySettings::new(),
        });
        let bus = Arc::new(RecordingBus::new());
        let agent = AlarmAgent::new(config, context.clone(), settings.clone(), bus.clone())
            .map_err(|e| e.to_string())?;

        Ok(Self {
            context,
            settings,
            bus,
            agent,
            calls: Vec::new(),
        })
    }

    /// Starts the agent and returns the calls of the bootstrap.
    pub fn start(&mut self) -> Result<Vec<BusCall>, String> {
        self.agent.start().map_err(|e| e.to_string())?;
        Ok(self.collect())
    }

    /// Writes `alarms` to the store, lets the agent react, and returns the
    /// calls that resulted.
    pub fn write(&mut self, alarms: AlarmSnapshot) -> Vec<BusCall> {
        self.settings.set_alarms(alarms);
        self.pump()
    }

    /// Runs every pending pass and returns the calls that resulted.
    pub fn pump(&mut self) -> Vec<BusCall> {
        let notifications = self.agent.process_pending();
        debug!("Pumped {} notifications", notifications);
        self.collect()
    }

    /// Published ids, ascending.
    pub fn published(&self) -> Vec<String> {
        self.agent
            .reconciler()
            .published_ids()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    /// Every call accepted so far.
    pub fn history(&self) -> &[BusCall] {
        &self.calls
    }

    fn collect(&mut self) -> Vec<BusCall> {
        let calls = self.bus.take_calls();
        self.calls.extend(calls.iter().cloned());
        calls
    }
}

fn alarm(id: &str, ring_time: Option<&str>) -> AlarmRecord {
    AlarmRecord::alarm(id, ring_time)
}

fn add(id: &str, ts: i64) -> BusCall {
    BusCall::add(id, ts).expect("scenario ids are non-empty")
}

fn remove(id: &str) -> BusCall {
    BusCall::remove(id).expect("scenario ids are non-empty")
}

fn expect_calls(step: &str, got: &[BusCall], want: &[BusCall]) -> Result<(), String> {
    if got == want {
        Ok(())
    } else {
        Err(format!("{step}: expected calls {want:?}, got {got:?}"))
    }
}

fn expect_published(step: &str, harness: &Harness, want: &[&str]) -> Result<(), String> {
    let got = harness.published();
    if got.iter().map(String::as_str).eq(want.iter().copied()) {
        Ok(())
    } else {
        Err(format!("{step}: expected published {want:?}, got {got:?}"))
    }
}

const T0: &str = "2030-01-01T00:00:00Z";
const T0_UNIX: i64 = 1_893_456_000;
const T10: &str = "2030-01-01T00:00:10Z";
const T10_UNIX: i64 = 1_893_456_010;

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let config = self.config_for(scenario);
        let mut harness = match Harness::new(self.seed, config, None) {
            Ok(harness) => harness,
            Err(reason) => return self.finish(scenario, None, Err(reason)),
        };

        let outcome = match scenario {
            ScenarioId::BootstrapAdd => self.run_bootstrap_add(&mut harness),
            ScenarioId::Disable => self.run_disable(&mut harness),
            ScenarioId::Mixed => self.run_mixed(&mut harness),
            ScenarioId::Renotify => self.run_renotify(&mut harness),
            ScenarioId::Malformed => self.run_malformed(&mut harness),
            ScenarioId::Simulator => self.run_simulator(&mut harness),
            ScenarioId::TimeChange => self.run_time_change(&mut harness),
            ScenarioId::WithdrawMissing => self.run_withdraw_missing(&mut harness),
            ScenarioId::BusOutage => self.run_bus_outage(&mut harness),
            ScenarioId::Burst => self.run_burst(&mut harness),
        };

        self.finish(scenario, Some(&harness), outcome)
    }

    fn config_for(&self, scenario: ScenarioId) -> AgentConfig {
        let config = AgentConfig::default().with_simulate(scenario == ScenarioId::Simulator);
        if !scenario.needs_policy() {
            return config;
        }
        config.with_policy(ReconcilePolicy {
            republish_on_change: scenario == ScenarioId::TimeChange,
            withdraw_missing: scenario == ScenarioId::WithdrawMissing,
        })
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        harness: Option<&Harness>,
        outcome: Result<(), String>,
    ) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            calls: harness.map(|h| h.history().to_vec()).unwrap_or_default(),
            published: harness.map(Harness::published).unwrap_or_default(),
            failure_reason: outcome.err(),
        }
    }

    /// Seeds the store before the agent starts, then starts it.
    fn bootstrap(&self, harness: &mut Harness, alarms: AlarmSnapshot) -> Result<Vec<BusCall>, String> {
        harness.settings.set_alarms(alarms);
        harness.start()
    }

    fn run_bootstrap_add(&self, harness: &mut Harness) -> Result<(), String> {
        let calls = self.bootstrap(harness, vec![alarm("a", Some(T0))])?;
        expect_calls("bootstrap", &calls, &[add("a", T0_UNIX)])?;
        expect_published("bootstrap", harness, &["a"])
    }

    fn run_disable(&self, harness: &mut Harness) -> Result<(), String> {
        self.run_bootstrap_add(harness)?;
        let calls = harness.write(vec![alarm("a", None)]);
        expect_calls("disable", &calls, &[remove("a")])?;
        expect_published("disable", harness, &[])
    }

    fn run_mixed(&self, harness: &mut Harness) -> Result<(), String> {
        self.run_bootstrap_add(harness)?;
        let calls = harness.write(vec![alarm("a", None), alarm("b", Some(T10))]);
        expect_calls("mixed", &calls, &[remove("a"), add("b", T10_UNIX)])?;
        expect_published("mixed", harness, &["b"])
    }

    fn run_renotify(&self, harness: &mut Harness) -> Result<(), String> {
        self.run_bootstrap_add(harness)?;
        harness.settings.notify();
        let calls = harness.pump();
        expect_calls("renotify", &calls, &[])?;
        let calls = harness.write(vec![alarm("a", Some(T0))]);
        expect_calls("rewrite", &calls, &[])?;
        expect_published("renotify", harness, &["a"])
    }

    fn run_malformed(&self, harness: &mut Harness) -> Result<(), String> {
        let snapshot = vec![
            alarm("", Some(T0)),
            AlarmRecord::new().with("ring_time", T0),
            alarm("c", Some("not-a-date")),
        ];
        let calls = self.bootstrap(harness, snapshot)?;
        expect_calls("malformed", &calls, &[])?;
        expect_published("malformed", harness, &[])
    }

    fn run_simulator(&self, harness: &mut Harness) -> Result<(), String> {
        let now = harness.context.unix_now();
        let calls = self.bootstrap(harness, vec![alarm("a", Some(T0))])?;

        if harness.settings.subscriber_count() != 0 {
            return Err("simulator subscribed to settings".to_string());
        }
        let stamps: Vec<i64> = calls
            .iter()
            .filter_map(|call| match call {
                BusCall::AddAlarm { clock_id, timestamp } if clock_id.as_str() == APP_ID => {
                    Some(*timestamp - now)
                }
                _ => None,
            })
            .collect();
        if calls.len() != 2 || stamps.len() != 2 {
            return Err(format!("expected two {APP_ID} add_alarm calls, got {calls:?}"));
        }
        if !FIRST_OFFSET_SECS.contains(&stamps[0]) || !SECOND_OFFSET_SECS.contains(&stamps[1]) {
            return Err(format!("offsets {stamps:?} outside simulator windows"));
        }
        expect_published("simulator", harness, &[])
    }

    fn run_time_change(&self, harness: &mut Harness) -> Result<(), String> {
        self.run_bootstrap_add(harness)?;
        let calls = harness.write(vec![alarm("a", Some(T10))]);
        expect_calls("time_change", &calls, &[remove("a"), add("a", T10_UNIX)])?;
        expect_published("time_change", harness, &["a"])
    }

    fn run_withdraw_missing(&self, harness: &mut Harness) -> Result<(), String> {
        let calls = self.bootstrap(harness, vec![alarm("a", Some(T0)), alarm("b", Some(T10))])?;
        expect_calls("bootstrap", &calls, &[add("a", T0_UNIX), add("b", T10_UNIX)])?;
        let calls = harness.write(vec![alarm("b", Some(T10))]);
        expect_calls("withdraw", &calls, &[remove("a")])?;
        expect_published("withdraw", harness, &["b"])
    }

    fn run_bus_outage(&self, harness: &mut Harness) -> Result<(), String> {
        harness.bus.set_failing(true);
        let calls = self.bootstrap(harness, vec![alarm("a", Some(T0))])?;
        expect_calls("outage", &calls, &[])?;
        if harness.bus.rejected() != 1 {
            return Err(format!("expected one rejected call, got {}", harness.bus.rejected()));
        }
        expect_published("outage", harness, &["a"])?;

        harness.bus.set_failing(false);
        let calls = harness.write(vec![alarm("a", None)]);
        expect_calls("recovered", &calls, &[remove("a")])?;
        expect_published("recovered", harness, &[])
    }

    fn run_burst(&self, harness: &mut Harness) -> Result<(), String> {
        let calls = harness.start()?;
        expect_calls("empty store", &calls, &[])?;

        harness.settings.set_alarms(vec![alarm("a", Some(T0))]);
        harness.settings.set_alarms(vec![alarm("a", Some(T0)), alarm("b", Some(T10))]);
        harness.settings.set_alarms(vec![alarm("a", Some(T0)), alarm("b", None)]);
        let calls = harness.pump();
        expect_calls("burst", &calls, &[add("a", T0_UNIX)])?;
        expect_published("burst", harness, &["a"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(42);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_mixed_history() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Mixed);
        assert_eq!(
            result.calls,
            vec![add("a", T0_UNIX), remove("a"), add("b", T10_UNIX)]
        );
        assert_eq!(result.published, vec!["b".to_string()]);
    }

    #[test]
    fn test_simulator_deterministic_per_seed() {
        let a = ScenarioRunner::new(99).run(ScenarioId::Simulator);
        let b = ScenarioRunner::new(99).run(ScenarioId::Simulator);
        assert!(a.passed);
        assert_eq!(a.calls, b.calls);
    }

    #[test]
    fn test_policy_only_where_needed() {
        let runner = ScenarioRunner::new(1);
        for scenario in ScenarioId::all() {
            let config = runner.config_for(scenario);
            assert_eq!(
                config.policy != ReconcilePolicy::default(),
                scenario.needs_policy(),
                "{}",
                scenario
            );
            assert_eq!(config.simulate, scenario == ScenarioId::Simulator);
        }
    }

    #[test]
    fn test_result_serializes_for_summary() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Mixed);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["scenario"], "mixed");
        assert_eq!(value["passed"], true);
        assert_eq!(value["calls"][0]["method"], "add_alarm");
        assert_eq!(value["published"][0], "b");
        assert!(value["failure_reason"].is_null());
    }

    #[test]
    fn test_harness_reports_subscribe_failure() {
        let mut harness = Harness::new(1, AgentConfig::default(), None).unwrap();
        harness.settings.refuse_subscriptions(true);
        assert!(harness.start().is_err());
    }
}
