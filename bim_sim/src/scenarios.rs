//! End-to-end scenarios for the clocks agent.

use serde::Serialize;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// S1: first pass publishes an enabled alarm
    BootstrapAdd,

    /// S2: clearing the ring time withdraws the alarm
    Disable,

    /// S3: withdraw and publish in one pass, in list order
    Mixed,

    /// S4: unchanged list re-notified emits nothing
    Renotify,

    /// S5: records without id or with a bad time are skipped
    Malformed,

    /// S6: simulator injects two alarms and ignores settings
    Simulator,

    // ═══════════════════════════════════════════════════
    // Policy and transport scenarios
    // ═══════════════════════════════════════════════════

    /// Ring time moved on a published alarm, with republishing enabled
    TimeChange,

    /// Alarm dropped from the list, with withdrawal enabled
    WithdrawMissing,

    /// Bus rejects every call; published set still tracks intent
    BusOutage,

    /// Several writes land before the agent gets to run
    Burst,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::BootstrapAdd,
            ScenarioId::Disable,
            ScenarioId::Mixed,
            ScenarioId::Renotify,
            ScenarioId::Malformed,
            ScenarioId::Simulator,
            ScenarioId::TimeChange,
            ScenarioId::WithdrawMissing,
            ScenarioId::BusOutage,
            ScenarioId::Burst,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::BootstrapAdd => "bootstrap_add",
            ScenarioId::Disable => "disable",
            ScenarioId::Mixed => "mixed",
            ScenarioId::Renotify => "renotify",
            ScenarioId::Malformed => "malformed",
            ScenarioId::Simulator => "simulator",
            ScenarioId::TimeChange => "time_change",
            ScenarioId::WithdrawMissing => "withdraw_missing",
            ScenarioId::BusOutage => "bus_outage",
            ScenarioId::Burst => "burst",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::BootstrapAdd => "Bootstrap pass publishes a=2030-01-01T00:00:00Z",
            ScenarioId::Disable => "a loses its ring time and is removed",
            ScenarioId::Mixed => "remove a, then add b, in one pass",
            ScenarioId::Renotify => "Same list notified again, no bus traffic",
            ScenarioId::Malformed => "Empty id, missing id and bad date all skipped",
            ScenarioId::Simulator => "Two APP_ID alarms at now+[30,60) and now+[80,120)",
            ScenarioId::TimeChange => "Published alarm re-armed at a new time is re-published",
            ScenarioId::WithdrawMissing => "Alarm deleted from the list is withdrawn",
            ScenarioId::BusOutage => "Sends fail, state advances, later removal still sent",
            ScenarioId::Burst => "Three writes folded into a single pass",
        }
    }

    /// True for scenarios that need a non-default policy.
    pub fn needs_policy(&self) -> bool {
        matches!(self, ScenarioId::TimeChange | ScenarioId::WithdrawMissing)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bootstrap_add" | "bootstrap" | "s1" => Ok(ScenarioId::BootstrapAdd),
            "disable" | "s2" => Ok(ScenarioId::Disable),
            "mixed" | "s3" => Ok(ScenarioId::Mixed),
            "renotify" | "s4" => Ok(ScenarioId::Renotify),
            "malformed" | "s5" => Ok(ScenarioId::Malformed),
            "simulator" | "simulate" | "s6" => Ok(ScenarioId::Simulator),
            "time_change" | "timechange" => Ok(ScenarioId::TimeChange),
            "withdraw_missing" | "withdrawmissing" => Ok(ScenarioId::WithdrawMissing),
            "bus_outage" | "busoutage" => Ok(ScenarioId::BusOutage),
            "burst" => Ok(ScenarioId::Burst),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
    }

    #[test]
    fn test_serializes_as_name() {
        for scenario in ScenarioId::all() {
            assert_eq!(
                serde_json::to_value(scenario).unwrap(),
                serde_json::Value::String(scenario.name().to_string())
            );
        }
    }

    #[test]
    fn test_short_aliases() {
        assert_eq!("S3".parse::<ScenarioId>(), Ok(ScenarioId::Mixed));
        assert!("nope".parse::<ScenarioId>().is_err());
    }
}
