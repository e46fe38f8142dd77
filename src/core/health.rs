//! Service health reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of one component or the service overall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "up",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of a single subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub detail: String,
}

/// Aggregated health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    /// Builds a report; overall status is the worst component status
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let status = components
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Up, |acc, s| match (acc, s) {
                (HealthStatus::Down, _) | (_, HealthStatus::Down) => HealthStatus::Down,
                (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => {
                    HealthStatus::Degraded
                }
                _ => HealthStatus::Up,
            });

        Self {
            status,
            checked_at: Utc::now(),
            components,
        }
    }

    /// Human-readable summary for CLI output
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Service status: {}\n", self.status));
        for component in &self.components {
            summary.push_str(&format!(
                "  {:<14} {:<9} {}\n",
                component.name, component.status, component.detail
            ));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, status: HealthStatus) -> ComponentHealth {
        ComponentHealth {
            name: name.to_string(),
            status,
            detail: String::new(),
        }
    }

    #[test]
    fn test_all_up() {
        let report = HealthReport::from_components(vec![
            component("policy-store", HealthStatus::Up),
            component("audit-chain", HealthStatus::Up),
        ]);
        assert_eq!(report.status, HealthStatus::Up);
    }

    #[test]
    fn test_worst_status_wins() {
        let report = HealthReport::from_components(vec![
            component("policy-store", HealthStatus::Up),
            component("audit-chain", HealthStatus::Degraded),
        ]);
        assert_eq!(report.status, HealthStatus::Degraded);

        let report = HealthReport::from_components(vec![
            component("policy-store", HealthStatus::Degraded),
            component("audit-chain", HealthStatus::Down),
        ]);
        assert_eq!(report.status, HealthStatus::Down);
    }

    #[test]
    fn test_summary_lists_components() {
        let report = HealthReport::from_components(vec![component(
            "audit-chain",
            HealthStatus::Up,
        )]);
        let summary = report.format_summary();
        assert!(summary.contains("Service status: up"));
        assert!(summary.contains("audit-chain"));
    }
}
