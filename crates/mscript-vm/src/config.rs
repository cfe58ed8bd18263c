//! VM resource limits

use serde::Deserialize;
use std::time::Duration;

/// Limits applied to one `VirtualMachine`
///
/// Deserializable so hosts can load it from a JSON file; missing fields
/// keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub max_calc_stack: usize,
    pub max_task_stack: usize,
    pub max_scope_stack: usize,
    /// Wall clock limit for `exec`, none when absent
    pub max_execution_time_ms: Option<u64>,
    /// Time one statement may spend in compile-time evaluation
    pub compile_time_budget_ms: u64,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_calc_stack: 1000,
            max_task_stack: 1000,
            max_scope_stack: 1000,
            max_execution_time_ms: None,
            compile_time_budget_ms: 1000,
        }
    }
}

impl VmConfig {
    pub fn max_execution_time(&self) -> Option<Duration> {
        self.max_execution_time_ms.map(Duration::from_millis)
    }

    pub fn compile_time_budget(&self) -> Duration {
        Duration::from_millis(self.compile_time_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let c: VmConfig = serde_json::from_str(r#"{"max_task_stack": 50}"#).unwrap();
        assert_eq!(c.max_task_stack, 50);
        assert_eq!(c.max_calc_stack, 1000);
        assert_eq!(c.max_execution_time(), None);
    }
}
