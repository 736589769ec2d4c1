use fail::FailScenario;

/// Arms a set of failpoints for the lifetime of the scenario.
///
/// Failpoints are process-wide, so [`FailScenario`] serializes the tests that use them. Every
/// armed failpoint is turned off again when the scenario is dropped.
pub struct SieveFailScenario<'a> {
    _scenario: FailScenario<'a>,
    failpoints: Vec<String>,
}

impl<'a> SieveFailScenario<'a> {
    /// Arms each `(failpoint, action)` pair, for example `("generator.before_send", "3*off->return")`.
    pub fn setup(failpoints: &[(&str, &str)]) -> SieveFailScenario<'a> {
        let scenario = FailScenario::setup();

        for (failpoint, action) in failpoints {
            fail::cfg(*failpoint, action).unwrap();
        }

        Self {
            _scenario: scenario,
            failpoints: failpoints
                .iter()
                .map(|(failpoint, _)| failpoint.to_string())
                .collect(),
        }
    }
}

impl Drop for SieveFailScenario<'_> {
    fn drop(&mut self) {
        for failpoint in &self.failpoints {
            fail::remove(failpoint);
        }
    }
}
