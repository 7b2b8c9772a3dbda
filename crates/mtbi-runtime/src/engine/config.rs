//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;

/// Configuration for the rule execution engine.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Program commands are handed to.
    #[builder(default = "\"sh\".to_owned()")]
    pub shell: String,

    /// Arguments placed before the rendered command.
    #[builder(default = "vec![\"-c\".to_owned()]")]
    pub shell_args: Vec<String>,

    /// Maximum time a single rule may run; `None` waits indefinitely.
    #[builder(default, setter(strip_option))]
    pub rule_timeout: Option<Duration>,

    /// Number of trailing stderr bytes kept for failure reports.
    #[builder(default = "4096")]
    pub stderr_tail_bytes: usize,

    /// Whether to create missing parent directories of outputs and logs.
    #[builder(default = "true")]
    pub create_output_dirs: bool,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(shell) = &self.shell
            && shell.trim().is_empty()
        {
            return Err("shell must not be empty".into());
        }
        if let Some(Some(timeout)) = self.rule_timeout
            && timeout.is_zero()
        {
            return Err("rule_timeout must be greater than zero".into());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Returns a builder with default values.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_owned(),
            shell_args: vec!["-c".to_owned()],
            rule_timeout: None,
            stderr_tail_bytes: 4096,
            create_output_dirs: true,
        }
    }
}
