//! Scripted [`CommandRunner`] for tests: canned outputs matched by substring,
//! with every invocation recorded.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RunnerError;
use crate::exec::{CommandOutput, CommandRunner, CommandSpec};

struct Rule {
    pattern: String,
    /// Consumed front to back; the last response repeats.
    responses: VecDeque<(CommandOutput, Duration)>,
}

#[derive(Default)]
pub(crate) struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Respond to commands whose display contains `pattern`. Rules added
    /// later take priority; unmatched commands succeed with empty output.
    pub(crate) fn on(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.on_delayed(pattern, output, Duration::ZERO)
    }

    pub(crate) fn on_delayed(&self, pattern: &str, output: CommandOutput, delay: Duration) -> &Self {
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| r.pattern == pattern) {
            rule.responses.push_back((output, delay));
        } else {
            rules.push(Rule {
                pattern: pattern.to_string(),
                responses: VecDeque::from([(output, delay)]),
            });
        }
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(CommandSpec::display).collect()
    }

    pub(crate) fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().unwrap().push(spec.clone());
        let display = spec.display();
        let (output, delay) = {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().rev().find(|r| display.contains(&r.pattern)) {
                Some(rule) if rule.responses.len() > 1 => rule.responses.pop_front().unwrap(),
                Some(rule) => rule.responses.front().cloned().unwrap(),
                None => (CommandOutput::ok(""), Duration::ZERO),
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(output)
    }
}

/// Context over `workdir` with default settings and a fixed target.
pub(crate) fn context(workdir: &std::path::Path, runner: std::sync::Arc<ScriptedRunner>) -> crate::DeployContext {
    crate::DeployContext {
        workdir: workdir.to_path_buf(),
        settings: launchpad_core::Settings::default(),
        target: launchpad_core::DeploymentTarget {
            api: "https://api.c.example.com:6443".to_string(),
            domain: "apps.c.example.com".to_string(),
            namespace: "rfe".to_string(),
            registry: "quay.io/acme".to_string(),
            project: "rfe-builder".to_string(),
        },
        runner,
        renderer: launchpad_renderer::Renderer::new().unwrap(),
        host_os: crate::podman::HostOs::Linux,
    }
}
