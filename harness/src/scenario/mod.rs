//! Scenario sequencing
//!
//! Scenarios form a chain (deploy → fund → proposal → rewards → split) with
//! the insufficient-gas split branching off next to `split`. Asking for any
//! scenario runs whatever part of the chain in front of it has not produced
//! its data yet, then the scenario itself.

mod accounts;
mod deploy;
mod fund;
mod proposal;
mod rewards;
mod split;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::client::{GenesisMode, ScriptRunner};
use crate::compiler::{CompiledArtifact, ContractCompiler};
use crate::config::Config;
use crate::evaluator::{OutcomeEvaluator, ResultMap};
use crate::state::ScenarioState;
use crate::template::{ScriptGenerator, Substitutions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Scenario {
    None,
    Deploy,
    Fund,
    Proposal,
    Rewards,
    Split,
    SplitInsufficientGas,
}

impl Scenario {
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Deploy => "deploy",
            Self::Fund => "fund",
            Self::Proposal => "proposal",
            Self::Rewards => "rewards",
            Self::Split => "split",
            Self::SplitInsufficientGas => "split-insufficient-gas",
        }
    }

    /// Scenario whose results this one builds on
    pub fn prerequisite(self) -> Option<Self> {
        match self {
            Self::None | Self::Deploy => None,
            Self::Fund => Some(Self::Deploy),
            Self::Proposal => Some(Self::Fund),
            Self::Rewards => Some(Self::Proposal),
            Self::Split | Self::SplitInsufficientGas => Some(Self::Rewards),
        }
    }

    /// Whether `state` already holds what this scenario produces
    pub fn is_satisfied(self, state: &ScenarioState) -> bool {
        match self {
            Self::None => true,
            Self::Deploy => state.deployment().is_some(),
            Self::Fund => !state.token_amounts().is_empty(),
            Self::Proposal => state.proposal_passed().is_some(),
            Self::Rewards => state.rewards().is_some(),
            Self::Split | Self::SplitInsufficientGas => false,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scenarios to run, in order, so that `target` has everything it needs.
///
/// Prerequisites are walked back until one is already satisfied by `state`;
/// `target` itself always runs.
pub fn plan(target: Scenario, state: &ScenarioState) -> Vec<Scenario> {
    let mut steps = vec![target];
    let mut next = target.prerequisite();
    while let Some(step) = next {
        if step.is_satisfied(state) {
            break;
        }
        steps.push(step);
        next = step.prerequisite();
    }
    steps.reverse();
    steps
}

/// Contracts the deployment needs, compiled once per run
#[derive(Debug, Clone)]
pub(crate) struct DeployArtifacts {
    pub dao: CompiledArtifact,
    pub creator: CompiledArtifact,
    pub offer: CompiledArtifact,
}

/// Everything scenarios share while a run lasts
pub struct TestContext<R: ScriptRunner> {
    config: Config,
    runner: R,
    generator: ScriptGenerator,
    evaluator: OutcomeEvaluator,
    compiler: ContractCompiler,
    artifacts: Option<DeployArtifacts>,
    state: ScenarioState,
    rng: StdRng,
    executed: Vec<Scenario>,
}

impl<R: ScriptRunner> TestContext<R> {
    pub fn new(config: Config, runner: R, state: ScenarioState, rng: StdRng) -> Result<Self> {
        let generator = ScriptGenerator::new(
            config.templates_dir.clone(),
            config.work_dir.clone(),
            config.users_num,
        )
        .context("Failed to build script generator")?;
        let evaluator =
            OutcomeEvaluator::new(config.verbose).context("Failed to build result evaluator")?;
        let compiler = ContractCompiler::new(config.solc.clone());

        Ok(Self {
            config,
            runner,
            generator,
            evaluator,
            compiler,
            artifacts: None,
            state,
            rng,
            executed: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &ScenarioState {
        &self.state
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Scenarios run so far, in order
    pub fn executed(&self) -> &[Scenario] {
        &self.executed
    }

    /// Run `target` and whatever it depends on
    pub async fn run_scenario(&mut self, target: Scenario) -> Result<()> {
        self.prepare_accounts().await?;

        let steps = plan(target, &self.state);
        info!(
            "Scenario plan: {}",
            steps
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(" → ")
        );

        for step in steps {
            info!("▶ Running scenario '{}'", step);
            match step {
                Scenario::None => {}
                Scenario::Deploy => self.run_deploy().await?,
                Scenario::Fund => self.run_fund().await?,
                Scenario::Proposal => self.run_proposal().await?,
                Scenario::Rewards => self.run_rewards().await?,
                Scenario::Split => self.run_split(false).await?,
                Scenario::SplitInsufficientGas => self.run_split(true).await?,
            }
            self.executed.push(step);
        }
        Ok(())
    }

    /// Compile DAO.sol and SampleOffer.sol unless already done this run
    pub(crate) async fn artifacts(&mut self) -> Result<DeployArtifacts> {
        if let Some(artifacts) = &self.artifacts {
            return Ok(artifacts.clone());
        }

        let dao_source = self.config.contract_source("DAO.sol");
        let dao_contracts = if self.config.keep_limits {
            self.compiler.compile(&dao_source).await
        } else {
            self.compiler.compile_relaxed(&dao_source).await
        }
        .context("Failed to compile the DAO")?;

        let offer_source = self.config.contract_source("SampleOffer.sol");
        let offer_contracts = self
            .compiler
            .compile(&offer_source)
            .await
            .context("Failed to compile the sample offer")?;

        let artifacts = DeployArtifacts {
            dao: dao_contracts.require("DAO")?.clone(),
            creator: dao_contracts.require("DAO_Creator")?.clone(),
            offer: offer_contracts.require("SampleOffer")?.clone(),
        };
        self.artifacts = Some(artifacts.clone());
        Ok(artifacts)
    }

    /// Write `template` as the script for `scenario`, run it and check its
    /// result record
    pub(crate) async fn execute<F>(
        &self,
        scenario: &str,
        template: &str,
        subs: Substitutions,
        hook: F,
        expected: &ResultMap,
    ) -> Result<ResultMap>
    where
        F: FnOnce(&mut Substitutions),
    {
        let script = self.generator.write_as(template, scenario, subs, hook)?;
        self.run_script(scenario, script, GenesisMode::WithGenesis, expected)
            .await
    }

    pub(crate) async fn run_script(
        &self,
        scenario: &str,
        script: PathBuf,
        mode: GenesisMode,
        expected: &ResultMap,
    ) -> Result<ResultMap> {
        let output = self
            .runner
            .run(&script, mode)
            .await
            .with_context(|| format!("Scenario '{}' failed to run", scenario))?;
        Ok(self.evaluator.evaluate(scenario, &output, expected)?)
    }
}

/// Seconds since the Unix epoch
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub(crate) fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Read a string field out of a result record
pub(crate) fn record_str(record: &ResultMap, key: &str) -> Result<String> {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .with_context(|| format!("result record has no string '{}'", key))
}

/// Read a numeric field out of a result record
pub(crate) fn record_f64(record: &ResultMap, key: &str) -> Result<f64> {
    record
        .get(key)
        .and_then(|v| v.as_f64())
        .with_context(|| format!("result record has no number '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Deployment, RewardSnapshot};

    fn deployed() -> ScenarioState {
        let mut state = ScenarioState::default();
        state.set_accounts(vec!["0x1".into(), "0x2".into(), "0x3".into()]);
        state.record_deployment(Deployment {
            dao_addr: "0xdao".into(),
            dao_creator_addr: "0xcreator".into(),
            offer_addr: "0xoffer".into(),
            closing_time: 0,
        });
        state
    }

    #[test]
    fn test_plan_from_fresh_state() {
        let state = ScenarioState::default();
        assert_eq!(
            plan(Scenario::Rewards, &state),
            vec![
                Scenario::Deploy,
                Scenario::Fund,
                Scenario::Proposal,
                Scenario::Rewards
            ]
        );
        assert_eq!(plan(Scenario::None, &state), vec![Scenario::None]);
        assert_eq!(plan(Scenario::Deploy, &state), vec![Scenario::Deploy]);
    }

    #[test]
    fn test_plan_resumes_after_saved_deployment() {
        let state = deployed();
        assert_eq!(
            plan(Scenario::Proposal, &state),
            vec![Scenario::Fund, Scenario::Proposal]
        );
        // an explicit request always runs, even if satisfied
        assert_eq!(plan(Scenario::Deploy, &state), vec![Scenario::Deploy]);
    }

    #[test]
    fn test_split_branches_share_prerequisite() {
        let mut state = deployed();
        state.set_token_amounts(vec![1, 2, 3]).unwrap();
        state.record_proposal(true);
        state.record_rewards(RewardSnapshot {
            dao_balance: 6.0,
            dao_reward_tokens: 1.0,
            provider_reward: 1.0,
        });

        assert_eq!(plan(Scenario::Split, &state), vec![Scenario::Split]);
        assert_eq!(
            plan(Scenario::SplitInsufficientGas, &state),
            vec![Scenario::SplitInsufficientGas]
        );
    }

    #[test]
    fn test_names_match_cli_values() {
        for scenario in Scenario::value_variants() {
            let value = scenario.to_possible_value().unwrap();
            assert_eq!(value.get_name(), scenario.name());
        }
    }
}
