//! State carried between scenarios
//!
//! Deployment addresses and the sale closing time survive across harness
//! invocations through a small JSON save file; everything else only lives as
//! long as the process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// What a deployment leaves behind, as persisted in the save file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub dao_addr: String,
    pub dao_creator_addr: String,
    pub offer_addr: String,
    /// Unix timestamp at which the DAO token sale closes
    pub closing_time: u64,
}

/// Balances captured after the rewards scenario
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardSnapshot {
    /// Ether held by the DAO
    pub dao_balance: f64,
    /// Reward tokens held by the DAO
    pub dao_reward_tokens: f64,
    /// Reward the service provider claimed
    pub provider_reward: f64,
}

/// Mutable record every scenario reads from and writes to
#[derive(Debug, Clone)]
pub struct ScenarioState {
    accounts: Vec<String>,
    deployment: Option<Deployment>,
    token_amounts: Vec<u64>,
    next_proposal_id: u64,
    proposal_passed: Option<bool>,
    rewards: Option<RewardSnapshot>,
}

impl Default for ScenarioState {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            deployment: None,
            token_amounts: Vec::new(),
            next_proposal_id: 1,
            proposal_passed: None,
            rewards: None,
        }
    }
}

impl ScenarioState {
    /// Start from the save file at `path` if there is one
    pub fn load(path: &Path) -> Result<Self> {
        let mut state = Self::default();
        if !path.exists() {
            return Ok(state);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read save file {}", path.display()))?;
        let deployment: Deployment = serde_json::from_str(&data)
            .with_context(|| format!("Invalid save file {}", path.display()))?;
        info!(
            "Loaded deployment from {}: DAO at {}",
            path.display(),
            deployment.dao_addr
        );
        state.deployment = Some(deployment);
        Ok(state)
    }

    /// Persist the current deployment (if any) to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let Some(deployment) = &self.deployment else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(deployment)?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write save file {}", path.display()))?;
        Ok(())
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Fix the account list for the rest of the run
    pub fn set_accounts(&mut self, accounts: Vec<String>) {
        self.accounts = accounts;
        self.token_amounts.clear();
    }

    pub fn deployment(&self) -> Option<&Deployment> {
        self.deployment.as_ref()
    }

    /// A fresh DAO starts numbering proposals from 1 and has no funding yet
    pub fn record_deployment(&mut self, deployment: Deployment) {
        self.deployment = Some(deployment);
        self.token_amounts.clear();
        self.next_proposal_id = 1;
        self.proposal_passed = None;
        self.rewards = None;
    }

    /// Drop the deployment after its chain data was wiped, together with the
    /// save file at `path` that still points at it
    pub fn forget_deployment(&mut self, path: &Path) -> Result<()> {
        if let Some(deployment) = self.deployment.take() {
            info!("Forgetting DAO at {}: chain data was cleaned", deployment.dao_addr);
        }
        self.token_amounts.clear();
        self.next_proposal_id = 1;
        self.proposal_passed = None;
        self.rewards = None;

        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove save file {}", path.display()))?;
        }
        Ok(())
    }

    pub fn token_amounts(&self) -> &[u64] {
        &self.token_amounts
    }

    pub fn total_supply(&self) -> u64 {
        self.token_amounts.iter().sum()
    }

    /// Record per-account token balances, one per account in account order
    pub fn set_token_amounts(&mut self, amounts: Vec<u64>) -> Result<()> {
        if amounts.len() != self.accounts.len() {
            anyhow::bail!(
                "Got {} token balances for {} accounts",
                amounts.len(),
                self.accounts.len()
            );
        }
        self.token_amounts = amounts;
        Ok(())
    }

    /// Id the next created proposal will get
    pub fn next_proposal_id(&self) -> u64 {
        self.next_proposal_id
    }

    /// Claim the id for a proposal about to be created
    pub fn take_proposal_id(&mut self) -> u64 {
        let id = self.next_proposal_id;
        self.next_proposal_id += 1;
        id
    }

    pub fn proposal_passed(&self) -> Option<bool> {
        self.proposal_passed
    }

    pub fn record_proposal(&mut self, passed: bool) {
        self.proposal_passed = Some(passed);
    }

    pub fn rewards(&self) -> Option<RewardSnapshot> {
        self.rewards
    }

    pub fn record_rewards(&mut self, snapshot: RewardSnapshot) {
        self.rewards = Some(snapshot);
    }
}
