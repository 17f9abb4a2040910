use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use super::{record_f64, TestContext};
use crate::accounting::calculate_reward;
use crate::client::ScriptRunner;
use crate::evaluator::expect;
use crate::state::RewardSnapshot;
use crate::template::Substitutions;

impl<R: ScriptRunner> TestContext<R> {
    /// Donate to the DAO, move the donation to the reward account and have
    /// the service provider claim its share
    pub(crate) async fn run_rewards(&mut self) -> Result<()> {
        let artifacts = self.artifacts().await?;
        let deployment = self
            .state
            .deployment()
            .cloned()
            .context("rewards needs a deployed DAO")?;

        let balances = self.state.token_amounts();
        let provider_tokens = balances.first().copied().unwrap_or_default();
        let provider_reward = calculate_reward(
            provider_tokens,
            self.state.total_supply(),
            self.config.total_rewards,
            self.config.reward_rounding,
        );
        let prop_id = self.state.take_proposal_id();
        info!(
            "Rewards proposal {}: provider should get {} ether",
            prop_id, provider_reward
        );

        let mut subs = Substitutions::new();
        subs.set_json("dao_abi", &artifacts.dao.abi)?
            .set("dao_address", &deployment.dao_addr)
            .set("holders", self.config.users_num)
            .set("prop_id", prop_id)
            .set("debating_period", self.config.proposal_debate_seconds)
            .set("proposal_deposit", self.config.proposal_deposit)
            .set("total_rewards", self.config.total_rewards);

        let expected = expect(json!({ "provider_reward_portion": provider_reward }));
        let record = self
            .execute("rewards", "rewards", subs, |_| {}, &expected)
            .await?;

        let snapshot = RewardSnapshot {
            dao_balance: record_f64(&record, "dao_balance")?,
            dao_reward_tokens: record_f64(&record, "dao_reward_tokens")?,
            provider_reward,
        };
        info!(
            "DAO holds {} ether and {} reward tokens",
            snapshot.dao_balance, snapshot.dao_reward_tokens
        );
        self.state.record_rewards(snapshot);
        Ok(())
    }
}
