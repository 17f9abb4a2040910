use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use super::TestContext;
use crate::accounting::{create_votes, split_accounting, tally, SplitOutcome, VoteOutcome};
use crate::client::ScriptRunner;
use crate::evaluator::expect;
use crate::state::RewardSnapshot;
use crate::template::Substitutions;

impl<R: ScriptRunner> TestContext<R> {
    /// Split the yes-voters off into a new DAO.
    ///
    /// With `insufficient_gas` every `splitDAO` call runs out of gas, so
    /// nothing may move at all.
    pub(crate) async fn run_split(&mut self, insufficient_gas: bool) -> Result<()> {
        let artifacts = self.artifacts().await?;
        let deployment = self
            .state
            .deployment()
            .cloned()
            .context("split needs a deployed DAO")?;
        let snapshot = self
            .state
            .rewards()
            .context("split needs the DAO balances captured by rewards")?;

        let balances = self.state.token_amounts().to_vec();
        let votes = create_votes(&balances, VoteOutcome::Pass);
        let (yay, nay) = tally(&balances, &votes);
        let prop_id = self.state.take_proposal_id();

        let (name, gas, outcome) = if insufficient_gas {
            (
                "split-insufficient-gas",
                self.config.insufficient_split_gas,
                SplitOutcome::unchanged(
                    &balances,
                    snapshot.dao_balance,
                    snapshot.dao_reward_tokens,
                ),
            )
        } else {
            (
                "split",
                self.config.split_gas,
                split_accounting(
                    &balances,
                    &votes,
                    snapshot.dao_balance,
                    snapshot.dao_reward_tokens,
                ),
            )
        };
        if insufficient_gas {
            warn!("Splitting with only {} gas, the split must not happen", gas);
        }
        info!("Split proposal {}: votes {:?}", prop_id, votes);

        let mut subs = Substitutions::new();
        subs.set_json("dao_abi", &artifacts.dao.abi)?
            .set("dao_address", &deployment.dao_addr)
            .set_json("votes", &votes)?
            .set("prop_id", prop_id)
            .set("debating_period", self.config.split_debate_seconds)
            .set("split_gas", gas);

        let expected = expect(json!({
            "proposal_yay": yay,
            "proposal_nay": nay,
            "old_dao_balances": outcome.old_balances,
            "new_dao_balances": outcome.new_balances,
            "old_dao_reward_tokens": outcome.rewards_left,
            "new_dao_reward_tokens": outcome.rewards_moved,
            "old_dao_ether": outcome.ether_left,
            "new_dao_ether": outcome.ether_moved,
            "new_dao_total_supply": outcome.new_total_supply(),
        }));
        self.execute(name, "split", subs, |_| {}, &expected).await?;

        self.state.record_rewards(RewardSnapshot {
            dao_balance: outcome.ether_left,
            dao_reward_tokens: outcome.rewards_left,
            provider_reward: snapshot.provider_reward,
        });
        self.state.set_token_amounts(outcome.old_balances)?;
        Ok(())
    }
}
