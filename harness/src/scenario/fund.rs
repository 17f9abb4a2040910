use anyhow::{Context, Result};
use rand::Rng;
use serde_json::json;
use tracing::info;

use super::{now_millis, TestContext};
use crate::accounting::constrained_sum_sample_pos;
use crate::client::ScriptRunner;
use crate::evaluator::expect;
use crate::template::Substitutions;

impl<R: ScriptRunner> TestContext<R> {
    /// Buy tokens from every account, wait for the sale to close and check
    /// the resulting balances
    pub(crate) async fn run_fund(&mut self) -> Result<()> {
        let artifacts = self.artifacts().await?;
        let deployment = self
            .state
            .deployment()
            .cloned()
            .context("fund needs a deployed DAO")?;

        let users = self.config.users_num;
        let floor = self.config.min_value.max(users as u64);
        let total = floor + self.rng.gen_range(1..=100);
        let amounts = constrained_sum_sample_pos(&mut self.rng, users, total)
            .context("could not split the token supply between accounts")?;
        info!("Funding the DAO with {} ether: {:?}", total, amounts);

        let mut subs = Substitutions::new();
        subs.set_json("dao_abi", &artifacts.dao.abi)?
            .set("dao_address", &deployment.dao_addr)
            .set_json("amounts", &amounts)?;

        let closing_ms = u128::from(deployment.closing_time) * 1000;
        let expected = expect(json!({
            "dao_funded": true,
            "total_supply": total,
            "balances": amounts,
            "user0_after": amounts[0],
        }));
        self.execute(
            "fund",
            "fund",
            subs,
            |subs| {
                let wait_ms = closing_ms.saturating_sub(now_millis());
                info!("Sale closes in {}ms", wait_ms);
                subs.set("wait_ms", wait_ms);
            },
            &expected,
        )
        .await?;

        self.state.set_token_amounts(amounts)?;
        Ok(())
    }
}
