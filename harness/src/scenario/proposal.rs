use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use super::TestContext;
use crate::accounting::{create_votes, tally, VoteOutcome};
use crate::client::ScriptRunner;
use crate::evaluator::expect;
use crate::template::Substitutions;

/// Transaction data calling `sign()` on the sample offer
pub const SIGN_BYTECODE: &str = "0x2ca15122";

impl<R: ScriptRunner> TestContext<R> {
    /// Propose funding the sample offer and vote it through (or down)
    pub(crate) async fn run_proposal(&mut self) -> Result<()> {
        let artifacts = self.artifacts().await?;
        let deployment = self
            .state
            .deployment()
            .cloned()
            .context("proposal needs a deployed DAO")?;

        let outcome = VoteOutcome::from_should_pass(!self.config.proposal_fail);
        let should_pass = outcome == VoteOutcome::Pass;
        let balances = self.state.token_amounts().to_vec();
        let votes = create_votes(&balances, outcome);
        let (yay, nay) = tally(&balances, &votes);
        let prop_id = self.state.take_proposal_id();
        info!(
            "Proposal {} should {}: votes {:?}",
            prop_id,
            if should_pass { "pass" } else { "fail" },
            votes
        );

        let deposit = self.config.proposal_deposit;
        let onetime_payment = if should_pass {
            self.config.offer_onetime_costs
        } else {
            0
        };
        let mut subs = Substitutions::new();
        subs.set_json("dao_abi", &artifacts.dao.abi)?
            .set_json("offer_abi", &artifacts.offer.abi)?
            .set("dao_address", &deployment.dao_addr)
            .set("offer_address", &deployment.offer_addr)
            .set_json("votes", &votes)?
            .set("prop_id", prop_id)
            .set("debating_period", self.config.proposal_debate_seconds)
            .set("proposal_deposit", deposit)
            .set("offer_amount", self.config.offer_total_costs)
            .set_json("offer_description", "Fund the sample offer")?
            .set("transaction_bytecode", SIGN_BYTECODE);

        let expected = expect(json!({
            "proposal_number": prop_id,
            "proposal_passed": should_pass,
            "proposal_yay": yay,
            "proposal_nay": nay,
            "creator_deposit_locked": deposit,
            "creator_deposit_returned": deposit,
            "offer_promise_valid": should_pass,
            "provider_onetime_payment": onetime_payment,
        }));
        self.execute("proposal", "proposal", subs, |_| {}, &expected)
            .await?;

        self.state.record_proposal(should_pass);
        Ok(())
    }
}
