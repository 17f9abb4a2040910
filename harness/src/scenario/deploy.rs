use anyhow::Result;
use serde_json::json;
use tracing::info;

use super::{now_secs, record_str, TestContext};
use crate::client::{GenesisMode, ScriptRunner};
use crate::evaluator::expect;
use crate::state::Deployment;
use crate::template::Substitutions;

impl<R: ScriptRunner> TestContext<R> {
    /// Deploy DAO_Creator, the DAO and the sample offer, then persist their
    /// addresses
    pub(crate) async fn run_deploy(&mut self) -> Result<()> {
        let artifacts = self.artifacts().await?;

        let mut subs = Substitutions::new();
        subs.set_json("dao_abi", &artifacts.dao.abi)?
            .set("dao_bin", &artifacts.dao.bytecode)
            .set_json("creator_abi", &artifacts.creator.abi)?
            .set("creator_bin", &artifacts.creator.bytecode)
            .set_json("offer_abi", &artifacts.offer.abi)?
            .set("offer_bin", &artifacts.offer.bytecode)
            .set("min_value", self.config.min_value)
            .set("proposal_deposit", self.config.proposal_deposit)
            .set("offer_total_costs", self.config.offer_total_costs)
            .set("offer_onetime_costs", self.config.offer_onetime_costs);

        let sale_duration = self.config.closing_time_secs;
        let mut closing_time = 0;
        let script = self.generator.write_with("deploy", subs, |subs| {
            closing_time = now_secs() + sale_duration;
            subs.set("closing_time", closing_time);
        })?;

        let expected = expect(json!({
            "closing_time": closing_time,
            "min_value": self.config.min_value,
            "proposal_deposit": self.config.proposal_deposit,
            "offer_onetime_costs": self.config.offer_onetime_costs,
        }));
        let record = self
            .run_script("deploy", script, GenesisMode::WithGenesis, &expected)
            .await?;

        let deployment = Deployment {
            dao_addr: record_str(&record, "dao_address")?,
            dao_creator_addr: record_str(&record, "dao_creator_address")?,
            offer_addr: record_str(&record, "offer_address")?,
            closing_time,
        };
        info!(
            "DAO deployed at {}, sale closes at {}",
            deployment.dao_addr, deployment.closing_time
        );

        self.state.record_deployment(deployment);
        self.state.save(&self.config.save_file())?;
        Ok(())
    }
}
