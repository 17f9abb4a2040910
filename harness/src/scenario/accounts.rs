use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;

use super::TestContext;
use crate::chain;
use crate::client::{GenesisMode, ScriptRunner};
use crate::evaluator::expect;
use crate::template::Substitutions;

impl<R: ScriptRunner> TestContext<R> {
    /// Make sure `users_num` accounts exist and the genesis block funds them.
    ///
    /// A previously written account list of the right length is reused;
    /// otherwise the bootstrap script creates the missing accounts.
    pub(crate) async fn prepare_accounts(&mut self) -> Result<()> {
        if !self.state.accounts().is_empty() {
            return Ok(());
        }

        let accounts_file = self.config.accounts_file();
        let genesis_file = self.config.genesis_file();
        let known = chain::load_accounts(&accounts_file)?
            .filter(|accounts| accounts.len() == self.config.users_num);

        let accounts = match known {
            Some(accounts) => {
                info!("Using {} accounts from {}", accounts.len(), accounts_file.display());
                if !genesis_file.exists() {
                    chain::write_genesis(&genesis_file, &accounts)?;
                }
                accounts
            }
            None => {
                let accounts = self.bootstrap_accounts().await?;
                chain::save_accounts(&accounts_file, &accounts)?;
                chain::write_genesis(&genesis_file, &accounts)?;
                // the bootstrap ran without our genesis block, and any DAO
                // deployed on the old chain is gone with it
                chain::clean_blockchain(&self.config.data_dir())?;
                self.state.forget_deployment(&self.config.save_file())?;
                accounts
            }
        };

        self.state.set_accounts(accounts);
        Ok(())
    }

    async fn bootstrap_accounts(&self) -> Result<Vec<String>> {
        let wanted = self.config.users_num;
        info!("Bootstrapping {} accounts", wanted);

        let mut subs = Substitutions::new();
        subs.set("accounts_number", wanted);
        let script = self.generator.write("accounts", &subs)?;

        let expected = expect(json!({ "accounts_number": wanted }));
        let record = self
            .run_script("accounts", script, GenesisMode::Bootstrap, &expected)
            .await?;

        let accounts: Vec<String> = record
            .get("accounts")
            .and_then(Value::as_array)
            .context("account bootstrap did not report its accounts")?
            .iter()
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect();
        if accounts.len() != wanted {
            anyhow::bail!(
                "Account bootstrap reported {} accounts, wanted {}",
                accounts.len(),
                wanted
            );
        }
        Ok(accounts)
    }
}
