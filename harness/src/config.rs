use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};

use crate::accounting::RewardRounding;
use crate::binary;
use crate::cli::Args;
use crate::scenario::Scenario;

/// Proposal deposits must be strictly above this many ether
pub const MIN_PROPOSAL_DEPOSIT: u64 = 20;

/// Scenarios need a service provider, a proposal creator and a miner
pub const MIN_USERS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not find {name} binary{}", describe_given(.given))]
    BinaryNotFound {
        name: &'static str,
        given: Option<PathBuf>,
    },

    #[error("at least {min} users are needed, got {0}", min = MIN_USERS)]
    NotEnoughUsers(usize),

    #[error("proposal deposit must be more than {min} ether, got {0}", min = MIN_PROPOSAL_DEPOSIT)]
    ProposalDepositTooLow(u64),
}

/// Harness configuration: CLI flags plus resolved binaries
#[derive(Debug, Clone)]
pub struct Config {
    pub solc: PathBuf,
    pub geth: PathBuf,

    pub keep_limits: bool,
    pub clean_chain: bool,
    pub verbose: bool,
    pub scenario: Scenario,

    // Directories
    pub contracts_dir: PathBuf,
    pub work_dir: PathBuf,
    pub templates_dir: PathBuf,

    // DAO parameters
    pub closing_time_secs: u64,
    pub min_value: u64,
    pub proposal_fail: bool,
    pub proposal_deposit: u64,
    pub offer_onetime_costs: u64,
    pub offer_total_costs: u64,
    pub users_num: usize,
    pub total_rewards: u64,

    // Timing and gas
    pub proposal_debate_seconds: u64,
    pub split_debate_seconds: u64,
    pub split_gas: u64,
    pub insufficient_split_gas: u64,
    pub reward_rounding: RewardRounding,
}

impl Config {
    /// Resolve binaries for `args` and validate the result.
    ///
    /// `SOLC` and `GETH` (also read from a `.env` file) stand in for absent
    /// `--solc`/`--geth` flags.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let solc_given = args.solc.clone().or_else(|| env_path("SOLC"));
        let solc = binary::resolve(solc_given.as_deref(), "solc").ok_or(
            ConfigError::BinaryNotFound {
                name: "solc",
                given: solc_given,
            },
        )?;

        let geth_given = args.geth.clone().or_else(|| env_path("GETH"));
        let geth = binary::resolve(geth_given.as_deref(), "geth").ok_or(
            ConfigError::BinaryNotFound {
                name: "geth",
                given: geth_given,
            },
        )?;

        let config = Self::with_binaries(args, solc, geth);
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration around already resolved binaries
    pub fn with_binaries(args: Args, solc: PathBuf, geth: PathBuf) -> Self {
        Self {
            solc,
            geth,
            keep_limits: args.keep_limits,
            clean_chain: args.clean_chain,
            verbose: args.verbose,
            scenario: args.scenario,
            contracts_dir: args.contracts_dir,
            work_dir: args.work_dir,
            templates_dir: args.templates_dir,
            closing_time_secs: args.closing_time,
            min_value: args.min_value,
            proposal_fail: args.proposal_fail,
            proposal_deposit: args.proposal_deposit,
            offer_onetime_costs: args.offer_onetime_costs,
            offer_total_costs: args.offer_total_costs,
            users_num: args.users_num,
            total_rewards: args.total_rewards,
            proposal_debate_seconds: args.proposal_debate_seconds,
            split_debate_seconds: args.split_debate_seconds,
            split_gas: args.split_gas,
            insufficient_split_gas: args.insufficient_split_gas,
            reward_rounding: args.reward_rounding,
        }
    }

    /// Default flags with contracts and artifacts both under `work_dir`
    pub fn for_work_dir(work_dir: &Path, solc: PathBuf, geth: PathBuf) -> Self {
        let mut config = Self::with_binaries(Args::parse_from(["dao-test"]), solc, geth);
        config.work_dir = work_dir.to_path_buf();
        config.contracts_dir = work_dir.to_path_buf();
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users_num < MIN_USERS {
            return Err(ConfigError::NotEnoughUsers(self.users_num));
        }
        if self.proposal_deposit <= MIN_PROPOSAL_DEPOSIT {
            return Err(ConfigError::ProposalDepositTooLow(self.proposal_deposit));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.work_dir.join("data")
    }

    pub fn save_file(&self) -> PathBuf {
        self.data_dir().join("saved")
    }

    pub fn genesis_file(&self) -> PathBuf {
        self.work_dir.join("genesis_block.json")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.work_dir.join("accounts.json")
    }

    pub fn client_log(&self) -> PathBuf {
        self.work_dir.join("out.log.geth")
    }

    pub fn contract_source(&self, file: &str) -> PathBuf {
        self.contracts_dir.join(file)
    }
}

fn describe_given(given: &Option<PathBuf>) -> String {
    given
        .as_ref()
        .map(|path| format!(" at {}", path.display()))
        .unwrap_or_default()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
