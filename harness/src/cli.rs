use clap::Parser;
use std::path::PathBuf;

use crate::accounting::RewardRounding;
use crate::scenario::Scenario;

#[derive(Parser, Debug, Clone)]
#[command(name = "dao-test")]
#[command(about = "DAO contracts test framework")]
pub struct Args {
    /// Full path to the solc binary (falls back to $SOLC, then PATH)
    #[arg(long)]
    pub solc: Option<PathBuf>,

    /// Full path to the geth binary (falls back to $GETH, then PATH)
    #[arg(long)]
    pub geth: Option<PathBuf>,

    /// Compile the DAO with its minimum debate periods intact
    #[arg(long)]
    pub keep_limits: bool,

    /// Wipe chain data (keystore excepted) and ignore any saved deployment
    #[arg(long)]
    pub clean_chain: bool,

    /// Print every passing check and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Seconds from deployment until the token sale closes
    #[arg(long, default_value_t = 35)]
    pub closing_time: u64,

    /// Minimum ether the sale must raise for the DAO to be funded
    #[arg(long, default_value_t = 20)]
    pub min_value: u64,

    /// Make the spending proposal fail instead of pass
    #[arg(long)]
    pub proposal_fail: bool,

    /// Ether deposited by a proposal creator (must be above 20)
    #[arg(long, default_value_t = 22)]
    pub proposal_deposit: u64,

    /// One-time costs of the sample offer, in ether
    #[arg(long, default_value_t = 5)]
    pub offer_onetime_costs: u64,

    /// Total costs of the sample offer, in ether
    #[arg(long, default_value_t = 10)]
    pub offer_total_costs: u64,

    /// Number of test accounts (at least 3)
    #[arg(long, default_value_t = 5)]
    pub users_num: usize,

    /// Ether donated to the DAO and sent to its reward account
    #[arg(long, default_value_t = 10)]
    pub total_rewards: u64,

    /// Scenario to run; its prerequisites run first when needed
    #[arg(long, value_enum, default_value_t = Scenario::None)]
    pub scenario: Scenario,

    /// Directory holding DAO.sol and SampleOffer.sol
    #[arg(long, default_value = "..")]
    pub contracts_dir: PathBuf,

    /// Directory for generated scripts, chain data and logs
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Directory holding the *.template.js scenario templates
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))]
    pub templates_dir: PathBuf,

    /// Debating period of the spending and rewards proposals, in seconds
    #[arg(long, default_value_t = 20)]
    pub proposal_debate_seconds: u64,

    /// Debating period of split proposals, in seconds
    #[arg(long, default_value_t = 15)]
    pub split_debate_seconds: u64,

    /// Gas allowed for each splitDAO call
    #[arg(long, default_value_t = 4_000_000)]
    pub split_gas: u64,

    /// Gas allowed for splitDAO in the insufficient-gas scenario
    #[arg(long, default_value_t = 100_000)]
    pub insufficient_split_gas: u64,

    /// How the expected provider reward is rounded
    #[arg(long, value_enum, default_value_t = RewardRounding::Exact)]
    pub reward_rounding: RewardRounding,
}
