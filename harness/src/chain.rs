//! On-disk pieces of the private test chain: data directory, account list
//! and genesis block

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::info;

/// Initial balance (in wei) given to every test account: one million ether
pub const GENESIS_BALANCE_WEI: &str = "1000000000000000000000000";

/// Remove all chain data apart from the keystore, so existing accounts
/// survive a clean chain
pub fn clean_blockchain(data_dir: &Path) -> Result<()> {
    info!("Cleaning blockchain data directory {}", data_dir.display());

    for dir in ["chaindata", "dapp"] {
        let path = data_dir.join(dir);
        if path.exists() {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    let nodekey = data_dir.join("nodekey");
    if nodekey.exists() {
        std::fs::remove_file(&nodekey)
            .with_context(|| format!("Failed to remove {}", nodekey.display()))?;
    }
    Ok(())
}

/// Read the account list written by a previous bootstrap, if any
pub fn load_accounts(path: &Path) -> Result<Option<Vec<String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let accounts = serde_json::from_str(&data)
        .with_context(|| format!("Invalid account list {}", path.display()))?;
    Ok(Some(accounts))
}

pub fn save_accounts(path: &Path, accounts: &[String]) -> Result<()> {
    let data = serde_json::to_string_pretty(accounts)?;
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

/// Genesis block allocating [`GENESIS_BALANCE_WEI`] to every account
pub fn genesis_block(accounts: &[String]) -> Value {
    let alloc: Map<String, Value> = accounts
        .iter()
        .map(|account| {
            (
                account.trim_start_matches("0x").to_lowercase(),
                json!({ "balance": GENESIS_BALANCE_WEI }),
            )
        })
        .collect();

    json!({
        "nonce": "0x0000000000000042",
        "difficulty": "0x4000",
        "alloc": alloc,
        "mixhash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "coinbase": "0x0000000000000000000000000000000000000000",
        "timestamp": "0x00",
        "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "extraData": "0x",
        "gasLimit": "0xffffffff"
    })
}

pub fn write_genesis(path: &Path, accounts: &[String]) -> Result<()> {
    let data = serde_json::to_string_pretty(&genesis_block(accounts))?;
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote genesis block for {} accounts", accounts.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_keeps_keystore() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path();
        std::fs::create_dir_all(data.join("chaindata")).unwrap();
        std::fs::write(data.join("chaindata").join("000001.ldb"), "x").unwrap();
        std::fs::create_dir_all(data.join("dapp")).unwrap();
        std::fs::create_dir_all(data.join("keystore")).unwrap();
        std::fs::write(data.join("keystore").join("key"), "secret").unwrap();
        std::fs::write(data.join("nodekey"), "node").unwrap();

        clean_blockchain(data).unwrap();

        assert!(!data.join("chaindata").exists());
        assert!(!data.join("dapp").exists());
        assert!(!data.join("nodekey").exists());
        assert!(data.join("keystore").join("key").exists());

        // cleaning twice is fine
        clean_blockchain(data).unwrap();
    }

    #[test]
    fn test_accounts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        assert_eq!(load_accounts(&path).unwrap(), None);

        let accounts = vec!["0xAa".to_string(), "0xbb".to_string()];
        save_accounts(&path, &accounts).unwrap();
        assert_eq!(load_accounts(&path).unwrap(), Some(accounts));
    }

    #[test]
    fn test_genesis_allocates_every_account() {
        let genesis = genesis_block(&["0xAbC".to_string(), "0xdef".to_string()]);
        let alloc = genesis["alloc"].as_object().unwrap();

        assert_eq!(alloc.len(), 2);
        assert_eq!(alloc["abc"]["balance"], GENESIS_BALANCE_WEI);
        assert_eq!(alloc["def"]["balance"], GENESIS_BALANCE_WEI);
        assert_eq!(genesis["gasLimit"], "0xffffffff");
    }
}
