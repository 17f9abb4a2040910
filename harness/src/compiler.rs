//! Solidity compilation through the external `solc` binary
//!
//! `solc --optimize --combined-json abi,bin <source>` prints a JSON document
//! with an ABI and hex bytecode per contract. Older compilers key contracts
//! by bare name and encode the ABI as a string; newer ones use `path:Name`
//! keys and inline ABI arrays. Both are accepted.
//!
//! Unless the debate limits are kept, the DAO source is first rewritten to
//! drop its minimum debate-period guards so scenarios can run in seconds
//! instead of weeks. The rewrite goes to a sibling temporary file (relative
//! imports keep working) that is removed once compilation is over, whether it
//! succeeded or not.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Fixed flag set passed to the compiler
pub const SOLC_FLAGS: &[&str] = &["--optimize", "--combined-json", "abi,bin"];

/// Textual substitutions that remove the minimum debate-period checks
pub const DEBATE_LIMIT_GUARDS: &[(&str, &str)] = &[
    (" || _debatingPeriod < minProposalDebatePeriod", ""),
    (" || _debatingPeriod < minSplitDebatePeriod", ""),
];

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("solidity source not found at {0}")]
    SourceNotFound(PathBuf),

    #[error("could not find solidity solc binary at {0}")]
    CompilerNotFound(PathBuf),

    #[error("failed to prepare source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to spawn solc: {0}")]
    Spawn(std::io::Error),

    #[error("solc exited with status {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    #[error("solc output is not valid combined JSON ({reason}):\n{output}")]
    MalformedOutput { reason: String, output: String },

    #[error("contract '{0}' is missing from the solc output")]
    MissingContract(String),

    #[error("contract '{contract}' has invalid bytecode: {reason}")]
    InvalidBytecode { contract: String, reason: String },
}

/// ABI and bytecode of one compiled contract
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub abi: Value,
    /// Hex bytecode without a `0x` prefix
    pub bytecode: String,
}

/// Every contract produced by one compiler invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledContracts {
    contracts: BTreeMap<String, CompiledArtifact>,
}

impl CompiledContracts {
    /// Look a contract up by name; `DAO` also matches a `path/DAO.sol:DAO` key
    pub fn get(&self, name: &str) -> Option<&CompiledArtifact> {
        self.contracts.get(name).or_else(|| {
            self.contracts
                .iter()
                .find(|(key, _)| key.rsplit(':').next() == Some(name))
                .map(|(_, artifact)| artifact)
        })
    }

    pub fn require(&self, name: &str) -> Result<&CompiledArtifact, CompileError> {
        self.get(name)
            .ok_or_else(|| CompileError::MissingContract(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Parse `solc --combined-json abi,bin` output
pub fn parse_combined_json(output: &str) -> Result<CompiledContracts, CompileError> {
    let malformed = |reason: String| CompileError::MalformedOutput {
        reason,
        output: output.to_string(),
    };

    let doc: Value = serde_json::from_str(output).map_err(|e| malformed(e.to_string()))?;
    let entries = doc
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("no 'contracts' object".to_string()))?;

    let mut contracts = BTreeMap::new();
    for (name, entry) in entries {
        let abi = match entry.get("abi") {
            Some(Value::String(encoded)) => serde_json::from_str(encoded)
                .map_err(|e| malformed(format!("ABI of '{}': {}", name, e)))?,
            Some(inline @ Value::Array(_)) => inline.clone(),
            _ => return Err(malformed(format!("'{}' has no ABI", name))),
        };
        let raw_bin = entry
            .get("bin")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(format!("'{}' has no bytecode", name)))?;
        let bytecode = raw_bin.trim_start_matches("0x").to_string();
        hex::decode(&bytecode).map_err(|e| CompileError::InvalidBytecode {
            contract: name.clone(),
            reason: e.to_string(),
        })?;

        contracts.insert(name.clone(), CompiledArtifact { abi, bytecode });
    }

    Ok(CompiledContracts { contracts })
}

/// Drop the debate-period guards from DAO source text
pub fn relax_limits(source: &str) -> String {
    DEBATE_LIMIT_GUARDS
        .iter()
        .fold(source.to_string(), |text, (guard, replacement)| {
            text.replace(guard, replacement)
        })
}

/// Removes the rewritten source when dropped
struct TempSource {
    path: PathBuf,
}

impl Drop for TempSource {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("🧹 Removed {}", self.path.display()),
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Thin wrapper around the `solc` binary
#[derive(Debug, Clone)]
pub struct ContractCompiler {
    solc: PathBuf,
}

impl ContractCompiler {
    pub fn new(solc: PathBuf) -> Self {
        Self { solc }
    }

    /// Compile `source` as-is
    pub async fn compile(&self, source: &Path) -> Result<CompiledContracts, CompileError> {
        if !source.is_file() {
            return Err(CompileError::SourceNotFound(source.to_path_buf()));
        }
        if !self.solc.is_file() {
            return Err(CompileError::CompilerNotFound(self.solc.clone()));
        }

        info!("🔨 Compiling {}", source.display());
        let output = Command::new(&self.solc)
            .arg(source)
            .args(SOLC_FLAGS)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(CompileError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            return Err(CompileError::Failed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                stdout,
            });
        }

        let contracts = parse_combined_json(&stdout)?;
        info!(
            "✅ Compiled {} contract(s) from {}",
            contracts.len(),
            source.display()
        );
        Ok(contracts)
    }

    /// Compile `source` with its debate-period guards removed
    pub async fn compile_relaxed(
        &self,
        source: &Path,
    ) -> Result<CompiledContracts, CompileError> {
        if !source.is_file() {
            return Err(CompileError::SourceNotFound(source.to_path_buf()));
        }
        let original = std::fs::read_to_string(source).map_err(|e| CompileError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract");
        let relaxed_path =
            source.with_file_name(format!("{}-relaxed-{}.sol", stem, uuid::Uuid::new_v4()));
        std::fs::write(&relaxed_path, relax_limits(&original)).map_err(|e| CompileError::Io {
            path: relaxed_path.clone(),
            source: e,
        })?;
        let guard = TempSource { path: relaxed_path };

        info!("Debate limits removed, compiling {}", guard.path.display());
        self.compile(&guard.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LEGACY_OUTPUT: &str = r#"{
        "contracts": {
            "DAO": {"abi": "[{\"type\":\"function\",\"name\":\"vote\"}]", "bin": "6060"},
            "DAO_Creator": {"abi": "[]", "bin": "0x6061"}
        },
        "version": "0.3.1"
    }"#;

    #[test]
    fn test_parse_legacy_output() {
        let contracts = parse_combined_json(LEGACY_OUTPUT).unwrap();
        assert_eq!(contracts.len(), 2);

        let dao = contracts.get("DAO").unwrap();
        assert_eq!(dao.abi, json!([{"type": "function", "name": "vote"}]));
        assert_eq!(dao.bytecode, "6060");
        assert_eq!(contracts.get("DAO_Creator").unwrap().bytecode, "6061");
    }

    #[test]
    fn test_parse_prefixed_names_and_inline_abi() {
        let output = r#"{"contracts": {"/src/DAO.sol:DAO": {"abi": [], "bin": "00ff"}}}"#;
        let contracts = parse_combined_json(output).unwrap();

        assert_eq!(contracts.get("DAO").unwrap().abi, json!([]));
        assert!(contracts.get("DAO_Creator").is_none());
        assert!(matches!(
            contracts.require("DAO_Creator"),
            Err(CompileError::MissingContract(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_combined_json("not json"),
            Err(CompileError::MalformedOutput { .. })
        ));
        assert!(matches!(
            parse_combined_json(r#"{"version": 1}"#),
            Err(CompileError::MalformedOutput { .. })
        ));
        assert!(matches!(
            parse_combined_json(r#"{"contracts": {"DAO": {"abi": "[]", "bin": "zz"}}}"#),
            Err(CompileError::InvalidBytecode { .. })
        ));
    }

    #[test]
    fn test_relax_limits() {
        let source = "if (_debatingPeriod < 1 || _debatingPeriod < minProposalDebatePeriod) throw;\n\
                      if (_debatingPeriod < 1 || _debatingPeriod < minSplitDebatePeriod) throw;";
        let relaxed = relax_limits(source);
        assert!(!relaxed.contains("minProposalDebatePeriod"));
        assert!(!relaxed.contains("minSplitDebatePeriod"));
        assert!(relaxed.contains("if (_debatingPeriod < 1) throw;"));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let compiler = ContractCompiler::new(PathBuf::from("/bin/true"));
        let err = compiler
            .compile(Path::new("/definitely/not/DAO.sol"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::SourceNotFound(_)));
    }
}
