//! Compiled contract artifacts in the Hardhat output layout.
//!
//! ```text
//! artifacts/
//! ├── build-info/<id>.json            solc input + long version
//! └── contracts/Token.sol/
//!     ├── Token.json                  abi + creation bytecode
//!     └── Token.dbg.json              points at the build info
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::JsonAbi,
    primitives::Bytes,
};
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::errors::{BroadcastError, VerificationError};

const ARTIFACT_FORMAT_PREFIX: &str = "hh-sol-artifact";
const BUILD_INFO_DIR: &str = "build-info";

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("no compiled artifact named `{0}`")]
    NotFound(String),
    #[error("artifact for `{name}` could not be parsed: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("contract name `{name}` is ambiguous, use one of: {}", .candidates.join(", "))]
    Ambiguous { name: String, candidates: Vec<String> },
    #[error("`{0}` has no creation bytecode (abstract contract or interface?)")]
    NoBytecode(String),
    #[error("`{0}` has unlinked library references")]
    UnlinkedLibraries(String),
    #[error("`{name}` bytecode is not valid hex: {reason}")]
    InvalidBytecode { name: String, reason: String },
    #[error("`{name}` constructor takes {expected} argument(s), got {got}")]
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("`{name}` constructor argument {index}: {reason}")]
    InvalidArgument {
        name: String,
        index: usize,
        reason: String,
    },
    #[error("cannot load build info for `{name}`: {reason}")]
    BuildInfo { name: String, reason: String },
}

impl From<ArtifactError> for BroadcastError {
    fn from(err: ArtifactError) -> Self {
        match &err {
            ArtifactError::NotFound(name) => BroadcastError::UnknownArtifact(name.clone()),
            ArtifactError::ArgumentCount { .. } | ArtifactError::InvalidArgument { .. } => {
                BroadcastError::Encoding(err.to_string())
            }
            _ => BroadcastError::Artifact(err.to_string()),
        }
    }
}

impl From<ArtifactError> for VerificationError {
    fn from(err: ArtifactError) -> Self {
        VerificationError::Artifact(err.to_string())
    }
}

/// One compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "_format")]
    format: String,
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    bytecode: String,
    #[serde(skip)]
    path: PathBuf,
}

/// Compiler input and version recorded for an artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// e.g. `0.8.24+commit.e11b9ed9`
    pub solc_long_version: String,
    /// Standard JSON input given to solc.
    pub input: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

impl Artifact {
    /// `contracts/Token.sol:Token`
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Creation bytecode without constructor arguments.
    pub fn bytecode(&self) -> Result<Bytes, ArtifactError> {
        let code = self.bytecode.trim_start_matches("0x");
        if code.is_empty() {
            return Err(ArtifactError::NoBytecode(self.contract_name.clone()));
        }
        if code.contains("__") {
            return Err(ArtifactError::UnlinkedLibraries(self.contract_name.clone()));
        }
        hex::decode(code)
            .map(Bytes::from)
            .map_err(|e| ArtifactError::InvalidBytecode {
                name: self.contract_name.clone(),
                reason: e.to_string(),
            })
    }

    /// ABI-encode constructor arguments against the artifact's constructor.
    pub fn encode_constructor_arguments(
        &self,
        arguments: &[Value],
    ) -> Result<Vec<u8>, ArtifactError> {
        let inputs = self
            .abi
            .constructor()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();

        if inputs.len() != arguments.len() {
            return Err(ArtifactError::ArgumentCount {
                name: self.contract_name.clone(),
                expected: inputs.len(),
                got: arguments.len(),
            });
        }

        let Some(constructor) = self.abi.constructor() else {
            return Ok(Vec::new());
        };

        let values = inputs
            .iter()
            .zip(arguments)
            .enumerate()
            .map(|(index, (param, value))| {
                param
                    .resolve()
                    .map_err(|e| e.to_string())
                    .and_then(|ty| coerce_argument(&ty, value))
                    .map_err(|reason| ArtifactError::InvalidArgument {
                        name: self.contract_name.clone(),
                        index,
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        constructor
            .abi_encode_input(&values)
            .map_err(|e| ArtifactError::InvalidArgument {
                name: self.contract_name.clone(),
                index: 0,
                reason: e.to_string(),
            })
    }

    /// Creation bytecode followed by the encoded constructor arguments.
    pub fn deployment_data(&self, arguments: &[Value]) -> Result<Bytes, ArtifactError> {
        let mut data = self.bytecode()?.to_vec();
        data.extend(self.encode_constructor_arguments(arguments)?);
        Ok(data.into())
    }

    /// Load the build info referenced by this artifact's `.dbg.json` file.
    pub fn build_info(&self) -> Result<BuildInfo, ArtifactError> {
        let err = |reason: String| ArtifactError::BuildInfo {
            name: self.contract_name.clone(),
            reason,
        };

        let dbg_path = self.path.with_extension("dbg.json");
        let dbg: DebugFile = read_json(&dbg_path).map_err(|e| err(format!("{e:#}")))?;

        let parent = dbg_path.parent().unwrap_or_else(|| Path::new("."));
        read_json(&parent.join(dbg.build_info)).map_err(|e| err(format!("{e:#}")))
    }
}

/// Turn a JSON constructor argument into a value of the ABI type.
fn coerce_argument(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match (ty, value) {
        (DynSolType::String, Value::String(s)) => Ok(DynSolValue::String(s.clone())),
        (DynSolType::Bool, Value::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (_, Value::String(s)) => ty.coerce_str(s).map_err(|e| e.to_string()),
        (_, Value::Null) => Err(format!("null is not a valid `{}`", ty.sol_type_name())),
        (_, other) => ty.coerce_str(&other.to_string()).map_err(|e| e.to_string()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Every artifact found under an artifacts directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    artifacts: Arc<Vec<Artifact>>,
    /// Contract files that failed to parse, by contract name.
    unreadable: Arc<Vec<(String, String)>>,
}

impl ArtifactStore {
    /// Scan `root` recursively for Hardhat contract artifacts.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        if !root.is_dir() {
            anyhow::bail!(
                "Artifacts directory not found: {}. Compile the contracts first.",
                root.display()
            );
        }

        let mut files = Vec::new();
        collect_json_files(root, &mut files)?;

        let mut artifacts = Vec::new();
        let mut unreadable = Vec::new();
        for path in files {
            let mut artifact = match read_json::<Artifact>(&path) {
                Ok(artifact) => artifact,
                Err(e) => {
                    match contract_file_name(&path) {
                        Some(name) => {
                            tracing::warn!(
                                path = %path.display(),
                                error = %format!("{e:#}"),
                                "Skipping unreadable contract artifact"
                            );
                            unreadable.push((name, format!("{e:#}")));
                        }
                        None => tracing::trace!(
                            path = %path.display(),
                            "Skipping non-artifact JSON file"
                        ),
                    }
                    continue;
                }
            };
            if !artifact.format.starts_with(ARTIFACT_FORMAT_PREFIX) {
                continue;
            }
            artifact.path = path;
            artifacts.push(artifact);
        }

        tracing::debug!(
            root = %root.display(),
            artifacts = artifacts.len(),
            "Loaded contract artifacts"
        );

        Ok(Self {
            root: root.to_path_buf(),
            artifacts: Arc::new(artifacts),
            unreadable: Arc::new(unreadable),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Look up an artifact by `Name` or `path/File.sol:Name`.
    pub fn get(&self, name: &str) -> Result<&Artifact, ArtifactError> {
        if name.contains(':') {
            return self
                .artifacts
                .iter()
                .find(|a| a.fully_qualified_name() == name)
                .ok_or_else(|| self.not_found(name));
        }

        let mut matches = self.artifacts.iter().filter(|a| a.contract_name == name);
        match (matches.next(), matches.next()) {
            (None, _) => Err(self.not_found(name)),
            (Some(artifact), None) => Ok(artifact),
            (Some(_), Some(_)) => Err(ArtifactError::Ambiguous {
                name: name.to_string(),
                candidates: self
                    .artifacts
                    .iter()
                    .filter(|a| a.contract_name == name)
                    .map(Artifact::fully_qualified_name)
                    .collect(),
            }),
        }
    }
}

impl ArtifactStore {
    fn not_found(&self, name: &str) -> ArtifactError {
        let contract = name.rsplit(':').next().unwrap_or(name);
        match self.unreadable.iter().find(|(file, _)| file == contract) {
            Some((_, reason)) => ArtifactError::Unreadable {
                name: name.to_string(),
                reason: reason.clone(),
            },
            None => ArtifactError::NotFound(name.to_string()),
        }
    }
}

/// Contract name for a file laid out as `Source.sol/Name.json`.
fn contract_file_name(path: &Path) -> Option<String> {
    let parent = path.parent()?.file_name()?.to_str()?;
    if !parent.ends_with(".sol") {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();

        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                continue;
            }
            collect_json_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json")
            && !path.to_string_lossy().ends_with(".dbg.json")
        {
            files.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;
    use tempdir::TempDir;

    use super::*;

    /// Write a minimal Hardhat artifact tree and return its root.
    pub(crate) fn write_fixture(root: &Path) {
        let write = |relative: &str, value: Value| {
            let path = root.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        };

        write(
            "contracts/StudyAchievements.sol/StudyAchievements.json",
            json!({
                "_format": "hh-sol-artifact-1",
                "contractName": "StudyAchievements",
                "sourceName": "contracts/StudyAchievements.sol",
                "abi": [{
                    "type": "constructor",
                    "stateMutability": "nonpayable",
                    "inputs": [{ "name": "baseURI", "type": "string", "internalType": "string" }]
                }],
                "bytecode": "0x6080604052",
                "deployedBytecode": "0x6080",
                "linkReferences": {},
                "deployedLinkReferences": {}
            }),
        );
        write(
            "contracts/StudyAchievements.sol/StudyAchievements.dbg.json",
            json!({ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/abc123.json" }),
        );
        write(
            "contracts/SimbiToken.sol/SimbiToken.json",
            json!({
                "_format": "hh-sol-artifact-1",
                "contractName": "SimbiToken",
                "sourceName": "contracts/SimbiToken.sol",
                "abi": [],
                "bytecode": "0x60806040",
                "deployedBytecode": "0x6080",
                "linkReferences": {},
                "deployedLinkReferences": {}
            }),
        );
        write(
            "contracts/SimbiToken.sol/SimbiToken.dbg.json",
            json!({ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/abc123.json" }),
        );
        write(
            "build-info/abc123.json",
            json!({
                "_format": "hh-sol-build-info-1",
                "id": "abc123",
                "solcVersion": "0.8.24",
                "solcLongVersion": "0.8.24+commit.e11b9ed9",
                "input": { "language": "Solidity", "sources": {}, "settings": {} },
                "output": {}
            }),
        );
    }

    fn fixture() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new("shipyard-artifacts").unwrap();
        write_fixture(dir.path());
        let store = ArtifactStore::load(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_load_skips_debug_and_build_info_files() {
        let (_dir, store) = fixture();
        assert_eq!(store.len(), 2);
        assert!(store.get("SimbiToken").is_ok());
        assert!(store.get("contracts/StudyAchievements.sol:StudyAchievements").is_ok());
        assert_eq!(
            store.get("Missing").unwrap_err(),
            ArtifactError::NotFound("Missing".to_string())
        );
    }

    #[test]
    fn test_malformed_artifact_reports_parse_error() {
        let dir = TempDir::new("shipyard-artifacts").unwrap();
        write_fixture(dir.path());
        let broken = dir.path().join("contracts/Vault.sol/Vault.json");
        std::fs::create_dir_all(broken.parent().unwrap()).unwrap();
        std::fs::write(&broken, r#"{ "_format": "hh-sol-artifact-1", "contractName": "#).unwrap();

        let store = ArtifactStore::load(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(matches!(
            store.get("Vault"),
            Err(ArtifactError::Unreadable { ref name, .. }) if name == "Vault"
        ));
        assert!(matches!(
            store.get("contracts/Vault.sol:Vault"),
            Err(ArtifactError::Unreadable { .. })
        ));
        assert_eq!(
            store.get("Missing").unwrap_err(),
            ArtifactError::NotFound("Missing".to_string())
        );
    }

    #[test]
    fn test_load_missing_directory_fails() {
        assert!(ArtifactStore::load(Path::new("/nonexistent/artifacts")).is_err());
    }

    #[test]
    fn test_string_constructor_argument_encoding() {
        let (_dir, store) = fixture();
        let artifact = store.get("StudyAchievements").unwrap();

        let encoded = artifact.encode_constructor_arguments(&[json!("")]).unwrap();
        // offset word + zero length word
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[31], 0x20);
        assert!(encoded[32..].iter().all(|b| *b == 0));

        let data = artifact.deployment_data(&[json!("")]).unwrap();
        assert_eq!(&data[..5], &[0x60, 0x80, 0x60, 0x40, 0x52]);
        assert_eq!(data.len(), 5 + 64);
    }

    #[test]
    fn test_argument_count_mismatch() {
        let (_dir, store) = fixture();

        let err = store
            .get("StudyAchievements")
            .unwrap()
            .encode_constructor_arguments(&[])
            .unwrap_err();
        assert!(matches!(err, ArtifactError::ArgumentCount { expected: 1, got: 0, .. }));

        let err = store
            .get("SimbiToken")
            .unwrap()
            .deployment_data(&[json!(1)])
            .unwrap_err();
        assert!(matches!(err, ArtifactError::ArgumentCount { expected: 0, got: 1, .. }));
        assert!(matches!(BroadcastError::from(err), BroadcastError::Encoding(_)));
    }

    #[test]
    fn test_coerce_numeric_and_address_arguments() {
        let uint = coerce_argument(&DynSolType::Uint(256), &json!(42)).unwrap();
        assert_eq!(uint, DynSolValue::Uint(alloy_core::primitives::U256::from(42), 256));

        let addr = coerce_argument(
            &DynSolType::Address,
            &json!("0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F"),
        )
        .unwrap();
        assert!(matches!(addr, DynSolValue::Address(_)));

        assert!(coerce_argument(&DynSolType::Uint(8), &Value::Null).is_err());
    }

    #[test]
    fn test_build_info_follows_debug_file() {
        let (_dir, store) = fixture();
        let info = store.get("SimbiToken").unwrap().build_info().unwrap();
        assert_eq!(info.solc_long_version, "0.8.24+commit.e11b9ed9");
        assert_eq!(info.input["language"], "Solidity");
    }

    #[test]
    fn test_ambiguous_simple_name() {
        let dir = TempDir::new("shipyard-artifacts").unwrap();
        write_fixture(dir.path());
        let duplicate = dir.path().join("contracts/legacy/SimbiToken.sol/SimbiToken.json");
        std::fs::create_dir_all(duplicate.parent().unwrap()).unwrap();
        std::fs::write(
            &duplicate,
            json!({
                "_format": "hh-sol-artifact-1",
                "contractName": "SimbiToken",
                "sourceName": "contracts/legacy/SimbiToken.sol",
                "abi": [],
                "bytecode": "0x00"
            })
            .to_string(),
        )
        .unwrap();

        let store = ArtifactStore::load(dir.path()).unwrap();
        assert!(matches!(
            store.get("SimbiToken"),
            Err(ArtifactError::Ambiguous { .. })
        ));
        assert!(store.get("contracts/legacy/SimbiToken.sol:SimbiToken").is_ok());
    }

    #[test]
    fn test_unlinked_and_empty_bytecode() {
        let mut artifact = fixture().1.get("SimbiToken").unwrap().clone();
        artifact.bytecode = "0x".to_string();
        assert!(matches!(artifact.bytecode(), Err(ArtifactError::NoBytecode(_))));

        artifact.bytecode = "0x6080__$abcdef$__".to_string();
        assert!(matches!(
            artifact.bytecode(),
            Err(ArtifactError::UnlinkedLibraries(_))
        ));
    }
}
