use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

/// vNFT contract on Ethereum mainnet.
pub const MAINNET_CONTRACT_ADDRESS: &str = "0x57f0B53926dd62f2E26bc40B30140AbEA474DA94";
/// Block the mainnet contract was created in. No contract logs exist below it.
pub const MAINNET_CREATION_BLOCK: u64 = 11_023_280;

pub const DEFAULT_MAINNET_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Mainnet,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Mainnet => "mainnet",
            DeploymentEnv::Local => "local",
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            DeploymentEnv::Mainnet => DEFAULT_MAINNET_RPC_URL,
            DeploymentEnv::Local => DEFAULT_LOCAL_RPC_URL,
        }
    }

    /// The record used when nothing has been stored for this network.
    pub fn builtin_record(self) -> Option<DeploymentRecord> {
        match self {
            DeploymentEnv::Mainnet => Some(DeploymentRecord {
                recorded_at: None,
                contract_address: MAINNET_CONTRACT_ADDRESS.to_string(),
                network_url: DEFAULT_MAINNET_RPC_URL.to_string(),
                creation_block: MAINNET_CREATION_BLOCK,
            }),
            DeploymentEnv::Local => None,
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Mainnet => "Mainnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(default)]
    pub recorded_at: Option<String>,
    pub contract_address: String,
    pub network_url: String,
    pub creation_block: u64,
}

#[derive(Debug)]
pub struct DeploymentStore {
    env: DeploymentEnv,
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Self {
        Self::at(DEPLOYMENTS_ROOT, env)
    }

    pub fn at(root: impl AsRef<Path>, env: DeploymentEnv) -> Self {
        let path = root.as_ref().join(env.dir_name()).join(DEPLOYMENTS_FILE);
        Self { env, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored record, or `None` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        read_record(&self.path)
    }

    /// Stored record, falling back to the network's built-in record.
    pub fn load_or_builtin(&self) -> Result<Option<DeploymentRecord>> {
        Ok(self.load()?.or_else(|| self.env.builtin_record()))
    }

    pub fn save(&self, record: &DeploymentRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "Failed to create {}/{} directory",
                    DEPLOYMENTS_ROOT,
                    self.env.dir_name()
                )
            })?;
        }
        write_record(&self.path, record)
    }
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) || data.is_empty() {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}

fn write_record(path: impl AsRef<Path>, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .context("Failed to serialize deployment record")?;
    fs::write(path.as_ref(), json).context("Failed to write deployment record")?;
    Ok(())
}

pub fn record_contract(
    root: impl AsRef<Path>,
    env: DeploymentEnv,
    contract_address: impl AsRef<str>,
    network_url: impl AsRef<str>,
    creation_block: u64,
) -> Result<DeploymentRecord> {
    let store = DeploymentStore::at(root, env);
    let record = DeploymentRecord {
        recorded_at: Some(Utc::now().to_rfc3339()),
        contract_address: contract_address.as_ref().to_string(),
        network_url: network_url.as_ref().to_string(),
        creation_block,
    };
    store.save(&record)?;
    Ok(record)
}
