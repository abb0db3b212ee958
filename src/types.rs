use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Port number → record. Unordered; consumers sort port numbers themselves.
pub type PortTable = HashMap<u16, PortRecord>;

/// Output of one default script run against a port.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub id: String,
    pub output: String,
}

/// Per-port service record as reported by nmap.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRecord {
    pub state: String,
    #[serde(default)]
    pub reason: String,
    /// Service name, empty when nmap could not name it.
    #[serde(default)]
    pub name: String,
    pub product: Option<String>,
    pub version: Option<String>,
    pub extrainfo: Option<String>,
    #[serde(default)]
    pub cpe: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<ScriptOutput>,
}

impl PortRecord {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

/// One scanned host: protocol name ("tcp", "udp", ...) → port table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HostScan {
    pub state: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
    pub protocols: BTreeMap<String, PortTable>,
}

/// Everything one nmap invocation reported, keyed by nmap's own host identifiers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScanResults {
    pub command_line: String,
    pub nmap_version: String,
    pub scanned_at: String,
    pub elapsed_secs: Option<f64>,
    pub hosts: BTreeMap<String, HostScan>,
}

impl ScanResults {
    pub fn open_count(&self) -> usize {
        self.hosts
            .values()
            .flat_map(|h| h.protocols.values())
            .flat_map(|t| t.values())
            .filter(|r| r.is_open())
            .count()
    }
}
