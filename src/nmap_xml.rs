//! Decoding of nmap's XML report (`-oX`) into [`ScanResults`].
//!
//! Only the parts of the document this tool reads are modelled; everything else
//! (`scaninfo`, `taskbegin`, `times`, `os`, ...) is skipped by serde.

use serde::Deserialize;

use crate::error::{ScanError, ScanResult};
use crate::types::{HostScan, PortRecord, ScanResults, ScriptOutput};

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "@args", default)]
    args: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "host", default)]
    hosts: Vec<XmlHost>,
    #[serde(default)]
    runstats: Option<XmlRunStats>,
}

#[derive(Debug, Deserialize)]
struct XmlRunStats {
    #[serde(default)]
    finished: Option<XmlFinished>,
}

#[derive(Debug, Deserialize)]
struct XmlFinished {
    #[serde(rename = "@elapsed", default)]
    elapsed: Option<String>,
    #[serde(rename = "@exit", default)]
    exit: Option<String>,
    #[serde(rename = "@errormsg", default)]
    errormsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlHost {
    #[serde(default)]
    status: Option<XmlStatus>,
    #[serde(rename = "address", default)]
    addresses: Vec<XmlAddress>,
    #[serde(default)]
    hostnames: Option<XmlHostnames>,
    #[serde(default)]
    ports: Option<XmlPorts>,
}

#[derive(Debug, Deserialize)]
struct XmlStatus {
    #[serde(rename = "@state", default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct XmlAddress {
    #[serde(rename = "@addr")]
    addr: String,
    #[serde(rename = "@addrtype", default)]
    addrtype: String,
}

#[derive(Debug, Default, Deserialize)]
struct XmlHostnames {
    #[serde(rename = "hostname", default)]
    names: Vec<XmlHostname>,
}

#[derive(Debug, Deserialize)]
struct XmlHostname {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct XmlPorts {
    #[serde(rename = "port", default)]
    ports: Vec<XmlPort>,
}

#[derive(Debug, Deserialize)]
struct XmlPort {
    #[serde(rename = "@protocol")]
    protocol: String,
    #[serde(rename = "@portid")]
    portid: u16,
    state: XmlState,
    #[serde(default)]
    service: Option<XmlService>,
    #[serde(rename = "script", default)]
    scripts: Vec<XmlScript>,
}

#[derive(Debug, Deserialize)]
struct XmlState {
    #[serde(rename = "@state")]
    state: String,
    #[serde(rename = "@reason", default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct XmlService {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@product", default)]
    product: Option<String>,
    #[serde(rename = "@version", default)]
    version: Option<String>,
    #[serde(rename = "@extrainfo", default)]
    extrainfo: Option<String>,
    #[serde(rename = "cpe", default)]
    cpe: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct XmlScript {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@output", default)]
    output: String,
}

/// Decode an nmap XML document.
///
/// Hosts are keyed by the IPv4/IPv6 address nmap reported, which may differ from
/// the target given on the command line. `scanned_at` is left empty for the caller.
pub fn parse_nmap_xml(xml: &str) -> ScanResult<ScanResults> {
    let run: NmapRun = quick_xml::de::from_str(xml)?;

    let finished = run.runstats.and_then(|r| r.finished);
    if let Some(f) = &finished {
        if f.exit.as_deref() == Some("error") {
            let msg = non_empty(f.errormsg.clone())
                .unwrap_or_else(|| "nmap reported an error".to_string());
            return Err(ScanError::Nmap(msg));
        }
    }
    let elapsed_secs = finished
        .and_then(|f| f.elapsed)
        .and_then(|e| e.parse::<f64>().ok());

    let mut results = ScanResults {
        command_line: run.args,
        nmap_version: run.version,
        elapsed_secs,
        ..ScanResults::default()
    };

    for host in run.hosts {
        let Some(key) = host
            .addresses
            .iter()
            .find(|a| a.addrtype == "ipv4" || a.addrtype == "ipv6")
            .map(|a| a.addr.clone())
        else {
            continue;
        };

        let mut scan = HostScan {
            state: host.status.map(|s| s.state).unwrap_or_default(),
            hostnames: host
                .hostnames
                .unwrap_or_default()
                .names
                .into_iter()
                .map(|h| h.name)
                .collect(),
            ..HostScan::default()
        };

        for port in host.ports.unwrap_or_default().ports {
            let record = port_record(port.state, port.service, port.scripts);
            scan.protocols
                .entry(port.protocol)
                .or_default()
                .insert(port.portid, record);
        }

        results.hosts.insert(key, scan);
    }

    Ok(results)
}

fn port_record(
    state: XmlState,
    service: Option<XmlService>,
    scripts: Vec<XmlScript>,
) -> PortRecord {
    let mut record = PortRecord {
        state: state.state,
        reason: state.reason,
        scripts: scripts
            .into_iter()
            .map(|s| ScriptOutput {
                id: s.id,
                output: s.output,
            })
            .collect(),
        ..PortRecord::default()
    };
    if let Some(svc) = service {
        record.name = svc.name;
        record.product = non_empty(svc.product);
        record.version = non_empty(svc.version);
        record.extrainfo = non_empty(svc.extrainfo);
        record.cpe = svc.cpe;
    }
    record
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}
