use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// Common reconnaissance ports: far faster than all 65535 and still informative.
const COMMON_PORTS: &[u16] = &[
    20, 21, 22, 23, 25, 53, 67, 68, 69, 80, 88, 110, 111, 119, 123, 135, 137, 138, 139, 143, 161,
    179, 194, 389, 427, 443, 445, 465, 500, 512, 513, 514, 515, 520, 548, 554, 587, 623, 631, 636,
    989, 990, 993, 995, 1433, 1434, 1521, 1723, 2049, 2082, 2083, 2086, 2087, 2181, 2222, 2375,
    2376, 2483, 2484, 3000, 3128, 3260, 3306, 3389, 3690, 4444, 5000, 5001, 5060, 5061, 5432, 5601,
    5800, 5900, 5985, 5986, 6379, 6443, 6667, 7001, 7002, 7443, 7777, 8000, 8008, 8009, 8080, 8081,
    8082, 8088, 8090, 8091, 8181, 8333, 8443, 8500, 8888, 9000, 9042, 9080, 9090, 9091, 9100, 9200,
    9443, 9999, 10000, 11211, 27017,
];

/// The curated list of well-known service ports scanned by default.
pub fn default_ports() -> Vec<u16> {
    COMMON_PORTS.to_vec()
}

/// Join ports into the comma separated form nmap's `-p` expects: `22,80,443`.
pub fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// One entry of a port spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortItem {
    Single(u16),
    /// Inclusive range.
    Range(u16, u16),
}

impl fmt::Display for PortItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortItem::Single(p) => write!(f, "{p}"),
            PortItem::Range(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/// Ports handed to nmap, kept in the order given. `Display` yields nmap syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    items: Vec<PortItem>,
}

impl PortSpec {
    pub fn items(&self) -> &[PortItem] {
        &self.items
    }

    /// Number of individual ports covered, counting repeats.
    pub fn port_count(&self) -> usize {
        self.items
            .iter()
            .map(|i| match *i {
                PortItem::Single(_) => 1,
                PortItem::Range(a, b) => (b - a) as usize + 1,
            })
            .sum()
    }
}

impl Default for PortSpec {
    fn default() -> Self {
        Self {
            items: COMMON_PORTS.iter().copied().map(PortItem::Single).collect(),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Parse a port spec such as `22,80,8000-8010` or `10-30`.
///
/// Entries are separated by commas or newlines:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
/// - comments: everything after `#` on a line is ignored
/// - whitespace and blank entries are ignored
pub fn parse_port_spec(s: &str) -> Result<PortSpec> {
    let mut items = Vec::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().unwrap_or("");
        for entry in line.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if let Some((a, b)) = entry.split_once('-') {
                let start = parse_port_str(a.trim())
                    .with_context(|| format!("line {line_no}: invalid start in range: {entry}"))?;
                let end = parse_port_str(b.trim())
                    .with_context(|| format!("line {line_no}: invalid end in range: {entry}"))?;
                if start > end {
                    bail!("line {line_no}: invalid range {start}-{end} (start > end)");
                }
                items.push(if start == end {
                    PortItem::Single(start)
                } else {
                    PortItem::Range(start, end)
                });
                continue;
            }

            let p = parse_port_str(entry)
                .with_context(|| format!("line {line_no}: invalid port value: {entry}"))?;
            items.push(PortItem::Single(p));
        }
    }

    if items.is_empty() {
        bail!("port spec is empty");
    }
    Ok(PortSpec { items })
}

/// Load a port spec from a file, one port or range per line.
pub fn load_port_spec_from_path(path: impl AsRef<Path>) -> Result<PortSpec> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read ports file: {}", path.as_ref().display()))?;
    parse_port_spec(&content)
        .with_context(|| format!("invalid ports file: {}", path.as_ref().display()))
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_keeps_curated_order() {
        let d = default_ports();
        assert_eq!(d.len(), 109);
        assert_eq!(&d[..3], &[20, 21, 22]);
        assert_eq!(d.last(), Some(&27017));
    }

    #[test]
    fn join_is_comma_separated() {
        assert_eq!(join_ports(&[22, 80, 443]), "22,80,443");
        assert_eq!(join_ports(&[]), "");
    }

    #[test]
    fn default_spec_matches_joined_list() {
        assert_eq!(PortSpec::default().to_string(), join_ports(&default_ports()));
    }

    #[test]
    fn parse_range_variant() {
        let spec = parse_port_spec("10-30").unwrap();
        assert_eq!(spec.items(), &[PortItem::Range(10, 30)]);
        assert_eq!(spec.port_count(), 21);
        assert_eq!(spec.to_string(), "10-30");
    }

    #[test]
    fn parse_mixed_list_keeps_order() {
        let spec = parse_port_spec(" 443, 22 ,8000-8002,80").unwrap();
        assert_eq!(spec.to_string(), "443,22,8000-8002,80");
    }

    #[test]
    fn degenerate_range_collapses() {
        let spec = parse_port_spec("25-25").unwrap();
        assert_eq!(spec.items(), &[PortItem::Single(25)]);
    }

    #[test]
    fn invalid_values_error() {
        assert!(parse_port_spec("70000").is_err());
        assert!(parse_port_spec("0").is_err());
        assert!(parse_port_spec("30-10").is_err());
        assert!(parse_port_spec("http").is_err());
        assert!(parse_port_spec(" # nothing here\n").is_err());
    }
}
