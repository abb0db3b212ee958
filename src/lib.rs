//! Library crate for nmap-recon: port lists, the nmap runner, XML decoding and reporting.
pub mod cli;
pub mod error;
pub mod nmap_xml;
pub mod ports;
pub mod report;
pub mod scanner;
pub mod types;
