// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::{BfnetError, ErrorKind, IpVersion};

const SEARCH_KEY: &str = "search";
const NAMESERVER_KEY: &str = "nameserver";

/// Desired change of the search domain list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchUpdate {
    /// Keep domains currently stored
    #[default]
    Keep,
    /// Replace stored domains, an empty list removes the `search` line
    Replace(Vec<String>),
}

impl SearchUpdate {
    /// Build from user supplied domains, a list holding only blank entries
    /// means clearing all domains.
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Replace(
            domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
        )
    }
}

/// Explicitly supplied nameservers. When both lists are empty the stored
/// nameservers are kept, otherwise they are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct NameserverUpdate {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl NameserverUpdate {
    pub fn new(ipv4: Vec<String>, ipv6: Vec<String>) -> Self {
        Self { ipv4, ipv6 }
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), BfnetError> {
        for (addrs, expected) in
            [(&self.ipv4, IpVersion::V4), (&self.ipv6, IpVersion::V6)]
        {
            for addr in addrs.iter().filter(|a| !a.trim().is_empty()) {
                if IpVersion::classify(addr) != expected {
                    return Err(BfnetError::new(
                        ErrorKind::InvalidArgument,
                        format!("Expecting {expected} nameserver, got '{addr}'"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Content of resolver file, process wide.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct ResolverConfig {
    pub search_domains: Vec<String>,
    pub nameservers: Vec<String>,
}

impl ResolverConfig {
    pub fn load(path: &Path) -> Result<Self, BfnetError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BfnetError::new(
                ErrorKind::ConfigLoadError,
                format!(
                    "Failed to read configuration file {}: {e}",
                    path.display()
                ),
            )
        })?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut ret = Self::default();
        for line in content.lines() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some(SEARCH_KEY) => {
                    ret.search_domains = tokens.map(ToString::to_string).collect();
                }
                Some(NAMESERVER_KEY) => {
                    if let Some(addr) = tokens.next() {
                        ret.nameservers.push(addr.to_string());
                    }
                }
                _ => (),
            }
        }
        ret
    }

    pub fn ipv4_nameservers(&self) -> Vec<&str> {
        self.nameservers_of(IpVersion::V4)
    }

    pub fn ipv6_nameservers(&self) -> Vec<&str> {
        self.nameservers_of(IpVersion::V6)
    }

    fn nameservers_of(&self, version: IpVersion) -> Vec<&str> {
        self.nameservers
            .iter()
            .map(String::as_str)
            .filter(|n| IpVersion::classify(n) == version)
            .collect()
    }

    pub fn set_search(&mut self, update: &SearchUpdate) {
        if let SearchUpdate::Replace(domains) = update {
            self.search_domains = domains.clone();
        }
    }

    pub fn set_nameservers(&mut self, update: &NameserverUpdate) {
        if update.is_empty() {
            return;
        }
        self.nameservers = update
            .ipv4
            .iter()
            .chain(update.ipv6.iter())
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(ToString::to_string)
            .collect();
    }

    pub fn to_file_content(&self) -> String {
        let mut ret = String::new();
        if !self.search_domains.is_empty() {
            ret.push_str(&format!(
                "{SEARCH_KEY} {}\n",
                self.search_domains.join(" ")
            ));
        }
        for nameserver in
            self.nameservers.iter().filter(|n| !n.trim().is_empty())
        {
            ret.push_str(&format!("{NAMESERVER_KEY} {nameserver}\n"));
        }
        ret
    }

    pub fn save(&self, path: &Path) -> Result<(), BfnetError> {
        std::fs::write(path, self.to_file_content()).map_err(|e| {
            BfnetError::new(
                ErrorKind::ConfigWriteError,
                format!(
                    "Failed to write to the configuration file {}: {e}",
                    path.display()
                ),
            )
        })
    }
}
