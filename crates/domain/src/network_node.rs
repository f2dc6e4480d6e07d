use ipnetwork::IpNetwork;
use std::net::IpAddr;

use crate::{DomainError, Geolocation};

/// A coverage-zone entry: the cache group a client network is bound to, and
/// where that network sits.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNode {
    pub loc: Option<String>,
    pub geolocation: Option<Geolocation>,
}

impl NetworkNode {
    pub fn new(loc: Option<&str>, geolocation: Option<Geolocation>) -> Self {
        Self {
            loc: loc.map(str::to_string),
            geolocation,
        }
    }
}

/// CIDR table answering with the most specific network containing an address.
#[derive(Debug, Clone)]
pub struct NetworkTable<T> {
    networks: Vec<(IpNetwork, T)>,
}

impl<T> Default for NetworkTable<T> {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
        }
    }
}

impl<T> NetworkTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cidr: &str, value: T) -> Result<(), DomainError> {
        let network: IpNetwork = cidr
            .trim()
            .parse()
            .map_err(|e| DomainError::InvalidCidr(format!("{cidr}: {e}")))?;
        self.networks.push((network, value));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Longest-prefix match; the first inserted wins between equal prefixes.
    pub fn lookup(&self, ip: IpAddr) -> Option<&T> {
        let mut best: Option<(u8, &T)> = None;

        for (network, value) in &self.networks {
            if !network.contains(ip) {
                continue;
            }
            let prefix = network.prefix();
            match best {
                Some((existing, _)) if prefix <= existing => {}
                _ => best = Some((prefix, value)),
            }
        }

        best.map(|(_, value)| value)
    }
}
