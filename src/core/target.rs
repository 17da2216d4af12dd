// src/core/target.rs

use std::fmt;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::core::error::ValidationError;

/// Longest textual domain name accepted.
const MAX_DOMAIN_LEN: usize = 253;

static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap());
static RE_TLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2,63}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Ipv4,
    Domain,
}

/// A validated host. Only [`Target::parse`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    kind: TargetKind,
    raw: String,
    host: String,
    #[serde(serialize_with = "serialize_url")]
    url: Url,
}

fn serialize_url<S: serde::Serializer>(url: &Url, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(url.as_str())
}

impl Target {
    /// Classifies `input` as an IPv4 address or a fully qualified domain name.
    ///
    /// Surrounding whitespace is ignored; `raw` keeps the input as entered.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let host = input.trim();

        let (kind, host, scheme) = if let Some(ip) = parse_ipv4(host) {
            (TargetKind::Ipv4, ip.to_string(), "http")
        } else if is_domain(host) {
            (TargetKind::Domain, host.to_ascii_lowercase(), "https")
        } else {
            return Err(ValidationError::InvalidTarget(input.to_string()));
        };

        let url = Url::parse(&format!("{}://{}/", scheme, host))
            .map_err(|_| ValidationError::InvalidTarget(input.to_string()))?;

        Ok(Self { kind, raw: input.to_string(), host, url })
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The canonical host: dotted-decimal for addresses, lower-case for domains.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// URL used by HTTP based probes. Addresses get `http://`, domains `https://`.
    pub fn normalized_url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)
    }
}

/// Four dot-separated decimal groups, each 0-255. Leading zeros are read as decimal.
fn parse_ipv4(input: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut groups = input.split('.');
    for octet in octets.iter_mut() {
        let group = groups.next()?;
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = group.parse().ok()?;
    }
    if groups.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

fn is_domain(input: &str) -> bool {
    if input.is_empty() || input.len() > MAX_DOMAIN_LEN {
        return false;
    }
    let labels: Vec<&str> = input.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let Some(tld) = labels.last() else {
        return false;
    };
    labels.iter().all(|label| RE_LABEL.is_match(label)) && RE_TLD.is_match(tld)
}
