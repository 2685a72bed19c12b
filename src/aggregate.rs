//! Per-AS snapshot aggregation
//!
//! Groups the resolved (prefix, origin ASN) pairs of one address family
//! within one snapshot into per-ASN aggregates: the set of distinct announced
//! prefixes plus the total number of addresses they cover. The same prefix
//! attributed to two different ASNs counts toward both; within one ASN a
//! prefix is only ever counted once.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Address family of a prefix. The string forms double as storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Afi {
    V4,
    V6,
}

impl Afi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Afi::V4 => "v4",
            Afi::V6 => "v6",
        }
    }

    /// Both families, in the order they are committed for a snapshot date.
    pub fn both() -> [Afi; 2] {
        [Afi::V4, Afi::V6]
    }
}

impl std::fmt::Display for Afi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything one AS originated in one snapshot for one address family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsAggregate {
    /// Distinct canonical CIDR strings.
    pub prefixes: HashSet<String>,
    /// Sum of `2^(width - len)` over the distinct prefixes.
    pub ip_count: u128,
}

impl AsAggregate {
    /// Add one canonical prefix; re-adding is a no-op and the address count
    /// is only bumped on first insertion.
    pub fn insert(&mut self, net: IpNet) {
        if self.prefixes.insert(net.to_string()) {
            self.ip_count += prefix_ip_count(&net);
        }
    }

    /// Rebuild an aggregate from a set of canonical prefix strings,
    /// recomputing the address count from scratch.
    pub fn from_prefixes<I>(prefixes: I) -> Result<AsAggregate>
    where
        I: IntoIterator<Item = String>,
    {
        let mut agg = AsAggregate::default();
        for prefix in prefixes {
            agg.insert(normalize_prefix(&prefix)?);
        }
        Ok(agg)
    }
}

/// Number of addresses covered by a prefix: `2^(32 - len)` for v4,
/// `2^(128 - len)` for v6. A v6 default route would need 2^128, one more
/// than `u128` can hold; the count saturates there.
pub fn prefix_ip_count(net: &IpNet) -> u128 {
    let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

/// Parse a prefix string into its canonical network form.
///
/// Strict: a string that does not parse as CIDR, or whose address has bits
/// set below the mask, is a `ParseError` (fatal for the current family of
/// the file being loaded).
pub fn normalize_prefix(prefix: &str) -> Result<IpNet> {
    let net: IpNet = prefix.parse().map_err(|e| LoaderError::Parse {
        prefix: prefix.to_string(),
        reason: format!("{e}"),
    })?;
    if net.addr() != net.network() {
        return Err(LoaderError::Parse {
            prefix: prefix.to_string(),
            reason: "host bits set".to_string(),
        }
        .into());
    }
    Ok(net.trunc())
}

/// Group the resolved (prefix, origin ASN) pairs of one family into a map
/// from ASN to its aggregate.
pub fn aggregate_origins<I>(pairs: I) -> Result<HashMap<String, AsAggregate>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut aggregates: HashMap<String, AsAggregate> = HashMap::new();
    for (prefix, asn) in pairs {
        let net = normalize_prefix(&prefix)?;
        aggregates.entry(asn).or_default().insert(net);
    }
    Ok(aggregates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(prefix: &str, asn: &str) -> (String, String) {
        (prefix.to_string(), asn.to_string())
    }

    #[test]
    fn test_prefix_ip_count() {
        let v4: IpNet = "10.0.0.0/24".parse().unwrap();
        assert_eq!(prefix_ip_count(&v4), 256);

        let v6: IpNet = "2001:db8::/32".parse().unwrap();
        assert_eq!(prefix_ip_count(&v6), 1u128 << 96);

        let all_v6: IpNet = "::/0".parse().unwrap();
        assert_eq!(prefix_ip_count(&all_v6), u128::MAX);
    }

    #[test]
    fn test_ip_counting() {
        let aggs = aggregate_origins([
            pair("10.0.0.0/24", "65000"),
            pair("10.0.1.0/24", "65000"),
        ])
        .unwrap();
        assert_eq!(aggs["65000"].ip_count, 512);
        assert_eq!(aggs["65000"].prefixes.len(), 2);
    }

    #[test]
    fn test_duplicate_prefix_not_double_counted() {
        let aggs = aggregate_origins([
            pair("10.0.0.0/24", "65000"),
            pair("10.0.1.0/24", "65000"),
            pair("10.0.0.0/24", "65000"),
        ])
        .unwrap();
        assert_eq!(aggs["65000"].ip_count, 512);
        assert_eq!(aggs["65000"].prefixes.len(), 2);
    }

    #[test]
    fn test_same_prefix_counted_per_asn() {
        let aggs = aggregate_origins([
            pair("10.0.0.0/24", "65000"),
            pair("10.0.0.0/24", "65001"),
        ])
        .unwrap();
        assert_eq!(aggs["65000"].ip_count, 256);
        assert_eq!(aggs["65001"].ip_count, 256);
    }

    #[test]
    fn test_invalid_prefix_is_fatal() {
        assert!(aggregate_origins([pair("not-a-prefix", "65000")]).is_err());
        // host bits below the mask
        assert!(aggregate_origins([pair("10.0.0.1/24", "65000")]).is_err());
    }

    #[test]
    fn test_from_prefixes_recomputes_count() {
        let agg = AsAggregate::from_prefixes([
            "10.0.0.0/24".to_string(),
            "10.0.1.0/24".to_string(),
            "10.0.0.0/24".to_string(),
        ])
        .unwrap();
        assert_eq!(agg.ip_count, 512);
        assert_eq!(agg.prefixes.len(), 2);
    }

    #[test]
    fn test_afi_strings() {
        assert_eq!(Afi::V4.to_string(), "v4");
        assert_eq!(Afi::V6.to_string(), "v6");
    }
}
