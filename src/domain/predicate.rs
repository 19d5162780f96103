//! Device match predicate built once from a [`SearchConfig`].

use crate::domain::address;
use crate::domain::settings::SearchConfig;
use crate::error::{LinkError, Result};
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone)]
enum Matcher {
    /// Exact match on the canonical address
    Address(String),
    /// Unanchored match on the advertised name
    Name(Regex),
}

/// Boolean match over `(address, name)`, immutable for one search.
#[derive(Debug, Clone)]
pub struct DevicePredicate {
    matcher: Matcher,
}

impl DevicePredicate {
    /// Build the predicate. A non-empty address wins over the name pattern.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        if let Some(addr) = config.address.as_deref().filter(|a| !a.is_empty()) {
            let canonical = address::normalize(addr)?;
            return Ok(Self {
                matcher: Matcher::Address(canonical),
            });
        }

        if let Some(pattern) = config.name_pattern.as_deref().filter(|p| !p.is_empty()) {
            let regex = Regex::new(pattern)?;
            return Ok(Self {
                matcher: Matcher::Name(regex),
            });
        }

        Err(LinkError::Configuration)
    }

    pub fn matches(&self, address: &str, name: &str) -> bool {
        match &self.matcher {
            Matcher::Address(expected) => address == expected,
            Matcher::Name(regex) => regex.is_match(name),
        }
    }
}

impl fmt::Display for DevicePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Address(addr) => write!(f, "address == {}", addr),
            Matcher::Name(regex) => write!(f, "name =~ /{}/", regex.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: Option<&str>, pattern: Option<&str>) -> SearchConfig {
        SearchConfig {
            address: address.map(str::to_string),
            name_pattern: pattern.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_address_wins_over_pattern() {
        let predicate =
            DevicePredicate::from_config(&config(Some("AA:BB:CC:DD:EE:FF"), Some(".*"))).unwrap();

        assert!(predicate.matches("AA:BB:CC:DD:EE:FF", "anything"));
        assert!(!predicate.matches("AA:BB:CC:DD:EE:00", "anything"));
        // Exact on the canonical form
        assert!(!predicate.matches("aa:bb:cc:dd:ee:ff", "anything"));
    }

    #[test]
    fn test_bare_address_is_normalized() {
        let predicate = DevicePredicate::from_config(&config(Some("AABBCCDDEEFF"), None)).unwrap();
        assert!(predicate.matches("AA:BB:CC:DD:EE:FF", ""));
    }

    #[test]
    fn test_name_pattern_unanchored() {
        let predicate = DevicePredicate::from_config(&config(None, Some("(?i)k850$"))).unwrap();

        assert!(predicate.matches("00:00:00:00:00:00", "Samsung Sound Bar K850"));
        assert!(predicate.matches("00:00:00:00:00:00", "soundbar-k850"));
        assert!(!predicate.matches("00:00:00:00:00:00", "K851"));
    }

    #[test]
    fn test_empty_address_falls_through_to_pattern() {
        let predicate = DevicePredicate::from_config(&config(Some(""), Some("Speaker"))).unwrap();
        assert!(predicate.matches("11:22:33:44:55:66", "Kitchen Speaker"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            DevicePredicate::from_config(&config(None, None)),
            Err(LinkError::Configuration)
        ));
        assert!(matches!(
            DevicePredicate::from_config(&config(Some(""), Some(""))),
            Err(LinkError::Configuration)
        ));
        assert!(matches!(
            DevicePredicate::from_config(&config(Some("AA-BB"), None)),
            Err(LinkError::MalformedAddress(_))
        ));
        assert!(matches!(
            DevicePredicate::from_config(&config(None, Some("(unclosed"))),
            Err(LinkError::InvalidPattern(_))
        ));
    }
}
