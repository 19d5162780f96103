//! Hardware address normalization.
//!
//! Accepts either the bare 12-character form (`5C497D963611`) or the
//! colon-separated 17-character form (`5C:49:7D:96:36:11`) and always
//! produces the latter. Case is preserved as given.

use crate::error::{LinkError, Result};

/// Length of an address without separators
const BARE_LEN: usize = 12;
/// Length of a colon-separated address
const CANONICAL_LEN: usize = 17;

/// Normalize a hardware address to its canonical colon-separated form.
pub fn normalize(address: &str) -> Result<String> {
    let chars: Vec<char> = address.chars().collect();

    match chars.len() {
        CANONICAL_LEN => {
            let separators_ok = chars
                .iter()
                .enumerate()
                .filter(|(i, _)| i % 3 == 2)
                .all(|(_, c)| *c == ':');
            if !separators_ok {
                return Err(LinkError::MalformedAddress(address.to_string()));
            }
            Ok(address.to_string())
        }
        BARE_LEN => {
            let octets: Vec<String> = chars.chunks(2).map(|c| c.iter().collect()).collect();
            Ok(octets.join(":"))
        }
        _ => Err(LinkError::MalformedAddress(address.to_string())),
    }
}
