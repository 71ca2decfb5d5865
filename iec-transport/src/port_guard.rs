//! Process-wide serial port exclusivity
//!
//! One readout session occupies its port exclusively. The registry replaces
//! the implicit "is the port already open" global state of older adapters
//! with an explicit claim value owned by exactly one in-flight session.

use iec_core::{IecError, IecResult};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

static OPEN_PORTS: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Exclusive claim on one port path, released on drop
#[derive(Debug)]
pub struct PortClaim {
    path: String,
}

impl PortClaim {
    /// Claimed port path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for PortClaim {
    fn drop(&mut self) {
        let mut ports = OPEN_PORTS
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        ports.remove(&self.path);
    }
}

/// Claim `path` for exclusive use
///
/// Fails with `PortUnavailable` while another claim on the same path is
/// outstanding. Distinct paths are independent.
pub fn claim(path: &str) -> IecResult<PortClaim> {
    let mut ports = OPEN_PORTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if !ports.insert(path.to_string()) {
        return Err(IecError::PortUnavailable(format!(
            "{} is held by another session",
            path
        )));
    }
    Ok(PortClaim {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iec_core::ErrorKind;

    #[test]
    fn test_second_claim_refused() {
        let first = claim("/dev/ttyTEST0").unwrap();
        let second = claim("/dev/ttyTEST0");
        assert_eq!(second.unwrap_err().kind(), ErrorKind::PortUnavailable);
        drop(first);
        // Released claims can be taken again
        let third = claim("/dev/ttyTEST0").unwrap();
        assert_eq!(third.path(), "/dev/ttyTEST0");
    }

    #[test]
    fn test_distinct_ports_independent() {
        let a = claim("/dev/ttyTEST1").unwrap();
        let b = claim("/dev/ttyTEST2").unwrap();
        drop(a);
        drop(b);
    }
}
