//! `fdb_version`.

/// Crate version encoded as `major*10000 + minor*100 + patch`, parsed once
/// from `Cargo.toml` via `env!("CARGO_PKG_VERSION")`.
fn encoded_version() -> u32 {
    use once_cell::sync::Lazy;
    static ENCODED: Lazy<u32> = Lazy::new(|| {
        let raw = env!("CARGO_PKG_VERSION");
        let mut parts = raw.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        let patch = parts.next().unwrap_or(0);
        major * 10_000 + minor * 100 + patch
    });
    *ENCODED
}

/// Returns the crate version encoded as `major*10000 + minor*100 + patch`.
#[no_mangle]
pub extern "C" fn fdb_version() -> u32 {
    encoded_version()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_current_cargo_version() {
        let v = encoded_version();
        assert_eq!(v / 10_000, 0);
    }
}
