//! HTTP room server
//!
//! Games are rule bases read once at startup. Every room is a live
//! environment built from one game.

mod clients;
mod games;
pub mod http;
mod payload;
pub mod tls;

pub use games::{Game, RuleSource};

const ID_LEN: usize = 16;

/// A random 16-hex-character id for which `taken` is false
fn unique_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(ID_LEN);
        if !taken(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sixteen_hex_chars() {
        let id = unique_id(|_| false);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_taken_ids_are_skipped() {
        let first = unique_id(|_| false);
        let second = unique_id(|id| id == first);
        assert_ne!(first, second);
    }
}
