//! Junk-file filter applied during the pack-time walk, before hashing and
//! before compression. The unpacker never filters -- whatever the archive
//! holds, it writes.

const IGNORED_EXACT: &[&str] = &[".DS_Store", "._.DS_Store", "Thumbs.db", "desktop.ini"];
const IGNORED_PREFIXES: &[&str] = &["._"];

/// Returns true if `filename` should be excluded from packing.
pub fn should_ignore(filename: &str) -> bool {
    IGNORED_EXACT.contains(&filename) || IGNORED_PREFIXES.iter().any(|p| filename.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_are_ignored() {
        for name in IGNORED_EXACT {
            assert!(should_ignore(name));
        }
    }

    #[test]
    fn prefix_matches_are_ignored() {
        assert!(should_ignore("._resource_fork"));
        assert!(should_ignore("._"));
    }

    #[test]
    fn ordinary_files_are_kept() {
        assert!(!should_ignore("main.rs"));
        assert!(!should_ignore("style.css.br"));
        assert!(!should_ignore("DS_Store")); // not the dotted form
    }
}
