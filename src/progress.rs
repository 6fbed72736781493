//! # Stats/progress
//!
//! Per-folder counters and the single rewriting status line printed during
//! pack/unpack (§2, §7): a `StatusLine` that overwrites itself in place on
//! stderr, and a helper that reduces a run's per-folder byte totals down to
//! the top five for the end-of-run summary block. Grounded on the
//! reference archiver's own progress reporting in `main.rs`/`cli_runner.rs`
//! (`eprint!("\r\x1B[2K{}", line)`, flushed after every update, a trailing
//! newline once the operation finishes) -- simplified from its atomic
//! multi-thread `ProgressTracker` down to the single rewriting line this
//! crate's serial writer loop actually needs.

use std::io::{self, Write};

/// A status line on stderr that rewrites itself instead of scrolling.
pub struct StatusLine {
    last_len: usize,
}

impl StatusLine {
    pub fn new() -> Self {
        Self { last_len: 0 }
    }

    /// Clears the previous line and prints `message` in its place.
    pub fn update(&mut self, message: &str) {
        eprint!("\r\x1B[2K{message}");
        let _ = io::stderr().flush();
        self.last_len = message.len();
    }

    /// Prints a trailing newline so the next output starts on a fresh line.
    /// A no-op if `update` was never called.
    pub fn finish(&mut self) {
        if self.last_len > 0 {
            eprintln!();
            self.last_len = 0;
        }
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the `n` largest `(folder, uncompressed_bytes)` pairs, descending
/// by size, for the end-of-run summary block (§7).
pub fn top_folders_by_size(folders: &[(String, u64)], n: usize) -> Vec<(String, u64)> {
    let mut sorted: Vec<(String, u64)> = folders.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_folders_keeps_the_largest_five_descending() {
        let folders = vec![
            ("a".to_string(), 10),
            ("b".to_string(), 50),
            ("c".to_string(), 5),
            ("d".to_string(), 40),
            ("e".to_string(), 30),
            ("f".to_string(), 20),
            ("g".to_string(), 1),
        ];
        let top = top_folders_by_size(&folders, 5);
        let sizes: Vec<u64> = top.iter().map(|(_, size)| *size).collect();
        assert_eq!(sizes, vec![50, 40, 30, 20, 10]);
    }

    #[test]
    fn fewer_folders_than_n_returns_all_of_them() {
        let folders = vec![("only".to_string(), 7)];
        let top = top_folders_by_size(&folders, 5);
        assert_eq!(top, vec![("only".to_string(), 7)]);
    }

    #[test]
    fn ties_break_lexicographically_for_determinism() {
        let folders = vec![("z".to_string(), 10), ("a".to_string(), 10)];
        let top = top_folders_by_size(&folders, 5);
        assert_eq!(top, vec![("a".to_string(), 10), ("z".to_string(), 10)]);
    }
}
