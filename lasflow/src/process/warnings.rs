//! Detection of warnings printed by tools that still exit successfully.

use regex::Regex;
use std::sync::OnceLock;

fn warning_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"(?i)^\s*warning\b\s*:?\s*(.*)$").expect("warning pattern is valid")
    })
}

/// Returns the warning lines found in captured tool output, in order.
#[must_use]
pub fn scan_warnings(stdout: &str, stderr: &str) -> Vec<String> {
    stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| warning_line().is_match(line))
        .map(|line| line.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_warnings() {
        let stderr = "processing tile_0_0.laz\nWARNING: 12 points outside of bounding box\nwarning tile is empty\ndone\n";
        let warnings = scan_warnings("", stderr);

        assert_eq!(
            warnings,
            vec![
                "WARNING: 12 points outside of bounding box".to_string(),
                "warning tile is empty".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_false_positives() {
        let stdout = "no warnings were issued\nwarnings_total=0\n";
        assert!(scan_warnings(stdout, "").is_empty());
    }
}
