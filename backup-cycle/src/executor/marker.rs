//! Success marker written by the backup tool at the end of its log.
//!
//! A successful run ends with a line such as
//! `240502 03:00:11  innobackupex: completed OK!`.

const COMPLETED_OK: &str = "completed OK!";

/// Whether the last non-empty line of `log` is a timestamped completion line.
pub fn completed_ok(log: &str) -> bool {
    log.lines()
        .rev()
        .map(str::trim_end)
        .find(|line| !line.is_empty())
        .is_some_and(|line| {
            line.starts_with(|c: char| c.is_ascii_digit()) && line.ends_with(COMPLETED_OK)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_on_last_line() {
        let log = "\
240502 03:00:01  innobackupex: Starting the backup operation
240502 03:00:10  innobackupex: Backup created in directory '/backups/20240502_full'
240502 03:00:11  innobackupex: completed OK!
";
        assert!(completed_ok(log));
    }

    #[test]
    fn test_trailing_blank_lines_are_ignored() {
        assert!(completed_ok("240502 03:00:11  innobackupex: completed OK!\n\n  \n"));
    }

    #[test]
    fn test_marker_must_be_last() {
        let log = "\
240502 03:00:11  innobackupex: completed OK!
240502 03:00:12  innobackupex: Error: failed to unlock tables
";
        assert!(!completed_ok(log));
    }

    #[test]
    fn test_marker_needs_timestamp() {
        assert!(!completed_ok("innobackupex: completed OK!"));
        assert!(!completed_ok(""));
    }
}
