//! CLI subcommand implementations.

pub mod report;
pub mod summarize;
pub mod watch;

use std::collections::BTreeMap;
use std::fmt::Write;

/// Formats `n` with `,` between groups of three digits.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders a reward map as an aligned two-column table.
pub fn format_rewards(rewards: &BTreeMap<String, u64>) -> String {
    if rewards.is_empty() {
        return "No rewards yet.\n".to_string();
    }
    let width = rewards.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (name, amount) in rewards {
        let _ = writeln!(out, "{name:<width$}  {:>13}", group_thousands(*amount));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1500), "1,500");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn rewards_table_aligns_columns() {
        let rewards = BTreeMap::from([
            ("Dilithium Ore".to_string(), 1500),
            ("Latinum".to_string(), 3),
        ]);
        assert_snapshot!(format_rewards(&rewards), @r"
        Dilithium Ore          1,500
        Latinum                    3
        ");
    }

    #[test]
    fn empty_rewards() {
        assert_snapshot!(format_rewards(&BTreeMap::new()), @"No rewards yet.");
    }
}
