use chrono::{DateTime, NaiveDate, Utc};

use crate::api::types::{Exemption, ExemptionMatchMode, IssueLevel, RuleSpec};

/// Parse an expiration stamp: RFC 3339, or a bare date treated as
/// expiring at the end of that day UTC.
fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

/// Whether the entry is still in force at `now`. Unparseable stamps are
/// treated as expired.
pub fn is_unexpired(entry: &Exemption, now: DateTime<Utc>) -> bool {
    match parse_expiration(&entry.expiration_date) {
        Some(expiry) => expiry > now,
        None => {
            tracing::warn!(
                rule = %entry.rule_name,
                stamp = %entry.expiration_date,
                "exemption has unparseable expiration, treating as expired"
            );
            false
        }
    }
}

fn repo_matches(entry: &Exemption, repo_url: &str) -> bool {
    match entry.match_mode {
        ExemptionMatchMode::Exact => entry.repo_url == repo_url,
        ExemptionMatchMode::Substring => repo_url.contains(&entry.repo_url),
    }
}

/// Whether `(repoUrl, ruleName)` is covered by an unexpired exemption.
pub fn is_exempt(exemptions: &[Exemption], repo_url: &str, rule_name: &str, now: DateTime<Utc>) -> bool {
    exemptions.iter().any(|entry| {
        entry.rule_name == rule_name && repo_matches(entry, repo_url) && is_unexpired(entry, now)
    })
}

/// Clone the rule set, rewriting the event type of exempted rules.
///
/// The input rules are never mutated, and applying the rewrite twice
/// yields the same result.
pub fn apply_exemptions(
    rules: &[RuleSpec],
    exemptions: &[Exemption],
    repo_url: &str,
    now: DateTime<Utc>,
) -> Vec<RuleSpec> {
    rules
        .iter()
        .map(|rule| {
            if is_exempt(exemptions, repo_url, &rule.name, now) {
                let mut exempted = rule.clone();
                exempted.event.event_type = IssueLevel::Exempt;
                tracing::info!(rule = %rule.name, "rule exempted for this repository");
                exempted
            } else {
                rule.clone()
            }
        })
        .collect()
}
