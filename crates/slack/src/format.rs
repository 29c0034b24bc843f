//! Value formatting for the extension details attachment.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use t3ext_core::domain::extension::DownloadLinks;

const SECONDS_PER_DAY: i64 = 86_400;

/// `DD/Mon/YYYY (qualifier)` for a unix timestamp, or `unknown`.
pub fn last_update(timestamp: Option<i64>, now: DateTime<Utc>) -> String {
    let Some(seconds) = timestamp.filter(|seconds| *seconds > 0) else {
        return "unknown".to_owned();
    };
    let Some(updated_at) = DateTime::<Utc>::from_timestamp(seconds, 0) else {
        return "unknown".to_owned();
    };

    // Whole days either side of now, rounded up.
    let elapsed = (now.timestamp() - seconds).abs();
    let days = (elapsed + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    let qualifier = if days > 365 {
        "(more than a year ago)".to_owned()
    } else if days > 1 {
        format!("({days} days ago)")
    } else {
        "(just recently)".to_owned()
    };

    format!("{} {qualifier}", updated_at.format("%d/%b/%Y"))
}

pub fn repository_link(url: &str) -> String {
    let host = [("github.com", "GitHub"), ("gitlab.com", "GitLab"), ("bitbucket.com", "Bitbucket")]
        .into_iter()
        .find(|(needle, _)| url.contains(needle));

    match host {
        Some((_, label)) => format!("Git repository at <{url}|{label}>"),
        None => "Code repository".to_owned(),
    }
}

/// `["9", "10", "11"]` renders as `v9, v10 and v11`. Entries that do not
/// start with a digit are dropped.
pub fn compatibility(versions: &[String]) -> String {
    let labels: Vec<String> = versions
        .iter()
        .filter(|version| version.starts_with(|c: char| c.is_ascii_digit()))
        .map(|version| format!("v{version}"))
        .collect();

    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}

/// Present links only, separated by ` | `. Empty when there are none.
pub fn downloads(links: &DownloadLinks) -> String {
    [(&links.zip, "ZIP"), (&links.t3x, "T3X"), (&links.packagist, "Packagist")]
        .into_iter()
        .filter_map(|(url, label)| url.as_deref().map(|url| format!("<{url}|{label}>")))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn gravatar_url(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}?d=404", hasher.finalize())
}
