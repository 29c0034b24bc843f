use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const MIN_KEY_LEN: usize = 3;

/// A TYPO3 extension key as accepted from the slash command.
///
/// The whole argument is the key: it is lowercased but never split on
/// whitespace, so `"news extra"` is rejected rather than looked up as `news`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionKey(String);

impl ExtensionKey {
    pub fn normalize(raw: &str) -> Result<Self, DomainError> {
        let key = raw.to_lowercase();
        let valid = key.len() >= MIN_KEY_LEN
            && key.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_');
        if valid {
            Ok(Self(key))
        } else {
            Err(DomainError::InvalidExtensionKey(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    /// The email address, only when it passes the syntax check.
    pub fn valid_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|email| is_valid_email(email))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLinks {
    pub zip: Option<String>,
    pub t3x: Option<String>,
    pub packagist: Option<String>,
}

impl DownloadLinks {
    pub fn is_empty(&self) -> bool {
        self.zip.is_none() && self.t3x.is_none() && self.packagist.is_none()
    }
}

/// Extension metadata as returned by either data source. Never mutated here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionRecord {
    pub key: String,
    pub title: String,
    pub version: String,
    pub author: Option<Author>,
    /// Unix seconds of the latest upload; `None` or `0` means unknown.
    pub last_updated: Option<i64>,
    pub description: String,
    pub compatibility: Vec<String>,
    pub downloads: DownloadLinks,
    pub repository_url: Option<String>,
}

/// Syntactic email check modelled on the usual RFC 5322 approximation:
/// dotted atoms or a quoted string before `@`, dotted labels with an
/// alphabetic TLD of two or more letters (or a bracketed IPv4 literal) after it.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.to_lowercase();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    valid_local_part(local) && valid_domain(domain)
}

fn valid_local_part(local: &str) -> bool {
    if local.len() >= 3 && local.starts_with('"') && local.ends_with('"') {
        return true;
    }
    !local.is_empty() && local.split('.').all(valid_atom)
}

fn valid_atom(atom: &str) -> bool {
    const FORBIDDEN: &[char] = &['<', '>', '(', ')', '[', ']', '\\', '.', ',', ';', ':', '@', '"'];
    !atom.is_empty() && !atom.chars().any(|ch| ch.is_whitespace() || FORBIDDEN.contains(&ch))
}

fn valid_domain(domain: &str) -> bool {
    if let Some(literal) = domain.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        let octets: Vec<&str> = literal.split('.').collect();
        return octets.len() == 4
            && octets.iter().all(|octet| {
                (1..=3).contains(&octet.len()) && octet.bytes().all(|byte| byte.is_ascii_digit())
            });
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    !rest.is_empty()
        && tld.len() >= 2
        && tld.bytes().all(|byte| byte.is_ascii_alphabetic())
        && rest.iter().all(|label| {
            !label.is_empty()
                && label.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
        })
}
