//! Deferred binding tokens
//!
//! Some identifiers (region, account, external stream names, key ids) are
//! not known when the graph is built. They are written as `%TOKEN_NAME%`
//! placeholders and substituted later from a [`Bindings`] table. A token
//! with no binding is passed through untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Environment variable prefix for binding overrides
pub const ENV_PREFIX: &str = "STACKGRAPH_BIND_";

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"%([A-Z0-9_]+)%").unwrap());
static TOKEN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").unwrap());

/// True if `name` can appear between `%` delimiters
#[must_use]
pub fn is_token_name(name: &str) -> bool {
    TOKEN_NAME.is_match(name)
}

/// Names of all placeholder tokens in `text`, without the `%` delimiters
pub fn tokens_in(text: &str) -> impl Iterator<Item = &str> {
    TOKEN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Token name to substituted value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, String>);

impl Bindings {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `token` (bare name, e.g. `REGION_NAME`) to `value`
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(token.into(), value.into())
    }

    /// Builder form of [`Bindings::insert`]
    #[must_use]
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    /// Value bound to `token`, if any
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    /// Number of bound tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay every `STACKGRAPH_BIND_<TOKEN>` variable from `vars`
    ///
    /// Later values win, so environment overrides file-based bindings when
    /// merged after them.
    pub fn merge_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(token) = key.strip_prefix(ENV_PREFIX) {
                if !token.is_empty() {
                    self.0.insert(token.to_string(), value);
                }
            }
        }
    }

    /// Overlay another table on top of this one
    pub fn extend(&mut self, other: &Bindings) {
        for (token, value) in &other.0 {
            self.0.insert(token.clone(), value.clone());
        }
    }

    /// Substitute every bound token in `text`
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        TOKEN.replace_all(text, |caps: &Captures<'_>| match self.0.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
    }

    /// Iterate over `(token, value)` pairs in token order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Bindings {
    fn from(table: BTreeMap<String, String>) -> Self {
        Self(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_in_finds_all() {
        let text = "arn:aws:kinesis:%REGION_NAME%:%ACCOUNT_ID%:stream/%STREAM_NAME%";
        let tokens: Vec<_> = tokens_in(text).collect();
        assert_eq!(tokens, vec!["REGION_NAME", "ACCOUNT_ID", "STREAM_NAME"]);
    }

    #[test]
    fn test_lowercase_is_not_a_token() {
        assert_eq!(tokens_in("100%done% and %not_a_token%").count(), 0);
    }

    #[test]
    fn test_apply_leaves_unbound_tokens() {
        let bindings = Bindings::new().with("REGION_NAME", "ap-northeast-1");
        let out = bindings.apply("arn:aws:kms:%REGION_NAME%:%ACCOUNT_ID%:key/%KEY_ID%");
        assert_eq!(out, "arn:aws:kms:ap-northeast-1:%ACCOUNT_ID%:key/%KEY_ID%");
    }

    #[test]
    fn test_apply_without_tokens_borrows() {
        let bindings = Bindings::new().with("X", "y");
        assert!(matches!(bindings.apply("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_merge_env_filters_prefix() {
        let mut bindings = Bindings::new().with("ACCOUNT_ID", "111111111111");
        bindings.merge_env(vec![
            ("STACKGRAPH_BIND_ACCOUNT_ID".to_string(), "222222222222".to_string()),
            ("STACKGRAPH_BIND_".to_string(), "ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.get("ACCOUNT_ID"), Some("222222222222"));
    }

    #[test]
    fn test_token_names() {
        assert!(is_token_name("KEY_ID"));
        assert!(!is_token_name("key_id"));
        assert!(!is_token_name("%KEY_ID%"));
        assert!(!is_token_name(""));
    }
}
