//! Permission action strings

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// `*` alone, or `service:Action` where the action may carry `*` wildcards
static ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\*|[a-z0-9][a-z0-9-]*:[A-Za-z0-9*]+)$").unwrap());

/// An action such as `s3:PutObject` or `kinesis:Get*`
///
/// Construction never fails; well-formedness is checked when the statement
/// holding the action is validated, so a bad action is reported against
/// the declaration that used it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Wrap an action string
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    /// Borrow the raw string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `*` and `service:Action` forms
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        ACTION.is_match(&self.0)
    }

    /// Service prefix (`s3` for `s3:PutObject`)
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.0.split_once(':').map(|(service, _)| service)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_well_formed_actions() {
        for ok in [
            "s3:PutObject",
            "s3:ListBucketMultipartUploads",
            "kinesis:Get*",
            "lambda:InvokeFunction",
            "*",
            "execute-api:Invoke",
        ] {
            assert!(Action::new(ok).is_well_formed(), "{ok}");
        }
    }

    #[test]
    fn test_malformed_actions() {
        for bad in ["", "s3", "s3:", ":PutObject", "S3:PutObject", "s3:Put Object", "s3:Put:Object"] {
            assert!(!Action::new(bad).is_well_formed(), "{bad}");
        }
    }

    #[test]
    fn test_service_prefix() {
        assert_eq!(Action::new("logs:PutLogEvents").service(), Some("logs"));
        assert_eq!(Action::new("*").service(), None);
    }

    proptest! {
        #[test]
        fn prop_actions_without_colon_are_rejected(s in "[A-Za-z0-9]{1,20}") {
            prop_assert!(!Action::new(s).is_well_formed());
        }
    }
}
