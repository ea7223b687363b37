//! Patterns: literal text joined with derived-attribute references
//!
//! `Pattern::attr(bucket_arn).then_text("/*")` describes "every object in
//! the bucket" before the bucket exists. Adjacent text fragments are merged,
//! so a pattern never holds two text fragments in a row.

use crate::binding::{tokens_in, Bindings};
use crate::reference::AttributeRef;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;

/// One piece of a pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Literal text, possibly holding `%TOKEN%` placeholders
    Text(String),
    /// Derived attribute of another descriptor
    Attr(AttributeRef),
}

/// Ordered fragments joined at deployment time
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    fragments: Vec<Fragment>,
}

impl Pattern {
    /// Pattern made of a single literal
    pub fn literal(text: impl Into<String>) -> Self {
        Self::default().then_text(text)
    }

    /// Pattern made of a single reference
    #[must_use]
    pub fn attr(reference: AttributeRef) -> Self {
        Self::default().then_attr(reference)
    }

    /// Append literal text
    #[must_use]
    pub fn then_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        match self.fragments.last_mut() {
            Some(Fragment::Text(prev)) => prev.push_str(&text),
            _ => self.fragments.push(Fragment::Text(text)),
        }
        self
    }

    /// Append a reference
    #[must_use]
    pub fn then_attr(mut self, reference: AttributeRef) -> Self {
        self.fragments.push(Fragment::Attr(reference));
        self
    }

    /// The fragments in order
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// True when the pattern has no fragments at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// References held by this pattern
    pub fn references(&self) -> impl Iterator<Item = &AttributeRef> {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Attr(r) => Some(r),
            Fragment::Text(_) => None,
        })
    }

    /// Unresolved placeholder tokens in the literal fragments
    #[must_use]
    pub fn tokens(&self) -> BTreeSet<String> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Text(t) => Some(t),
                Fragment::Attr(_) => None,
            })
            .flat_map(|t| tokens_in(t).map(str::to_string))
            .collect()
    }

    /// Copy with every bound token substituted
    #[must_use]
    pub fn bind(&self, bindings: &Bindings) -> Self {
        let fragments = self
            .fragments
            .iter()
            .map(|f| match f {
                Fragment::Text(t) => Fragment::Text(bindings.apply(t).into_owned()),
                Fragment::Attr(r) => Fragment::Attr(r.clone()),
            })
            .collect();
        Self { fragments }
    }

    /// Render as a template value
    ///
    /// A single fragment renders as itself; anything longer becomes an
    /// `Fn::Join` with an empty delimiter.
    #[must_use]
    pub fn to_template(&self) -> Value {
        match self.fragments.as_slice() {
            [] => Value::String(String::new()),
            [single] => fragment_value(single),
            many => {
                let parts: Vec<Value> = many.iter().map(fragment_value).collect();
                json!({ "Fn::Join": ["", parts] })
            }
        }
    }
}

fn fragment_value(fragment: &Fragment) -> Value {
    match fragment {
        Fragment::Text(t) => Value::String(t.clone()),
        Fragment::Attr(r) => r.to_template(),
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(t) => f.write_str(t)?,
                Fragment::Attr(r) => write!(f, "{r}")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Self::literal(value)
    }
}

impl From<AttributeRef> for Pattern {
    fn from(value: AttributeRef) -> Self {
        Self::attr(value)
    }
}
