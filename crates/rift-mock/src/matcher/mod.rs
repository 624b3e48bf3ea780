//! Value matchers used to compare expected and actual request fields.
//!
//! Every request field an expectation constrains (URI, header values, body) is
//! compared through a [`Matcher`]. The crate ships exact, regex, JSON, "not
//! empty" and predicate matchers; anything implementing the trait can be used
//! in their place.
//!
//! # Module Structure
//!
//! - `string_matcher` - exact, regex, not-empty, predicate and lazy callback matchers
//! - `json_matcher` - JSON structural equality with `<ignore-diff>` support
//! - `value` - coercion of raw values (strings, bytes, regexes, matchers) into matchers
//! - `body_matcher` - adapts a matcher to a request body
//! - `header_matcher` - header name to matcher mapping

mod body_matcher;
mod header_matcher;
mod json_matcher;
mod string_matcher;
mod value;

use crate::error::MatcherError;
use std::fmt;

pub use body_matcher::{BodyMatcher, UNDECODED_BODY};
pub use header_matcher::{HeaderMatchError, HeaderMatcher};
pub use json_matcher::{JsonMatcher, IGNORE_DIFF};
pub use string_matcher::{
    callback, exact, fn_matcher, is_not_empty, regex, regex_pattern, Callback, ExactMatcher,
    FnMatcher, IsNotEmptyMatcher, RegexMatcher,
};
pub use value::{match_body, match_value, to_bytes, Value};

/// Determines whether an actual value satisfies an expectation.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Evaluate the actual value. A mismatch is `Ok(false)`, not an error.
    fn matches(&self, actual: &str) -> Result<bool, MatcherError>;

    /// Human readable expectation, used in mismatch reports.
    fn expected(&self) -> String;

    /// Rendering of the expectation when it is shown inline, e.g. next to a header name.
    fn describe(&self) -> String {
        self.expected()
    }

    /// Name shown for non-literal matchers in reports (`with body using JsonMatcher`).
    ///
    /// `None` means the expectation is rendered verbatim without a type hint.
    fn kind(&self) -> Option<&'static str> {
        Some(short_type_name::<Self>())
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}
