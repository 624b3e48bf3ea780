//! Request execution planning.
//!
//! A [`Planner`] owns the registered expectations and decides which one
//! serves an incoming request. The default strategy, [`sequence()`], only
//! ever looks at the oldest live expectation: requests must arrive in the
//! order their expectations were declared.
//!
//! # Module Structure
//!
//! - `sequence` - strict head-only planner
//! - `matching` - method/URI/header/body checks with panic containment
//! - `error` - mismatch report and planner errors

mod error;
mod matching;
mod sequence;


use crate::expectation::{ExpectationHandler, Repeat};
use crate::matcher::{BodyMatcher, HeaderMatcher, Matcher};
use crate::request::Request;
use hyper::Method;
use std::fmt;
use std::sync::Arc;

pub use error::{MatchError, PlanError};
pub use matching::{match_body, match_header, match_method, match_request, match_uri};
pub use sequence::{sequence, Sequence};

pub(crate) use matching::recovered;

/// What a planner needs to know about an expectation.
pub trait Expectation: ExpectationHandler + fmt::Debug {
    fn method(&self) -> Method;
    fn uri_matcher(&self) -> Arc<dyn Matcher>;
    /// Header constraints; empty when none were configured.
    fn header_matcher(&self) -> HeaderMatcher;
    fn body_matcher(&self) -> Option<Arc<BodyMatcher>>;
    /// Calls left before the expectation retires.
    fn remain_times(&self) -> Repeat;
    /// Record a successful match.
    fn fulfilled(&self);
    fn fulfilled_times(&self) -> u32;
}

/// Strategy selecting the expectation that serves a request.
///
/// Implementations must append on `expect`, return exactly one expectation or
/// an error from `plan`, expose the live set through `remain` and drop
/// everything on `reset`.
pub trait Planner: Send + Sync {
    fn is_empty(&self) -> bool;
    fn expect(&self, expectation: Arc<dyn Expectation>);
    fn plan(&self, request: &mut Request) -> Result<Arc<dyn Expectation>, PlanError>;
    fn remain(&self) -> Vec<Arc<dyn Expectation>>;
    fn reset(&self);
}
