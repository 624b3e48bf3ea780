//! Text rendering of expected and actual requests for diagnostics.
//!
//! ```text
//! GET /users (called: 1 time(s), remaining: 2 time(s))
//!     with header:
//!         Authorization: Bearer token
//!     with body using JsonMatcher
//!         {"id":42}
//! ```

use crate::matcher::{BodyMatcher, HeaderMatcher, Matcher};
use crate::request::RequestSnapshot;
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Render an expectation. `called`/`remaining` are shown only when they add
/// information: some calls remain and the expectation is not a fresh `once`.
pub fn expected_request(
    w: &mut impl Write,
    method: &str,
    uri: &dyn Matcher,
    header: &HeaderMatcher,
    body: Option<&BodyMatcher>,
    called: u32,
    remaining: u32,
) -> fmt::Result {
    write!(w, "{method} {}", uri.expected())?;

    if remaining > 0 && (called != 0 || remaining != 1) {
        write!(
            w,
            " (called: {called} time(s), remaining: {remaining} time(s))"
        )?;
    }

    writeln!(w)?;

    if !header.is_empty() {
        writeln!(w, "{INDENT}with header:")?;

        for (name, matcher) in header.iter() {
            writeln!(w, "{INDENT}{INDENT}{name}: {}", inline(matcher.as_ref()))?;
        }
    }

    if let Some(body) = body {
        let expected = body.expected();

        if !expected.is_empty() {
            match body.matcher().kind() {
                Some(kind) => writeln!(w, "{INDENT}with body using {kind}")?,
                None => writeln!(w, "{INDENT}with body")?,
            }
            writeln!(w, "{INDENT}{INDENT}{expected}")?;
        }
    }

    Ok(())
}

/// Render a received request.
pub fn actual_request(w: &mut impl Write, request: &RequestSnapshot) -> fmt::Result {
    writeln!(w, "{} {}", request.method, request.uri)?;

    if !request.headers.is_empty() {
        writeln!(w, "{INDENT}with header:")?;

        for (name, value) in &request.headers {
            writeln!(w, "{INDENT}{INDENT}{name}: {value}")?;
        }
    }

    if !request.body.is_empty() {
        writeln!(w, "{INDENT}with body")?;
        writeln!(
            w,
            "{INDENT}{INDENT}{}",
            String::from_utf8_lossy(&request.body)
        )?;
    }

    Ok(())
}

fn inline(matcher: &dyn Matcher) -> String {
    match matcher.kind() {
        None => matcher.describe(),
        Some(kind) => format!("{kind}({:?})", matcher.expected()),
    }
}
