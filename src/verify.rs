//! Assertion helpers that report instead of panicking.
//!
//! Each check formats a message, records a `Pass` or `Fail` event on the
//! borrowed [`Reporter`] and returns whether it passed, so a test keeps going
//! after a failed check. `Err` is only returned for an unusable title or
//! message.

use std::fmt::Display;

use crate::report::{ReportResult, Reporter, Status};

const VERIFY_TITLE: &str = "Verify";
const VERIFY_TRUE_TITLE: &str = "Verify true";
const VERIFY_NOT_SAME_TITLE: &str = "Verify not the same";
const VERIFY_NOT_NULL_MESSAGE: &str = "Verify not null";
const NULL_TEXT: &str = "<b>null</b>";

/// Borrowed view of a reporter with verification helpers
pub struct Verifier<'a> {
    reporter: &'a mut Reporter,
}

impl<'a> Verifier<'a> {
    pub fn new(reporter: &'a mut Reporter) -> Self {
        Self { reporter }
    }

    /// Compare two values under the generic "Verify" title
    pub fn equals<T: PartialEq + Display>(&mut self, expected: T, actual: T) -> ReportResult<bool> {
        self.equals_titled(VERIFY_TITLE, expected, actual)
    }

    pub fn equals_titled<T: PartialEq + Display>(
        &mut self,
        title: &str,
        expected: T,
        actual: T,
    ) -> ReportResult<bool> {
        let message = format!("Expected ({}), actual ({})", expected, actual);
        self.equals_with_message(title, &message, expected, actual)
    }

    /// Compare values that may be absent; two `None`s are equal
    pub fn equals_optional<T: PartialEq + Display>(
        &mut self,
        title: &str,
        expected: Option<T>,
        actual: Option<T>,
    ) -> ReportResult<bool> {
        let message = format!(
            "Expected Object ({}), actual Object ({})",
            display_or_null(expected.as_ref()),
            display_or_null(actual.as_ref())
        );
        self.equals_with_message(title, &message, expected, actual)
    }

    pub fn equals_with_message<T: PartialEq>(
        &mut self,
        title: &str,
        message: &str,
        expected: T,
        actual: T,
    ) -> ReportResult<bool> {
        self.check(title, message, expected == actual)
    }

    /// Compare floats, passing when they differ by at most `delta`
    pub fn equals_with_delta(
        &mut self,
        title: &str,
        expected: f64,
        actual: f64,
        delta: f64,
    ) -> ReportResult<bool> {
        let message = format!("Expected ({}), actual ({})", expected, actual);
        let matched = expected == actual || (expected - actual).abs() <= delta;
        self.check(title, &message, matched)
    }

    pub fn is_true(&mut self, message: &str, condition: bool) -> ReportResult<bool> {
        self.check(VERIFY_TRUE_TITLE, message, condition)
    }

    /// `is_true` with a generated message
    pub fn expect_true(&mut self, condition: bool) -> ReportResult<bool> {
        let message = format!("Expected <b>true</b> and found ({}).", condition);
        self.is_true(&message, condition)
    }

    /// `is_false` with a generated message
    pub fn expect_false(&mut self, condition: bool) -> ReportResult<bool> {
        let message = format!("Expected <b>false</b> and found ({}).", condition);
        self.is_false(&message, condition)
    }

    /// Passes when `condition` is false; recorded like `is_true(!condition)`
    pub fn is_false(&mut self, message: &str, condition: bool) -> ReportResult<bool> {
        self.is_true(message, !condition)
    }

    pub fn not_null<T>(&mut self, message: &str, value: Option<&T>) -> ReportResult<bool> {
        self.is_true(message, value.is_some())
    }

    pub fn is_some<T>(&mut self, value: Option<&T>) -> ReportResult<bool> {
        self.not_null(VERIFY_NOT_NULL_MESSAGE, value)
    }

    /// Passes unless both values are equal
    pub fn not_same<T: PartialEq>(&mut self, message: &str, first: T, second: T) -> ReportResult<bool> {
        self.check(VERIFY_NOT_SAME_TITLE, message, first != second)
    }

    pub fn pass(&mut self, title: &str, message: &str) -> ReportResult<()> {
        self.reporter.record(title, message, Status::Pass)
    }

    pub fn fail(&mut self, title: &str, message: &str) -> ReportResult<()> {
        self.reporter.record(title, message, Status::Fail)
    }

    pub fn fail_not_equals<T: Display>(&mut self, message: Option<&str>, expected: T, actual: T) -> ReportResult<()> {
        let text = format!("{}expected :< {} > was not:< {} >", prefix(message), expected, actual);
        self.fail("Fail", &text)
    }

    pub fn fail_not_same<T: Display>(&mut self, message: Option<&str>, expected: T, actual: T) -> ReportResult<()> {
        let text = format!("{}expected same:< {} > was not:< {} >", prefix(message), expected, actual);
        self.fail("Fail", &text)
    }

    pub fn fail_same(&mut self, message: Option<&str>) -> ReportResult<()> {
        let text = format!("{}expected not same", prefix(message));
        self.fail("Fail", &text)
    }

    fn check(&mut self, title: &str, message: &str, passed: bool) -> ReportResult<bool> {
        let status = if passed { Status::Pass } else { Status::Fail };
        self.reporter.record(title, message, status)?;
        Ok(passed)
    }
}

fn display_or_null<T: Display>(value: Option<&T>) -> String {
    value.map_or_else(|| NULL_TEXT.to_string(), |v| v.to_string())
}

fn prefix(message: Option<&str>) -> String {
    message.map(|m| format!("{} ", m)).unwrap_or_default()
}
