//! Assertion mechanism
//!
//! `check!`, `check_eq!` and `check_ne!` are the framework's own assertions.
//! A failed check unwinds with an [`AssertionFailure`] payload, which the
//! execution engine recognises and reports apart from any other panic.
//!
//! Every check, passing or not, is recorded for the invocation running on the
//! current thread; the engine collects the records into the test result.

use std::cell::RefCell;
use std::fmt;

use crate::definition::SourceLocation;

/// Payload of a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AssertionFailure {}

/// One evaluated check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionInfo {
    /// Source text of the checked expression
    pub expression: String,
    /// Operand values, when the check knows them
    pub expanded: String,
    pub success: bool,
    pub location: SourceLocation,
}

#[derive(Default)]
struct Tracker {
    test_name: String,
    assertions: Vec<AssertionInfo>,
}

thread_local! {
    static TRACKER: RefCell<Tracker> = RefCell::new(Tracker::default());
}

/// Reset the record for a new invocation of `test_name`.
pub fn begin(test_name: &str) {
    TRACKER.with(|tracker| {
        let mut tracker = tracker.borrow_mut();
        tracker.test_name = test_name.to_string();
        tracker.assertions.clear();
    });
}

/// Take the checks recorded since the last [`begin`].
pub fn take() -> Vec<AssertionInfo> {
    TRACKER.with(|tracker| std::mem::take(&mut tracker.borrow_mut().assertions))
}

/// Qualified name of the test currently running on this thread.
pub fn current_test() -> String {
    TRACKER.with(|tracker| tracker.borrow().test_name.clone())
}

/// Fail the running test with a framework assertion failure.
pub fn fail(message: impl Into<String>, location: SourceLocation) -> ! {
    std::panic::panic_any(AssertionFailure {
        message: message.into(),
        location,
    })
}

#[doc(hidden)]
pub fn __check(
    kind: &str,
    success: bool,
    expression: &str,
    expanded: String,
    message: Option<String>,
    file: &'static str,
    line: u32,
) {
    let location = SourceLocation { file, line };
    let text = if success {
        None
    } else {
        Some(describe(kind, expression, &expanded, message.as_deref(), location))
    };

    TRACKER.with(|tracker| {
        tracker.borrow_mut().assertions.push(AssertionInfo {
            expression: expression.to_string(),
            expanded,
            success,
            location,
        });
    });

    if let Some(text) = text {
        fail(text, location);
    }
}

fn describe(kind: &str, expression: &str, expanded: &str, message: Option<&str>, location: SourceLocation) -> String {
    let mut text = format!("{kind} failed at {location}");
    if let Some(message) = message {
        text.push_str(": ");
        text.push_str(message);
    }
    text.push_str(&format!("\n    {kind}!({expression});"));
    if !expanded.is_empty() {
        text.push_str(&format!("\n    where: {expanded}"));
    }
    text
}

/// Check a boolean condition.
///
/// ```ignore
/// check!(bar > 5);
/// check!(foo != 'x', "unexpected foo {}", foo);
/// ```
#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        $crate::assertion::__check(
            "check",
            $cond,
            ::std::stringify!($cond),
            ::std::string::String::new(),
            ::std::option::Option::None,
            ::std::file!(),
            ::std::line!(),
        )
    };
    ($cond:expr, $($arg:tt)+) => {
        $crate::assertion::__check(
            "check",
            $cond,
            ::std::stringify!($cond),
            ::std::string::String::new(),
            ::std::option::Option::Some(::std::format!($($arg)+)),
            ::std::file!(),
            ::std::line!(),
        )
    };
}

/// Check that two values are equal, recording both operands.
#[macro_export]
macro_rules! check_eq {
    (@impl $left:expr, $right:expr, $message:expr) => {
        match (&$left, &$right) {
            (left, right) => $crate::assertion::__check(
                "check_eq",
                *left == *right,
                ::std::concat!(::std::stringify!($left), " == ", ::std::stringify!($right)),
                ::std::format!("{:?} == {:?}", left, right),
                $message,
                ::std::file!(),
                ::std::line!(),
            ),
        }
    };
    ($left:expr, $right:expr $(,)?) => {
        $crate::check_eq!(@impl $left, $right, ::std::option::Option::None)
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        $crate::check_eq!(@impl $left, $right, ::std::option::Option::Some(::std::format!($($arg)+)))
    };
}

/// Check that two values differ, recording both operands.
#[macro_export]
macro_rules! check_ne {
    (@impl $left:expr, $right:expr, $message:expr) => {
        match (&$left, &$right) {
            (left, right) => $crate::assertion::__check(
                "check_ne",
                *left != *right,
                ::std::concat!(::std::stringify!($left), " != ", ::std::stringify!($right)),
                ::std::format!("{:?} != {:?}", left, right),
                $message,
                ::std::file!(),
                ::std::line!(),
            ),
        }
    };
    ($left:expr, $right:expr $(,)?) => {
        $crate::check_ne!(@impl $left, $right, ::std::option::Option::None)
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        $crate::check_ne!(@impl $left, $right, ::std::option::Option::Some(::std::format!($($arg)+)))
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::panic;

    use super::*;

    #[test]
    fn test_passing_checks_are_recorded() {
        begin("suite::passing");
        crate::check!(1 + 1 == 2);
        crate::check_eq!(2 * 2, 4);
        let recorded = take();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|info| info.success));
        assert_eq!(recorded[0].expression, "1 + 1 == 2");
        assert_eq!(recorded[1].expanded, "4 == 4");
        assert_eq!(current_test(), "suite::passing");
    }

    #[test]
    fn test_failing_check_unwinds_with_assertion_failure() {
        begin("suite::failing");
        let payload = panic::catch_unwind(|| {
            crate::check!(3 > 5, "three is {}", 3);
        })
        .unwrap_err();

        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert!(failure.message.starts_with("check failed at "));
        assert!(failure.message.contains("three is 3"));
        assert!(failure.message.contains("check!(3 > 5);"));

        let recorded = take();
        assert_eq!(recorded.len(), 1);
        assert!(!recorded[0].success);
    }

    #[test]
    fn test_check_ne_expands_operands() {
        begin("suite::ne");
        let payload = panic::catch_unwind(|| {
            crate::check_ne!('x', 'x');
        })
        .unwrap_err();
        let failure = payload.downcast_ref::<AssertionFailure>().unwrap();
        assert!(failure.message.contains("where: 'x' != 'x'"));
    }
}
