//! Location breadcrumbs for rootcause reports.
//!
//! A report records where it was created; `attach_loc` adds a message and the
//! caller's file:line each time it is propagated through a layer that knows
//! more about what was being done.
//!
//! ```text
//!  ● Literal 'abc' cannot be cast to int4
//!  ├ src/route/static_value.rs:121
//!  ├ converting routing operand 'abc'::int4 at src/route/system_tables.rs:112
//!  ╰ extracting routing predicates from arm 0 Where filter at src/route/planner.rs:61
//! ```

use rootcause::Report;
use core::panic::Location;

/// A message with the source location it was attached at.
/// Displays as "message at file:line".
#[derive(Debug, Clone)]
pub struct LocatedAttachment {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl core::fmt::Display for LocatedAttachment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

/// Add a located breadcrumb to a report or to the error side of a result.
pub trait ReportExt<C> {
    type Output;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Self::Output;
}

impl<C: 'static> ReportExt<C> for Report<C> {
    type Output = Report<C>;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Report<C> {
        self.attach(LocatedAttachment {
            message: message.into(),
            location: Location::caller(),
        })
    }
}

impl<T, C: 'static> ReportExt<C> for Result<T, Report<C>> {
    type Output = Result<T, Report<C>>;

    #[track_caller]
    fn attach_loc(self, message: impl Into<String>) -> Result<T, Report<C>> {
        let location = Location::caller();
        self.map_err(|e| {
            e.attach(LocatedAttachment {
                message: message.into(),
                location,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use crate::route::{RouteError, RouteResult};

    use super::*;

    fn placeholder_check(placeholder: &str) -> RouteResult<()> {
        Err(Report::from(RouteError::InvalidParameterPlaceholder {
            placeholder: placeholder.to_owned(),
        }))
    }

    fn operand_check() -> RouteResult<()> {
        placeholder_check("$0").attach_loc("converting operand")
    }

    fn filter_check() -> RouteResult<()> {
        operand_check().attach_loc("extracting filter")
    }

    #[test]
    fn breadcrumbs_in_order() {
        let output = filter_check().unwrap_err().to_string();

        assert!(output.contains("Invalid parameter placeholder: $0"));
        assert!(output.contains("converting operand at"));
        assert!(output.contains("extracting filter at"));
        assert!(output.contains("result.rs"));
    }

    #[test]
    fn breadcrumbs_keep_context() {
        let err = filter_check().unwrap_err();

        assert!(matches!(
            err.into_current_context(),
            RouteError::InvalidParameterPlaceholder { placeholder } if placeholder == "$0"
        ));
    }

    #[test]
    fn ok_passes_through() {
        let result: RouteResult<u32> = Ok(7);
        assert_eq!(result.attach_loc("unused").unwrap(), 7);
    }
}
