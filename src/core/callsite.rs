//! Call-site identity captured at the public log call

use serde::Serialize;
use std::panic::Location;

/// Where a log call was made.
///
/// Always captured on the caller's side, before the record crosses any queue,
/// so queued records still point at application code rather than the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    pub module_path: Option<&'static str>,
    pub function: Option<&'static str>,
}

impl CallSite {
    pub const fn new(
        file: &'static str,
        line: u32,
        module_path: &'static str,
        function: &'static str,
    ) -> Self {
        Self {
            file,
            line,
            module_path: Some(module_path),
            function: Some(function),
        }
    }

    /// Location of the nearest caller not marked `#[track_caller]`
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            module_path: None,
            function: None,
        }
    }
}

/// Strip the helper suffix from a `type_name` of a nested fn item.
#[doc(hidden)]
pub fn function_name(marker_type_name: &'static str) -> &'static str {
    let name = marker_type_name
        .strip_suffix("::__callsite_marker")
        .unwrap_or(marker_type_name);
    // Closures show up as `{{closure}}` segments
    let name = name.trim_end_matches("::{{closure}}");
    name.rsplit("::").next().unwrap_or(name)
}
