// Copyright (c) The ktreport Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{error, fmt};

/// An error that occurs while reading a [`TestSuiteResult`](crate::TestSuiteResult) back from
/// its serialized form.
#[derive(Debug)]
pub enum ReportParseError {
    /// Reading the report produced an I/O error.
    Io(std::io::Error),

    /// The report was not valid JSON, or did not match the expected schema.
    Json(serde_json::Error),
}

impl fmt::Display for ReportParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(_) => {
                write!(f, "error reading ktreport report")
            }
            Self::Json(_) => {
                write!(f, "error parsing ktreport report JSON")
            }
        }
    }
}

impl error::Error for ReportParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}
