//! Storage technique tag.
//!
//! Fixed at engine configuration time and recorded on each snapshot; restore
//! always follows the technique stored on the snapshot, never the currently
//! configured one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technique {
    /// Store each file's content as a single record.
    WholeFile,
    /// Split each file into fixed-size chunks stored with sequence numbers.
    Chunked,
}

impl Technique {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technique::WholeFile => "whole-file",
            Technique::Chunked => "chunked",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technique {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whole-file" => Ok(Technique::WholeFile),
            "chunked" => Ok(Technique::Chunked),
            other => Err(format!(
                "unknown technique '{other}' (expected 'whole-file' or 'chunked')"
            )),
        }
    }
}
