//! Recurring contest series an operator can ask about.

use std::fmt;

/// Category token accepted from the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Series {
    Abc,
    Arc,
    Agc,
    Ahc,
}

impl Series {
    /// Contest slug prefix for this series.
    pub fn category_prefix(self) -> &'static str {
        match self {
            Series::Abc => "abc",
            Series::Arc => "arc",
            Series::Agc => "agc",
            Series::Ahc => "ahc",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.category_prefix().to_uppercase())
    }
}
