//! Status markers for terminal output.

use console::{style, StyledObject};

pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

pub fn warning() -> StyledObject<&'static str> {
    style("⚠").yellow()
}

pub fn arrow() -> StyledObject<&'static str> {
    style("→").dim()
}
