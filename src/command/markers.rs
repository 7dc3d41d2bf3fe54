//! Signal markers a command prints on stdout
//!
//! A line of the form `::success::`, `::fail:: <message>`, `::skip::` or
//! `::retry::` makes the task raise the matching signal.

use crate::core::Signal;

fn parse_line(line: &str) -> Option<Signal> {
    let rest = line.trim().strip_prefix("::")?;
    let (name, tail) = rest.split_once("::")?;

    match name {
        "success" => Some(Signal::Success),
        "skip" => Some(Signal::Skip),
        "retry" => Some(Signal::Retry),
        "fail" => {
            let message = tail.trim();
            if message.is_empty() {
                Some(Signal::Fail("FAIL signal raised".to_string()))
            } else {
                Some(Signal::Fail(message.to_string()))
            }
        }
        _ => None,
    }
}

/// The signal requested by the last marker line, if any
pub fn find_signal(output: &str) -> Option<Signal> {
    output.lines().filter_map(parse_line).last()
}

/// Output with marker lines removed
pub fn strip_markers(output: &str) -> String {
    output
        .lines()
        .filter(|line| parse_line(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
}
