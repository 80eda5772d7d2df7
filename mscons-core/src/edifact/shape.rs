use crate::{domain::SLOTS_PER_DAY, edifact::SERVICE_STRING_ADVICE};

/// A structural property a built message is expected to have and does not.
///
/// This is a self-check of our own output, not an EDIFACT validator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    #[error("message contains a line break")]
    LineBreak,
    #[error("message does not start with the service string advice")]
    MissingServiceAdvice,
    #[error("service string advice is not followed by UNB")]
    MissingInterchangeHeader,
    #[error("expected 96 interval quantities, found {0}")]
    IntervalCount(usize),
    #[error("expected one UNT and one UNZ, found {unt} and {unz}")]
    TrailerCount { unt: usize, unz: usize },
    #[error("UNT declares {declared} segments, message has {actual}")]
    SegmentCount { declared: usize, actual: usize },
    #[error("UNZ reference does not match UNB")]
    ReferenceMismatch,
}

/// Split on unreleased `'` terminators.
fn segments(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut released = false;
    for (i, ch) in body.char_indices() {
        match ch {
            '?' if !released => released = true,
            '\'' if !released => {
                out.push(&body[start..i]);
                start = i + 1;
            }
            _ => released = false,
        }
    }
    out
}

fn element(segment: &str, index: usize) -> Option<&str> {
    segment.split('+').nth(index)
}

pub fn check_shape(text: &str) -> Result<(), ShapeViolation> {
    if text.contains(|c: char| c == '\n' || c == '\r') {
        return Err(ShapeViolation::LineBreak);
    }
    let body = text
        .strip_prefix(SERVICE_STRING_ADVICE)
        .ok_or(ShapeViolation::MissingServiceAdvice)?;

    let segs = segments(body);
    let unb = segs
        .first()
        .filter(|s| s.starts_with("UNB+"))
        .ok_or(ShapeViolation::MissingInterchangeHeader)?;

    let tag = |s: &str| s.split('+').next().unwrap_or("").to_string();
    let unt = segs.iter().filter(|s| tag(s) == "UNT").count();
    let unz = segs.iter().filter(|s| tag(s) == "UNZ").count();
    let last_two: Vec<String> = segs.iter().rev().take(2).rev().map(|s| tag(s)).collect();
    if unt != 1 || unz != 1 || last_two != ["UNT", "UNZ"] {
        return Err(ShapeViolation::TrailerCount { unt, unz });
    }

    let intervals = segs
        .windows(2)
        .filter(|w| w[0].starts_with("DTM+164:") && w[1].starts_with("QTY+220:"))
        .count();
    if intervals != SLOTS_PER_DAY {
        return Err(ShapeViolation::IntervalCount(intervals));
    }

    let unh_pos = segs.iter().position(|s| tag(s) == "UNH").unwrap_or(0);
    let unt_seg = segs[segs.len() - 2];
    let actual = segs.len() - 1 - unh_pos;
    let declared = element(unt_seg, 1).and_then(|n| n.parse().ok()).unwrap_or(0);
    if declared != actual {
        return Err(ShapeViolation::SegmentCount { declared, actual });
    }

    if element(unb, 5) != element(segs[segs.len() - 1], 2) {
        return Err(ShapeViolation::ReferenceMismatch);
    }

    Ok(())
}
