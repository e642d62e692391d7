//! Ticket identifiers
//!
//! Structured tickets look like `OSIS24-000123-K`: the two-digit year, a
//! six-digit sequence and a check letter computed from the digits.

use osis_validation::registration::is_structured_ticket;

/// Check letter for a year/sequence pair
fn check_letter(digits: &str) -> char {
    let sum: u32 = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| d * (i as u32 + 1))
        .sum();
    char::from(b'A' + (sum % 26) as u8)
}

/// Format a structured ticket. Sequences wrap at one million.
pub fn format_ticket(year: i32, sequence: u64) -> String {
    let digits = format!("{:02}{:06}", year.rem_euclid(100), sequence % 1_000_000);
    format!(
        "OSIS{}-{}-{}",
        &digits[..2],
        &digits[2..],
        check_letter(&digits)
    )
}

/// Whether a structured ticket carries the right check letter
pub fn has_valid_checksum(ticket: &str) -> bool {
    if !is_structured_ticket(ticket) {
        return false;
    }
    // OSISyy-nnnnnn-L
    let digits = format!("{}{}", &ticket[4..6], &ticket[7..13]);
    ticket.ends_with(check_letter(&digits))
}
