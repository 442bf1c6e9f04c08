//! Parsing of Brazilian real price strings into [`Decimal`] values.
//!
//! Storefronts render prices as `R$ 1.234,56`, split across `whole` and
//! `fraction` elements, or occasionally in US notation inside hidden
//! accessibility spans. All of these reduce to the same two-place decimal.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parses the first numeric token of `text` as a BRL amount.
///
/// The last `.` or `,` is treated as the decimal separator when one or two
/// digits follow it; every other separator is a thousands separator.
///
/// Returns `None` when the text holds no digits or the amount overflows.
#[must_use]
pub fn parse_brl_price(text: &str) -> Option<Decimal> {
    let token = first_numeric_token(text)?;
    let token = token.trim_end_matches(['.', ',']);

    match token.rfind(['.', ',']) {
        Some(pos) if (1..=2).contains(&(token.len() - pos - 1)) => {
            decimal_from_parts(&digits_only(&token[..pos]), &token[pos + 1..])
        }
        _ => decimal_from_parts(&digits_only(token), ""),
    }
}

/// Joins a price rendered as separate integer and cents elements.
///
/// `whole` may carry thousands separators and a trailing decimal mark
/// (`"1.234,"`). When `fraction` is absent or holds no digits the whole part
/// is parsed on its own.
#[must_use]
pub fn join_price_parts(whole: &str, fraction: Option<&str>) -> Option<Decimal> {
    let whole_digits = digits_only(whole);
    if whole_digits.is_empty() {
        return None;
    }

    let cents = fraction.map(digits_only).filter(|f| !f.is_empty());
    match cents {
        Some(cents) if cents.len() <= 2 => decimal_from_parts(&whole_digits, &cents),
        _ => parse_brl_price(whole),
    }
}

/// Returns the slice starting at the first ASCII digit and running over
/// digits and separators.
fn first_numeric_token(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn decimal_from_parts(integer: &str, fraction: &str) -> Option<Decimal> {
    let integer = if integer.is_empty() { "0" } else { integer };
    let cents = format!("{fraction:0<2}");
    Decimal::from_str(&format!("{integer}.{cents}")).ok()
}
