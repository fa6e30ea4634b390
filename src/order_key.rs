//! Fractional-index order keys.
//!
//! Sibling order is stored as a short base-62 string compared
//! lexicographically. [`key_between`] produces a key strictly between two
//! neighbours, growing the key by one digit only when the gap cannot be
//! bisected at the current length. Keys never end in the zero digit, so
//! every key keeps a non-empty open interval on both sides.

use crate::error::{Result, WorkstackError};

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: usize = 62;

/// Key for the first entry of an empty sibling list.
pub const INITIAL: &str = "V";

fn digit_index(c: u8) -> Option<usize> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as usize),
        b'A'..=b'Z' => Some((c - b'A') as usize + 10),
        b'a'..=b'z' => Some((c - b'a') as usize + 36),
        _ => None,
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.ends_with('0')
        && key.bytes().all(|c| digit_index(c).is_some())
}

/// Midpoint of two fractional digit strings. `a` must sort strictly below
/// `b`; the empty string stands for zero on the left and infinity on the
/// right. Digits are validated by the caller.
fn midpoint(a: &str, b: &str) -> String {
    if !b.is_empty() {
        // Carry the shared prefix over verbatim and bisect the remainder.
        let ab = a.as_bytes();
        let bb = b.as_bytes();
        let mut n = 0;
        while n < bb.len() && ab.get(n).copied().unwrap_or(b'0') == bb[n] {
            n += 1;
        }
        if n > 0 {
            // n can run past a's end when a is a zero-padded prefix of b
            return format!(
                "{}{}",
                &b[..n],
                midpoint(a.get(n..).unwrap_or(""), &b[n..])
            );
        }
    }

    let da = a
        .as_bytes()
        .first()
        .and_then(|&c| digit_index(c))
        .unwrap_or(0);
    let db = b
        .as_bytes()
        .first()
        .and_then(|&c| digit_index(c))
        .unwrap_or(BASE);

    if db - da > 1 {
        let mid = (da + db + 1) / 2;
        return (DIGITS[mid] as char).to_string();
    }

    // Consecutive leading digits: the gap lives below b's remainder or
    // above a's remainder.
    if b.len() > 1 {
        return (b.as_bytes()[0] as char).to_string();
    }
    format!(
        "{}{}",
        DIGITS[da] as char,
        midpoint(a.get(1..).unwrap_or(""), "")
    )
}

/// Generate an order key strictly between `before` and `after`. `None`
/// means "no neighbour on that side". Equal or inverted neighbours indicate
/// duplicate sibling keys, a data-integrity bug, and fail.
pub fn key_between(before: Option<&str>, after: Option<&str>) -> Result<String> {
    let exhausted = || {
        WorkstackError::OrderKeyExhausted(
            before.map(str::to_string),
            after.map(str::to_string),
        )
    };

    if let Some(b) = before
        && !is_valid_key(b)
    {
        return Err(exhausted());
    }
    if let Some(a) = after
        && !is_valid_key(a)
    {
        return Err(exhausted());
    }
    if let (Some(b), Some(a)) = (before, after)
        && b >= a
    {
        return Err(exhausted());
    }

    Ok(midpoint(before.unwrap_or(""), after.unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn between(before: Option<&str>, after: Option<&str>) -> String {
        let key = key_between(before, after).unwrap();
        if let Some(b) = before {
            assert!(key.as_str() > b, "{key:?} must sort above {b:?}");
        }
        if let Some(a) = after {
            assert!(key.as_str() < a, "{key:?} must sort below {a:?}");
        }
        assert!(!key.ends_with('0'), "{key:?} must not end in zero");
        key
    }

    #[test]
    fn first_key_in_empty_list() {
        assert_eq!(between(None, None), INITIAL);
    }

    #[test]
    fn append_after_and_prepend_before() {
        let k = between(None, None);
        let after = between(Some(&k), None);
        let before = between(None, Some(&k));
        assert!(before < k && k < after);
    }

    #[test]
    fn bisects_adjacent_digits() {
        // "V" and "W" leave no single-digit gap; the key must grow.
        let k = between(Some("V"), Some("W"));
        assert!(k.len() > 1);
    }

    #[test]
    fn bisects_wide_gap_with_single_digit() {
        let k = between(Some("3"), Some("x"));
        assert_eq!(k.len(), 1);
    }

    #[test]
    fn prepend_below_lowest_digit() {
        // Nothing sorts below "1" at length one; the key must grow.
        let k = between(None, Some("1"));
        assert!(k.starts_with('0'));
    }

    #[test]
    fn append_above_highest_digit() {
        let k = between(Some("z"), None);
        assert!(k.starts_with('z') && k.len() > 1);
    }

    #[test]
    fn shared_prefix_is_preserved() {
        let k = between(Some("Vx"), Some("Vz"));
        assert!(k.starts_with('V'));
    }

    #[test]
    fn zero_padded_prefix_does_not_panic() {
        // "V" reads as "V0…" against "V01"; the scan runs past its end
        between(Some("V"), Some("V01"));
        between(Some("V"), Some("V1"));
    }

    #[test]
    fn repeated_head_insertion_stays_ordered() {
        let mut head = between(None, None);
        for _ in 0..100 {
            let k = between(None, Some(&head));
            assert!(k < head);
            head = k;
        }
    }

    #[test]
    fn repeated_tail_insertion_stays_ordered() {
        let mut tail = between(None, None);
        for _ in 0..100 {
            let k = between(Some(&tail), None);
            assert!(k > tail);
            tail = k;
        }
    }

    #[test]
    fn repeated_midpoint_insertion_stays_ordered() {
        let mut lo = between(None, None);
        let hi = between(Some(&lo), None);
        for _ in 0..100 {
            let k = between(Some(&lo), Some(&hi));
            assert!(lo < k && k < hi);
            lo = k;
        }
    }

    #[test]
    fn equal_neighbours_fail() {
        let err = key_between(Some("V"), Some("V")).unwrap_err();
        assert!(matches!(err, WorkstackError::OrderKeyExhausted(..)));
    }

    #[test]
    fn inverted_neighbours_fail() {
        assert!(key_between(Some("W"), Some("V")).is_err());
    }

    #[test]
    fn invalid_digits_fail() {
        assert!(key_between(Some("V!"), None).is_err());
        assert!(key_between(Some("V0"), None).is_err());
        assert!(key_between(Some(""), None).is_err());
    }
}
