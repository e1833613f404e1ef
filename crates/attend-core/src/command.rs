// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload metadata parsing and device-code matching.
//!
//! Payloads follow the terminal push protocol: `C:<code>:<command text>`.
//! The code is chosen when the payload is formatted and echoed back by the
//! device in its result report. Routing metadata (target user, category) is
//! read from marker substrings in the command text.

use crate::types::CommandCategory;

/// Marker preceding the target user identifier.
pub const PIN_MARKER: &str = "PIN=";

const DELETE_MARKERS: &[&str] = &["DELETE USERINFO", "DEL_USER"];
const PHOTO_MARKERS: &[&str] = &["USERPIC", "BIOPHOTO"];
const UPSERT_MARKERS: &[&str] = &["USERINFO", "DATA USER"];

/// Separators allowed between a shared code and its sequence suffix.
const SUFFIX_SEPARATORS: &[char] = &['-', '_', '.'];

/// Extract the device-local code from the `C:<code>:` header.
pub fn parse_device_code(payload: &str) -> Option<&str> {
    let rest = payload.trim_start().strip_prefix("C:")?;
    let (code, _) = rest.split_once(':')?;
    let code = code.trim();
    (!code.is_empty()).then_some(code)
}

/// Extract the target user from the first whitespace-delimited `PIN=` token.
pub fn parse_target_user(payload: &str) -> Option<&str> {
    payload
        .split(|c: char| c.is_whitespace() || c == '&')
        .find_map(|token| token.strip_prefix(PIN_MARKER))
        .filter(|pin| !pin.is_empty())
}

/// Classify a payload by its command markers.
///
/// Delete markers are checked first since `DELETE USERINFO` also contains the
/// upsert marker.
pub fn classify_payload(payload: &str) -> CommandCategory {
    let contains_any = |markers: &[&str]| markers.iter().any(|m| payload.contains(m));
    if contains_any(DELETE_MARKERS) {
        CommandCategory::UserDelete
    } else if contains_any(PHOTO_MARKERS) {
        CommandCategory::UserPhoto
    } else if contains_any(UPSERT_MARKERS) {
        CommandCategory::UserUpsert
    } else {
        CommandCategory::Other
    }
}

/// Whether a code embedded in a sent payload matches a code reported by the
/// device.
///
/// Codes match when equal, or when one is a prefix of the other and the
/// remainder is a sequence suffix: an optional single separator followed by
/// one or more ASCII digits. Batches reuse one umbrella code with numbered
/// suffixes, and devices echo either form.
pub fn codes_match(embedded: &str, reported: &str) -> bool {
    if embedded.is_empty() || reported.is_empty() {
        return false;
    }
    if embedded == reported {
        return true;
    }
    let (short, long) = if embedded.len() < reported.len() {
        (embedded, reported)
    } else {
        (reported, embedded)
    };
    long.strip_prefix(short).is_some_and(is_sequence_suffix)
}

fn is_sequence_suffix(rest: &str) -> bool {
    let digits = rest.strip_prefix(SUFFIX_SEPARATORS).unwrap_or(rest);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn device_code_from_header() {
        assert_eq!(parse_device_code("C:X01:DATA USER PIN=7"), Some("X01"));
        assert_eq!(parse_device_code("C:1A2B3C4D:INFO"), Some("1A2B3C4D"));
        assert_eq!(parse_device_code("DATA USER PIN=7"), None);
        assert_eq!(parse_device_code("C::DATA"), None);
        assert_eq!(parse_device_code("C:nocolon"), None);
    }

    #[test]
    fn target_user_from_space_or_tab_separated_fields() {
        assert_eq!(parse_target_user("C:1:DATA USER PIN=7 Name=Ann"), Some("7"));
        assert_eq!(
            parse_target_user("C:1:DATA UPDATE USERINFO PIN=42\tName=Bo\tPri=0"),
            Some("42")
        );
        assert_eq!(parse_target_user("C:1:DATA UPDATE USERINFO PIN=\tName=x"), None);
        assert_eq!(parse_target_user("C:1:INFO"), None);
    }

    #[test]
    fn classify_known_markers() {
        assert_eq!(
            classify_payload("C:1:DATA UPDATE USERINFO PIN=1\tName=a"),
            CommandCategory::UserUpsert
        );
        assert_eq!(
            classify_payload("C:1:DATA USER PIN=7 Name=Ann"),
            CommandCategory::UserUpsert
        );
        assert_eq!(
            classify_payload("C:1:DATA UPDATE USERPIC PIN=1\tSize=3\tContent=abc"),
            CommandCategory::UserPhoto
        );
        assert_eq!(
            classify_payload("C:1:DATA UPDATE BIOPHOTO PIN=1\tType=9"),
            CommandCategory::UserPhoto
        );
        assert_eq!(
            classify_payload("C:1:DATA DELETE USERINFO PIN=1"),
            CommandCategory::UserDelete
        );
        assert_eq!(classify_payload("C:1:REBOOT"), CommandCategory::Other);
    }

    #[test]
    fn exact_code_matches() {
        assert!(codes_match("X01", "X01"));
        assert!(!codes_match("X01", "X02"));
    }

    #[test]
    fn sequence_suffixed_report_matches_shared_code() {
        assert!(codes_match("AB12", "AB1201"));
        assert!(codes_match("AB1201", "AB12"));
        assert!(codes_match("AB12", "AB12-3"));
    }

    #[test]
    fn non_sequence_suffix_does_not_match() {
        assert!(!codes_match("AB12", "AB12XY"));
        assert!(!codes_match("AB12", "AB12-"));
        assert!(!codes_match("AB12", "AB12--1"));
        assert!(!codes_match("", "AB12"));
    }

    proptest! {
        #[test]
        fn codes_match_is_symmetric(a in "[A-F0-9]{1,8}", b in "[A-F0-9]{1,10}") {
            prop_assert_eq!(codes_match(&a, &b), codes_match(&b, &a));
        }

        #[test]
        fn numbered_batch_member_matches_umbrella(code in "[A-F0-9]{8}", seq in 1u32..100) {
            let member = format!("{code}{seq:02}");
            prop_assert!(codes_match(&member, &code));
        }

        #[test]
        fn distinct_fixed_width_codes_never_match(a in "[A-F0-9]{8}", b in "[A-F0-9]{8}") {
            prop_assume!(a != b);
            prop_assert!(!codes_match(&a, &b));
        }
    }
}
