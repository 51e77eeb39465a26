// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PII redaction for conversational text.
//!
//! Detects known PII formats (emails, phone numbers, payment card numbers,
//! national identifiers, IP addresses) and replaces each match with a typed
//! placeholder such as `[REDACTED:EMAIL]`. Candidates that fail semantic
//! checks (Luhn for card numbers, octet range for IP addresses) are left
//! untouched.

use std::sync::LazyLock;

use regex::Regex;

/// Categories of PII the redactor detects.
///
/// Ordering matters: more specific patterns run first so a card number is
/// not partially consumed by the phone pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiKind {
    Email,
    CreditCard,
    Ssn,
    Phone,
    IpAddress,
}

impl PiiKind {
    /// The typed placeholder inserted in place of a match.
    pub fn marker(&self) -> &'static str {
        match self {
            PiiKind::Email => "[REDACTED:EMAIL]",
            PiiKind::CreditCard => "[REDACTED:CARD]",
            PiiKind::Ssn => "[REDACTED:SSN]",
            PiiKind::Phone => "[REDACTED:PHONE]",
            PiiKind::IpAddress => "[REDACTED:IP]",
        }
    }
}

/// All kinds, in application order.
const KINDS: [PiiKind; 5] = [
    PiiKind::Email,
    PiiKind::CreditCard,
    PiiKind::Ssn,
    PiiKind::Phone,
    PiiKind::IpAddress,
];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap()
});

// 13-19 digits with optional space/dash separators between groups.
// Candidates are confirmed with a Luhn check before replacement.
static CREDIT_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d[ \-]?){12,18}\d\b").unwrap()
});

static SSN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());

// Optional country code, optional parenthesized area code, common
// separators. Both ends are boundary guarded so the pattern never consumes
// part of a longer digit run.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[ .\-]?)?\(?\b\d{3}\)?[ .\-]?\d{3}[ .\-]?\d{4}\b").unwrap()
});

// Octet range is validated before replacement.
static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

/// The result of one redaction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    /// The input with every confirmed PII match replaced by its marker.
    pub text: String,
    /// Total number of replacements made across all kinds.
    pub hits: usize,
}

impl Redaction {
    /// Whether anything was redacted.
    pub fn was_redacted(&self) -> bool {
        self.hits > 0
    }
}

/// Deterministic, idempotent PII redactor.
///
/// Stateless and cheap to share; patterns are compiled once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiRedactor;

impl PiiRedactor {
    pub fn new() -> Self {
        Self
    }

    /// Redact all confirmed PII matches from `input`.
    ///
    /// Replacement markers never themselves match any pattern, so
    /// `redact(redact(x).text)` always equals `redact(x).text`.
    pub fn redact(&self, input: &str) -> Redaction {
        let mut text = input.to_string();
        let mut hits = 0usize;

        for kind in KINDS {
            let (next, n) = apply_kind(kind, &text);
            text = next;
            hits += n;
        }

        if hits > 0 {
            tracing::debug!(hits, "redacted PII from input text");
        }

        Redaction { text, hits }
    }
}

/// Apply one pattern, counting confirmed replacements.
fn apply_kind(kind: PiiKind, input: &str) -> (String, usize) {
    let pattern: &Regex = match kind {
        PiiKind::Email => &EMAIL,
        PiiKind::CreditCard => &CREDIT_CARD,
        PiiKind::Ssn => &SSN,
        PiiKind::Phone => &PHONE,
        PiiKind::IpAddress => &IPV4,
    };

    let mut count = 0usize;
    let result = pattern.replace_all(input, |caps: &regex::Captures<'_>| {
        let matched = &caps[0];
        let confirmed = match kind {
            PiiKind::CreditCard => luhn_valid(matched),
            PiiKind::IpAddress => valid_ipv4(matched),
            _ => true,
        };
        if confirmed {
            count += 1;
            kind.marker().to_string()
        } else {
            matched.to_string()
        }
    });

    (result.into_owned(), count)
}

/// Luhn checksum over the digits of a card candidate (separators ignored).
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// All four octets must be in range.
fn valid_ipv4(candidate: &str) -> bool {
    candidate
        .split('.')
        .all(|octet| octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn redact(input: &str) -> Redaction {
        PiiRedactor::new().redact(input)
    }

    #[test]
    fn redacts_email_address() {
        let result = redact("reach me at alice@example.com tomorrow");
        assert_eq!(result.text, "reach me at [REDACTED:EMAIL] tomorrow");
        assert_eq!(result.hits, 1);
    }

    #[test]
    fn redacts_email_with_plus_tag() {
        let result = redact("billing alerts go to bob+invoices@corp.example.co.uk");
        assert!(result.text.contains("[REDACTED:EMAIL]"));
        assert!(!result.text.contains("bob+invoices"));
    }

    #[test]
    fn redacts_us_phone_number() {
        let result = redact("call (415) 555-2671 after lunch");
        assert_eq!(result.text, "call [REDACTED:PHONE] after lunch");
    }

    #[test]
    fn redacts_international_phone_number() {
        let result = redact("my number is +44 207 946-0958");
        assert!(result.text.contains("[REDACTED:PHONE]"));
        assert!(!result.text.contains("946"));
    }

    #[test]
    fn redacts_valid_card_number() {
        // Passes Luhn.
        let result = redact("charge 4111 1111 1111 1111 please");
        assert_eq!(result.text, "charge [REDACTED:CARD] please");
    }

    #[test]
    fn leaves_luhn_invalid_digit_run_alone() {
        // Fails Luhn, so this is not treated as a card number.
        let input = "order id 4111 1111 1111 1112";
        let result = redact(input);
        assert!(!result.text.contains("[REDACTED:CARD]"));
    }

    #[test]
    fn redacts_ssn() {
        let result = redact("SSN on file: 078-05-1120");
        assert_eq!(result.text, "SSN on file: [REDACTED:SSN]");
    }

    #[test]
    fn redacts_ipv4_address() {
        let result = redact("the box at 192.168.1.44 went down");
        assert_eq!(result.text, "the box at [REDACTED:IP] went down");
    }

    #[test]
    fn leaves_out_of_range_octets_alone() {
        let result = redact("version 300.400.500.600 is not an address");
        assert!(!result.text.contains("[REDACTED:IP]"));
    }

    #[test]
    fn passes_through_plain_text() {
        let input = "the user prefers dark roast coffee in the morning";
        let result = redact(input);
        assert_eq!(result.text, input);
        assert_eq!(result.hits, 0);
        assert!(!result.was_redacted());
    }

    #[test]
    fn redacts_multiple_kinds_in_one_message() {
        let input = "email carol@example.org or call 415-555-2671 from 10.0.0.1";
        let result = redact(input);
        assert!(result.text.contains("[REDACTED:EMAIL]"));
        assert!(result.text.contains("[REDACTED:PHONE]"));
        assert!(result.text.contains("[REDACTED:IP]"));
        assert_eq!(result.hits, 3);
    }

    #[test]
    fn redaction_is_idempotent() {
        let input = "alice@example.com, 4111 1111 1111 1111, 078-05-1120, 10.1.2.3";
        let once = redact(input);
        let twice = redact(&once.text);
        assert_eq!(once.text, twice.text);
        assert_eq!(twice.hits, 0);
    }

    #[test]
    fn redaction_is_deterministic() {
        let input = "alice@example.com called from +1 415 555 2671";
        assert_eq!(redact(input).text, redact(input).text);
    }

    proptest! {
        #[test]
        fn idempotent_for_arbitrary_input(input in ".{0,200}") {
            let once = redact(&input);
            let twice = redact(&once.text);
            prop_assert_eq!(once.text, twice.text);
        }

        #[test]
        fn markers_never_leak_email_text(user in "[a-z]{1,8}", host in "[a-z]{1,8}") {
            let input = format!("contact {user}@{host}.com now");
            let result = redact(&input);
            prop_assert!(!result.text.contains('@'));
        }
    }
}
