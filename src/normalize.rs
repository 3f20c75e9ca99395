//! Identifier normalization
//!
//! Canonicalizes raw contact identifiers (phone numbers and emails) into the
//! comparable keys used to join messages, chat participants and address book
//! records.

use regex::Regex;

use crate::error::Result;

/// Canonicalizes raw identifiers into join keys.
///
/// Phone numbers lose their punctuation and, for US-style numbers, a single
/// leading `1`/`+1`; emails are only trimmed. Normalization is pure and
/// idempotent, and never fails: identifiers it cannot improve pass through
/// unchanged.
#[derive(Debug)]
pub struct IdentifierNormalizer {
    phone_noise: Regex,
    leading_one: Regex,
}

impl IdentifierNormalizer {
    /// Compile the normalization patterns.
    pub fn new() -> Result<Self> {
        // Parens, dashes, regular spaces and the non-breaking spaces that
        // device backups embed in formatted numbers.
        let phone_noise = Regex::new(r"[()\- \x{A0}]+")?;
        // A single international prefix, stripped only when exactly ten
        // digits remain so non-US numbers are left intact.
        let leading_one = Regex::new(r"^\+?1(\d{10})$")?;

        Ok(Self {
            phone_noise,
            leading_one,
        })
    }

    /// Canonicalize one raw identifier.
    ///
    /// Inputs containing `@` are treated as emails and only trimmed. Anything
    /// else is treated as a phone number: formatting characters are removed
    /// and a leading `1` or `+1` is dropped when exactly ten digits follow
    /// it. Empty and whitespace-only inputs pass through unchanged.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return raw.to_string();
        }

        if raw.contains('@') {
            return raw.trim().to_string();
        }

        let stripped = self.phone_noise.replace_all(raw, "");
        match self.leading_one.captures(&stripped) {
            Some(caps) => caps[1].to_string(),
            None => stripped.into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> IdentifierNormalizer {
        IdentifierNormalizer::new().expect("patterns compile")
    }

    #[test]
    fn formatted_us_number_collapses_to_ten_digits() {
        assert_eq!(normalizer().normalize("+1 (415) 555-0100"), "4155550100");
    }

    #[test]
    fn bare_leading_one_is_stripped() {
        assert_eq!(normalizer().normalize("14155550100"), "4155550100");
    }

    #[test]
    fn seven_digit_residue_is_untouched() {
        assert_eq!(normalizer().normalize("555-0100"), "5550100");
    }

    #[test]
    fn long_international_number_keeps_its_prefix() {
        assert_eq!(normalizer().normalize("+447700900123"), "+447700900123");
        assert_eq!(normalizer().normalize("1415555010012"), "1415555010012");
    }

    #[test]
    fn email_is_only_trimmed() {
        assert_eq!(normalizer().normalize(" a@b.com "), "a@b.com");
        assert_eq!(
            normalizer().normalize("15551234567@example.com"),
            "15551234567@example.com"
        );
    }

    #[test]
    fn non_breaking_spaces_are_treated_as_spaces() {
        assert_eq!(
            normalizer().normalize("+1\u{a0}415\u{a0}555\u{a0}0100"),
            "4155550100"
        );
    }

    #[test]
    fn blank_inputs_pass_through() {
        assert_eq!(normalizer().normalize(""), "");
        assert_eq!(normalizer().normalize("   "), "   ");
    }
}
