//! Text patterns shared by the order extractor and the cache write guard.

use once_cell::sync::Lazy;
use regex::Regex;

pub const PHONE_MIN_DIGITS: usize = 8;
pub const PHONE_MAX_DIGITS: usize = 15;

/// Markers that introduce a delivery location, in every operating language.
pub const ADDRESS_MARKERS: &[&str] = &[
    "hotel",
    "room",
    "address",
    "villa",
    "resort",
    "bungalow",
    "отель",
    "гостиниц",
    "комнат",
    "адрес",
    "вилла",
    "โรงแรม",
    "ห้อง",
    "ที่อยู่",
];

// A digit run where single separators (space, dash, dot, parentheses) may sit
// between digits, optionally led by `+`.
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\(?\d(?:[\s\-.()]{0,2}\d)+").expect("digit run pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigitRun<'a> {
    pub text: &'a str,
    pub digits: usize,
}

pub fn digit_runs(text: &str) -> impl Iterator<Item = DigitRun<'_>> {
    DIGIT_RUN.find_iter(text).map(|found| {
        let text = found.as_str();
        DigitRun { text, digits: text.chars().filter(char::is_ascii_digit).count() }
    })
}

/// First digit run shaped like a phone number (8 to 15 digits).
pub fn find_phone(text: &str) -> Option<&str> {
    digit_runs(text)
        .find(|run| (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&run.digits))
        .map(|run| run.text)
}

pub fn has_long_digit_run(text: &str) -> bool {
    digit_runs(text).any(|run| run.digits >= PHONE_MIN_DIGITS)
}

pub fn contains_any(normalized: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| normalized.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::{contains_any, find_phone, has_long_digit_run, ADDRESS_MARKERS};

    #[test]
    fn finds_phone_with_or_without_separators() {
        assert_eq!(find_phone("call +66812345678 pls"), Some("+66812345678"));
        assert_eq!(find_phone("my number 081-234-5678"), Some("081-234-5678"));
        assert_eq!(find_phone("+66 81 234 5678"), Some("+66 81 234 5678"));
    }

    #[test]
    fn short_runs_are_not_phones() {
        assert_eq!(find_phone("20g and room 404"), None);
        assert!(!has_long_digit_run("Hotel Y room 12"));
    }

    #[test]
    fn overlong_runs_are_not_phones_but_still_flagged() {
        let card_like = "1234567890123456789";
        assert_eq!(find_phone(card_like), None);
        assert!(has_long_digit_run(card_like));
    }

    #[test]
    fn address_markers_cover_operating_languages() {
        assert!(contains_any("deliver to hotel x", ADDRESS_MARKERS));
        assert!(contains_any("мой адрес ленина 5", ADDRESS_MARKERS));
        assert!(!contains_any("we deliver within koh samui daily", ADDRESS_MARKERS));
    }
}
