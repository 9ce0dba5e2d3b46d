//! Preference Extractor: turns one free-text message into a `PreferenceDelta`.
//!
//! Only the current message is inspected, never history. Each signal class (salary,
//! location type, titles, credentials, industries) is detected independently, so a
//! single message may change several fields.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::candidate::CandidateProfile;
use crate::models::job::LocationType;
use crate::preferences::vocabulary::{
    AFFIRMATIONS, CREDENTIALS, INDUSTRIES, LOCATION_TYPES, NEGATIONS, SALARY_MENTIONS,
    SALARY_THRESHOLDS, TITLES,
};
use crate::preferences::{InvalidPreferenceValue, PreferenceDelta, PreferenceField};

/// Result of running the extractor against a profile.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub updated: CandidateProfile,
    pub changed: BTreeSet<PreferenceField>,
    pub delta: PreferenceDelta,
    pub rejected: Vec<InvalidPreferenceValue>,
}

/// Extracts preferences from `message` and applies them to a copy of `current`.
///
/// `changed` lists only the fields whose value differs from `current`.
pub fn extract(message: &str, current: &CandidateProfile) -> Extraction {
    let (delta, rejected) = extract_delta(message);
    let mut updated = current.clone();
    let changed = delta.apply(&mut updated);

    debug!(
        candidate_id = %current.id,
        changed = changed.len(),
        rejected = rejected.len(),
        "preference extraction finished"
    );

    Extraction {
        updated,
        changed,
        delta,
        rejected,
    }
}

/// Detects every signal in `message` without looking at any profile.
pub fn extract_delta(message: &str) -> (PreferenceDelta, Vec<InvalidPreferenceValue>) {
    let mut delta = PreferenceDelta::default();
    let mut rejected = Vec::new();
    let normalized = normalize(message);

    match find_salary_amount(message) {
        Some(Ok(amount)) => delta.min_salary = Some(amount),
        Some(Err(raw)) => rejected.push(InvalidPreferenceValue {
            field: PreferenceField::MinSalary,
            value: raw,
            reason: "amount is out of range".to_string(),
        }),
        None => {}
    }

    // Most recent statement wins: the keyword stated last in the message.
    let location = LOCATION_TYPES
        .iter()
        .filter_map(|(kw, location_type)| {
            phrase_position(&normalized, kw).map(|pos| (pos, *location_type))
        })
        .max_by_key(|(pos, _)| *pos)
        .map(|(_, location_type)| location_type);
    if let Some(location_type) = location {
        delta.preferred_location_types = Some(vec![location_type]);
    }

    let mut remaining = normalized.clone();
    let mut credentials = Vec::new();
    for (phrases, canonical) in CREDENTIALS {
        let mut found = false;
        for phrase in phrases.iter() {
            if contains_phrase(&remaining, phrase) {
                found = true;
                blank_phrase(&mut remaining, phrase);
            }
        }
        if found {
            credentials.push(canonical.to_string());
        }
    }
    let affirmed = AFFIRMATIONS.iter().any(|kw| contains_phrase(&normalized, kw))
        && !NEGATIONS.iter().any(|kw| contains_phrase(&normalized, kw));
    if affirmed {
        delta.skills = credentials;
    }

    delta.preferred_titles = vocabulary_hits(&remaining, TITLES);
    delta.preferred_industries = vocabulary_hits(&remaining, INDUSTRIES);

    (delta, rejected)
}

/// Canonical names of every vocabulary entry found in `text`, in stated order.
fn vocabulary_hits(text: &str, vocabulary: &[(&[&str], &str)]) -> Vec<String> {
    let mut hits: Vec<(usize, &str)> = vocabulary
        .iter()
        .filter_map(|(phrases, canonical)| {
            phrases
                .iter()
                .filter_map(|phrase| first_position(text, phrase))
                .min()
                .map(|pos| (pos, *canonical))
        })
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);
    hits.into_iter().map(|(_, c)| c.to_string()).collect()
}

/// Lowercases, drops apostrophes and collapses everything else that is not
/// alphanumeric to single spaces. The result is padded with one space on each side
/// so whole-word phrases can be found with `" phrase "`.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
        } else if ch == '\'' || ch == '\u{2019}' {
            continue;
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    first_position(normalized, phrase).is_some()
}

fn first_position(normalized: &str, phrase: &str) -> Option<usize> {
    normalized.find(&format!(" {phrase} "))
}

fn phrase_position(normalized: &str, phrase: &str) -> Option<usize> {
    normalized.rfind(&format!(" {phrase} "))
}

fn blank_phrase(normalized: &mut String, phrase: &str) {
    let needle = format!(" {phrase} ");
    while normalized.contains(&needle) {
        *normalized = normalized.replace(&needle, " ");
    }
}

/// Most characters allowed between a salary phrase and its amount.
const MAX_INTENT_GAP: usize = 24;

/// A number in a message that may be a salary, located by char offsets.
#[derive(Debug)]
struct AmountMention {
    start: usize,
    end: usize,
    value: Result<u64, String>,
    /// Written with `$` or a `k` suffix.
    marked: bool,
}

/// Finds the amount tied to a salary phrase in `message`.
///
/// Only amounts within `MAX_INTENT_GAP` characters of a phrase count, on either side.
/// Threshold phrases outrank plain mentions of salary, then the nearest amount wins,
/// then `$`/`k` amounts beat bare numbers. Returns `Err(raw)` when the chosen amount
/// does not fit.
fn find_salary_amount(message: &str) -> Option<Result<u64, String>> {
    let chars: Vec<char> = message.to_lowercase().chars().collect();
    let amounts = amount_mentions(&chars);
    if amounts.is_empty() {
        return None;
    }
    let words = words(&chars);

    let mut best: Option<((usize, usize, bool), &AmountMention)> = None;
    for (tier, phrases) in [SALARY_THRESHOLDS, SALARY_MENTIONS].into_iter().enumerate() {
        for phrase in phrases {
            for (start, end) in phrase_spans(&words, phrase) {
                for amount in &amounts {
                    let gap = if amount.start >= end {
                        amount.start - end
                    } else if amount.end <= start {
                        start - amount.end
                    } else {
                        0
                    };
                    if gap > MAX_INTENT_GAP {
                        continue;
                    }
                    let key = (tier, gap, !amount.marked);
                    if best.as_ref().map_or(true, |(best_key, _)| key < *best_key) {
                        best = Some((key, amount));
                    }
                }
            }
        }
    }

    best.map(|(_, amount)| amount.value.clone())
}

/// Every `$` amount, `k` amount and bare number of at least 1000 in `chars`.
/// Thousands separators are stripped and `k` multiplies by 1000.
fn amount_mentions(chars: &[char]) -> Vec<AmountMention> {
    let mut mentions = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let has_dollar = chars[i] == '$';
        let start = if has_dollar { i + 1 } else { i };
        let word_start = has_dollar || i == 0 || !chars[i - 1].is_alphanumeric();

        if start < chars.len() && chars[start].is_ascii_digit() && word_start {
            let mut end = start;
            while end < chars.len()
                && (chars[end].is_ascii_digit() || chars[end] == ',' || chars[end] == '.')
            {
                end += 1;
            }
            let raw: String = chars[start..end].iter().collect();
            let raw = raw.trim_end_matches([',', '.']).to_string();
            let has_k = end < chars.len()
                && chars[end] == 'k'
                && (end + 1 == chars.len() || !chars[end + 1].is_alphanumeric());
            let marked = has_dollar || has_k;
            let span_end = if has_k { end + 1 } else { end };

            let value = match parse_amount(&raw, has_k) {
                Some(amount) if marked || amount >= 1000 => Some(Ok(amount)),
                Some(_) => None,
                None => Some(Err(raw)),
            };
            if let Some(value) = value {
                mentions.push(AmountMention {
                    start: i,
                    end: span_end,
                    value,
                    marked,
                });
            }
            i = end.max(i + 1);
            continue;
        }
        i += 1;
    }

    mentions
}

/// Words of `chars` with their char offsets, split the same way as `normalize`.
fn words(chars: &[char]) -> Vec<(String, usize, usize)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() {
            if current.is_empty() {
                start = i;
            }
            current.push(ch);
        } else if ch == '\'' || ch == '\u{2019}' {
            continue;
        } else if !current.is_empty() {
            out.push((std::mem::take(&mut current), start, i));
        }
    }
    if !current.is_empty() {
        out.push((current, start, chars.len()));
    }
    out
}

/// Char spans of every whole-word occurrence of `phrase`.
fn phrase_spans(words: &[(String, usize, usize)], phrase: &str) -> Vec<(usize, usize)> {
    let parts: Vec<&str> = phrase.split(' ').collect();
    if words.len() < parts.len() {
        return Vec::new();
    }
    words
        .windows(parts.len())
        .filter(|window| {
            window
                .iter()
                .zip(&parts)
                .all(|((word, _, _), part)| word.as_str() == *part)
        })
        .map(|window| (window[0].1, window[window.len() - 1].2))
        .collect()
}

fn parse_amount(raw: &str, thousands: bool) -> Option<u64> {
    let cleaned = raw.replace(',', "");
    let multiplier = if thousands { 1000 } else { 1 };

    if cleaned.contains('.') {
        let value: f64 = cleaned.parse().ok()?;
        let scaled = (value * multiplier as f64).round();
        if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
            return None;
        }
        Some(scaled as u64)
    } else {
        cleaned.parse::<u64>().ok()?.checked_mul(multiplier)
    }
}
