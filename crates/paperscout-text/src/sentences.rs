//! Rule-based sentence boundary detection tuned for scientific abstracts.

use crate::resources::{ensure_ready, TextResources};

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

fn is_opening(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '\u{201C}' | '\u{2018}')
}

/// Split `text` into trimmed, non-empty sentences.
///
/// A sentence ends at `.`, `!` or `?` (plus any closing quotes or brackets)
/// when what follows is end of text, or whitespace and then an uppercase
/// letter, a digit or an opening quote/bracket. A period after a known
/// abbreviation or a single-letter initial is not a boundary.
pub fn split_sentences(text: &str) -> Vec<String> {
    let resources = ensure_ready();
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }

        let abbreviated = c == '.' && ends_with_abbreviation(&text[start..pos], resources);
        if !abbreviated && starts_new_sentence(&chars, j) {
            let end = chars.get(j).map_or(text.len(), |&(p, _)| p);
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
        i = j;
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

/// Whether the text from char index `j` on can begin a new sentence.
fn starts_new_sentence(chars: &[(usize, char)], j: usize) -> bool {
    let Some(&(_, next)) = chars.get(j) else {
        return true;
    };
    if !next.is_whitespace() {
        return false;
    }
    match chars[j..].iter().map(|&(_, c)| c).find(|c| !c.is_whitespace()) {
        None => true,
        Some(c) => c.is_uppercase() || c.is_ascii_digit() || is_opening(c),
    }
}

fn ends_with_abbreviation(before_period: &str, resources: &TextResources) -> bool {
    let token = before_period
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(is_opening);
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (None, _) => false,
        (Some(c), None) => c.is_alphabetic(),
        _ => resources.is_abbreviation(&token.to_lowercase()),
    }
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
