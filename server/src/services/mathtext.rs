//! Best-effort repair of LaTeX in model output.
//!
//! Models sometimes emit `\frac` or `\beta` inside a JSON string with a
//! single backslash. JSON decoding turns `\f` and `\b` (and `\r`, `\t`)
//! into control characters, leaving `rac` / `eta` behind. A control
//! character from that set directly followed by a letter is turned back
//! into a backslash sequence. Other occurrences (a CRLF line ending, a tab
//! before a space) are left alone.

/// Undo JSON escape damage to LaTeX commands.
#[must_use]
pub fn restore_latex_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let letter_follows = chars.peek().is_some_and(char::is_ascii_alphabetic);
        match escape_letter(c) {
            Some(letter) if letter_follows => {
                out.push('\\');
                out.push(letter);
            }
            _ => out.push(c),
        }
    }
    out
}

fn escape_letter(c: char) -> Option<char> {
    match c {
        '\u{8}' => Some('b'),
        '\u{c}' => Some('f'),
        '\r' => Some('r'),
        '\t' => Some('t'),
        _ => None,
    }
}

#[cfg(test)]
#[path = "mathtext_test.rs"]
mod tests;
