//! The message-strings CSV field.
//!
//! A record's message strings travel in a single CSV field, separated by
//! `|`; a literal `|` or `\` is escaped with `\`. Splitting always yields
//! at least one string, so an empty field means one empty message string.

/// Joins message strings into the escaped, `|`-separated field form.
pub fn join_strings(strings: &[String]) -> String {
    let mut out = String::new();
    for (index, string) in strings.iter().enumerate() {
        if index > 0 {
            out.push('|');
        }
        for c in string.chars() {
            if c == '|' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Splits the field form back into message strings.
pub fn split_strings(field: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '|' => strings.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    strings.push(current);
    strings
}
