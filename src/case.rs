//! Key casing between the wire convention (snake_case) and the in-memory
//! convention (camelCase).
//!
//! Both functions work on plain strings with no knowledge of the surrounding
//! structure, and both are total: every input produces an output.

/// Converts a camelCase key to snake_case.
///
/// Every uppercase character is replaced by an underscore followed by its
/// lowercase form. A leading uppercase letter therefore produces a leading
/// underscore.
///
/// # Examples
///
/// ```
/// use wirecall::case::to_snake;
///
/// assert_eq!(to_snake("orgName"), "org_name");
/// assert_eq!(to_snake("ipv4Block"), "ipv4_block");
/// assert_eq!(to_snake("Name"), "_name");
/// ```
pub fn to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for ch in s.chars() {
        if ch.is_uppercase() {
            out.push('_');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a snake_case key to camelCase.
///
/// Every underscore followed by a character is replaced by the uppercase form
/// of that character, scanning left to right. A trailing underscore is kept.
///
/// # Examples
///
/// ```
/// use wirecall::case::to_camel;
///
/// assert_eq!(to_camel("org_name"), "orgName");
/// assert_eq!(to_camel("ipv4_block"), "ipv4Block");
/// ```
pub fn to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '_' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) => out.extend(next.to_uppercase()),
            None => out.push('_'),
        }
    }
    out
}
