//! Name derivation: canonical keys, environment variable names and flag names.
//!
//! Every source agrees on what "the same setting" means because all three names
//! are derived here from the field identifier and its prefix:
//!
//! | field | prefix | key | env | flag |
//! |-------|--------|-----|-----|------|
//! | `port` | `""` / `APP` | `port` | `APP_PORT` | `port` |
//! | `inner` under `outer` | `outer` / `APP_OUTER` | `outer.inner` | `APP_OUTER_INNER` | `outer-inner` |

/// Split a compound identifier into `_`-separated words.
///
/// Words are runs of uppercase letters followed by lowercase letters, runs of
/// lowercase letters, or runs of digits. A leading acronym glued to a
/// capitalized word (`ACRWith`) is split into two words (`ACR`, `With`).
/// Any other character separates words, so already split identifiers such as
/// `multi_word_var` come back unchanged.
///
/// Without `split`, the identifier is returned verbatim. The caller is
/// responsible for uppercasing.
///
/// ```ignore
/// assert_eq!(split_words("MultiWordACRWithAutoSplit", true), "Multi_Word_ACR_With_Auto_Split");
/// ```
pub fn split_words(name: &str, split: bool) -> String {
    if !split {
        return name.to_string();
    }

    let words = gather_words(name);
    if words.is_empty() {
        return name.to_string();
    }

    let mut out: Vec<&str> = Vec::with_capacity(words.len());
    for word in words {
        match split_acronym(word) {
            Some((acronym, rest)) => {
                out.push(acronym);
                out.push(rest);
            }
            None => out.push(word),
        }
    }
    out.join("_")
}

/// Scan `name` for word runs, in priority order: uppercase run plus trailing
/// lowercase run, lowercase run, digit run.
fn gather_words(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut words = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        if c.is_ascii_uppercase() {
            while i < bytes.len() && bytes[i].is_ascii_uppercase() {
                i += 1;
            }
            while i < bytes.len() && bytes[i].is_ascii_lowercase() {
                i += 1;
            }
        } else if c.is_ascii_lowercase() {
            while i < bytes.len() && bytes[i].is_ascii_lowercase() {
                i += 1;
            }
        } else if c.is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        } else {
            // Separator or non-ASCII: advance a whole char.
            i += name[i..].chars().next().map_or(1, char::len_utf8);
            continue;
        }
        words.push(&name[start..i]);
    }

    words
}

/// Split `ACRWith` into (`ACR`, `With`).
///
/// Words produced by [`gather_words`] are an uppercase run followed by a
/// lowercase run, so the longest acronym leaving a capitalized remainder ends
/// one character before the last uppercase letter.
fn split_acronym(word: &str) -> Option<(&str, &str)> {
    let upper = word.bytes().take_while(u8::is_ascii_uppercase).count();
    if upper < 2 || upper == word.len() {
        return None;
    }
    Some(word.split_at(upper - 1))
}

/// Join a key segment to a dotted prefix. The result is lowercased.
pub fn join_key(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_lowercase()
    } else {
        format!("{prefix}.{segment}").to_lowercase()
    }
}

/// Join an environment name to an underscore prefix. The result is uppercased.
pub fn join_env(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_uppercase()
    } else {
        format!("{prefix}_{name}").to_uppercase()
    }
}

/// Derive a long flag name from a canonical key: `outer.inner` → `outer-inner`.
pub fn flag_from_key(key: &str) -> String {
    key.replace('.', "-")
}
