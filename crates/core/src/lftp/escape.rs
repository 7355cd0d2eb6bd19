//! Escaping of remote paths for lftp's shell-like command parser.

/// Characters backslash-escaped before spaces are handled.
const SHELL_METACHARACTERS: &[char] = &[
    '\\', '\'', '"', '`', '$', ';', '&', '|', '<', '>', '(', ')', '*', '?', '[', ']', '{', '}',
    '#', '!', '~',
];

/// Escapes a path so it survives as a single word.
///
/// Metacharacters are escaped first, then literal spaces. The order is
/// fixed: escaping spaces first would have their backslashes doubled by the
/// metacharacter pass.
pub fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        if SHELL_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.replace(' ', "\\ ")
}

/// Splits a command line into words, honoring backslash escapes and
/// removing them.
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
