use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_SEPARATOR_RX: Regex = Regex::new(r"[._]+").unwrap();
}

/// A Rust string literal holding `text`.
pub fn quote(text: &str) -> String {
    format!("{:?}", text)
}

/// Converts a TL name to PascalCase.
/// - Dots and underscores separate words: `auth.sentCode` becomes `AuthSentCode`.
/// - A fully uppercase word keeps only its first letter uppercase.
/// - Otherwise, the casing of the rest of each word is preserved.
pub fn to_pascal_case(s: &str) -> String {
    WORD_SEPARATOR_RX
        .split(s)
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) if word.len() > 1 && word == word.to_uppercase() => {
                    first.to_uppercase().to_string() + &chars.as_str().to_lowercase()
                }
                Some(first) => first.to_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect()
}

/// Converts a TL name to snake_case.
/// Consecutive uppercase letters stay one word, so "sessionID" becomes "session_id".
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '.' {
            snake.push('_');
        } else if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                // Insert an underscore if the previous character is not uppercase,
                // or if the next character exists and is lowercase.
                let starts_word = !prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase());
                if starts_word && prev != '_' && prev != '.' {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes Rust keywords, including the reserved ones, by suffixing with an
/// underscore.
pub fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "abstract", "as", "async", "await", "become", "box", "break", "const",
        "continue", "crate", "do", "dyn", "else", "enum", "extern", "false",
        "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
        "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
        "return", "self", "Self", "static", "struct", "super", "trait", "true",
        "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
        "while", "yield",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("user"), "User");
        assert_eq!(to_pascal_case("inputPeerUser"), "InputPeerUser");
        assert_eq!(to_pascal_case("auth.sentCode"), "AuthSentCode");
        assert_eq!(to_pascal_case("user_full"), "UserFull");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("A"), "A");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("first_name"), "first_name");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("userId"), "user_id");
        assert_eq!(to_snake_case("auth.sendCode"), "auth_send_code");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
    }

    #[test]
    fn test_escape_and_quote() {
        assert_eq!(escape_rust_keyword("type"), "type_");
        assert_eq!(escape_rust_keyword("name"), "name");
        for reserved in ["final", "box", "yield", "try", "abstract", "macro"] {
            assert_eq!(escape_rust_keyword(reserved), format!("{}_", reserved));
        }
        assert_eq!(quote("user"), "\"user\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
