use rand::{distr::Alphanumeric, Rng};

/// Reserved SQL keywords that need quoting.
pub const RESERVED_KEYWORDS: &[&str] =
    &["group", "user", "order", "table", "index", "primary", "key", "session", "value"];

/// Quotes an identifier with ANSI double quotes if it's a reserved keyword.
#[inline]
pub fn quote_identifier(name: &str) -> String {
    quote_identifier_with(name, '"')
}

/// Quotes an identifier with `quote` if it's a reserved keyword.
pub fn quote_identifier_with(name: &str, quote: char) -> String {
    if RESERVED_KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
        format!("{}{}{}", quote, name, quote)
    } else {
        name.to_string()
    }
}

/// Renders a SQL string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Lowercases and replaces anything outside `[a-z0-9_]` so the result can be
/// embedded in a generated table name.
pub fn sanitize_name_segment(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

pub fn generate_random_id(len: usize) -> String {
    rand::rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}
