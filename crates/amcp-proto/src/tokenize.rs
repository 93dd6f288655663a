//! AMCP line tokenization.
//!
//! Splits one complete command line (delimiter already stripped by the
//! transport) into tokens. Spaces separate tokens except inside double
//! quotes, and a backslash escapes the following character. `\\`, `\"`
//! and `\n` are shorthand for a literal backslash, quote and newline;
//! any other escaped character passes through unchanged. Closing a
//! quote always emits the accumulated token, so `""` yields one empty
//! token. No input is ever rejected.

/// Tokenize one AMCP command line.
///
/// # Examples
///
/// ```
/// use amcp_proto::tokenize;
///
/// assert_eq!(tokenize("CG 1 ADD"), vec!["CG", "1", "ADD"]);
/// assert_eq!(tokenize(r#"PLAY 1 "my clip""#), vec!["PLAY", "1", "my clip"]);
/// ```
pub fn tokenize(message: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaping = false;

    for ch in message.chars() {
        if escaping {
            match ch {
                '\\' => current.push('\\'),
                '"' => current.push('"'),
                'n' => current.push('\n'),
                other => current.push(other),
            }
            escaping = false;
            continue;
        }

        match ch {
            '\\' => escaping = true,
            ' ' if !in_quote => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '"' => {
                in_quote = !in_quote;
                // A closing quote emits the token even when it is empty.
                if !current.is_empty() || !in_quote {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            other => current.push(other),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
