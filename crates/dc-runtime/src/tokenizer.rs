/// Splits command text into tokens.
///
/// Whitespace separates tokens. A double quote opens a span that runs to the
/// next unescaped quote (or end of input) and is emitted as one token even if
/// empty. Inside a span only `\\` and `\"` are escapes; any other backslash is
/// kept verbatim.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }

        if ch != '"' {
            current.push(ch);
            continue;
        }

        while let Some(quoted) = chars.next() {
            match quoted {
                '"' => break,
                '\\' => match chars.peek() {
                    Some(&next) if next == '\\' || next == '"' => {
                        chars.next();
                        current.push(next);
                    }
                    _ => current.push('\\'),
                },
                other => current.push(other),
            }
        }
        tokens.push(std::mem::take(&mut current));
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
