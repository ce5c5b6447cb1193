//! Script tokenizer.
//!
//! Turns script text into a list of commands, each a list of words. A word
//! is a sequence of [`Part`]s that the interpreter concatenates after
//! performing variable and command substitution. Braced words are a single
//! literal part.

use crate::error::{ScriptError, ScriptResult};

/// One piece of a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Text(String),
    /// `$name`, `${name}` or `$name(key)`.
    Var { name: String, key: Option<String> },
    /// `[script]`
    Script(String),
}

pub(crate) type Word = Vec<Part>;
pub(crate) type Command = Vec<Word>;

/// Parse script text into commands.
pub(crate) fn parse(script: &str) -> ScriptResult<Vec<Command>> {
    Parser::new(script).script()
}

/// Split a list value into its elements, honouring braces and quotes but
/// performing no substitution.
pub fn split_list(list: &str) -> ScriptResult<Vec<String>> {
    let mut parser = Parser::new(list);
    let mut items = Vec::new();
    loop {
        parser.skip_while(char::is_whitespace);
        let Some(c) = parser.peek() else {
            return Ok(items);
        };
        let item = match c {
            '{' => parser.braced()?,
            '"' => {
                parser.pos += 1;
                let start = parser.pos;
                while parser.peek().is_some_and(|c| c != '"') {
                    parser.pos += 1;
                }
                if parser.peek().is_none() {
                    return Err(ScriptError::Syntax("unmatched open quote in list".into()));
                }
                let text: String = parser.chars[start..parser.pos].iter().collect();
                parser.pos += 1;
                text
            }
            _ => {
                let mut text = String::new();
                while let Some(c) = parser.peek().filter(|c| !c.is_whitespace()) {
                    parser.pos += 1;
                    if c == '\\' {
                        parser.escape(&mut text);
                    } else {
                        text.push(c);
                    }
                }
                text
            }
        };
        items.push(item);
    }
}

/// Quote a string so that [`split_list`] yields it back as one element.
///
/// Braces are used when the value's own braces nest; otherwise every
/// special character is backslash-escaped.
pub fn quote_element(value: &str) -> String {
    let special = |c: char| {
        c.is_whitespace() || matches!(c, '{' | '}' | '"' | '$' | '[' | ']' | ';' | '\\')
    };
    if !value.is_empty() && !value.chars().any(special) {
        return value.to_string();
    }
    if braces_nest(value) {
        return format!("{{{value}}}");
    }

    let mut quoted = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        match c {
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if special(c) => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted
}

/// Whether `value` can sit between braces and be read back unchanged.
fn braces_nest(value: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn script(&mut self) -> ScriptResult<Vec<Command>> {
        let mut commands = Vec::new();
        loop {
            self.skip_while(|c| c.is_whitespace() || c == ';');
            match self.peek() {
                None => return Ok(commands),
                Some('#') => self.skip_while(|c| c != '\n'),
                Some(_) => {
                    let command = self.command()?;
                    if !command.is_empty() {
                        commands.push(command);
                    }
                }
            }
        }
    }

    fn command(&mut self) -> ScriptResult<Command> {
        let mut words = Vec::new();
        loop {
            self.skip_inline_space();
            match self.peek() {
                None | Some('\n') | Some(';') => return Ok(words),
                Some(_) => words.push(self.word()?),
            }
        }
    }

    /// Spaces, tabs and backslash-newline continuations.
    fn skip_inline_space(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => self.pos += 1,
                Some('\\') if self.peek_at(1) == Some('\n') => self.pos += 2,
                _ => return,
            }
        }
    }

    fn word(&mut self) -> ScriptResult<Word> {
        match self.peek() {
            Some('{') => {
                let text = self.braced()?;
                self.expect_word_end("close-brace")?;
                Ok(vec![Part::Text(text)])
            }
            Some('"') => {
                self.pos += 1;
                let parts = self.parts(|c| c == '"')?;
                if self.peek() != Some('"') {
                    return Err(ScriptError::Syntax("missing \"".into()));
                }
                self.pos += 1;
                self.expect_word_end("close-quote")?;
                Ok(parts)
            }
            _ => self.parts(|c| c.is_whitespace() || c == ';'),
        }
    }

    fn expect_word_end(&self, what: &str) -> ScriptResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(c) if c.is_whitespace() || c == ';' => Ok(()),
            Some(_) => Err(ScriptError::Syntax(format!(
                "extra characters after {what}"
            ))),
        }
    }

    /// Consume `{...}` and return the text between the outer braces.
    fn braced(&mut self) -> ScriptResult<String> {
        self.pos += 1;
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.pos += 1;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(text);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(ScriptError::Syntax("missing close-brace".into()))
    }

    /// Collect parts until `end` matches (the terminator is not consumed).
    fn parts(&mut self, end: impl Fn(char) -> bool) -> ScriptResult<Word> {
        let mut parts = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if end(c) {
                break;
            }
            match c {
                '$' => {
                    self.pos += 1;
                    match self.variable()? {
                        Some(var) => {
                            if !text.is_empty() {
                                parts.push(Part::Text(std::mem::take(&mut text)));
                            }
                            parts.push(var);
                        }
                        None => text.push('$'),
                    }
                }
                '[' => {
                    let script = self.bracketed()?;
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    parts.push(Part::Script(script));
                }
                '\\' => {
                    self.pos += 1;
                    self.escape(&mut text);
                }
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        if !text.is_empty() || parts.is_empty() {
            parts.push(Part::Text(text));
        }
        Ok(parts)
    }

    fn escape(&mut self, text: &mut String) {
        let Some(c) = self.peek() else {
            text.push('\\');
            return;
        };
        self.pos += 1;
        match c {
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '\n' => {
                self.skip_while(|c| c == ' ' || c == '\t');
                text.push(' ');
            }
            other => text.push(other),
        }
    }

    /// Parse the variable reference following a `$`. Returns `None` when the
    /// `$` is not followed by a name.
    fn variable(&mut self) -> ScriptResult<Option<Part>> {
        if self.peek() == Some('{') {
            let name = self.braced()?;
            return Ok(Some(Part::Var { name, key: None }));
        }

        let start = self.pos;
        self.skip_while(|c| c.is_alphanumeric() || c == '_' || c == ':');
        if self.pos == start {
            return Ok(None);
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        let key = if self.peek() == Some('(') {
            self.pos += 1;
            let key_start = self.pos;
            self.skip_while(|c| c != ')');
            if self.peek().is_none() {
                return Err(ScriptError::Syntax(format!(
                    "missing ) in reference to array \"{name}\""
                )));
            }
            let key = self.chars[key_start..self.pos].iter().collect();
            self.pos += 1;
            Some(key)
        } else {
            None
        };

        Ok(Some(Part::Var { name, key }))
    }

    /// Consume `[...]` and return the nested script text.
    fn bracketed(&mut self) -> ScriptResult<String> {
        self.pos += 1;
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '\\' => self.pos += 1,
                '{' => {
                    self.braced()?;
                    continue;
                }
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(text);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(ScriptError::Syntax("missing close-bracket".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn text(s: &str) -> Part {
        Part::Text(s.to_string())
    }

    #[test]
    fn splits_commands_on_newlines_and_semicolons() {
        let commands = parse("create_design foo\nsynth; packing").unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], vec![vec![text("create_design")], vec![text("foo")]]);
        assert_eq!(commands[2], vec![vec![text("packing")]]);
    }

    #[test]
    fn comments_are_skipped() {
        let commands = parse("# setup\nset a 1\n  # trailing\n").unwrap();
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn braces_keep_text_literal() {
        let commands = parse("proc greet {name} { puts \"hi $name\"; return }").unwrap();
        let words = &commands[0];
        assert_eq!(words.len(), 4);
        assert_eq!(words[2], vec![text("name")]);
        assert_eq!(words[3], vec![text(" puts \"hi $name\"; return ")]);
    }

    #[test]
    fn quoted_words_substitute() {
        let commands = parse("puts \"a $x(k) [b c] ${y z}\"").unwrap();
        assert_eq!(
            commands[0][1],
            vec![
                text("a "),
                Part::Var { name: "x".into(), key: Some("k".into()) },
                text(" "),
                Part::Script("b c".into()),
                text(" "),
                Part::Var { name: "y z".into(), key: None },
            ]
        );
    }

    #[test]
    fn lone_dollar_is_literal() {
        let commands = parse("puts $").unwrap();
        assert_eq!(commands[0][1], vec![text("$")]);
    }

    #[test]
    fn unbalanced_input_is_a_syntax_error() {
        assert_matches!(parse("set a {x"), Err(ScriptError::Syntax(_)));
        assert_matches!(parse("set a [x"), Err(ScriptError::Syntax(_)));
        assert_matches!(parse("set a \"x"), Err(ScriptError::Syntax(_)));
        assert_matches!(parse("set a {x}y"), Err(ScriptError::Syntax(_)));
    }

    #[test]
    fn split_list_honours_braces() {
        let items = split_list("a {b c} \"d e\"  {}").unwrap();
        assert_eq!(items, vec!["a", "b c", "d e", ""]);
    }

    #[test]
    fn quote_element_round_trips_through_split_list() {
        let values = [
            "plain",
            "two words",
            "",
            "a{",
            "}b",
            "x\\",
            "a b{",
            "{nested {ok}}",
            "} {",
            "tab\there\nline",
            "$v [cmd] \"q\";",
        ];
        let list = values.map(quote_element).join(" ");
        assert_eq!(split_list(&list).unwrap(), values);
    }

    #[test]
    fn unbalanced_elements_are_escaped_not_braced() {
        assert_eq!(quote_element("a{"), "a\\{");
        assert_eq!(quote_element("x\\"), "x\\\\");
        assert_eq!(quote_element("a b"), "{a b}");
    }

    #[test]
    fn quoted_elements_parse_back_as_single_words() {
        for value in ["a{", "}b", "x\\", "a b{", "$v [cmd]", "line\nbreak"] {
            let commands = parse(&format!("set v {}", quote_element(value))).unwrap();
            assert_eq!(commands[0].len(), 3, "{value:?}");
            assert_eq!(commands[0][2], vec![text(value)], "{value:?}");
        }
    }
}
