//! Literal parsing for test-case inputs.
//!
//! Inputs are written by an upstream generator and look like Python source,
//! but they are only ever read as data. The grammar accepts Python literal
//! syntax (numbers, strings, lists, tuples, sets, dicts, booleans, `None`)
//! and rejects everything else, so parsing never executes anything and
//! always terminates. Anything that does not parse is handed to the entry
//! point as the raw text.

const MAX_DEPTH: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    /// Integer outside the i64 range, kept as its source text. Radix literals
    /// keep their `0x`/`0o`/`0b` prefix, so the text is valid for `int(text, 0)`.
    BigInt(String),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Whether the value may be used as a dict key or set member.
    pub fn is_hashable(&self) -> bool {
        match self {
            Literal::List(_) | Literal::Set(_) | Literal::Dict(_) => false,
            Literal::Tuple(items) => items.iter().all(Literal::is_hashable),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{msg} at offset {position}")]
pub struct LiteralError {
    pub msg: String,
    pub position: usize,
}

/// Parses `text` as a literal, falling back to the text itself as a string.
pub fn parse_literal(text: &str) -> Literal {
    match try_parse_literal(text) {
        Ok(literal) => literal,
        Err(err) => {
            tracing::trace!(reason = %err, "input is not a literal, passing raw text");
            Literal::Str(text.to_string())
        }
    }
}

pub fn try_parse_literal(text: &str) -> Result<Literal, LiteralError> {
    LiteralParser::new(text).parse_document()
}

struct LiteralParser {
    input: Vec<char>,
    position: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            input: text.chars().collect(),
            position: 0,
        }
    }

    fn parse_document(&mut self) -> Result<Literal, LiteralError> {
        let first = self.parse_value(0)?;
        self.skip_whitespace();

        if !self.eat(',') {
            self.expect_end()?;
            return Ok(first);
        }

        // A bare top-level sequence such as `1, 2` is a tuple.
        let mut items = vec![first];
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            items.push(self.parse_value(1)?);
            self.skip_whitespace();
            if !self.eat(',') {
                break;
            }
        }
        self.expect_end()?;
        Ok(Literal::Tuple(items))
    }

    fn parse_value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_whitespace();

        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => self.parse_list(depth),
            Some('(') => self.parse_parenthesized(depth),
            Some('{') => self.parse_braced(depth),
            Some('+') | Some('-') => self.parse_signed(depth),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(_) if self.string_prefix().is_some() => self.parse_strings(),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_word(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
        }
    }

    fn parse_list(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.advance();
        let items = self.parse_items(']', depth)?;
        Ok(Literal::List(items))
    }

    fn parse_parenthesized(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.advance();
        self.skip_whitespace();
        if self.eat(')') {
            return Ok(Literal::Tuple(Vec::new()));
        }

        let first = self.parse_value(depth + 1)?;
        self.skip_whitespace();
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;

        let mut items = vec![first];
        items.extend(self.parse_items(')', depth)?);
        Ok(Literal::Tuple(items))
    }

    fn parse_braced(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.advance();
        self.skip_whitespace();
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.parse_value(depth + 1)?;
        self.skip_whitespace();

        if self.eat(':') {
            let value = self.parse_value(depth + 1)?;
            let mut entries = vec![(first, value)];
            loop {
                self.skip_whitespace();
                if self.eat('}') {
                    break;
                }
                self.expect(',')?;
                self.skip_whitespace();
                if self.eat('}') {
                    break;
                }
                let key = self.parse_value(depth + 1)?;
                self.skip_whitespace();
                self.expect(':')?;
                let value = self.parse_value(depth + 1)?;
                entries.push((key, value));
            }
            if entries.iter().any(|(key, _)| !key.is_hashable()) {
                return Err(self.error("unhashable dict key"));
            }
            return Ok(Literal::Dict(entries));
        }

        let mut items = vec![first];
        if !self.eat('}') {
            self.expect(',')?;
            items.extend(self.parse_items('}', depth)?);
        }
        if items.iter().any(|item| !item.is_hashable()) {
            return Err(self.error("unhashable set member"));
        }
        Ok(Literal::Set(items))
    }

    /// Comma-separated values up to `close`, trailing comma allowed. The opening
    /// delimiter (and any items before it) must already be consumed.
    fn parse_items(&mut self, close: char, depth: usize) -> Result<Vec<Literal>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(',')?;
        }
    }

    fn parse_signed(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        let negative = self.advance() == Some('-');
        let start = self.position;
        let operand = self.parse_value(depth + 1)?;
        if !negative {
            return match operand {
                Literal::Int(_) | Literal::BigInt(_) | Literal::Float(_) => Ok(operand),
                _ => Err(self.error_at(start, "unary plus on a non-numeric literal")),
            };
        }

        match operand {
            Literal::Int(value) => Ok(value
                .checked_neg()
                .map(Literal::Int)
                .unwrap_or_else(|| Literal::BigInt(format!("{}", -(value as i128))))),
            Literal::BigInt(digits) => {
                let negated = match digits.strip_prefix('-') {
                    Some(positive) => positive.to_string(),
                    None => format!("-{digits}"),
                };
                Ok(negated
                    .parse::<i64>()
                    .map(Literal::Int)
                    .unwrap_or(Literal::BigInt(negated)))
            }
            Literal::Float(value) => Ok(Literal::Float(-value)),
            _ => Err(self.error_at(start, "unary minus on a non-numeric literal")),
        }
    }

    fn parse_number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.position;

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.position += 2;
                let digits = self.take_digits(|c| c.is_digit(radix));
                if digits.is_empty() {
                    return Err(self.error_at(start, "missing digits after radix prefix"));
                }
                self.reject_trailing_identifier()?;
                let prefix = match radix {
                    16 => 'x',
                    8 => 'o',
                    _ => 'b',
                };
                return Ok(i64::from_str_radix(&digits, radix)
                    .map(Literal::Int)
                    .unwrap_or_else(|_| Literal::BigInt(format!("0{prefix}{digits}"))));
            }
        }

        let int_part = self.take_digits(|c| c.is_ascii_digit());
        let mut is_float = false;
        let mut text = if int_part.is_empty() {
            "0".to_string()
        } else {
            int_part.clone()
        };

        if self.peek() == Some('.') {
            self.advance();
            let fraction = self.take_digits(|c| c.is_ascii_digit());
            if int_part.is_empty() && fraction.is_empty() {
                return Err(self.error_at(start, "lone decimal point"));
            }
            is_float = true;
            text.push('.');
            text.push_str(if fraction.is_empty() { "0" } else { &fraction });
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            is_float = true;
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.advance();
                text.push(sign);
            }
            let exponent = self.take_digits(|c| c.is_ascii_digit());
            if exponent.is_empty() {
                return Err(self.error_at(start, "missing exponent digits"));
            }
            text.push_str(&exponent);
        }

        if matches!(self.peek(), Some('j') | Some('J')) {
            return Err(self.error_at(start, "complex literals are not supported"));
        }
        self.reject_trailing_identifier()?;

        if is_float {
            return text
                .parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| self.error_at(start, "malformed float literal"));
        }

        if int_part.len() > 1 && int_part.starts_with('0') && int_part.chars().any(|c| c != '0') {
            return Err(self.error_at(start, "leading zeros in decimal integer"));
        }
        Ok(match int_part.parse::<i64>() {
            Ok(value) => Literal::Int(value),
            Err(_) => {
                let digits = int_part.trim_start_matches('0');
                Literal::BigInt(if digits.is_empty() { "0" } else { digits }.to_string())
            }
        })
    }

    /// Digits accepted by `is_digit`, with single `_` separators between them.
    fn take_digits(&mut self, is_digit: impl Fn(char) -> bool) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if is_digit(c) {
                digits.push(c);
                self.advance();
            } else if c == '_'
                && !digits.is_empty()
                && self.peek_at(1).is_some_and(|next| is_digit(next))
            {
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn reject_trailing_identifier(&self) -> Result<(), LiteralError> {
        match self.peek() {
            Some(c) if c.is_alphanumeric() || c == '_' => {
                Err(self.error(format!("unexpected character {c:?} after number")))
            }
            _ => Ok(()),
        }
    }

    fn parse_word(&mut self) -> Result<Literal, LiteralError> {
        let start = self.position;
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match word.as_str() {
            "None" => Ok(Literal::None),
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "set" => {
                self.skip_whitespace();
                self.expect('(')?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(Literal::Set(Vec::new()))
            }
            _ => Err(self.error_at(start, format!("name {word:?} is not a literal"))),
        }
    }

    /// Length of the string prefix at the cursor and whether it makes the string raw,
    /// or `None` if no string starts here.
    fn string_prefix(&self) -> Option<(usize, bool)> {
        match (self.peek()?, self.peek_at(1)) {
            ('\'' | '"', _) => Some((0, false)),
            ('r' | 'R', Some('\'' | '"')) => Some((1, true)),
            ('u' | 'U', Some('\'' | '"')) => Some((1, false)),
            _ => None,
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<Literal, LiteralError> {
        let mut joined = String::new();
        while let Some((prefix_len, raw)) = self.string_prefix() {
            self.position += prefix_len;
            joined.push_str(&self.parse_string_piece(raw)?);
            self.skip_whitespace();
        }
        Ok(Literal::Str(joined))
    }

    fn parse_string_piece(&mut self, raw: bool) -> Result<String, LiteralError> {
        let start = self.position;
        let Some(quote) = self.advance() else {
            return Err(self.error("expected a quote"));
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.position += 2;
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.advance() else {
                return Err(self.error_at(start, "unterminated string"));
            };

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.position += 2;
                    return Ok(out);
                }
                out.push(c);
            } else if c == '\n' && !triple {
                return Err(self.error_at(start, "newline in single-quoted string"));
            } else if c == '\\' {
                if raw {
                    out.push('\\');
                    if let Some(next) = self.advance() {
                        out.push(next);
                    }
                } else {
                    self.parse_escape(&mut out)?;
                }
            } else {
                out.push(c);
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let start = self.position;
        let Some(c) = self.advance() else {
            return Err(self.error("unterminated escape"));
        };

        match c {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            self.advance();
                        }
                        None => break,
                    }
                }
                out.push(self.char_from(code, start)?);
            }
            'x' => out.push(self.hex_escape(2, start)?),
            'u' => out.push(self.hex_escape(4, start)?),
            'U' => out.push(self.hex_escape(8, start)?),
            'N' => return Err(self.error_at(start, "named unicode escapes are not supported")),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, width: usize, start: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..width {
            let digit = self
                .peek()
                .and_then(|d| d.to_digit(16))
                .ok_or_else(|| self.error_at(start, "truncated hex escape"))?;
            code = code * 16 + digit;
            self.advance();
        }
        self.char_from(code, start)
    }

    fn char_from(&self, code: u32, start: usize) -> Result<char, LiteralError> {
        char::from_u32(code).ok_or_else(|| self.error_at(start, "invalid code point in escape"))
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}")))
        }
    }

    fn expect_end(&mut self) -> Result<(), LiteralError> {
        self.skip_whitespace();
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error(&self, msg: impl Into<String>) -> LiteralError {
        self.error_at(self.position, msg)
    }

    fn error_at(&self, position: usize, msg: impl Into<String>) -> LiteralError {
        LiteralError {
            msg: msg.into(),
            position,
        }
    }
}
