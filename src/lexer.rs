//! Assembly lexer.
//!
//! Splits source text into a flat token stream. Commas and whitespace
//! separate words, `:` closes a label declaration, `;` comments out the rest
//! of its line. Unknown words become [`TokenKind::Identifier`] so that label
//! references and junk alike are left for the encoder to judge.

use std::fmt;

use crate::error::{LexError, Pos};
use crate::opcode::{parse_register, Opcode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Opcode(Opcode),
    Register(u8),
    /// Label declaration, name without the colon.
    Label(String),
    Numeric(u32),
    Signed(i64),
    Hex(u32),
    Identifier(String),
    Eof,
}

impl TokenKind {
    pub fn tag(&self) -> &'static str {
        match self {
            TokenKind::Opcode(_) => "OPCODE",
            TokenKind::Register(_) => "REGISTER",
            TokenKind::Label(_) => "LABEL",
            TokenKind::Numeric(_) => "NUMERIC",
            TokenKind::Signed(_) => "SIGNED",
            TokenKind::Hex(_) => "HEX",
            TokenKind::Identifier(_) => "IDENTIFIER",
            TokenKind::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Opcode(op) => write!(f, "{op}"),
            TokenKind::Register(r) => write!(f, "r{r}"),
            TokenKind::Label(name) => write!(f, "{name}:"),
            TokenKind::Numeric(n) => write!(f, "{n}"),
            TokenKind::Signed(n) => write!(f, "{n}"),
            TokenKind::Hex(n) => write!(f, "{n:#x}"),
            TokenKind::Identifier(s) => f.write_str(s),
            TokenKind::Eof => f.write_str("<eof>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}:{})", self.kind.tag(), self.kind, self.pos.line, self.pos.word)
    }
}

/// Tokenizes `src`. The returned sequence always ends with [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut line_no = 0u32;
    let mut next_word = 1u32;

    for line in src.lines() {
        line_no += 1;
        next_word = 1;
        let code = match line.find(';') {
            Some(i) => &line[..i],
            None => line,
        };
        for unit in split_units(code) {
            let pos = Pos::new(line_no, next_word);
            next_word += 1;
            if unit == ":" {
                // `name :` declares `name` when it opens the line
                if let Some(prev) = tokens
                    .last_mut()
                    .filter(|t| t.pos.line == line_no && t.pos.word == 1)
                {
                    if let TokenKind::Identifier(name) = &prev.kind {
                        prev.kind = TokenKind::Label(name.clone());
                        continue;
                    }
                }
                return Err(LexError::StrayColon { pos });
            }
            tokens.push(Token { kind: classify_word(unit, pos)?, pos });
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: Pos::new(line_no.max(1), next_word),
    });
    Ok(tokens)
}

/// Whitespace/comma separated words; a `:` ends the word it is attached to.
fn split_units(code: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = None;
    for (i, c) in code.char_indices() {
        if c.is_whitespace() || c == ',' {
            if let Some(s) = start.take() {
                units.push(&code[s..i]);
            }
        } else if c == ':' {
            let s = start.take().unwrap_or(i);
            units.push(&code[s..i + 1]);
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        units.push(&code[s..]);
    }
    units
}

fn classify_word(word: &str, pos: Pos) -> Result<TokenKind, LexError> {
    if let Some(name) = word.strip_suffix(':') {
        return Ok(TokenKind::Label(name.to_string()));
    }
    if let Some(op) = Opcode::from_name(word) {
        return Ok(TokenKind::Opcode(op));
    }
    if let Some(r) = parse_register(word) {
        return Ok(TokenKind::Register(r));
    }
    if is_digits(word) {
        return word
            .parse::<u32>()
            .map(TokenKind::Numeric)
            .map_err(|_| LexError::NumberTooLarge { pos, text: word.to_string() });
    }
    if let Some(digits) = word.strip_prefix('-').filter(|d| is_digits(d)) {
        return digits
            .parse::<u32>()
            .map(|n| TokenKind::Signed(-i64::from(n)))
            .map_err(|_| LexError::NumberTooLarge { pos, text: word.to_string() });
    }
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LexError::MalformedHex { pos, text: word.to_string() });
        }
        return u32::from_str_radix(hex, 16)
            .map(TokenKind::Hex)
            .map_err(|_| LexError::NumberTooLarge { pos, text: word.to_string() });
    }
    Ok(TokenKind::Identifier(word.to_string()))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Renders tokens one instruction per line: a newline goes before every
/// opcode, label and the final EOF.
pub fn pretty(tokens: &[Token], only_value: bool) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if only_value {
            out.push_str(&tok.kind.to_string());
        } else {
            out.push_str(&tok.to_string());
        }
        let breaks = tokens.get(i + 1).is_some_and(|next| {
            matches!(
                next.kind,
                TokenKind::Opcode(_) | TokenKind::Label(_) | TokenKind::Eof
            )
        });
        out.push(if breaks || i + 1 == tokens.len() { '\n' } else { ' ' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_split_on_commas_and_colons() {
        assert_eq!(split_units("loop:add r1,r2 , r3"), vec!["loop:", "add", "r1", "r2", "r3"]);
        assert_eq!(split_units("  \t "), Vec::<&str>::new());
        assert_eq!(split_units("x :"), vec!["x", ":"]);
    }

    #[test]
    fn detached_colon_declares_previous_word() {
        let toks = tokenize("end :\n j end").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Label("end".into()));
        assert_eq!(toks[1].kind, TokenKind::Opcode(Opcode::J));
    }

    #[test]
    fn leading_colon_is_an_error() {
        assert!(matches!(tokenize(": add"), Err(LexError::StrayColon { .. })));
    }

    #[test]
    fn detached_colon_after_operand_is_stray() {
        assert_eq!(
            tokenize("j end :\nend:"),
            Err(LexError::StrayColon { pos: Pos::new(1, 3) })
        );
    }

    #[test]
    fn pretty_breaks_before_opcodes() {
        let toks = tokenize("a: addi r1, r0, 5\nj a").unwrap();
        assert_eq!(pretty(&toks, true), "a:\nADDI r1 r0 5\nJ a\n<eof>\n");
    }
}
