//! Command grammar
//!
//! Line-oriented commands driving the replication engine:
//!
//! ```text
//! command    := merge_cmd | timed_cmd
//! merge_cmd  := SYSTEM "." "MERGE" "(" SYSTEM ")"
//! timed_cmd  := INTEGER "," SYSTEM "." op
//! op         := "SET" "(" "(" key_list ")" "," value_list ")"
//!             | "GET" "(" key_list ")"
//! ```
//!
//! The system prefix and operation name are case-insensitive. Key and value
//! literals are positional, matching the addressed store's declared columns,
//! and may contain any text except commas and parentheses — including spaces
//! and dots, which real attribute values do.
//!
//! Parsing is a tokenizer plus a recursive-descent parser producing a typed
//! AST; there is no positional string splitting.

pub mod interpreter;

pub use interpreter::{BatchReport, Executed, Interpreter};

use crate::error::ParseError;
use crate::types::Timestamp;

/// Parsed command AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set {
        system: String,
        timestamp: Timestamp,
        keys: Vec<String>,
        values: Vec<String>,
    },
    Get {
        system: String,
        timestamp: Timestamp,
        keys: Vec<String>,
    },
    Merge {
        target: String,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom { text: String, column: usize },
    Dot { column: usize },
    Comma { column: usize },
    LParen { column: usize },
    RParen { column: usize },
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Atom { text, .. } => text.clone(),
            Token::Dot { .. } => ".".to_string(),
            Token::Comma { .. } => ",".to_string(),
            Token::LParen { .. } => "(".to_string(),
            Token::RParen { .. } => ")".to_string(),
        }
    }

    fn column(&self) -> usize {
        match self {
            Token::Atom { column, .. }
            | Token::Dot { column }
            | Token::Comma { column }
            | Token::LParen { column }
            | Token::RParen { column } => *column,
        }
    }
}

/// Tokenize one command line.
///
/// A dot is punctuation only at parenthesis depth zero (the system/operation
/// separator); inside argument lists it is ordinary literal text, so values
/// such as email addresses survive intact.
fn tokenize(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen { column: i + 1 });
                depth += 1;
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen { column: i + 1 });
                depth = depth.saturating_sub(1);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma { column: i + 1 });
                i += 1;
            }
            '.' if depth == 0 => {
                tokens.push(Token::Dot { column: i + 1 });
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() {
                    let c = chars[i];
                    if c == ',' || c == '(' || c == ')' || (c == '.' && depth == 0) {
                        break;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Atom {
                    text: text.trim_end().to_string(),
                    column: start + 1,
                });
            }
        }
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(line: &str) -> Self {
        Parser {
            tokens: tokenize(line),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof {
                expected: expected.to_string(),
            })?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_atom(&mut self, expected: &str) -> Result<(String, usize), ParseError> {
        match self.next(expected)? {
            Token::Atom { text, column } => Ok((text, column)),
            Token::Comma { column } => Err(ParseError::EmptyLiteral { column }),
            other => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: other.describe(),
                column: other.column(),
            }),
        }
    }

    fn expect_dot(&mut self) -> Result<(), ParseError> {
        match self.next("'.'")? {
            Token::Dot { .. } => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "'.'".to_string(),
                found: other.describe(),
                column: other.column(),
            }),
        }
    }

    fn expect_comma(&mut self) -> Result<(), ParseError> {
        match self.next("','")? {
            Token::Comma { .. } => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "','".to_string(),
                found: other.describe(),
                column: other.column(),
            }),
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        match self.next("'('")? {
            Token::LParen { .. } => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "'('".to_string(),
                found: other.describe(),
                column: other.column(),
            }),
        }
    }

    /// `literal ("," literal)* ")"` — consumes the closing parenthesis.
    fn literal_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut literals = Vec::new();
        let (first, _) = self.expect_atom("literal")?;
        literals.push(first);
        loop {
            match self.next("',' or ')'")? {
                Token::RParen { .. } => return Ok(literals),
                Token::Comma { .. } => {
                    let (literal, _) = self.expect_atom("literal")?;
                    literals.push(literal);
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "',' or ')'".to_string(),
                        found: other.describe(),
                        column: other.column(),
                    })
                }
            }
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(token) => Err(ParseError::TrailingInput {
                column: token.column(),
            }),
        }
    }

    fn parse(&mut self) -> Result<Command, ParseError> {
        // `SYSTEM "." MERGE(...)` is the only form without a leading
        // timestamp; a dot right after the first atom disambiguates.
        if matches!(self.peek(0), Some(Token::Atom { .. }))
            && matches!(self.peek(1), Some(Token::Dot { .. }))
        {
            return self.parse_merge();
        }
        self.parse_timed()
    }

    fn parse_merge(&mut self) -> Result<Command, ParseError> {
        let (target, _) = self.expect_atom("system name")?;
        self.expect_dot()?;
        let (op, _) = self.expect_atom("MERGE")?;
        if !op.eq_ignore_ascii_case("MERGE") {
            return Err(ParseError::UnknownOperation { found: op });
        }
        self.expect_lparen()?;
        let (source, _) = self.expect_atom("system name")?;
        match self.next("')'")? {
            Token::RParen { .. } => {}
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "')'".to_string(),
                    found: other.describe(),
                    column: other.column(),
                })
            }
        }
        self.expect_end()?;
        Ok(Command::Merge {
            target: target.to_uppercase(),
            source: source.to_uppercase(),
        })
    }

    fn parse_timed(&mut self) -> Result<Command, ParseError> {
        let (literal, _) = self.expect_atom("timestamp")?;
        let timestamp: Timestamp = literal
            .parse()
            .map_err(|_| ParseError::InvalidTimestamp {
                literal: literal.clone(),
            })?;
        if timestamp < 0 {
            return Err(ParseError::InvalidTimestamp { literal });
        }
        self.expect_comma()?;

        let (system, _) = self.expect_atom("system name")?;
        self.expect_dot()?;
        let (op, _) = self.expect_atom("SET or GET")?;

        if op.eq_ignore_ascii_case("SET") {
            self.expect_lparen()?;
            self.expect_lparen()?;
            let keys = self.literal_list()?;
            self.expect_comma()?;
            let values = self.literal_list()?;
            self.expect_end()?;
            Ok(Command::Set {
                system: system.to_uppercase(),
                timestamp,
                keys,
                values,
            })
        } else if op.eq_ignore_ascii_case("GET") {
            self.expect_lparen()?;
            let keys = self.literal_list()?;
            self.expect_end()?;
            Ok(Command::Get {
                system: system.to_uppercase(),
                timestamp,
                keys,
            })
        } else {
            Err(ParseError::UnknownOperation { found: op })
        }
    }
}

/// Parse one command line into its AST.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    Parser::new(line).parse()
}
