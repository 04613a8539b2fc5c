//! Table-driven scanner for the grammar-description language.
//!
//! The token kinds and the transition table are those of the meta-grammar
//! itself: identifiers, numbers, strings, character literals, the section
//! keywords, the bracket/operator tokens, and the two pragma forms
//! (`$ddt` trace switches and `$name=value` options). Line comments `//`
//! and nestable block comments `/* */` are consumed between tokens.

pub mod buffer;
pub mod token;

#[cfg(test)]
mod scanner_tests;

use std::collections::VecDeque;
use std::path::Path;

pub use buffer::{Buffer, CodeUnits, EOF, Source, Utf8Buffer};
pub use token::{Token, kinds};

use crate::{Error, Result};

const EOL: u32 = '\n' as u32;

pub struct Scanner {
    buffer: Source,
    /// Current input character ("lookahead of one").
    ch: u32,
    /// Byte position of `ch`.
    pos: usize,
    /// Characters read so far, minus one.
    char_pos: i64,
    col: u32,
    line: u32,
    /// Newlines swallowed by a comment, replayed one at a time.
    old_eols: u32,
    tval: String,
    /// Tokens produced by peeking but not yet consumed by `scan`.
    queue: VecDeque<Token>,
    peek_idx: usize,
}

impl Scanner {
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(Buffer::from_file(path)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::new(Buffer::from_bytes(data))
    }

    pub fn new(buffer: Buffer) -> Result<Self> {
        let mut s = Self {
            buffer: Source::Bytes(buffer),
            ch: EOF,
            pos: 0,
            char_pos: -1,
            col: 0,
            line: 1,
            old_eols: 0,
            tval: String::new(),
            queue: VecDeque::new(),
            peek_idx: 0,
        };
        s.next_ch()?;
        if s.ch == 0xEF {
            // Optional UTF-8 byte order mark.
            s.next_ch()?;
            let ch1 = s.ch;
            s.next_ch()?;
            let ch2 = s.ch;
            if ch1 != 0xBB || ch2 != 0xBF {
                return Err(Error::IllegalByteOrderMark);
            }
            s.buffer.switch_to_utf8();
            s.col = 0;
            s.char_pos = -1;
            s.next_ch()?;
        }
        Ok(s)
    }

    /// Re-reads source bytes, used for attribute and action positions.
    pub fn get_string(&mut self, beg: usize, end: usize) -> Result<String> {
        self.buffer.get_string(beg, end)
    }

    /// Next token, possibly one already seen while peeking.
    pub fn scan(&mut self) -> Result<Token> {
        let t = match self.queue.pop_front() {
            Some(t) => t,
            None => self.next_token()?,
        };
        self.peek_idx = 0;
        Ok(t)
    }

    /// Next non-pragma token without consuming anything.
    pub fn peek(&mut self) -> Result<Token> {
        loop {
            if self.peek_idx >= self.queue.len() {
                let t = self.next_token()?;
                self.queue.push_back(t);
            }
            let t = self.queue[self.peek_idx].clone();
            self.peek_idx += 1;
            if t.kind <= kinds::MAX_T {
                return Ok(t);
            }
        }
    }

    /// Makes peeking start again at the current scan position.
    pub fn reset_peek(&mut self) {
        self.peek_idx = 0;
    }

    fn next_ch(&mut self) -> Result<()> {
        if self.old_eols > 0 {
            self.ch = EOL;
            self.old_eols -= 1;
            return Ok(());
        }
        self.pos = self.buffer.pos();
        self.ch = self.buffer.read()?;
        self.col += 1;
        self.char_pos += 1;
        // Fold isolated '\r' to '\n' so eol handling is uniform across
        // Windows, Unix and Mac line endings.
        if self.ch == '\r' as u32 && self.buffer.peek()? != '\n' as u32 {
            self.ch = EOL;
        }
        if self.ch == EOL {
            self.line += 1;
            self.col = 0;
        }
        Ok(())
    }

    fn add_ch(&mut self) -> Result<()> {
        if self.ch != EOF {
            self.tval
                .push(char::from_u32(self.ch).unwrap_or(char::REPLACEMENT_CHARACTER));
            self.next_ch()?;
        }
        Ok(())
    }

    /// `//` to end of line.
    fn comment0(&mut self) -> Result<bool> {
        let (pos0, line0, col0, char_pos0) = (self.pos, self.line, self.col, self.char_pos);
        self.next_ch()?;
        if self.ch == '/' as u32 {
            self.next_ch()?;
            loop {
                if self.ch == EOL {
                    self.old_eols = self.line - line0;
                    self.next_ch()?;
                    return Ok(true);
                }
                if self.ch == EOF {
                    return Ok(false);
                }
                self.next_ch()?;
            }
        }
        self.buffer.set_pos(pos0)?;
        self.next_ch()?;
        self.line = line0;
        self.col = col0;
        self.char_pos = char_pos0;
        Ok(false)
    }

    /// `/*` to `*/`, nesting.
    fn comment1(&mut self) -> Result<bool> {
        let mut level = 1u32;
        let (pos0, line0, col0, char_pos0) = (self.pos, self.line, self.col, self.char_pos);
        self.next_ch()?;
        if self.ch == '*' as u32 {
            self.next_ch()?;
            loop {
                if self.ch == '*' as u32 {
                    self.next_ch()?;
                    if self.ch == '/' as u32 {
                        level -= 1;
                        if level == 0 {
                            self.old_eols = self.line - line0;
                            self.next_ch()?;
                            return Ok(true);
                        }
                        self.next_ch()?;
                    }
                } else if self.ch == '/' as u32 {
                    self.next_ch()?;
                    if self.ch == '*' as u32 {
                        level += 1;
                        self.next_ch()?;
                    }
                } else if self.ch == EOF {
                    return Ok(false);
                } else {
                    self.next_ch()?;
                }
            }
        }
        self.buffer.set_pos(pos0)?;
        self.next_ch()?;
        self.line = line0;
        self.col = col0;
        self.char_pos = char_pos0;
        Ok(false)
    }

    /// Rewinds behind the longest recognised prefix after a partial match.
    fn set_scanner_behind_t(&mut self, t: &Token, rec_end: usize) -> Result<()> {
        self.buffer.set_pos(t.pos)?;
        self.next_ch()?;
        self.line = t.line;
        self.col = t.col;
        self.char_pos = t.char_pos as i64;
        self.tval.clear();
        while self.pos < rec_end {
            self.tval
                .push(char::from_u32(self.ch).unwrap_or(char::REPLACEMENT_CHARACTER));
            self.next_ch()?;
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            while self.ch == ' ' as u32 || self.ch == 9 || self.ch == 10 || self.ch == 13 {
                self.next_ch()?;
            }
            if self.ch == '/' as u32 && (self.comment0()? || self.comment1()?) {
                continue;
            }
            break;
        }

        let mut rec_kind = kinds::NO_SYM;
        let mut rec_end = self.pos;

        let mut t = Token {
            kind: 0,
            pos: self.pos,
            char_pos: self.char_pos.max(0) as usize,
            col: self.col,
            line: self.line,
            val: String::new(),
        };

        let mut state = start_state(self.ch);
        self.tval.clear();
        self.add_ch()?;

        loop {
            let ch = self.ch;
            match state {
                -1 => {
                    t.kind = kinds::EOF;
                    break;
                }
                0 => {
                    // No further transition; fall back to the longest
                    // recognised prefix, if any.
                    if rec_kind != kinds::NO_SYM {
                        self.set_scanner_behind_t(&t, rec_end)?;
                    }
                    t.kind = rec_kind;
                    break;
                }
                1 => {
                    rec_end = self.pos;
                    rec_kind = kinds::IDENT;
                    if is_ident_char(ch) {
                        self.add_ch()?;
                    } else {
                        t.kind = kinds::IDENT;
                        t.val = self.tval.clone();
                        check_literal(&mut t);
                        return Ok(t);
                    }
                }
                2 => {
                    rec_end = self.pos;
                    rec_kind = kinds::NUMBER;
                    if is_digit(ch) {
                        self.add_ch()?;
                    } else {
                        t.kind = kinds::NUMBER;
                        break;
                    }
                }
                3 => {
                    t.kind = kinds::STRING;
                    break;
                }
                4 => {
                    t.kind = kinds::BAD_STRING;
                    break;
                }
                5 => {
                    if ch <= 0xFFFF && ch != 10 && ch != 13 && ch != 39 && ch != 92 {
                        self.add_ch()?;
                        state = 6;
                    } else if ch == 92 {
                        self.add_ch()?;
                        state = 7;
                    } else {
                        state = 0;
                    }
                }
                6 => {
                    if ch == 39 {
                        self.add_ch()?;
                        state = 9;
                    } else {
                        state = 0;
                    }
                }
                7 => {
                    if (32..=126).contains(&ch) {
                        self.add_ch()?;
                        state = 8;
                    } else {
                        state = 0;
                    }
                }
                8 => {
                    if is_digit(ch) || (97..=102).contains(&ch) {
                        self.add_ch()?;
                    } else if ch == 39 {
                        self.add_ch()?;
                        state = 9;
                    } else {
                        state = 0;
                    }
                }
                9 => {
                    t.kind = kinds::CHAR;
                    break;
                }
                10 => {
                    rec_end = self.pos;
                    rec_kind = kinds::DDT_PRAGMA;
                    if is_ident_char(ch) {
                        self.add_ch()?;
                    } else {
                        t.kind = kinds::DDT_PRAGMA;
                        break;
                    }
                }
                11 => {
                    rec_end = self.pos;
                    rec_kind = kinds::OPTION_PRAGMA;
                    if (45..=46).contains(&ch)
                        || (48..=58).contains(&ch)
                        || is_ascii_letter(ch)
                        || ch == 95
                    {
                        self.add_ch()?;
                    } else {
                        t.kind = kinds::OPTION_PRAGMA;
                        break;
                    }
                }
                12 => {
                    if ch <= 0xFFFF && ch != 10 && ch != 13 && ch != 34 && ch != 92 {
                        self.add_ch()?;
                    } else if ch == 10 || ch == 13 {
                        self.add_ch()?;
                        state = 4;
                    } else if ch == 34 {
                        self.add_ch()?;
                        state = 3;
                    } else if ch == 92 {
                        self.add_ch()?;
                        state = 14;
                    } else {
                        state = 0;
                    }
                }
                13 => {
                    rec_end = self.pos;
                    rec_kind = kinds::DDT_PRAGMA;
                    if is_digit(ch) {
                        self.add_ch()?;
                        state = 10;
                    } else if ch == 95 || is_ascii_letter(ch) {
                        self.add_ch()?;
                        state = 15;
                    } else {
                        t.kind = kinds::DDT_PRAGMA;
                        break;
                    }
                }
                14 => {
                    if (32..=126).contains(&ch) {
                        self.add_ch()?;
                        state = 12;
                    } else {
                        state = 0;
                    }
                }
                15 => {
                    rec_end = self.pos;
                    rec_kind = kinds::DDT_PRAGMA;
                    if is_digit(ch) {
                        self.add_ch()?;
                        state = 10;
                    } else if ch == 95 || is_ascii_letter(ch) {
                        self.add_ch()?;
                    } else if ch == 61 {
                        self.add_ch()?;
                        state = 11;
                    } else {
                        t.kind = kinds::DDT_PRAGMA;
                        break;
                    }
                }
                16 => {
                    t.kind = kinds::EQ;
                    break;
                }
                17 => {
                    t.kind = kinds::PLUS;
                    break;
                }
                18 => {
                    t.kind = kinds::MINUS;
                    break;
                }
                19 => {
                    t.kind = kinds::DOTDOT;
                    break;
                }
                20 => {
                    t.kind = kinds::CARET;
                    break;
                }
                21 => {
                    t.kind = kinds::GT;
                    break;
                }
                22 => {
                    t.kind = kinds::COMMA;
                    break;
                }
                23 => {
                    t.kind = kinds::LT_DOT;
                    break;
                }
                24 => {
                    t.kind = kinds::DOT_GT;
                    break;
                }
                25 => {
                    t.kind = kinds::LBRACK;
                    break;
                }
                26 => {
                    t.kind = kinds::RBRACK;
                    break;
                }
                27 => {
                    t.kind = kinds::BAR;
                    break;
                }
                28 => {
                    t.kind = kinds::RPAREN;
                    break;
                }
                29 => {
                    t.kind = kinds::LBRACE;
                    break;
                }
                30 => {
                    t.kind = kinds::RBRACE;
                    break;
                }
                31 => {
                    t.kind = kinds::LPAREN_DOT;
                    break;
                }
                32 => {
                    t.kind = kinds::DOT_RPAREN;
                    break;
                }
                33 => {
                    rec_end = self.pos;
                    rec_kind = kinds::DOT;
                    if ch == '.' as u32 {
                        self.add_ch()?;
                        state = 19;
                    } else if ch == '>' as u32 {
                        self.add_ch()?;
                        state = 24;
                    } else if ch == ')' as u32 {
                        self.add_ch()?;
                        state = 32;
                    } else {
                        t.kind = kinds::DOT;
                        break;
                    }
                }
                34 => {
                    rec_end = self.pos;
                    rec_kind = kinds::LT;
                    if ch == '.' as u32 {
                        self.add_ch()?;
                        state = 23;
                    } else {
                        t.kind = kinds::LT;
                        break;
                    }
                }
                35 => {
                    rec_end = self.pos;
                    rec_kind = kinds::LPAREN;
                    if ch == '.' as u32 {
                        self.add_ch()?;
                        state = 31;
                    } else {
                        t.kind = kinds::LPAREN;
                        break;
                    }
                }
                _ => {
                    return Err(Error::Internal(format!("scanner in unknown state {state}")));
                }
            }
        }

        t.val = self.tval.clone();
        Ok(t)
    }
}

/// Maps a token's first code point to its scanner start state.
fn start_state(ch: u32) -> i32 {
    match ch {
        65..=90 | 95 | 97..=122 => 1, // letters, '_'
        48..=57 => 2,                 // digits
        34 => 12,                     // '"'
        39 => 5,                      // '\''
        36 => 13,                     // '$'
        61 => 16,                     // '='
        46 => 33,                     // '.'
        43 => 17,                     // '+'
        45 => 18,                     // '-'
        60 => 34,                     // '<'
        94 => 20,                     // '^'
        62 => 21,                     // '>'
        44 => 22,                     // ','
        91 => 25,                     // '['
        93 => 26,                     // ']'
        124 => 27,                    // '|'
        40 => 35,                     // '('
        41 => 28,                     // ')'
        123 => 29,                    // '{'
        125 => 30,                    // '}'
        EOF => -1,
        _ => 0,
    }
}

/// Promotes identifiers that spell a keyword.
fn check_literal(t: &mut Token) {
    let kind = match t.val.as_str() {
        "COMPILER" => kinds::COMPILER,
        "IGNORECASE" => kinds::IGNORECASE,
        "CHARACTERS" => kinds::CHARACTERS,
        "TOKENS" => kinds::TOKENS,
        "PRAGMAS" => kinds::PRAGMAS,
        "COMMENTS" => kinds::COMMENTS,
        "FROM" => kinds::FROM,
        "TO" => kinds::TO,
        "NESTED" => kinds::NESTED,
        "IGNORE" => kinds::IGNORE,
        "PRODUCTIONS" => kinds::PRODUCTIONS,
        "END" => kinds::END,
        "ANY" => kinds::ANY,
        "out" => kinds::OUT,
        "WEAK" => kinds::WEAK,
        "SYNC" => kinds::SYNC,
        "IF" => kinds::IF,
        "CONTEXT" => kinds::CONTEXT,
        _ => return,
    };
    t.kind = kind;
}

fn is_ascii_letter(ch: u32) -> bool {
    (65..=90).contains(&ch) || (97..=122).contains(&ch)
}

fn is_ident_char(ch: u32) -> bool {
    is_ascii_letter(ch) || (48..=57).contains(&ch) || ch == 95
}

fn is_digit(ch: u32) -> bool {
    (48..=57).contains(&ch)
}
