// Scanner/tokenizer for assembly source lines.

use crate::instructions::{self, OperandCount};
use crate::symbol_table::validate_label;

pub const MAX_LINE_LENGTH: usize = 80;
pub const MAX_NUMBER: i32 = 2047;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Error,
    EndOfLine,
    LabelDecl,
    Label,
    Register,
    Number,
    StringData,
    Comma,
    Directive,
    TwoOperandOp,
    OneOperandOp,
    NoOperandOp,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenType,
    pub value: i32,
    pub text: String,
}

impl Token {
    fn new() -> Self {
        Self {
            kind: TokenType::EndOfLine,
            value: 0,
            text: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct Scanner {
    token: Token,
    line: Vec<u8>,
    cursor: usize,
    error_msg: String,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            token: Token::new(),
            line: Vec::new(),
            cursor: 0,
            error_msg: String::new(),
        }
    }

    /// Resets the scanner onto a new source line and scans the first token.
    /// Over-length lines fail before any token is produced.
    pub fn init(&mut self, line: &str) -> TokenType {
        self.error_msg.clear();
        self.token = Token::new();
        self.token.kind = TokenType::Label;

        let trimmed = line.trim_end_matches(['\n', '\r']);
        self.line = trimmed.as_bytes().to_vec();
        self.cursor = 0;

        if trimmed.chars().count() > MAX_LINE_LENGTH {
            return self.failure("Line exceeds 80 characters", None);
        }

        self.next_token()
    }

    pub fn next_token(&mut self) -> TokenType {
        if self.token.kind == TokenType::Error {
            return TokenType::Error;
        }
        if self.token.kind == TokenType::EndOfLine {
            return TokenType::EndOfLine;
        }

        self.skip_white();
        let c = self.current_byte();

        self.token.text.clear();
        self.token.value = 0;

        if c == b'\0' || c == b';' {
            self.token.kind = TokenType::EndOfLine;
            return self.token.kind;
        }
        if c == b',' {
            self.token.kind = TokenType::Comma;
            self.token.text.push(',');
            self.cursor = self.cursor.saturating_add(1);
            return self.token.kind;
        }
        if c == b'"' {
            return self.scan_string();
        }

        self.scan_word();
        self.classify_word()
    }

    pub fn is_end(&self) -> bool {
        self.token.kind == TokenType::EndOfLine
    }

    pub fn get_type(&self) -> TokenType {
        self.token.kind
    }

    pub fn get_value(&self) -> i32 {
        self.token.value
    }

    pub fn get_text(&self) -> &str {
        &self.token.text
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn get_error_msg(&self) -> &str {
        &self.error_msg
    }

    fn scan_word(&mut self) {
        while !is_word_boundary(self.current_byte()) {
            self.token.text.push(self.current_byte() as char);
            self.cursor = self.cursor.saturating_add(1);
        }
    }

    // Strings run through the closing quote so the data may contain spaces
    // and commas. Trailing junk glued to the quote stays in the token and
    // fails the directive's shape check.
    fn scan_string(&mut self) -> TokenType {
        self.token.text.push('"');
        self.cursor = self.cursor.saturating_add(1);

        while self.current_byte() != b'\0' && self.current_byte() != b'"' {
            self.token.text.push(self.current_byte() as char);
            self.cursor = self.cursor.saturating_add(1);
        }
        if self.current_byte() == b'"' {
            self.token.text.push('"');
            self.cursor = self.cursor.saturating_add(1);
        }
        while !is_word_boundary(self.current_byte()) {
            self.token.text.push(self.current_byte() as char);
            self.cursor = self.cursor.saturating_add(1);
        }

        self.token.kind = TokenType::StringData;
        self.token.kind
    }

    fn classify_word(&mut self) -> TokenType {
        let word = self.token.text.clone();
        let first = word.as_bytes().first().copied().unwrap_or(b'\0');

        if first == b'+' || first == b'-' || is_digit(first) {
            return self.scan_number(&word);
        }

        if word.contains('"') {
            self.token.kind = TokenType::StringData;
            return self.token.kind;
        }

        if let Some(colon) = word.find(':') {
            if colon != word.len() - 1 {
                return self.failure("Label colon must end the declaration", Some(&word));
            }
            let name = &word[..colon];
            if let Err(msg) = validate_label(name) {
                let name = name.to_string();
                return self.failure(msg, Some(&name));
            }
            self.token.kind = TokenType::LabelDecl;
            self.token.text = name.to_string();
            return self.token.kind;
        }

        if let Some(inst) = instructions::find_instruction(&word) {
            self.token.kind = match inst.operands {
                OperandCount::Two => TokenType::TwoOperandOp,
                OperandCount::One => TokenType::OneOperandOp,
                OperandCount::None => TokenType::NoOperandOp,
            };
            self.token.value = inst.opcode as i32;
            return self.token.kind;
        }

        if first == b'.' {
            self.token.kind = TokenType::Directive;
            return self.token.kind;
        }

        if first == b'@' {
            return self.scan_register(&word);
        }

        if is_alpha(first) {
            // Reference names obey the same shape rules as declarations,
            // so a bad operand fails here instead of surfacing as an
            // undefined label at resolution.
            if let Err(msg) = validate_label(&word) {
                return self.failure(msg, Some(&word));
            }
            self.token.kind = TokenType::Label;
            return self.token.kind;
        }

        self.failure("Invalid token", Some(&word))
    }

    fn scan_number(&mut self, word: &str) -> TokenType {
        let digits = word
            .strip_prefix('+')
            .or_else(|| word.strip_prefix('-'))
            .unwrap_or(word);
        if digits.is_empty() || !digits.bytes().all(is_digit) {
            return self.failure("Invalid number", Some(word));
        }
        let value: i32 = match word.parse() {
            Ok(v) => v,
            Err(_) => {
                return self.failure(
                    "Number out of range; magnitude may not exceed 2047",
                    Some(word),
                )
            }
        };
        if value.abs() > MAX_NUMBER {
            return self.failure(
                "Number out of range; magnitude may not exceed 2047",
                Some(word),
            );
        }
        self.token.kind = TokenType::Number;
        self.token.value = value;
        self.token.kind
    }

    fn scan_register(&mut self, word: &str) -> TokenType {
        let bytes = word.as_bytes();
        if bytes.len() == 3 && bytes[1] == b'r' && (b'0'..=b'7').contains(&bytes[2]) {
            self.token.kind = TokenType::Register;
            self.token.value = (bytes[2] - b'0') as i32;
            return self.token.kind;
        }
        self.failure("Invalid register; expected @r0 through @r7", Some(word))
    }

    fn skip_white(&mut self) {
        while self.current_byte() == b' ' || self.current_byte() == b'\t' {
            self.cursor = self.cursor.saturating_add(1);
        }
    }

    fn failure(&mut self, msg: &str, param: Option<&str>) -> TokenType {
        self.token.kind = TokenType::Error;
        self.token.value = 0;
        self.error_msg = match param {
            Some(p) => format!("{msg}: {p}"),
            None => msg.to_string(),
        };
        self.token.kind
    }

    fn current_byte(&self) -> u8 {
        self.line.get(self.cursor).copied().unwrap_or(b'\0')
    }
}

impl Iterator for Scanner {
    type Item = TokenType;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token == TokenType::EndOfLine || token == TokenType::Error {
            None
        } else {
            Some(token)
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_word_boundary(c: u8) -> bool {
    c == b'\0' || c == b' ' || c == b'\t' || c == b',' || c == b';'
}

fn is_alpha(c: u8) -> bool {
    (c as char).is_ascii_alphabetic()
}

fn is_digit(c: u8) -> bool {
    (c as char).is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::{Scanner, TokenType};

    #[test]
    fn label_and_mnemonic_tokens() {
        let mut scanner = Scanner::new();
        let t = scanner.init("LOOP: mov @r1,@r2");
        assert_eq!(t, TokenType::LabelDecl);
        assert_eq!(scanner.get_text(), "LOOP");

        assert_eq!(scanner.next_token(), TokenType::TwoOperandOp);
        assert_eq!(scanner.get_text(), "mov");
        assert_eq!(scanner.get_value(), 0);
        assert_eq!(scanner.next_token(), TokenType::Register);
        assert_eq!(scanner.get_value(), 1);
        assert_eq!(scanner.next_token(), TokenType::Comma);
        assert_eq!(scanner.next_token(), TokenType::Register);
        assert_eq!(scanner.get_value(), 2);
        assert_eq!(scanner.next_token(), TokenType::EndOfLine);
    }

    #[test]
    fn mnemonic_groups_are_distinguished() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("lea"), TokenType::TwoOperandOp);
        assert_eq!(scanner.get_value(), 6);
        assert_eq!(scanner.init("jsr"), TokenType::OneOperandOp);
        assert_eq!(scanner.get_value(), 13);
        assert_eq!(scanner.init("stop"), TokenType::NoOperandOp);
        assert_eq!(scanner.get_value(), 15);
    }

    #[test]
    fn signed_numbers_in_range() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("-2047"), TokenType::Number);
        assert_eq!(scanner.get_value(), -2047);
        assert_eq!(scanner.init("+2047"), TokenType::Number);
        assert_eq!(scanner.get_value(), 2047);
    }

    #[test]
    fn number_out_of_range_is_error() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("2048"), TokenType::Error);
        assert!(scanner.get_error_msg().contains("out of range"));
    }

    #[test]
    fn trailing_junk_after_digits_is_error() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("12ab"), TokenType::Error);
        assert!(scanner.get_error_msg().contains("Invalid number"));
    }

    #[test]
    fn label_declaration_is_validated() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("1BAD: stop"), TokenType::Error);
        assert_eq!(scanner.init("mov: stop"), TokenType::Error);
        assert!(scanner.get_error_msg().contains("reserved"));
        assert_eq!(scanner.init("GOOD2: stop"), TokenType::LabelDecl);
    }

    #[test]
    fn string_tokens_keep_spaces_and_commas() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init(".string \"ab, cd\""), TokenType::Directive);
        assert_eq!(scanner.next_token(), TokenType::StringData);
        assert_eq!(scanner.get_text(), "\"ab, cd\"");
        assert_eq!(scanner.next_token(), TokenType::EndOfLine);
    }

    #[test]
    fn label_reference_shape_is_checked() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("jmp bad_name"), TokenType::OneOperandOp);
        assert_eq!(scanner.next_token(), TokenType::Error);
        assert!(scanner.get_error_msg().contains("letters and digits"));

        let long = format!("jmp {}", "a".repeat(40));
        assert_eq!(scanner.init(&long), TokenType::OneOperandOp);
        assert_eq!(scanner.next_token(), TokenType::Error);
        assert!(scanner.get_error_msg().contains("31"));
    }

    #[test]
    fn invalid_register_is_error() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("inc @r8"), TokenType::OneOperandOp);
        assert_eq!(scanner.next_token(), TokenType::Error);
        assert!(scanner.get_error_msg().contains("@r0 through @r7"));
    }

    #[test]
    fn invalid_token_is_line_error_not_fatal() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("mov #5,@r1"), TokenType::TwoOperandOp);
        assert_eq!(scanner.next_token(), TokenType::Error);
        assert!(scanner.get_error_msg().contains("Invalid token"));
        // A fresh init fully recovers the scanner.
        assert_eq!(scanner.init("stop"), TokenType::NoOperandOp);
    }

    #[test]
    fn over_length_line_is_rejected() {
        let mut scanner = Scanner::new();
        let long = "a".repeat(81);
        assert_eq!(scanner.init(&long), TokenType::Error);
        assert!(scanner.get_error_msg().contains("80"));
    }

    #[test]
    fn comment_terminates_line() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.init("rts ; done"), TokenType::NoOperandOp);
        assert_eq!(scanner.next_token(), TokenType::EndOfLine);
    }
}
