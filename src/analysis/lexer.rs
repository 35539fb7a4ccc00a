use crate::analysis::token::{Token, TokenKind, TokenKinds};
use crate::search::wildcard::PatternItem;

/// Bytes that separate tokens unless a schema says otherwise.
pub const DEFAULT_DELIMITERS: &[u8] = b" \t\r\n:,!;%=[](){}\"'|";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,  // Scans left to right
    Reverse,  // Scans right to left
}

/// Which ends of a token fragment are unknown because they sit next to a
/// wildcard that may extend the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Openness {
    pub left: bool,
    pub right: bool,
}

impl Openness {
    pub const CLOSED: Openness = Openness { left: false, right: false };
    pub const LEFT: Openness = Openness { left: true, right: false };
    pub const RIGHT: Openness = Openness { left: false, right: true };
}

/// Token table over bytes. The forward table tokenizes and classifies from
/// a token's start; the reverse table classifies from its end.
#[derive(Clone)]
pub struct ByteLexer {
    direction: Direction,
    delimiters: [bool; 256],
}

impl ByteLexer {
    pub fn new(direction: Direction, delimiters: &[u8]) -> Self {
        let mut table = [false; 256];
        for &b in delimiters {
            table[b as usize] = true;
        }
        ByteLexer { direction, delimiters: table }
    }

    pub fn forward() -> Self {
        Self::new(Direction::Forward, DEFAULT_DELIMITERS)
    }

    pub fn reverse() -> Self {
        Self::new(Direction::Reverse, DEFAULT_DELIMITERS)
    }

    pub fn is_delimiter(&self, b: u8) -> bool {
        self.delimiters[b as usize]
    }

    pub fn same_delimiters(&self, other: &ByteLexer) -> bool {
        self.delimiters == other.delimiters
    }

    /// Split text into non-empty tokens, in scan order.
    pub fn tokenize<'t>(&self, text: &'t [u8]) -> Vec<Token<'t>> {
        let mut tokens = Vec::new();
        let mut start = None;
        for (i, &b) in text.iter().enumerate() {
            match (self.is_delimiter(b), start) {
                (true, Some(s)) => {
                    tokens.push(self.token_at(text, s, i));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            tokens.push(self.token_at(text, s, text.len()));
        }
        if self.direction == Direction::Reverse {
            tokens.reverse();
        }
        tokens
    }

    fn token_at<'t>(&self, text: &'t [u8], start: usize, end: usize) -> Token<'t> {
        let bytes = &text[start..end];
        Token {
            text: bytes,
            offset: start,
            kind: self.classify_token(bytes),
        }
    }

    /// Kind of a fully known token.
    pub fn classify_token(&self, token: &[u8]) -> TokenKind {
        if !token.iter().any(u8::is_ascii_digit) {
            return TokenKind::Static;
        }
        if is_canonical_integer(token) {
            TokenKind::Integer
        } else {
            TokenKind::Dictionary
        }
    }

    /// Kinds a token may have given only a fragment of it. Wildcards inside
    /// the fragment and open ends stand for unknown bytes.
    pub fn classify_fragment(&self, fragment: &[PatternItem], open: Openness) -> TokenKinds {
        let has_wildcard = fragment.iter().any(PatternItem::is_wildcard);
        if !has_wildcard && !open.left && !open.right {
            let bytes: Vec<u8> = fragment
                .iter()
                .filter_map(|item| match item {
                    PatternItem::Literal(b) => Some(*b),
                    _ => None,
                })
                .collect();
            return TokenKinds::of(self.classify_token(&bytes));
        }

        let literal_digit = fragment
            .iter()
            .any(|item| matches!(item, PatternItem::Literal(b) if b.is_ascii_digit()));

        let mut kinds = TokenKinds::NONE;
        if !literal_digit {
            kinds.insert(TokenKind::Static);
        }
        let integer_shaped = match self.direction {
            Direction::Forward => scan_integer_forward(fragment),
            Direction::Reverse => scan_integer_reverse(fragment),
        };
        if integer_shaped {
            kinds.insert(TokenKind::Integer);
        }
        // Unknown bytes may always supply the digit a variable needs
        kinds.insert(TokenKind::Dictionary);
        kinds
    }
}

/// `-?[0-9]+` with no leading zeros, fitting in an i64.
pub fn is_canonical_integer(token: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(token) else {
        return false;
    };
    match text.parse::<i64>() {
        Ok(value) => value.to_string() == text,
        Err(_) => false,
    }
}

#[derive(Clone, Copy)]
enum IntState {
    Sign,
    Digits,
}

fn scan_integer_forward(fragment: &[PatternItem]) -> bool {
    let mut state = IntState::Sign;
    for item in fragment {
        state = match (state, item) {
            (_, PatternItem::Literal(b)) if b.is_ascii_digit() => IntState::Digits,
            (IntState::Sign, PatternItem::Literal(b'-')) => IntState::Digits,
            (_, PatternItem::Literal(_)) => return false,
            (IntState::Sign, PatternItem::AnyMany) => IntState::Sign,
            (_, PatternItem::AnyOne | PatternItem::AnyMany) => IntState::Digits,
        };
    }
    true
}

fn scan_integer_reverse(fragment: &[PatternItem]) -> bool {
    let mut signed = false;
    for item in fragment.iter().rev() {
        if signed {
            // Only empty-able wildcards may precede the sign
            if *item != PatternItem::AnyMany {
                return false;
            }
            continue;
        }
        match item {
            PatternItem::Literal(b) if b.is_ascii_digit() => {}
            PatternItem::Literal(b'-') => signed = true,
            PatternItem::Literal(_) => return false,
            PatternItem::AnyOne | PatternItem::AnyMany => {}
        }
    }
    true
}
