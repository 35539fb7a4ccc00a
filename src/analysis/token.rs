use std::fmt;

/// How a message token is stored once encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Static,      // Part of the logtype text
    Integer,     // Canonical decimal i64, stored inline
    Dictionary,  // Any other token with a digit, stored by variable id
}

/// Token located in a message, borrowed from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'t> {
    pub text: &'t [u8],
    pub offset: usize,  // Byte offset in the message
    pub kind: TokenKind,
}

/// Set of kinds a partially known token may still turn out to be.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenKinds(u8);

impl TokenKinds {
    pub const NONE: TokenKinds = TokenKinds(0);
    pub const STATIC: TokenKinds = TokenKinds(1);
    pub const INTEGER: TokenKinds = TokenKinds(2);
    pub const DICTIONARY: TokenKinds = TokenKinds(4);

    pub fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Static => Self::STATIC,
            TokenKind::Integer => Self::INTEGER,
            TokenKind::Dictionary => Self::DICTIONARY,
        }
    }

    pub fn insert(&mut self, kind: TokenKind) {
        self.0 |= Self::of(kind).0;
    }

    pub fn contains(&self, kind: TokenKind) -> bool {
        self.0 & Self::of(kind).0 != 0
    }

    pub fn union(self, other: TokenKinds) -> TokenKinds {
        TokenKinds(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenKind> + '_ {
        [TokenKind::Static, TokenKind::Integer, TokenKind::Dictionary]
            .into_iter()
            .filter(|kind| self.contains(*kind))
    }
}

impl fmt::Debug for TokenKinds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
