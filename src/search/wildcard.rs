use std::fmt;
use crate::core::error::{Error, ErrorKind, Result};

/// One element of a parsed wildcard pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternItem {
    Literal(u8),
    AnyOne,   // '?'
    AnyMany,  // '*'
}

impl PatternItem {
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, PatternItem::Literal(_))
    }
}

/// Byte-oriented `*`/`?` pattern with `\` escapes, matched against the whole
/// text (anchored at both ends).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardPattern {
    items: Vec<PatternItem>,
}

impl WildcardPattern {
    /// Parse a raw search string. `\*`, `\?` and `\\` are literals; a
    /// dangling `\` is an invalid query. Runs of `*` collapse into one.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut items = Vec::with_capacity(raw.len());
        let mut bytes = raw.bytes();
        while let Some(b) = bytes.next() {
            match b {
                b'*' => items.push(PatternItem::AnyMany),
                b'?' => items.push(PatternItem::AnyOne),
                b'\\' => match bytes.next() {
                    Some(escaped @ (b'*' | b'?' | b'\\')) => items.push(PatternItem::Literal(escaped)),
                    Some(other) => {
                        items.push(PatternItem::Literal(b'\\'));
                        items.push(PatternItem::Literal(other));
                    }
                    None => {
                        return Err(Error::new(
                            ErrorKind::InvalidQuery,
                            format!("Search string '{}' ends with a dangling escape", raw),
                        ));
                    }
                },
                other => items.push(PatternItem::Literal(other)),
            }
        }
        Ok(Self::from_items(items))
    }

    pub fn from_items(items: Vec<PatternItem>) -> Self {
        let mut collapsed: Vec<PatternItem> = Vec::with_capacity(items.len());
        for item in items {
            if item == PatternItem::AnyMany && collapsed.last() == Some(&PatternItem::AnyMany) {
                continue;
            }
            collapsed.push(item);
        }
        WildcardPattern { items: collapsed }
    }

    /// Pattern matching exactly `bytes`.
    pub fn literal(bytes: &[u8]) -> Self {
        WildcardPattern {
            items: bytes.iter().map(|&b| PatternItem::Literal(b)).collect(),
        }
    }

    pub fn items(&self) -> &[PatternItem] {
        &self.items
    }

    /// True for patterns made only of `*`: they match every text.
    pub fn is_unconstrained(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| *i == PatternItem::AnyMany)
    }

    /// Literal bytes before the first wildcard.
    pub fn literal_prefix(&self) -> Vec<u8> {
        self.items
            .iter()
            .map_while(|item| match item {
                PatternItem::Literal(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn is_match(&self, text: &[u8], case_sensitive: bool) -> bool {
        let eq = |a: u8, b: u8| if case_sensitive { a == b } else { a.eq_ignore_ascii_case(&b) };
        let items = &self.items;
        let (mut p, mut t) = (0usize, 0usize);
        // Last '*' seen and the text position it currently absorbs up to
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            if p < items.len() {
                match items[p] {
                    PatternItem::AnyMany => {
                        backtrack = Some((p, t));
                        p += 1;
                        continue;
                    }
                    PatternItem::AnyOne => {
                        p += 1;
                        t += 1;
                        continue;
                    }
                    PatternItem::Literal(b) if eq(b, text[t]) => {
                        p += 1;
                        t += 1;
                        continue;
                    }
                    PatternItem::Literal(_) => {}
                }
            }
            match backtrack {
                Some((star, absorbed)) => {
                    p = star + 1;
                    t = absorbed + 1;
                    backtrack = Some((star, absorbed + 1));
                }
                None => return false,
            }
        }

        items[p..].iter().all(|i| *i == PatternItem::AnyMany)
    }

    pub fn is_match_str(&self, text: &str, case_sensitive: bool) -> bool {
        self.is_match(text.as_bytes(), case_sensitive)
    }
}

impl fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for item in &self.items {
            match item {
                PatternItem::AnyMany => f.write_str("*")?,
                PatternItem::AnyOne => f.write_str("?")?,
                PatternItem::Literal(b @ (b'*' | b'?' | b'\\')) => write!(f, "\\{}", *b as char)?,
                PatternItem::Literal(b) if b.is_ascii_graphic() || *b == b' ' => write!(f, "{}", *b as char)?,
                PatternItem::Literal(b) => write!(f, "\\x{:02x}", b)?,
            }
        }
        Ok(())
    }
}
