use crate::analysis::lexer::ByteLexer;
use crate::analysis::token::TokenKind;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::VariableId;
use crate::index::dictionary::VariableDictionary;

/// Marks an integer variable stored inline in the variable column.
pub const INTEGER_PLACEHOLDER: u8 = 0x11;
/// Marks a dictionary variable stored by id in the variable column.
pub const DICTIONARY_PLACEHOLDER: u8 = 0x12;

pub fn is_placeholder(b: u8) -> bool {
    b == INTEGER_PLACEHOLDER || b == DICTIONARY_PLACEHOLDER
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedVariable {
    Integer(i64),
    Dictionary(String),
}

/// A message split into its logtype and the variables it factored out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage {
    pub logtype: String,
    pub variables: Vec<EncodedVariable>,
}

/// Factor the variables out of `message`. Archives are written by the
/// compressor; this is the same rule, kept here for the query compiler and
/// for building fixtures.
pub fn encode_message(lexer: &ByteLexer, message: &str) -> Result<EncodedMessage> {
    let bytes = message.as_bytes();
    if bytes.iter().copied().any(is_placeholder) {
        return Err(Error::new(
            ErrorKind::Unsupported,
            "Message contains a reserved placeholder byte",
        ));
    }

    let mut logtype = String::with_capacity(message.len());
    let mut variables = Vec::new();
    let mut copied = 0;
    for token in lexer.tokenize(bytes) {
        logtype.push_str(&message[copied..token.offset]);
        let text = &message[token.offset..token.offset + token.text.len()];
        match token.kind {
            TokenKind::Static => logtype.push_str(text),
            TokenKind::Integer => {
                let value = text.parse::<i64>().map_err(|e| {
                    Error::new(ErrorKind::Parse, format!("Integer token '{}': {}", text, e))
                })?;
                logtype.push(INTEGER_PLACEHOLDER as char);
                variables.push(EncodedVariable::Integer(value));
            }
            TokenKind::Dictionary => {
                logtype.push(DICTIONARY_PLACEHOLDER as char);
                variables.push(EncodedVariable::Dictionary(text.to_string()));
            }
        }
        copied = token.offset + token.text.len();
    }
    logtype.push_str(&message[copied..]);

    Ok(EncodedMessage { logtype, variables })
}

/// Kinds of the placeholders in a logtype, in order.
pub fn placeholder_kinds(logtype: &str) -> impl Iterator<Item = TokenKind> + '_ {
    logtype.bytes().filter_map(|b| match b {
        INTEGER_PLACEHOLDER => Some(TokenKind::Integer),
        DICTIONARY_PLACEHOLDER => Some(TokenKind::Dictionary),
        _ => None,
    })
}

/// Rebuild message text from a logtype and its variable column values.
pub fn decode_message(
    logtype: &str,
    variables: &[i64],
    dictionary: &VariableDictionary,
) -> Result<String> {
    let mut text = String::with_capacity(logtype.len() + variables.len() * 8);
    let mut values = variables.iter();
    let mut literal_start = 0;

    for (pos, b) in logtype.bytes().enumerate() {
        if !is_placeholder(b) {
            continue;
        }
        text.push_str(&logtype[literal_start..pos]);
        literal_start = pos + 1;

        let value = *values.next().ok_or_else(|| {
            Error::new(ErrorKind::Corrupt, "Message has fewer variables than its logtype")
        })?;
        if b == INTEGER_PLACEHOLDER {
            text.push_str(&value.to_string());
        } else {
            let id = VariableId(value as u64);
            let var = dictionary.get(id).ok_or_else(|| {
                Error::new(ErrorKind::Corrupt, format!("Unknown variable id {}", id.value()))
            })?;
            text.push_str(var);
        }
    }
    text.push_str(&logtype[literal_start..]);

    if values.next().is_some() {
        return Err(Error::new(
            ErrorKind::Corrupt,
            "Message has more variables than its logtype",
        ));
    }
    Ok(text)
}
