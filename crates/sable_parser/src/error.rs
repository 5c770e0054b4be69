//! Expression parser error kinds.

use sable_lexer::ErrorKind;
use thiserror::Error;

/// A user-facing expression parse error.
///
/// These never escape the public entry points; they are rendered into the
/// [`ErrorReporter`](sable_lexer::ErrorReporter) and the parser returns a
/// sentinel node instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("integer literal is out of range, must fit within a 53 bit mantissa")]
    IntegerOutOfRange,

    #[error("invalid function name '{name}', function names must be simple identifiers")]
    InvalidFunctionName { name: String },

    #[error("invalid param name, expected an identifier followed by ':'")]
    InvalidParamName,

    #[error("duplicate param name '{name}'")]
    DuplicateParamName { name: String },

    #[error("'ij' is not a valid variable name")]
    InvalidVarNameIj,

    #[error("'$ij' must be followed by a field access, like '$ij.foo'")]
    UnexpectedIjDataReference,

    #[error(
        "disallowed single-identifier key '{key}' in map literal, \
         quote it as a string or surround it with parens to reference a global"
    )]
    SingleIdentifierKeyInMapLiteral { key: String },

    #[error("found '{found}', use '{replacement}' instead")]
    LegacyOperator {
        found: &'static str,
        replacement: &'static str,
    },

    #[error("string literals must use single quotes")]
    DoubleQuotedString,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid string escape '\\{escape}'")]
    InvalidEscape { escape: char },

    #[error("invalid unicode escape, expected '\\u' followed by 4 hex digits")]
    InvalidUnicodeEscape,

    #[error("expression is nested too deeply")]
    ExpressionTooDeep,
}

impl ErrorKind for ParseErrorKind {
    fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedToken { .. } => "UNEXPECTED_TOKEN",
            ParseErrorKind::IntegerOutOfRange => "INTEGER_OUT_OF_RANGE",
            ParseErrorKind::InvalidFunctionName { .. } => "INVALID_FUNCTION_NAME",
            ParseErrorKind::InvalidParamName => "INVALID_PARAM_NAME",
            ParseErrorKind::DuplicateParamName { .. } => "DUPLICATE_PARAM_NAME",
            ParseErrorKind::InvalidVarNameIj => "INVALID_VAR_NAME_IJ",
            ParseErrorKind::UnexpectedIjDataReference => "UNEXPECTED_IJ_DATA_REFERENCE",
            ParseErrorKind::SingleIdentifierKeyInMapLiteral { .. } => {
                "SINGLE_IDENTIFIER_KEY_IN_MAP_LITERAL"
            }
            ParseErrorKind::LegacyOperator { .. } => "UNEXPECTED_TOKEN",
            ParseErrorKind::DoubleQuotedString => "UNEXPECTED_TOKEN",
            ParseErrorKind::UnterminatedString => "UNEXPECTED_TOKEN",
            ParseErrorKind::InvalidEscape { .. } => "UNEXPECTED_TOKEN",
            ParseErrorKind::InvalidUnicodeEscape => "UNEXPECTED_TOKEN",
            ParseErrorKind::ExpressionTooDeep => "EXPRESSION_TOO_DEEP",
        }
    }
}
