//! HTML rewriter error kinds.

use sable_lexer::ErrorKind;
use thiserror::Error;

/// A user-facing error from the contextual HTML rewrite pass.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RewriteErrorKind {
    #[error("{block} changes context from '{from}' to '{to}'.{hint}")]
    BlockChangesContext {
        block: String,
        from: String,
        to: String,
        /// Either empty or ` <suggestion>` with a leading space.
        hint: String,
    },

    #[error("'{block}' block ends in an invalid state '{state}'")]
    BlockEndsInInvalidState { block: String, state: String },

    #[error("{block} started in '{state}', cannot create a {construct}.")]
    BlockTransitionDisallowed {
        block: String,
        state: String,
        construct: &'static str,
    },

    #[error("expected exactly one attribute value, the {block} isn't guaranteed to produce exactly one")]
    ConditionalBlockNotGuaranteedToProduceOneAttributeValue { block: String },

    #[error("expected an attribute value")]
    ExpectedAttributeValue,

    #[error("expected whitespace, '=' or tag close after an attribute name")]
    ExpectedWsEqOrCloseAfterAttributeName,

    #[error("expected whitespace or tag close after a tag name or attribute")]
    ExpectedWsOrCloseAfterTagOrAttribute,

    #[error(
        "found the end of an html attribute that was started in another block, \
         html attributes should be opened and closed in the same block"
    )]
    FoundEndOfAttributeStartedInAnotherBlock,

    #[error(
        "found the end of a tag that was started in another block, \
         html tags should be opened and closed in the same block"
    )]
    FoundEndTagStartedInAnotherBlock,

    #[error("found an '=' character in a different block than the attribute name.")]
    FoundEqWithAttributeInAnotherBlock,

    #[error("unexpected character, expected {expected} instead")]
    GenericUnexpectedChar { expected: &'static str },

    #[error("illegal unquoted attribute value character")]
    IllegalHtmlAttributeCharacter,

    #[error("invalid html identifier, '{character}' is an illegal character")]
    InvalidIdentifier { character: char },

    #[error("invalid location for a '{construct}' node, {reason}")]
    InvalidLocationForControlFlow {
        construct: String,
        reason: &'static str,
    },

    #[error("invalid location for a non-printable node: {reason}")]
    InvalidLocationForNonprintable { reason: &'static str },

    #[error(
        "tag names may only be raw text or print nodes, \
         consider extracting a '{{let...' variable"
    )]
    InvalidTagName,

    #[error("close tags should not be self closing")]
    SelfClosingCloseTag,

    #[error("unexpected close tag content, only whitespace is allowed in close tags")]
    UnexpectedCloseTagContent,

    #[error("unexpected whitespace after '<', did you mean '&lt;'?")]
    UnexpectedWsAfterLt,
}

impl ErrorKind for RewriteErrorKind {
    fn code(&self) -> &'static str {
        match self {
            RewriteErrorKind::BlockChangesContext { .. } => "BLOCK_CHANGES_CONTEXT",
            RewriteErrorKind::BlockEndsInInvalidState { .. } => "BLOCK_ENDS_IN_INVALID_STATE",
            RewriteErrorKind::BlockTransitionDisallowed { .. } => "BLOCK_TRANSITION_DISALLOWED",
            RewriteErrorKind::ConditionalBlockNotGuaranteedToProduceOneAttributeValue { .. } => {
                "CONDITIONAL_BLOCK_ISNT_GUARANTEED_TO_PRODUCE_ONE_ATTRIBUTE_VALUE"
            }
            RewriteErrorKind::ExpectedAttributeValue => "EXPECTED_ATTRIBUTE_VALUE",
            RewriteErrorKind::ExpectedWsEqOrCloseAfterAttributeName => {
                "EXPECTED_WS_EQ_OR_CLOSE_AFTER_ATTRIBUTE_NAME"
            }
            RewriteErrorKind::ExpectedWsOrCloseAfterTagOrAttribute => {
                "EXPECTED_WS_OR_CLOSE_AFTER_TAG_OR_ATTRIBUTE"
            }
            RewriteErrorKind::FoundEndOfAttributeStartedInAnotherBlock => {
                "FOUND_END_OF_ATTRIBUTE_STARTED_IN_ANOTHER_BLOCK"
            }
            RewriteErrorKind::FoundEndTagStartedInAnotherBlock => {
                "FOUND_END_TAG_STARTED_IN_ANOTHER_BLOCK"
            }
            RewriteErrorKind::FoundEqWithAttributeInAnotherBlock => {
                "FOUND_EQ_WITH_ATTRIBUTE_IN_ANOTHER_BLOCK"
            }
            RewriteErrorKind::GenericUnexpectedChar { .. } => "GENERIC_UNEXPECTED_CHAR",
            RewriteErrorKind::IllegalHtmlAttributeCharacter => "ILLEGAL_HTML_ATTRIBUTE_CHARACTER",
            RewriteErrorKind::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            RewriteErrorKind::InvalidLocationForControlFlow { .. } => {
                "INVALID_LOCATION_FOR_CONTROL_FLOW"
            }
            RewriteErrorKind::InvalidLocationForNonprintable { .. } => {
                "INVALID_LOCATION_FOR_NONPRINTABLE"
            }
            RewriteErrorKind::InvalidTagName => "INVALID_TAG_NAME",
            RewriteErrorKind::SelfClosingCloseTag => "SELF_CLOSING_CLOSE_TAG",
            RewriteErrorKind::UnexpectedCloseTagContent => "UNEXPECTED_CLOSE_TAG_CONTENT",
            RewriteErrorKind::UnexpectedWsAfterLt => "UNEXPECTED_WS_AFTER_LT",
        }
    }
}
