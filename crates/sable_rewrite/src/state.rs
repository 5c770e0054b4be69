//! The tag-lexing state machine's states.

use sable_ast::{ContentKind, RcDataTag};
use std::fmt;

/// The contextual state of the HTML scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Content that is never rewritten (text, css, js, uri kinds).
    None,
    Pcdata,
    RcdataScript,
    RcdataTextarea,
    RcdataTitle,
    RcdataStyle,
    HtmlComment,
    Cdata,
    /// `<!doctype ...>`, `<!element ...>`, or `<?xml ...>`; these work like
    /// tags but attribute values need not be paired with names.
    XmlDeclaration,
    SingleQuotedXmlAttrValue,
    DoubleQuotedXmlAttrValue,
    HtmlTagName,
    /// Right after an attribute name. Needed as its own state (rather than
    /// looking ahead for `=`) so dynamic attribute names work.
    AfterAttributeName,
    BeforeAttributeValue,
    SingleQuotedAttrValue,
    DoubleQuotedAttrValue,
    UnquotedAttrValue,
    AfterTagNameOrAttribute,
    BeforeAttributeName,
}

impl State {
    /// The scanner state a block starts in for the given content kind.
    pub fn from_content_kind(kind: Option<ContentKind>) -> State {
        match kind {
            Some(ContentKind::Html) => State::Pcdata,
            Some(ContentKind::Attributes) => State::BeforeAttributeName,
            // rcdata is specific to html pages; standalone css/js blocks
            // have their own rules and are not scanned here
            Some(
                ContentKind::Text
                | ContentKind::Css
                | ContentKind::Js
                | ContentKind::Uri
                | ContentKind::TrustedResourceUri,
            )
            | None => State::None,
        }
    }

    pub fn rcdata(tag: RcDataTag) -> State {
        match tag {
            RcDataTag::Script => State::RcdataScript,
            RcDataTag::Style => State::RcdataStyle,
            RcDataTag::Title => State::RcdataTitle,
            RcDataTag::Textarea => State::RcdataTextarea,
        }
    }

    /// True for states that are within a tag but outside an attribute value.
    pub fn is_tag_state(&self) -> bool {
        matches!(
            self,
            State::AfterAttributeName | State::AfterTagNameOrAttribute | State::BeforeAttributeName
        )
    }

    /// A block must not end right after an attribute name and `=` but before
    /// its value.
    pub fn is_invalid_end_of_block(&self) -> bool {
        matches!(self, State::BeforeAttributeValue)
    }

    /// Returns a state compatible with both `self` and `other`, used when
    /// branches of a conditional end in different states. `None` means the
    /// branches are irreconcilable.
    pub fn reconcile(self, other: State) -> Option<State> {
        if self == other {
            return Some(self);
        }
        // before-attribute-value pairs with the value-ish states because a
        // complete attribute value is a reasonable thing for a block to
        // produce; this is what makes class={if $c}"a"{else}"b"{/if} work
        match (self, other) {
            (State::BeforeAttributeValue, s) | (s, State::BeforeAttributeValue)
                if matches!(
                    s,
                    State::UnquotedAttrValue
                        | State::AfterTagNameOrAttribute
                        | State::BeforeAttributeName
                ) =>
            {
                return Some(s);
            }
            _ => {}
        }
        if self.is_tag_state() && other.is_tag_state() {
            return Some(State::AfterTagNameOrAttribute);
        }
        // everything else requires an exact match
        None
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::None => "none",
            State::Pcdata => "pcdata",
            State::RcdataScript => "rcdata script",
            State::RcdataTextarea => "rcdata textarea",
            State::RcdataTitle => "rcdata title",
            State::RcdataStyle => "rcdata style",
            State::HtmlComment => "html comment",
            State::Cdata => "cdata",
            State::XmlDeclaration => "xml declaration",
            State::SingleQuotedXmlAttrValue => "single quoted xml attribute value",
            State::DoubleQuotedXmlAttrValue => "double quoted xml attribute value",
            State::HtmlTagName => "html tag name",
            State::AfterAttributeName => "after attribute name",
            State::BeforeAttributeValue => "before attribute value",
            State::SingleQuotedAttrValue => "single quoted attribute value",
            State::DoubleQuotedAttrValue => "double quoted attribute value",
            State::UnquotedAttrValue => "unquoted attribute value",
            State::AfterTagNameOrAttribute => "after tag name or attribute",
            State::BeforeAttributeName => "before attribute name",
        };
        f.write_str(name)
    }
}
