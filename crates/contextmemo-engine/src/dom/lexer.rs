//! # Lexer - Tokenizing HTML Source
//!
//! Breaks HTML into a flat sequence of coarse tokens using [Logos]. The
//! lexer is context-free: it does not know which elements are void or which
//! hold raw text. That is the tree builder's job.
//!
//! [Logos]: https://docs.rs/logos
//!
//! Every byte of the input lands in exactly one token. Input that matches
//! no rule (a lone `<` in running text, say) comes back as [`TokenKind::Text`],
//! so the tree builder never has to deal with lexer errors.

use logos::{Lexer, Logos};

/// Token kinds produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<!-- ... -->`, running to end of input when unterminated
    #[token("<!--", lex_comment)]
    Comment,

    /// `<!DOCTYPE ...>` and other markup declarations
    #[regex(r"<![a-zA-Z][^>]*>")]
    Declaration,

    /// `</tag>`
    #[regex(r"</[a-zA-Z][a-zA-Z0-9:-]*[ \t\r\n]*>")]
    EndTag,

    /// `<tag attr="value">` or `<tag/>`
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9:-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    /// Character data between tags
    #[regex(r"[^<]+")]
    Text,
}

fn lex_comment(lex: &mut Lexer<TokenKind>) -> bool {
    let consumed = match lex.remainder().find("-->") {
        Some(end) => end + 3,
        None => lex.remainder().len(),
    };
    lex.bump(consumed);
    true
}

/// A lexed token with its kind and source slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut lexer = TokenKind::lexer(input);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        tokens.push(Token {
            // Unrecognized markup is treated as text
            kind: result.unwrap_or(TokenKind::Text),
            text: lexer.slice(),
        });
    }

    tokens
}
