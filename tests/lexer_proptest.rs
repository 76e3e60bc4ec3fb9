//! Property-based tests for the DevIns lexer
//!
//! These tests check the lexer's contract on arbitrary input (it always
//! terminates with `EOF`, always makes progress and never loses a byte) and
//! its bookkeeping on generated well-formed documents.

use devins::devins::lexing::{tokenize, Lexer, LexerState};
use devins::devins::token::{detokenize, Token, TokenType};
use proptest::prelude::*;

/// Drive the lexer by hand, checking the context after every token.
fn scan_with<F>(source: &str, mut check: F) -> Vec<Token>
where
    F: FnMut(&Token, &Lexer<'_>),
{
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        check(&token, &lexer);
        let done = token.is(TokenType::Eof);
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

fn entry_strategy() -> impl Strategy<Value = String> {
    let key = prop::sample::select(vec![
        "name",
        "description",
        "when",
        "onStreamingEnd",
        "afterStreaming",
        "enabled",
        "model",
    ]);
    let value = prop::sample::select(vec![
        "true",
        "\"Summarize the code\"",
        "42",
        "[a, b, \"c\"]",
        "$selection.length >= 1",
        "$a == 1 && $b != \"x\"",
        "/.*\\.rs/ { cat | grep(\"fn \") }",
        "{ verifyCode | runCode }",
        "{ parseCode | saveFile(\"out.md\") }",
    ]);
    (key, value).prop_map(|(k, v)| format!("{}: {}", k, v))
}

fn body_strategy() -> impl Strategy<Value = String> {
    let fragment = prop::sample::select(vec![
        "Summarize the selection.",
        "@agent do something",
        "/file:src/main.rs",
        "$selection",
        "plain words, with punctuation!",
        "```rust\nfn main() {}\n```",
        "[flow]: script.devin",
    ]);
    prop::collection::vec(fragment, 0..6).prop_map(|parts| parts.join("\n"))
}

fn document_strategy() -> impl Strategy<Value = String> {
    (prop::collection::vec(entry_strategy(), 1..6), body_strategy()).prop_map(
        |(entries, body)| format!("---\n{}\n---\n{}", entries.join("\n"), body),
    )
}

#[cfg(test)]
mod arbitrary_input {
    use super::*;

    proptest! {
        #[test]
        fn tokenize_always_ends_with_one_eof(input in "\\PC*") {
            let tokens = tokenize(&input);
            prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenType::Eof));
            prop_assert_eq!(tokens.iter().filter(|t| t.is(TokenType::Eof)).count(), 1);
        }

        #[test]
        fn tokens_reassemble_the_source(input in "\\PC*") {
            let tokens = tokenize(&input);
            prop_assert_eq!(detokenize(&tokens), input);
        }

        #[test]
        fn every_token_before_eof_consumes_input(input in "(\\PC|\n){0,200}") {
            let mut last = 0;
            scan_with(&input, |token, lexer| {
                if !token.is(TokenType::Eof) {
                    assert!(lexer.position() > last, "no progress at offset {}", last);
                    assert!(!token.is_empty());
                    last = lexer.position();
                }
            });
            assert_eq!(last, input.len());
        }

        #[test]
        fn spans_are_contiguous(input in "(\\PC|\n){0,200}") {
            let tokens = tokenize(&input);
            let mut offset = 0;
            for token in &tokens {
                prop_assert_eq!(token.start_offset, offset);
                prop_assert_eq!(&input[token.start_offset..token.end_offset], token.text.as_str());
                offset = token.end_offset;
            }
        }

        #[test]
        fn marker_heavy_input_is_total(input in "[-@/$#`{}()\\[\\]:|\n a-z0-9\"]{0,120}") {
            let tokens = tokenize(&input);
            prop_assert_eq!(detokenize(&tokens), input);
            prop_assert!(tokens.last().map_or(false, |t| t.is(TokenType::Eof)));
        }
    }
}

#[cfg(test)]
mod well_formed_documents {
    use super::*;

    proptest! {
        #[test]
        fn front_matter_fences_balance(doc in document_strategy()) {
            let tokens = tokenize(&doc);
            let starts = tokens.iter().filter(|t| t.is(TokenType::FrontMatterStart)).count();
            let ends = tokens.iter().filter(|t| t.is(TokenType::FrontMatterEnd)).count();
            prop_assert_eq!(starts, 1);
            prop_assert_eq!(ends, 1);
        }

        #[test]
        fn context_is_inside_front_matter_between_fences(doc in document_strategy()) {
            let mut inside = false;
            scan_with(&doc, |token, lexer| {
                match token.kind {
                    TokenType::FrontMatterStart => inside = true,
                    TokenType::FrontMatterEnd => inside = false,
                    _ => {}
                }
                assert_eq!(lexer.context().is_inside_front_matter(), inside, "at {}", token);
            });
        }

        #[test]
        fn braces_return_to_their_entry_level(doc in document_strategy()) {
            let mut lexer = Lexer::new(&doc);
            for _ in lexer.by_ref() {}
            prop_assert_eq!(lexer.context().pattern_action_brace_level(), 0);
            prop_assert_eq!(lexer.context().stack_depth(), 0);
            prop_assert!(lexer.context().has_front_matter());
        }

        #[test]
        fn lifecycle_keys_are_keyword_tokens(doc in document_strategy()) {
            let tokens = tokenize(&doc);
            for token in tokens.iter().filter(|t| t.text == "onStreamingEnd") {
                prop_assert_eq!(token.kind, TokenType::OnStreamingEnd);
            }
        }
    }
}

#[test]
fn unbalanced_final_brace_is_detectable() {
    let mut lexer = Lexer::new("---\nwhen: { a | b\n");
    for _ in lexer.by_ref() {}
    assert_eq!(lexer.context().current_state(), LexerState::FunctionDeclBlock);
    assert_eq!(lexer.context().pattern_action_brace_level(), 1);
}
