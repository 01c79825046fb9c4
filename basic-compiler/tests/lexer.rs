use basic_compiler::frontend::lexer::{tokenize, Keyword, LexError, Lexer, Token};

fn tokens(source: &str) -> Vec<Token> {
    tokenize(source)
        .expect("source should lex")
        .into_iter()
        .map(|s| s.token)
        .collect()
}

// ── Token classes ────────────────────────────────────────────────────────

#[test]
fn keywords_are_never_identifiers() {
    for keyword in Keyword::ALL {
        assert_eq!(
            tokens(keyword.as_str()),
            vec![Token::Keyword(keyword), Token::EndOfInput]
        );
    }
}

#[test]
fn keywords_are_case_sensitive_and_whole_words() {
    assert_eq!(
        tokens("dim DIMX PRINT1 NEXT"),
        vec![
            Token::Identifier("dim".into()),
            Token::Identifier("DIMX".into()),
            Token::Identifier("PRINT1".into()),
            Token::Keyword(Keyword::Next),
            Token::EndOfInput,
        ]
    );
}

#[test]
fn end_is_an_identifier() {
    assert_eq!(
        tokens("END"),
        vec![Token::Identifier("END".into()), Token::EndOfInput]
    );
}

#[test]
fn every_symbol_is_a_single_token() {
    assert_eq!(
        tokens("+-*/()=<>:"),
        "+-*/()=<>:"
            .chars()
            .map(Token::Symbol)
            .chain(std::iter::once(Token::EndOfInput))
            .collect::<Vec<_>>()
    );
}

#[test]
fn whitespace_and_newlines_are_ignored() {
    assert_eq!(
        tokens("  FOR\tI\r\n=\n\n1 TO 3  "),
        vec![
            Token::Keyword(Keyword::For),
            Token::Identifier("I".into()),
            Token::Symbol('='),
            Token::Number(1.0),
            Token::Keyword(Keyword::To),
            Token::Number(3.0),
            Token::EndOfInput,
        ]
    );
}

#[test]
fn every_ascii_whitespace_is_skipped() {
    assert_eq!(
        tokens("DIM\x0BX\x0C\tPRINT\r\nX"),
        vec![
            Token::Keyword(Keyword::Dim),
            Token::Identifier("X".into()),
            Token::Keyword(Keyword::Print),
            Token::Identifier("X".into()),
            Token::EndOfInput,
        ]
    );
}

#[test]
fn number_followed_by_letters_splits() {
    assert_eq!(
        tokens("2X"),
        vec![
            Token::Number(2.0),
            Token::Identifier("X".into()),
            Token::EndOfInput
        ]
    );
}

#[test]
fn empty_source_is_just_end_of_input() {
    assert_eq!(tokens(""), vec![Token::EndOfInput]);
    assert_eq!(tokens(" \n\t "), vec![Token::EndOfInput]);
}

#[test]
fn lexing_supported_text_terminates() {
    let source = "DIM A1 FOR A1 = 1 TO 20 IF (A1 - 3) * 2 THEN PRINT A1 / 4 ELSE PRINT 0.25 END NEXT : < >";
    let mut lexer = Lexer::new(source);
    let mut count = 0;
    loop {
        let tok = lexer.next_token().expect("supported text should lex");
        if tok.token == Token::EndOfInput {
            break;
        }
        count += 1;
        assert!(count < 1000, "lexer did not reach end of input");
    }
    assert_eq!(lexer.next_token().unwrap().token, Token::EndOfInput);
}

#[test]
fn iterator_stops_after_end_of_input() {
    let items: Vec<_> = Lexer::new("PRINT 1").collect();
    assert_eq!(items.len(), 3);
    assert!(matches!(
        items.last(),
        Some(Ok(s)) if s.token == Token::EndOfInput
    ));
}

// ── Numbers ──────────────────────────────────────────────────────────────

#[test]
fn numeric_literals_round_trip() {
    let literals = [
        "0",
        "7",
        "42",
        "3.14",
        "0.5",
        "2.",
        "1000000",
        "123.456",
        "0.1",
        "9007199254740993",
        "00012.500",
    ];
    for lit in literals {
        let expected: f64 = lit.parse().unwrap();
        let lexed = tokens(lit);
        assert_eq!(lexed, vec![Token::Number(expected), Token::EndOfInput]);

        // Re-render and lex again: same bits.
        let Token::Number(value) = lexed[0] else {
            unreachable!()
        };
        let again = tokens(&value.to_string());
        assert_eq!(again[0], Token::Number(value), "literal {lit}");
    }
}

#[test]
fn number_with_two_dots_is_malformed() {
    let err = tokenize("PRINT 1.2.3").unwrap_err();
    match err {
        LexError::MalformedNumber { text, location } => {
            assert_eq!(text, "1.2.3");
            assert_eq!(location.offset, 6);
            assert_eq!((location.line, location.column), (1, 7));
        }
        other => panic!("expected MalformedNumber, got {other:?}"),
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

#[test]
fn unknown_character_reports_position() {
    let err = tokenize("DIM X\nPRINT X $ 1").unwrap_err();
    assert_eq!(
        err,
        LexError::UnknownCharacter {
            ch: '$',
            location: basic_compiler::SourceLocation {
                line: 2,
                column: 9,
                offset: 14,
            },
        }
    );
    assert!(err.to_string().contains("'$'"));
    assert!(err.to_string().contains("line 2, column 9"));
}

#[test]
fn string_quotes_and_commas_are_not_supported() {
    assert!(matches!(
        tokenize("PRINT \"hi\""),
        Err(LexError::UnknownCharacter { ch: '"', .. })
    ));
    assert!(matches!(
        tokenize("F(1, 2)"),
        Err(LexError::UnknownCharacter { ch: ',', .. })
    ));
}
