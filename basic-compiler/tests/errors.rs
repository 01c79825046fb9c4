use basic_compiler::frontend::lexer::get_error_context;
use basic_compiler::{
    compile_to_ir, compile_to_ir_with, CodegenError, CompileError, CompileOptions, LexError,
    ParseError,
};

fn compile_err(source: &str) -> CompileError {
    match compile_to_ir(source) {
        Err(e) => e,
        Ok(_) => panic!("{source:?} should not compile"),
    }
}

#[test]
fn each_stage_reports_its_own_class() {
    assert!(matches!(compile_err("PRINT @"), CompileError::Lex(_)));
    assert!(matches!(compile_err("PRINT )"), CompileError::Parse(_)));
    assert!(matches!(compile_err("PRINT Y"), CompileError::Codegen(_)));
}

#[test]
fn lex_error_message_has_position() {
    let err = compile_err("DIM X\n  X ? 1");
    assert_eq!(
        err.to_string(),
        "Lexical error: Unexpected character '?' at line 2, column 5"
    );
}

#[test]
fn malformed_number_message() {
    let err = compile_err("PRINT 1..2");
    assert_eq!(
        err.to_string(),
        "Lexical error: Malformed number '1..2' at line 1, column 7"
    );
}

#[test]
fn parse_error_message_names_both_tokens() {
    let err = compile_err("FOR I = 1\nTHEN");
    assert_eq!(
        err.to_string(),
        "Parse error: Unexpected token THEN at line 2, column 1. Expected TO"
    );
}

#[test]
fn parse_error_at_end_of_input() {
    let err = compile_err("IF 1");
    assert_eq!(
        err,
        CompileError::Parse(ParseError::UnexpectedEndOfInput {
            expected: "THEN".to_string()
        })
    );
    assert_eq!(
        err.to_string(),
        "Parse error: Unexpected end of input. Expected THEN"
    );
}

#[test]
fn codegen_error_message() {
    let err = compile_err("DIM X PRINT X + Y");
    assert_eq!(
        err,
        CompileError::Codegen(CodegenError::UndefinedVariable("Y".to_string()))
    );
    assert_eq!(err.to_string(), "Codegen error: Undefined variable 'Y'");
}

#[test]
fn variable_declared_in_one_branch_is_visible_after() {
    // Symbols are flat: a DIM anywhere earlier in the text counts.
    assert!(compile_to_ir("IF 0 THEN DIM X END PRINT X").is_ok());
}

#[test]
fn lex_error_location_points_into_context() {
    let source = "DIM A\nPRINT A & 2\nPRINT A";
    let CompileError::Lex(lex) = compile_err(source) else {
        panic!("expected a lexical error");
    };
    assert!(matches!(lex, LexError::UnknownCharacter { ch: '&', .. }));
    let location = lex.location();
    assert_eq!((location.line, location.column), (2, 9));
    assert_eq!(get_error_context(source, location.offset), "PRINT A & 2");
}

fn with_entry(entry: &str) -> CompileOptions {
    CompileOptions {
        entry_name: entry.to_string(),
        ..CompileOptions::default()
    }
}

#[test]
fn reserved_entry_names_are_rejected() {
    for entry in ["print", "printf"] {
        let err = compile_to_ir_with("PRINT 1", &with_entry(entry)).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidOptions {
                option: "entry name",
                reason: format!("'{entry}' is reserved for the print routine"),
            }
        );
    }
}

#[test]
fn malformed_entry_names_are_rejected() {
    for entry in ["", "1main", "my main", "a\"b"] {
        assert!(
            matches!(
                compile_to_ir_with("", &with_entry(entry)),
                Err(CompileError::InvalidOptions {
                    option: "entry name",
                    ..
                })
            ),
            "{entry:?} should be rejected"
        );
    }
}

#[test]
fn empty_module_name_is_rejected() {
    let options = CompileOptions {
        module_name: String::new(),
        ..CompileOptions::default()
    };
    let err = compile_to_ir_with("PRINT 1", &options).unwrap_err();
    assert_eq!(err.to_string(), "Invalid module name: must not be empty");
}

#[test]
fn options_are_checked_before_the_source() {
    // A broken program still reports the option problem first.
    assert!(matches!(
        compile_to_ir_with("PRINT $", &with_entry("print")),
        Err(CompileError::InvalidOptions { .. })
    ));
}

#[test]
fn accepted_entry_names() {
    for entry in ["main", "_start", "basic.main", "run2"] {
        let module = compile_to_ir_with("PRINT 1", &with_entry(entry)).unwrap();
        assert!(module.get_function(entry).is_some());
    }
}
