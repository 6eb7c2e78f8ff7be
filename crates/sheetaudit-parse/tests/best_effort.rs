use proptest::prelude::*;
use sheetaudit_parse::{ParsedFormula, Token, TokenType, Tokenizer};

#[test]
fn best_effort_render_roundtrip_and_coverage() {
    let formulas = [
        "=A1+",
        "=A1+)",
        "=SUM(A1",
        "=\"unterminated",
        "=[A1",
        "=#BAD",
        "=(1}",
        "=A1+{1,2,3}",
        "=IF(A1=\"\",,)",
        "='My Sheet'!A1 + Sheet2!B2:C3",
    ];

    for formula in formulas {
        let tokenizer = Tokenizer::new_best_effort(formula);
        assert_eq!(tokenizer.render(), formula);
        assert_full_span_coverage(formula, &tokenizer.items);
    }
}

#[test]
fn invalid_tokens_match_recorded_errors() {
    let tokenizer = Tokenizer::new_best_effort("=#BAD+1");
    let invalid: Vec<&Token> = tokenizer.invalid_tokens().collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].value, "#BAD");
    assert_eq!(tokenizer.errors.len(), 1);

    // the rest of the formula still tokenizes
    assert_eq!(
        tokenizer.items.last().map(|t| t.token_type),
        Some(TokenType::Operand)
    );
}

fn assert_full_span_coverage(formula: &str, tokens: &[Token]) {
    let mut covered = vec![false; formula.len()];
    let offset = if formula.starts_with('=') { 1 } else { 0 };

    for token in tokens {
        assert!(token.start <= token.end, "invalid span order {token:?}");
        assert!(token.end <= formula.len(), "span out of bounds {token:?}");
        assert_eq!(&formula[token.start..token.end], token.value);
        for idx in token.start..token.end {
            assert!(!covered[idx], "overlap at {idx} for formula {formula:?}");
            covered[idx] = true;
        }
    }

    assert!(
        covered.iter().skip(offset).all(|c| *c),
        "uncovered bytes in {formula:?}"
    );
}

fn formula_body() -> impl Strategy<Value = String> {
    let alphabet = prop::sample::select(vec![
        '=', '(', ')', '{', '}', '[', ']', '!', '#', '+', '-', '*', '/', '^', '&', '<', '>', ',',
        ';', '.', ':', '%', 'A', 'E', '1', '2', '0', 'S', 'U', 'M', '\'', '"', ' ', '\n', '$',
    ]);
    prop::collection::vec(alphabet, 1..32).prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn tokens_always_cover_the_formula(body in formula_body()) {
        let formula = format!("={body}");
        let tokenizer = Tokenizer::new_best_effort(&formula);
        prop_assert_eq!(tokenizer.render(), formula.clone());
        assert_full_span_coverage(&formula, &tokenizer.items);
    }

    #[test]
    fn parsing_never_panics_and_is_deterministic(body in formula_body()) {
        let formula = format!("={body}");
        let first = ParsedFormula::parse(&formula);
        let second = ParsedFormula::parse(&formula);
        prop_assert_eq!(&first.ast, &second.ast);
        prop_assert_eq!(&first.lint, &second.lint);
        // a formula with parse errors always carries a local flag
        if first.is_malformed() {
            prop_assert!(!first.issues().is_empty());
        }
    }
}
