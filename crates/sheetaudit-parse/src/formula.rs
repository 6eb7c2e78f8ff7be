use smallvec::SmallVec;

use sheetaudit_common::{ErrorClass, LiteralValue, SeverityOrder};

use crate::lint::{self, FormulaIssue, FormulaLint};
use crate::parser::{ASTNode, ASTNodeType, Parser, ParserError};
use crate::reference::ReferenceType;
use crate::tokenizer::Tokenizer;

/// The formula marker. Raw text without it is not a formula.
pub const FORMULA_MARKER: char = '=';

/// One cell's formula: the best-effort tree plus everything the lint found.
#[derive(Debug, Clone)]
pub struct ParsedFormula {
    pub source: String,
    pub ast: ASTNode,
    /// Tokenizer and parser problems, in the order they were met.
    pub errors: Vec<ParserError>,
    pub lint: FormulaLint,
}

impl ParsedFormula {
    /// Parse a formula. Never fails; damage shows up in `errors` and the lint.
    pub fn parse(source: &str) -> Self {
        let tokenizer = Tokenizer::new_best_effort(source);
        let mut parser = Parser::new(tokenizer.items, false).with_catalogue_volatility();
        let ast = parser.parse_best_effort();
        let errors = parser.errors().to_vec();
        let lint = lint::lint(&ast, &errors);
        ParsedFormula {
            source: source.to_string(),
            ast,
            errors,
            lint,
        }
    }

    pub fn is_malformed(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn issues(&self) -> &[FormulaIssue] {
        &self.lint.issues
    }

    /// The most severe class among the local issues.
    pub fn local_class(&self, order: &SeverityOrder) -> ErrorClass {
        self.lint
            .issues
            .iter()
            .fold(ErrorClass::None, |acc, issue| order.max(acc, issue.class))
    }

    /// Every reference the formula depends on: references in the tree followed
    /// by literal `INDIRECT` targets.
    pub fn references(&self) -> SmallVec<[&ReferenceType; 4]> {
        let mut refs: SmallVec<[&ReferenceType; 4]> =
            self.ast.get_dependencies().into_iter().collect();
        refs.extend(self.lint.indirect_targets.iter());
        refs
    }

    pub fn is_volatile(&self) -> bool {
        self.ast.contains_volatile
    }

    /// The value of a formula that is nothing but a literal (`=0`, `=-2.5`, `="x"`, `=5%`).
    pub fn static_literal(&self) -> Option<LiteralValue> {
        literal_of(&self.ast)
    }
}

fn literal_of(node: &ASTNode) -> Option<LiteralValue> {
    match &node.node_type {
        ASTNodeType::Literal(value) => Some(value.clone()),
        ASTNodeType::UnaryOp { op, expr } => {
            let n = match literal_of(expr)? {
                LiteralValue::Number(n) => n,
                _ => return None,
            };
            match op.as_str() {
                "-" => Some(LiteralValue::Number(-n)),
                "+" => Some(LiteralValue::Number(n)),
                "%" => Some(LiteralValue::Number(n / 100.0)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Parse a cell's raw text if it is a formula; `None` means "not a formula"
/// and the text passes through untouched.
pub fn parse_cell_text(raw: &str) -> Option<ParsedFormula> {
    raw.starts_with(FORMULA_MARKER)
        .then(|| ParsedFormula::parse(raw))
}
