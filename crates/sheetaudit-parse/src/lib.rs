pub mod formula;
pub mod functions;
pub mod lint;
pub mod parser;
pub mod reference;
pub mod tokenizer;

pub use formula::{FORMULA_MARKER, ParsedFormula, parse_cell_text};
pub use functions::{FnCaps, FunctionSpec};
pub use lint::{FormulaIssue, FormulaLint, IssueKind};
pub use parser::{ASTNode, ASTNodeType, MalformedKind, Parser, ParserError, parse};
pub use reference::{Rect, ReferenceError, ReferenceType};
pub use tokenizer::{Token, TokenSubType, TokenType, Tokenizer, TokenizerError, TokenizerErrorKind};

// Re-export common types
pub use sheetaudit_common::{ArgKind, ErrorClass, LiteralValue};
