//! Local error flags for a single parsed formula.
//!
//! The lint only looks at the formula itself: functions, literals and the shape
//! of the tree. Anything that needs cell contents (division by a zero cell,
//! lookups into a table) is decided later against the workbook.

use sheetaudit_common::{ErrorClass, LiteralValue, parse_plain_number};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::functions::{self, FunctionSpec};
use crate::parser::{ASTNode, ASTNodeType, MalformedKind, ParserError};
use crate::reference::ReferenceType;

/// Which rule produced an issue.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueKind {
    ErrorLiteral,
    UnknownFunction,
    ArityMismatch,
    EmptyArgument,
    MissingOperand,
    TextInArithmetic,
    TextInNumericParameter,
    UnconvertibleText,
    NotAvailableCall,
    BadIndirect,
    DisjointIntersection,
    Malformed,
}

/// A local error flag raised by a formula's own text.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaIssue {
    pub class: ErrorClass,
    pub kind: IssueKind,
    pub message: String,
    /// Byte span in the formula text, when the offending token is known.
    pub span: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaLint {
    pub issues: Vec<FormulaIssue>,
    /// Canonical names of volatile calls, in source order.
    pub volatile_calls: Vec<String>,
    pub function_calls: usize,
    pub complexity: f64,
    /// Literal targets of `INDIRECT("...")` that parse as references.
    pub indirect_targets: Vec<ReferenceType>,
}

const ARITHMETIC_OPS: [&str; 5] = ["+", "-", "*", "/", "^"];

/// Run every local rule over a tree and the parse errors that produced it.
pub fn lint(ast: &ASTNode, errors: &[ParserError]) -> FormulaLint {
    let mut linter = Linter::default();
    for err in errors {
        linter.parse_error(err);
    }
    linter.visit(ast, 0);
    linter.out
}

#[derive(Default)]
struct Linter {
    out: FormulaLint,
}

impl Linter {
    fn push(
        &mut self,
        class: ErrorClass,
        kind: IssueKind,
        message: impl Into<String>,
        span: Option<(usize, usize)>,
    ) {
        self.out.issues.push(FormulaIssue {
            class,
            kind,
            message: message.into(),
            span,
        });
    }

    fn parse_error(&mut self, err: &ParserError) {
        let span = err.position.map(|p| (p, p));
        match err.kind {
            MalformedKind::MissingOperand => self.push(
                ErrorClass::MissingArgument,
                IssueKind::MissingOperand,
                err.message.clone(),
                span,
            ),
            MalformedKind::InvalidToken
            | MalformedKind::UnexpectedToken
            | MalformedKind::UnclosedGroup
            | MalformedKind::BadReference => self.push(
                ErrorClass::UnresolvedReference,
                IssueKind::Malformed,
                err.message.clone(),
                span,
            ),
        }
    }

    fn visit(&mut self, node: &ASTNode, depth: usize) {
        match &node.node_type {
            ASTNodeType::Literal(LiteralValue::Error(class)) => {
                self.push(
                    *class,
                    IssueKind::ErrorLiteral,
                    format!("error literal {}", class.excel_code().unwrap_or("#ERROR!")),
                    node.span(),
                );
            }
            ASTNodeType::Literal(_) | ASTNodeType::Reference { .. } | ASTNodeType::Empty => {}
            ASTNodeType::UnaryOp { op, expr } => {
                self.out.complexity += 0.5;
                self.check_numeric_operand(expr, op);
                self.visit(expr, depth);
            }
            ASTNodeType::BinaryOp { op, left, right } => {
                self.out.complexity += 0.5;
                if ARITHMETIC_OPS.contains(&op.as_str()) {
                    self.check_numeric_operand(left, op);
                    self.check_numeric_operand(right, op);
                } else if op == " " {
                    self.check_intersection(node, left, right);
                }
                self.visit(left, depth);
                self.visit(right, depth);
            }
            ASTNodeType::Function { name, args } => {
                self.out.function_calls += 1;
                self.out.complexity += 1.0 + 0.5 * depth as f64;
                self.check_function(node, name, args);
                for arg in args {
                    self.visit(arg, depth + 1);
                }
            }
            ASTNodeType::Array(rows) => {
                for item in rows.iter().flatten() {
                    self.visit(item, depth);
                }
            }
            ASTNodeType::MalformedToken { partial, .. } => {
                for part in partial {
                    self.visit(part, depth);
                }
            }
        }
    }

    fn check_numeric_operand(&mut self, operand: &ASTNode, op: &str) {
        if let ASTNodeType::Literal(LiteralValue::Text(text)) = &operand.node_type
            && parse_plain_number(text).is_none()
        {
            self.push(
                ErrorClass::InvalidValueCoercion,
                IssueKind::TextInArithmetic,
                format!("text \"{text}\" used as a number with '{op}'"),
                operand.span(),
            );
        }
    }

    fn check_intersection(&mut self, node: &ASTNode, left: &ASTNode, right: &ASTNode) {
        let (
            ASTNodeType::Reference { reference: a, .. },
            ASTNodeType::Reference { reference: b, .. },
        ) = (&left.node_type, &right.node_type)
        else {
            return;
        };
        let same_sheet = match (a.sheet(), b.sheet()) {
            (None, None) => true,
            (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
            _ => false,
        };
        if let (Some(ra), Some(rb)) = (a.rect(), b.rect())
            && same_sheet
            && !ra.intersects(&rb)
        {
            self.push(
                ErrorClass::NullError,
                IssueKind::DisjointIntersection,
                format!("{a} and {b} do not intersect"),
                node.span(),
            );
        }
    }

    fn check_function(&mut self, node: &ASTNode, name: &str, args: &[ASTNode]) {
        let Some(spec) = functions::lookup(name) else {
            self.push(
                ErrorClass::UnknownFunction,
                IssueKind::UnknownFunction,
                format!("unknown function {name}"),
                node.span(),
            );
            return;
        };

        if spec.is_volatile() {
            self.out.volatile_calls.push(spec.name.to_string());
        }

        if !spec.accepts(args.len()) {
            self.push(
                ErrorClass::MissingArgument,
                IssueKind::ArityMismatch,
                arity_message(spec, args.len()),
                node.span(),
            );
        }

        for (i, arg) in args.iter().enumerate() {
            match &arg.node_type {
                ASTNodeType::Empty => self.push(
                    ErrorClass::MissingArgument,
                    IssueKind::EmptyArgument,
                    format!("{} argument {} is empty", spec.name, i + 1),
                    arg.span(),
                ),
                ASTNodeType::Literal(LiteralValue::Text(text))
                    if spec.arg_kind(i).is_numeric() && parse_plain_number(text).is_none() =>
                {
                    self.push(
                        ErrorClass::InvalidValueCoercion,
                        IssueKind::TextInNumericParameter,
                        format!("{} argument {} expects a number, got \"{text}\"", spec.name, i + 1),
                        arg.span(),
                    )
                }
                _ => {}
            }
        }

        match spec.name {
            "NA" => self.push(
                ErrorClass::NotAvailable,
                IssueKind::NotAvailableCall,
                "NA() always yields #N/A",
                node.span(),
            ),
            "INDIRECT" => self.check_indirect(args),
            "VALUE" => self.check_value_text(args),
            _ => {}
        }
    }

    fn check_value_text(&mut self, args: &[ASTNode]) {
        let Some(arg) = args.first() else {
            return;
        };
        if let ASTNodeType::Literal(LiteralValue::Text(text)) = &arg.node_type {
            let cleaned: String = text
                .trim()
                .trim_end_matches('%')
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            if parse_plain_number(&cleaned).is_none() {
                self.push(
                    ErrorClass::InvalidValueCoercion,
                    IssueKind::UnconvertibleText,
                    format!("VALUE cannot convert \"{text}\" to a number"),
                    arg.span(),
                );
            }
        }
    }

    fn check_indirect(&mut self, args: &[ASTNode]) {
        let Some(ASTNodeType::Literal(LiteralValue::Text(text))) = args.first().map(|a| &a.node_type)
        else {
            return;
        };
        // R1C1 text is not validated.
        if let Some(ASTNodeType::Literal(LiteralValue::Boolean(false))) =
            args.get(1).map(|a| &a.node_type)
        {
            return;
        }
        match ReferenceType::from_string(text) {
            Ok(reference) if !reference.is_external() => {
                self.out.indirect_targets.push(reference);
            }
            Ok(_) => {}
            Err(_) => self.push(
                ErrorClass::UnresolvedReference,
                IssueKind::BadIndirect,
                format!("INDIRECT(\"{text}\") is not a reference"),
                args.first().and_then(ASTNode::span),
            ),
        }
    }
}

fn arity_message(spec: &FunctionSpec, got: usize) -> String {
    match spec.max_args {
        Some(max) if max == spec.min_args => {
            format!("{} takes {} argument(s), got {got}", spec.name, max)
        }
        Some(max) => format!(
            "{} takes {} to {} arguments, got {got}",
            spec.name, spec.min_args, max
        ),
        None => format!(
            "{} takes at least {} argument(s), got {got}",
            spec.name, spec.min_args
        ),
    }
}
