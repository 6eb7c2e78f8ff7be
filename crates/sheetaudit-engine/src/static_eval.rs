//! Local errors that need cell contents but not a full evaluator.
//!
//! Only values that are fixed without evaluating other formulas take part:
//! literals, constant cells, empty cells and formulas that are a bare literal.
//! Anything else is left undecided rather than guessed.

use rayon::prelude::*;
use sheetaudit_common::{CellCoord, ErrorClass, LiteralValue, parse_plain_number};
use sheetaudit_parse::functions::{self, FunctionSpec};
use sheetaudit_parse::{ASTNode, ASTNodeType, ParsedFormula, Rect, ReferenceType};

use crate::findings::{StructuralFinding, StructuralKind};
use crate::formulas::FormulaSet;
use crate::workbook::{Cell, CellValue, Sheet, Workbook};

/// The value a reference or expression is known to have.
#[derive(Debug, Clone, PartialEq)]
enum Known {
    Number(f64),
    Text(String),
    Boolean(bool),
}

pub struct StaticEvaluator<'a> {
    workbook: &'a Workbook,
    formulas: &'a FormulaSet,
}

impl<'a> StaticEvaluator<'a> {
    pub fn new(workbook: &'a Workbook, formulas: &'a FormulaSet) -> Self {
        Self { workbook, formulas }
    }

    /// Findings for every formula cell, in coordinate order.
    pub fn evaluate_all(&self, parallel: bool) -> Vec<StructuralFinding> {
        if parallel {
            let per_cell: Vec<Vec<StructuralFinding>> = self
                .formulas
                .par_iter()
                .map(|(coord, parsed)| self.evaluate(coord, parsed))
                .collect();
            per_cell.into_iter().flatten().collect()
        } else {
            self.formulas
                .iter()
                .flat_map(|(coord, parsed)| self.evaluate(coord, parsed))
                .collect()
        }
    }

    pub fn evaluate(&self, coord: &CellCoord, parsed: &ParsedFormula) -> Vec<StructuralFinding> {
        let mut out = Vec::new();
        self.visit(coord, &parsed.ast, &mut out);
        out
    }

    fn visit(&self, at: &CellCoord, node: &ASTNode, out: &mut Vec<StructuralFinding>) {
        match &node.node_type {
            ASTNodeType::BinaryOp { op, left, right } => {
                if matches!(op.as_str(), "+" | "-" | "*" | "/" | "^") {
                    self.check_text_operand(at, left, op, out);
                    self.check_text_operand(at, right, op, out);
                }
                if op == "/" && self.number(at, right) == Some(0.0) {
                    out.push(StructuralFinding::new(
                        at.clone(),
                        StructuralKind::DivisionByZero,
                        ErrorClass::DivideByZero,
                        format!("divisor {right} is zero"),
                    ));
                }
                self.visit(at, left, out);
                self.visit(at, right, out);
            }
            ASTNodeType::UnaryOp { op, expr } => {
                self.check_text_operand(at, expr, op, out);
                self.visit(at, expr, out);
            }
            ASTNodeType::Function { name, args } => {
                if let Some(spec) = functions::lookup(name) {
                    if spec.is_division()
                        && let Some(divisor) = args.get(1)
                        && self.number(at, divisor) == Some(0.0)
                    {
                        out.push(StructuralFinding::new(
                            at.clone(),
                            StructuralKind::DivisionByZero,
                            ErrorClass::DivideByZero,
                            format!("{} divisor {divisor} is zero", spec.name),
                        ));
                    }
                    if spec.is_lookup() {
                        self.check_lookup(at, spec, args, out);
                    }
                }
                for arg in args {
                    self.visit(at, arg, out);
                }
            }
            ASTNodeType::Array(rows) => {
                for item in rows.iter().flatten() {
                    self.visit(at, item, out);
                }
            }
            ASTNodeType::MalformedToken { partial, .. } => {
                for part in partial {
                    self.visit(at, part, out);
                }
            }
            ASTNodeType::Literal(_) | ASTNodeType::Reference { .. } | ASTNodeType::Empty => {}
        }
    }

    /// Arithmetic on a single cell that holds non-numeric text.
    fn check_text_operand(
        &self,
        at: &CellCoord,
        operand: &ASTNode,
        op: &str,
        out: &mut Vec<StructuralFinding>,
    ) {
        let ASTNodeType::Reference { reference, .. } = &operand.node_type else {
            return;
        };
        if !matches!(reference, ReferenceType::Cell { .. }) {
            return;
        }
        if let Some(Known::Text(text)) = self.reference_value(at, reference)
            && parse_plain_number(&text).is_none()
        {
            out.push(StructuralFinding::new(
                at.clone(),
                StructuralKind::TextCellArithmetic,
                ErrorClass::InvalidValueCoercion,
                format!("{reference} holds text \"{text}\" used with '{op}'"),
            ));
        }
    }

    fn check_lookup(
        &self,
        at: &CellCoord,
        spec: &FunctionSpec,
        args: &[ASTNode],
        out: &mut Vec<StructuralFinding>,
    ) {
        let Some(table) = args.get(1).and_then(|a| self.table(at, a)) else {
            return;
        };
        let (sheet, rect) = table;

        // VLOOKUP/HLOOKUP index outside the table
        let width = match spec.name {
            "VLOOKUP" => Some(rect.cols()),
            "HLOOKUP" => Some(rect.rows()),
            _ => None,
        };
        if let (Some(width), Some(index)) = (width, args.get(2).and_then(|a| self.number(at, a)))
            && index.trunc() > width as f64
        {
            out.push(StructuralFinding::new(
                at.clone(),
                StructuralKind::LookupIndexOutOfRange,
                ErrorClass::UnresolvedReference,
                format!("{} index {index} is beyond a table {width} wide", spec.name),
            ));
            return;
        }

        if !self.is_exact(spec, args) {
            return;
        }
        let Some(key) = args.first().and_then(literal_key) else {
            return;
        };
        if let Known::Text(text) = &key
            && text.contains(['*', '?', '~'])
        {
            return;
        }
        let vector = match spec.name {
            "VLOOKUP" => Rect::new(rect.start_row, rect.start_col, rect.end_row, rect.start_col),
            "HLOOKUP" => Rect::new(rect.start_row, rect.start_col, rect.start_row, rect.end_col),
            _ => rect,
        };

        let mut found = false;
        for (_, cell) in sheet.cells_in(vector) {
            match known_value(cell) {
                Some(value) if matches_key(&key, &value) => {
                    found = true;
                    break;
                }
                Some(_) => {}
                // a computed entry might match
                None if cell.value.is_formula() => return,
                None => {}
            }
        }
        if !found {
            out.push(StructuralFinding::new(
                at.clone(),
                StructuralKind::LookupMiss,
                ErrorClass::NotAvailable,
                format!("{} key {} is not in the lookup range", spec.name, describe(&key)),
            ));
        }
    }

    fn is_exact(&self, spec: &FunctionSpec, args: &[ASTNode]) -> bool {
        let literal_number = |idx: usize| match args.get(idx).map(|a| &a.node_type) {
            Some(ASTNodeType::Literal(LiteralValue::Number(n))) => Some(*n),
            Some(ASTNodeType::Literal(LiteralValue::Boolean(b))) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        match spec.name {
            "VLOOKUP" | "HLOOKUP" => literal_number(3) == Some(0.0),
            "MATCH" => literal_number(2) == Some(0.0),
            "XLOOKUP" => {
                let has_fallback = args
                    .get(3)
                    .is_some_and(|a| !matches!(a.node_type, ASTNodeType::Empty));
                let exact_mode = match args.get(4) {
                    None => true,
                    Some(a) if matches!(a.node_type, ASTNodeType::Empty) => true,
                    Some(_) => literal_number(4) == Some(0.0),
                };
                !has_fallback && exact_mode
            }
            _ => false,
        }
    }

    /// The sheet and rectangle behind a range argument.
    fn table(&self, at: &CellCoord, node: &ASTNode) -> Option<(&'a Sheet, Rect)> {
        let ASTNodeType::Reference { reference, .. } = &node.node_type else {
            return None;
        };
        let reference = self.through_names(reference)?;
        let sheet = self.workbook.sheet(reference.sheet().unwrap_or(&at.sheet))?;
        Some((sheet, reference.rect()?))
    }

    fn through_names<'r>(&'r self, reference: &'r ReferenceType) -> Option<&'r ReferenceType> {
        match reference {
            ReferenceType::NamedRange(name) => self.workbook.defined_name(name).map(|d| &d.target),
            ReferenceType::External { .. } => None,
            other => Some(other),
        }
    }

    fn number(&self, at: &CellCoord, node: &ASTNode) -> Option<f64> {
        match self.value(at, node)? {
            Known::Number(n) => Some(n),
            Known::Boolean(b) => Some(if b { 1.0 } else { 0.0 }),
            Known::Text(t) => parse_plain_number(&t),
        }
    }

    fn value(&self, at: &CellCoord, node: &ASTNode) -> Option<Known> {
        match &node.node_type {
            ASTNodeType::Literal(literal) => known_literal(literal),
            ASTNodeType::Reference { reference, .. } => self.reference_value(at, reference),
            ASTNodeType::UnaryOp { op, expr } => {
                let n = self.number(at, expr)?;
                match op.as_str() {
                    "-" => Some(Known::Number(-n)),
                    "+" => Some(Known::Number(n)),
                    "%" => Some(Known::Number(n / 100.0)),
                    _ => None,
                }
            }
            ASTNodeType::BinaryOp { op, left, right } => {
                let (a, b) = (self.number(at, left)?, self.number(at, right)?);
                let n = match op.as_str() {
                    "+" => a + b,
                    "-" => a - b,
                    "*" => a * b,
                    "/" if b != 0.0 => a / b,
                    "^" => a.powf(b),
                    _ => return None,
                };
                n.is_finite().then_some(Known::Number(n))
            }
            _ => None,
        }
    }

    /// The value of a single-cell reference; an absent or empty cell is 0.
    fn reference_value(&self, at: &CellCoord, reference: &ReferenceType) -> Option<Known> {
        let reference = self.through_names(reference)?;
        let ReferenceType::Cell { sheet, row, col } = reference else {
            return None;
        };
        let sheet = self.workbook.sheet(sheet.as_deref().unwrap_or(&at.sheet))?;
        match sheet.cell(*row, *col) {
            None => Some(Known::Number(0.0)),
            Some(cell) => match &cell.value {
                CellValue::Empty => Some(Known::Number(0.0)),
                CellValue::Formula(_) => {
                    let coord = CellCoord::new(sheet.name(), *row, *col);
                    self.formulas
                        .get(&coord)
                        .and_then(ParsedFormula::static_literal)
                        .and_then(|l| known_literal(&l))
                }
                _ => known_value(cell),
            },
        }
    }
}

fn known_literal(literal: &LiteralValue) -> Option<Known> {
    match literal {
        LiteralValue::Number(n) => Some(Known::Number(*n)),
        LiteralValue::Text(t) => Some(Known::Text(t.clone())),
        LiteralValue::Boolean(b) => Some(Known::Boolean(*b)),
        LiteralValue::Error(_) => None,
    }
}

fn known_value(cell: &Cell) -> Option<Known> {
    match &cell.value {
        CellValue::Number(n) => Some(Known::Number(*n)),
        CellValue::Text(t) => Some(Known::Text(t.clone())),
        CellValue::Boolean(b) => Some(Known::Boolean(*b)),
        CellValue::Empty | CellValue::Formula(_) => None,
    }
}

fn literal_key(node: &ASTNode) -> Option<Known> {
    match &node.node_type {
        ASTNodeType::Literal(literal) => known_literal(literal),
        _ => None,
    }
}

fn matches_key(key: &Known, value: &Known) -> bool {
    match (key, value) {
        (Known::Number(a), Known::Number(b)) => a == b,
        (Known::Text(a), Known::Text(b)) => a.to_lowercase() == b.to_lowercase(),
        (Known::Boolean(a), Known::Boolean(b)) => a == b,
        _ => false,
    }
}

fn describe(key: &Known) -> String {
    match key {
        Known::Number(n) => n.to_string(),
        Known::Text(t) => format!("\"{t}\""),
        Known::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
    }
}
