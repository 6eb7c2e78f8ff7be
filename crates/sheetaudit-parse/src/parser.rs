use std::error::Error;
use std::fmt::{self, Display};

use sheetaudit_common::{ErrorClass, LiteralValue};

use crate::functions;
use crate::reference::ReferenceType;
use crate::tokenizer::{Associativity, Token, TokenSubType, TokenType, Tokenizer};

/// What kind of damage a malformed fragment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MalformedKind {
    /// A fragment the tokenizer could not read (unterminated string, bad error code, stray closer).
    InvalidToken,
    /// An operator or group with nothing where an operand belongs.
    MissingOperand,
    /// A token that cannot appear where it was found.
    UnexpectedToken,
    /// A `(`, `{` or function call that is never closed.
    UnclosedGroup,
    /// Operand text that is neither a value nor a valid reference.
    BadReference,
}

/// A custom error type for the parser.
///
/// `position` is the byte offset of the offending fragment in the formula text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    pub kind: MalformedKind,
    pub message: String,
    pub position: Option<usize>,
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "ParserError at position {}: {}", pos, self.message)
        } else {
            write!(f, "ParserError: {}", self.message)
        }
    }
}

impl Error for ParserError {}

/// The different types of AST nodes.
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum ASTNodeType {
    Literal(LiteralValue),
    Reference {
        original: String,
        reference: ReferenceType,
    },
    UnaryOp {
        op: String,
        expr: Box<ASTNode>,
    },
    BinaryOp {
        op: String,
        left: Box<ASTNode>,
        right: Box<ASTNode>,
    },
    Function {
        name: String,
        args: Vec<ASTNode>,
    },
    Array(Vec<Vec<ASTNode>>),
    /// An argument slot left blank, as in `IF(A1,,)`.
    Empty,
    /// A fragment that could not be parsed. `partial` keeps whatever was
    /// recovered around it so references inside still count.
    MalformedToken {
        text: String,
        kind: MalformedKind,
        partial: Vec<ASTNode>,
    },
}

impl Display for ASTNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASTNodeType::Literal(value) => write!(f, "Literal({value})"),
            ASTNodeType::Reference { reference, .. } => write!(f, "Reference({reference})"),
            ASTNodeType::UnaryOp { op, expr } => write!(f, "UnaryOp({op}, {expr})"),
            ASTNodeType::BinaryOp { op, left, right } => {
                write!(f, "BinaryOp({op}, {left}, {right})")
            }
            ASTNodeType::Function { name, args } => {
                write!(f, "Function({name}")?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                write!(f, ")")
            }
            ASTNodeType::Array(rows) => write!(f, "Array({} rows)", rows.len()),
            ASTNodeType::Empty => write!(f, "Empty"),
            ASTNodeType::MalformedToken { text, kind, .. } => {
                write!(f, "MalformedToken({kind:?}, {text:?})")
            }
        }
    }
}

/// An AST node represents a parsed formula element
#[derive(Debug, Clone, PartialEq)]
pub struct ASTNode {
    pub node_type: ASTNodeType,
    pub source_token: Option<Token>,
    /// True if this AST contains any volatile function calls.
    pub contains_volatile: bool,
}

impl ASTNode {
    pub fn new(node_type: ASTNodeType, source_token: Option<Token>) -> Self {
        ASTNode {
            node_type,
            source_token,
            contains_volatile: false,
        }
    }

    pub fn new_with_volatile(
        node_type: ASTNodeType,
        source_token: Option<Token>,
        contains_volatile: bool,
    ) -> Self {
        ASTNode {
            node_type,
            source_token,
            contains_volatile,
        }
    }

    fn malformed(text: impl Into<String>, kind: MalformedKind, token: Option<Token>) -> Self {
        ASTNode::new(
            ASTNodeType::MalformedToken {
                text: text.into(),
                kind,
                partial: Vec::new(),
            },
            token,
        )
    }

    /// Byte span of the token this node was built from.
    pub fn span(&self) -> Option<(usize, usize)> {
        self.source_token.as_ref().map(|t| (t.start, t.end))
    }

    pub fn is_malformed(&self) -> bool {
        match &self.node_type {
            ASTNodeType::MalformedToken { .. } => true,
            ASTNodeType::UnaryOp { expr, .. } => expr.is_malformed(),
            ASTNodeType::BinaryOp { left, right, .. } => left.is_malformed() || right.is_malformed(),
            ASTNodeType::Function { args, .. } => args.iter().any(ASTNode::is_malformed),
            ASTNodeType::Array(rows) => rows.iter().flatten().any(ASTNode::is_malformed),
            ASTNodeType::Literal(_) | ASTNodeType::Reference { .. } | ASTNodeType::Empty => false,
        }
    }

    /// All references in the tree, in source order.
    pub fn get_dependencies(&self) -> Vec<&ReferenceType> {
        let mut dependencies = Vec::new();
        self.collect_dependencies(&mut dependencies);
        dependencies
    }

    fn collect_dependencies<'a>(&'a self, dependencies: &mut Vec<&'a ReferenceType>) {
        match &self.node_type {
            ASTNodeType::Reference { reference, .. } => dependencies.push(reference),
            ASTNodeType::UnaryOp { expr, .. } => expr.collect_dependencies(dependencies),
            ASTNodeType::BinaryOp { left, right, .. } => {
                left.collect_dependencies(dependencies);
                right.collect_dependencies(dependencies);
            }
            ASTNodeType::Function { args, .. } => {
                for arg in args {
                    arg.collect_dependencies(dependencies);
                }
            }
            ASTNodeType::Array(rows) => {
                for item in rows.iter().flatten() {
                    item.collect_dependencies(dependencies);
                }
            }
            ASTNodeType::MalformedToken { partial, .. } => {
                for node in partial {
                    node.collect_dependencies(dependencies);
                }
            }
            ASTNodeType::Literal(_) | ASTNodeType::Empty => {}
        }
    }
}

impl Display for ASTNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node_type)
    }
}

impl std::hash::Hash for ASTNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.node_type.hash(state);
    }
}

/// A parser for converting tokens into an AST.
///
/// Parsing is best-effort: problems are recorded in [`Parser::errors`] and
/// surface in the tree as [`ASTNodeType::MalformedToken`] or
/// [`ASTNodeType::Empty`] nodes instead of stopping the parse.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    end_offset: usize,
    errors: Vec<ParserError>,
    volatility_classifier: Option<Box<dyn Fn(&str) -> bool + Send + Sync + 'static>>,
}

impl<T> From<T> for Parser
where
    T: AsRef<str>,
{
    fn from(formula: T) -> Self {
        let tokens = Tokenizer::new_best_effort(formula.as_ref()).items;
        Self::new(tokens, false)
    }
}

impl Parser {
    /// Whitespace between two operands is the intersection operator and is
    /// kept as an infix `" "`; other whitespace is dropped unless asked for.
    pub fn new(tokens: Vec<Token>, include_whitespace: bool) -> Self {
        let end_offset = tokens.last().map(|t| t.end).unwrap_or(0);
        let filtered_tokens = if include_whitespace {
            tokens
        } else {
            Self::fold_whitespace(tokens)
        };
        Parser {
            tokens: filtered_tokens,
            position: 0,
            end_offset,
            errors: Vec::new(),
            volatility_classifier: None,
        }
    }

    /// Provide a function-volatility classifier for this parser.
    pub fn with_volatility_classifier<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.volatility_classifier = Some(Box::new(f));
        self
    }

    /// Use the built-in function catalogue to mark volatile calls.
    pub fn with_catalogue_volatility(self) -> Self {
        self.with_volatility_classifier(functions::is_volatile)
    }

    fn fold_whitespace(tokens: Vec<Token>) -> Vec<Token> {
        let ends_value = |t: &Token| {
            t.token_type == TokenType::Operand
                || t.token_type == TokenType::OpPostfix
                || (t.subtype == TokenSubType::Close && t.token_type != TokenType::Invalid)
        };
        let starts_value = |t: &Token| {
            t.token_type == TokenType::Operand
                || (t.token_type == TokenType::Func && t.subtype == TokenSubType::Open)
                || (t.token_type == TokenType::Paren && t.subtype == TokenSubType::Open)
        };

        let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
        let mut iter = tokens.into_iter().peekable();
        while let Some(token) = iter.next() {
            if token.token_type != TokenType::Whitespace {
                out.push(token);
                continue;
            }
            let between_values = out.last().is_some_and(ends_value)
                && iter.peek().is_some_and(starts_value);
            if between_values {
                out.push(Token::new_with_span(
                    " ".to_string(),
                    TokenType::OpInfix,
                    TokenSubType::None,
                    token.start,
                    token.end,
                ));
            }
        }
        out
    }

    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    /// Parse the tokens into an AST, failing on the first problem.
    pub fn parse(&mut self) -> Result<ASTNode, ParserError> {
        let ast = self.parse_best_effort();
        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(ast),
        }
    }

    /// Parse the tokens into an AST, never failing.
    pub fn parse_best_effort(&mut self) -> ASTNode {
        if self.tokens.is_empty() {
            self.error(MalformedKind::MissingOperand, "No tokens to parse", None);
            return ASTNode::malformed("", MalformedKind::MissingOperand, None);
        }

        // Check for literal formula (doesn't start with '=')
        if self.tokens[0].token_type == TokenType::Literal {
            let token = self.tokens[0].clone();
            return ASTNode::new(
                ASTNodeType::Literal(LiteralValue::Text(token.value.clone())),
                Some(token),
            );
        }

        let ast = self.parse_expression();
        if self.position >= self.tokens.len() {
            return ast;
        }

        // Leftover tokens: keep the parsed head and whatever can be salvaged after it.
        let mut partial = vec![ast];
        let mut text = String::new();
        while let Some(token) = self.peek().cloned() {
            self.error(
                MalformedKind::UnexpectedToken,
                format!("Unexpected token '{}'", token.value),
                Some(token.start),
            );
            text.push_str(&token.value);
            self.position += 1;
            if self.position < self.tokens.len() {
                partial.push(self.parse_expression());
            }
        }
        let contains_volatile = partial.iter().any(|n| n.contains_volatile);
        ASTNode::new_with_volatile(
            ASTNodeType::MalformedToken {
                text,
                kind: MalformedKind::UnexpectedToken,
                partial,
            },
            None,
            contains_volatile,
        )
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn error(&mut self, kind: MalformedKind, message: impl Into<String>, position: Option<usize>) {
        self.errors.push(ParserError {
            kind,
            message: message.into(),
            position,
        });
    }

    fn current_offset(&self) -> usize {
        self.peek().map(|t| t.start).unwrap_or(self.end_offset)
    }

    fn missing_operand(&mut self) -> ASTNode {
        let pos = self.current_offset();
        self.error(MalformedKind::MissingOperand, "Expected an operand", Some(pos));
        ASTNode::malformed("", MalformedKind::MissingOperand, None)
    }

    fn parse_expression(&mut self) -> ASTNode {
        self.parse_binary_op(0)
    }

    fn parse_binary_op(&mut self, min_precedence: u8) -> ASTNode {
        let mut left = self.parse_unary_op();

        while let Some(token) = self.peek() {
            if token.token_type != TokenType::OpInfix {
                break;
            }

            let (precedence, associativity) =
                token.get_precedence().unwrap_or((0, Associativity::Left));
            if precedence < min_precedence {
                break;
            }

            let op_token = token.clone();
            self.position += 1;

            let next_min_precedence = if associativity == Associativity::Left {
                precedence + 1
            } else {
                precedence
            };

            let right = self.parse_binary_op(next_min_precedence);
            let contains_volatile = left.contains_volatile || right.contains_volatile;
            left = ASTNode::new_with_volatile(
                ASTNodeType::BinaryOp {
                    op: op_token.value.clone(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Some(op_token),
                contains_volatile,
            );
        }

        left
    }

    fn parse_unary_op(&mut self) -> ASTNode {
        if let Some(token) = self.peek()
            && token.token_type == TokenType::OpPrefix
        {
            let op_token = token.clone();
            self.position += 1;
            let expr = self.parse_unary_op();
            let contains_volatile = expr.contains_volatile;
            return ASTNode::new_with_volatile(
                ASTNodeType::UnaryOp {
                    op: op_token.value.clone(),
                    expr: Box::new(expr),
                },
                Some(op_token),
                contains_volatile,
            );
        }
        self.parse_postfix_op()
    }

    fn parse_postfix_op(&mut self) -> ASTNode {
        let mut expr = self.parse_primary();

        while let Some(token) = self.peek() {
            if token.token_type != TokenType::OpPostfix {
                break;
            }
            let op_token = token.clone();
            self.position += 1;
            let contains_volatile = expr.contains_volatile;
            expr = ASTNode::new_with_volatile(
                ASTNodeType::UnaryOp {
                    op: op_token.value.clone(),
                    expr: Box::new(expr),
                },
                Some(op_token),
                contains_volatile,
            );
        }

        expr
    }

    fn parse_primary(&mut self) -> ASTNode {
        let Some(token) = self.peek().cloned() else {
            return self.missing_operand();
        };

        match token.token_type {
            TokenType::Operand => {
                self.position += 1;
                self.parse_operand(token)
            }
            TokenType::Func if token.subtype == TokenSubType::Open => {
                self.position += 1;
                self.parse_function(token)
            }
            TokenType::Paren if token.subtype == TokenSubType::Open => {
                self.position += 1;
                let expr = self.parse_expression();
                match self.peek() {
                    Some(t) if t.token_type == TokenType::Paren && t.subtype == TokenSubType::Close => {
                        self.position += 1;
                    }
                    _ => {
                        let pos = self.current_offset();
                        self.error(
                            MalformedKind::UnclosedGroup,
                            "Expected closing parenthesis",
                            Some(pos),
                        );
                    }
                }
                expr
            }
            TokenType::Array if token.subtype == TokenSubType::Open => {
                self.position += 1;
                self.parse_array()
            }
            TokenType::Invalid => {
                self.position += 1;
                self.error(
                    MalformedKind::InvalidToken,
                    format!("Unreadable fragment '{}'", token.value),
                    Some(token.start),
                );
                ASTNode::malformed(token.value.clone(), MalformedKind::InvalidToken, Some(token))
            }
            // Operators, separators and closers: the operand is missing. Leave the
            // token for the caller.
            _ => self.missing_operand(),
        }
    }

    fn parse_operand(&mut self, token: Token) -> ASTNode {
        match token.subtype {
            TokenSubType::Number => match token.value.parse::<f64>() {
                Ok(value) => ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Number(value)),
                    Some(token),
                ),
                Err(_) => self.bad_operand(token),
            },
            TokenSubType::Text => {
                let mut text = token.value.clone();
                if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 {
                    text = text[1..text.len() - 1].replace("\"\"", "\"");
                }
                ASTNode::new(ASTNodeType::Literal(LiteralValue::Text(text)), Some(token))
            }
            TokenSubType::Logical => {
                let value = token.value.eq_ignore_ascii_case("TRUE");
                ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Boolean(value)),
                    Some(token),
                )
            }
            TokenSubType::Error => match ErrorClass::from_error_literal(&token.value) {
                Some(class) => ASTNode::new(
                    ASTNodeType::Literal(LiteralValue::Error(class)),
                    Some(token),
                ),
                None => self.bad_operand(token),
            },
            TokenSubType::Range => match ReferenceType::from_string(&token.value) {
                Ok(reference) => ASTNode::new(
                    ASTNodeType::Reference {
                        original: token.value.clone(),
                        reference,
                    },
                    Some(token),
                ),
                Err(_) => self.bad_operand(token),
            },
            _ => self.bad_operand(token),
        }
    }

    fn bad_operand(&mut self, token: Token) -> ASTNode {
        self.error(
            MalformedKind::BadReference,
            format!("Invalid reference '{}'", token.value),
            Some(token.start),
        );
        ASTNode::malformed(token.value.clone(), MalformedKind::BadReference, Some(token))
    }

    fn parse_function(&mut self, func_token: Token) -> ASTNode {
        let name = func_token.value[..func_token.value.len() - 1].to_string();
        let args = self.parse_function_arguments(func_token.start);
        let this_is_volatile = self
            .volatility_classifier
            .as_ref()
            .map(|f| f(name.as_str()))
            .unwrap_or(false);
        let args_volatile = args.iter().any(|a| a.contains_volatile);

        ASTNode::new_with_volatile(
            ASTNodeType::Function { name, args },
            Some(func_token),
            this_is_volatile || args_volatile,
        )
    }

    fn is_arg_sep(token: &Token) -> bool {
        token.token_type == TokenType::Sep && token.subtype == TokenSubType::Arg
    }

    fn is_func_close(token: &Token) -> bool {
        token.token_type == TokenType::Func && token.subtype == TokenSubType::Close
    }

    fn empty_arg(at: usize) -> ASTNode {
        ASTNode::new(
            ASTNodeType::Empty,
            Some(Token::new_with_span(
                String::new(),
                TokenType::Operand,
                TokenSubType::None,
                at,
                at,
            )),
        )
    }

    /// Parse function arguments. Blank slots (`f(a,,b)`, `f(a,)`) become
    /// [`ASTNodeType::Empty`].
    fn parse_function_arguments(&mut self, call_start: usize) -> Vec<ASTNode> {
        let mut args = Vec::new();

        if let Some(token) = self.peek()
            && Self::is_func_close(token)
        {
            self.position += 1;
            return args;
        }

        let mut expect_arg = true;
        loop {
            let Some(token) = self.peek().cloned() else {
                self.error(
                    MalformedKind::UnclosedGroup,
                    "Function call is never closed",
                    Some(call_start),
                );
                if expect_arg && !args.is_empty() {
                    args.push(Self::empty_arg(self.end_offset));
                }
                break;
            };

            if Self::is_arg_sep(&token) {
                if expect_arg {
                    args.push(Self::empty_arg(token.start));
                }
                self.position += 1;
                expect_arg = true;
            } else if Self::is_func_close(&token) {
                if expect_arg && !args.is_empty() {
                    args.push(Self::empty_arg(token.start));
                }
                self.position += 1;
                break;
            } else if !expect_arg {
                self.error(
                    MalformedKind::UnexpectedToken,
                    format!("Expected ',' or ')' in function arguments, got '{}'", token.value),
                    Some(token.start),
                );
                self.position += 1;
            } else {
                args.push(self.parse_expression());
                expect_arg = false;
            }
        }

        args
    }

    fn parse_array(&mut self) -> ASTNode {
        let mut rows = Vec::new();

        if let Some(token) = self.peek()
            && token.token_type == TokenType::Array
            && token.subtype == TokenSubType::Close
        {
            self.position += 1;
            return ASTNode::new(ASTNodeType::Array(rows), None);
        }

        let mut current_row = vec![self.parse_expression()];

        loop {
            let Some(token) = self.peek().cloned() else {
                let pos = self.current_offset();
                self.error(MalformedKind::UnclosedGroup, "Array is never closed", Some(pos));
                rows.push(current_row);
                break;
            };

            match (token.token_type, token.subtype) {
                (TokenType::Sep, TokenSubType::Arg) => {
                    self.position += 1;
                    current_row.push(self.parse_expression());
                }
                (TokenType::Sep, TokenSubType::Row) => {
                    self.position += 1;
                    rows.push(std::mem::take(&mut current_row));
                    current_row.push(self.parse_expression());
                }
                (TokenType::Array, TokenSubType::Close) => {
                    self.position += 1;
                    rows.push(current_row);
                    break;
                }
                _ => {
                    self.error(
                        MalformedKind::UnexpectedToken,
                        format!("Unexpected token in array: '{}'", token.value),
                        Some(token.start),
                    );
                    self.position += 1;
                }
            }
        }

        let contains_volatile = rows.iter().flatten().any(|n| n.contains_volatile);
        ASTNode::new_with_volatile(ASTNodeType::Array(rows), None, contains_volatile)
    }
}

/// Parse a formula strictly.
pub fn parse<T: AsRef<str>>(formula: T) -> Result<ASTNode, ParserError> {
    let tokenizer = Tokenizer::new_best_effort(formula.as_ref());
    let mut parser = Parser::new(tokenizer.items, false).with_catalogue_volatility();
    parser.parse()
}
