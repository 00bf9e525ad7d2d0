//! Syntax validation of resolved content.
//!
//! Python sources are parsed and then checked for the statement placement
//! errors the compiler rejects (no execution). JSON and TOML are parsed
//! with their serde deserializers. Everything else only has to be non-empty,
//! which catches an oracle that returned nothing but nothing more.

use rustpython_parser::{ast, parse, Mode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parser::file_extension;

/// Outcome of a syntax check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    /// `Line N: message` for parse failures.
    pub error: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }

    /// The error text, or an empty string for a valid result.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// Grammar chosen from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Json,
    Toml,
    Other,
}

impl Language {
    pub fn from_path(file_path: &str) -> Self {
        match file_extension(file_path).as_str() {
            ".py" | ".pyi" => Self::Python,
            ".json" => Self::Json,
            ".toml" => Self::Toml,
            _ => Self::Other,
        }
    }
}

/// Stateless syntax validator.
pub struct SyntaxValidator;

impl SyntaxValidator {
    /// Validate `code` according to the grammar implied by `file_path`.
    pub fn validate(file_path: &str, code: &str) -> Validation {
        let language = Language::from_path(file_path);
        let result = match language {
            Language::Python => Self::validate_python(code),
            Language::Json => Self::validate_json(code),
            Language::Toml => Self::validate_toml(code),
            Language::Other => Self::validate_non_empty(code),
        };
        debug!(
            path = file_path,
            ?language,
            is_valid = result.is_valid,
            "validated content"
        );
        result
    }

    /// Validate a resolved conflict region rather than a whole file.
    ///
    /// Python regions are usually nested inside a block, so the common
    /// leading indentation is removed and the region is only parsed: whether
    /// a `return` or `break` is legal depends on the surrounding file.
    pub fn validate_fragment(file_path: &str, code: &str) -> Validation {
        match Language::from_path(file_path) {
            Language::Python => match parse_python(&dedent(code)) {
                Ok(_) => Validation::valid(),
                Err(invalid) => invalid,
            },
            _ => Self::validate(file_path, code),
        }
    }

    /// Compile-check `code` as a Python module without executing it.
    ///
    /// Beyond parsing, `return` must sit in a function and `break` or
    /// `continue` in a loop.
    pub fn validate_python(code: &str) -> Validation {
        let module = match parse_python(code) {
            Ok(module) => module,
            Err(invalid) => return invalid,
        };
        let body = match &module {
            ast::Mod::Module(m) => &m.body[..],
            _ => &[],
        };
        match check_block(body, Scope::default()) {
            Some((offset, msg)) => {
                Validation::invalid(format!("Line {}: {}", line_at_offset(code, offset), msg))
            }
            None => Validation::valid(),
        }
    }

    pub fn validate_json(code: &str) -> Validation {
        match serde_json::from_str::<serde_json::Value>(code) {
            Ok(_) => Validation::valid(),
            Err(e) => Validation::invalid(format!("Line {}: invalid JSON ({})", e.line(), e)),
        }
    }

    pub fn validate_toml(code: &str) -> Validation {
        match code.parse::<toml::Table>() {
            Ok(_) => Validation::valid(),
            Err(e) => {
                let line = e
                    .span()
                    .map(|span| line_at_offset(code, span.start))
                    .unwrap_or(1);
                Validation::invalid(format!("Line {}: {}", line, e.message().trim()))
            }
        }
    }

    pub fn validate_non_empty(code: &str) -> Validation {
        if code.trim().is_empty() {
            Validation::invalid("Resolved content is empty")
        } else {
            Validation::valid()
        }
    }
}

fn parse_python(code: &str) -> Result<ast::Mod, Validation> {
    parse(code, Mode::Module, "<string>").map_err(|e| {
        let line = line_at_offset(code, u32::from(e.offset) as usize);
        Validation::invalid(format!("Line {}: {}", line, e.error))
    })
}

/// Enclosing constructs that decide where control-flow statements are legal.
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    in_function: bool,
    in_loop: bool,
}

impl Scope {
    fn looping(self) -> Self {
        Self {
            in_loop: true,
            ..self
        }
    }
}

/// First misplaced statement in `body` as `(byte offset, message)`.
fn check_block(body: &[ast::Stmt], scope: Scope) -> Option<(usize, &'static str)> {
    body.iter().find_map(|stmt| check_stmt(stmt, scope))
}

fn check_stmt(stmt: &ast::Stmt, scope: Scope) -> Option<(usize, &'static str)> {
    use ast::Stmt;

    let function = Scope {
        in_function: true,
        in_loop: false,
    };
    match stmt {
        Stmt::Return(s) if !scope.in_function => {
            Some((u32::from(s.range.start()) as usize, "'return' outside function"))
        }
        Stmt::Break(s) if !scope.in_loop => {
            Some((u32::from(s.range.start()) as usize, "'break' outside loop"))
        }
        Stmt::Continue(s) if !scope.in_loop => {
            Some((u32::from(s.range.start()) as usize, "'continue' not properly in loop"))
        }
        Stmt::FunctionDef(s) => check_block(&s.body, function),
        Stmt::AsyncFunctionDef(s) => check_block(&s.body, function),
        Stmt::ClassDef(s) => check_block(&s.body, Scope::default()),
        // `else` clauses of loops are outside the loop itself.
        Stmt::For(s) => {
            check_block(&s.body, scope.looping()).or_else(|| check_block(&s.orelse, scope))
        }
        Stmt::AsyncFor(s) => {
            check_block(&s.body, scope.looping()).or_else(|| check_block(&s.orelse, scope))
        }
        Stmt::While(s) => {
            check_block(&s.body, scope.looping()).or_else(|| check_block(&s.orelse, scope))
        }
        Stmt::If(s) => check_block(&s.body, scope).or_else(|| check_block(&s.orelse, scope)),
        Stmt::With(s) => check_block(&s.body, scope),
        Stmt::AsyncWith(s) => check_block(&s.body, scope),
        Stmt::Match(s) => s.cases.iter().find_map(|case| check_block(&case.body, scope)),
        Stmt::Try(s) => check_try(&s.body, &s.handlers, &s.orelse, &s.finalbody, scope),
        Stmt::TryStar(s) => check_try(&s.body, &s.handlers, &s.orelse, &s.finalbody, scope),
        _ => None,
    }
}

fn check_try(
    body: &[ast::Stmt],
    handlers: &[ast::ExceptHandler],
    orelse: &[ast::Stmt],
    finalbody: &[ast::Stmt],
    scope: Scope,
) -> Option<(usize, &'static str)> {
    check_block(body, scope)
        .or_else(|| {
            handlers.iter().find_map(|handler| match handler {
                ast::ExceptHandler::ExceptHandler(h) => check_block(&h.body, scope),
            })
        })
        .or_else(|| check_block(orelse, scope))
        .or_else(|| check_block(finalbody, scope))
}

/// Strip the indentation shared by every non-blank line.
fn dedent(code: &str) -> String {
    let indent = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    code.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 1-based line containing byte `offset`.
fn line_at_offset(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
