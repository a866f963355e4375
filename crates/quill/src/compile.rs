//! Compilation: lexing, parsing, and lowering the surface AST into the
//! typed expression tree.
//!
//! The [`Compilation`] context carries the active environment, the
//! namespace and class stacks, the source registry and the error list.
//! Every diagnostic funnels through the same sink, prefixed with the
//! location chain (include path, line, column). No program is produced when
//! the list is non-empty.

use std::{fmt, path::Path, rc::Rc};

use lalrpop_util::ParseError;

use crate::{
    ast::{BinaryOp, ExprNode, Param, Stmt, SurfaceExpr},
    environment::Environment,
    expressions::{
        Expression,
        append::new_append_expression,
        assign::{
            define_function_binding, new_assign_expression, new_declare_expression,
            new_define_expression,
        },
        binary::{
            ComparisonKind, new_addition, new_comparison, new_division, new_equality,
            new_multiplication, new_subtraction,
        },
        call::new_function_call,
        class_expr::{finish_class_declaration, start_class_declaration},
        constant::{new_constant_expression, new_void_expression},
        if_expr::new_if_expression,
        lambda::LambdaExpression,
        logical::new_logical_expression,
        method::new_method_lookup,
        namespace_expr::{new_namespace_expression, start_namespace_declaration},
        negate::{new_negate_expression_bool, new_negate_expression_number},
        return_expr::new_return_expression,
        variable::new_variable_lookup,
        while_expr::{new_for_expression, new_while_expression},
    },
    gc::{Pool, Root},
    grammar,
    lexer::{LexError, Position, SourceMap, SpannedToken, Token, lex_file, lex_string},
    types::{FunctionType, Identifier, Namespace, PurityType, Type},
    value::Value,
};

/// A single location-prefixed compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError(pub String);

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The aggregated result of a failed compilation; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

/// State threaded through lowering.
pub struct Compilation {
    pub pool: Pool,
    pub environment: Root<Environment>,
    pub current_namespace: Namespace,
    pub current_class: Vec<Type>,
    source_map: SourceMap,
    position: Position,
    errors: Vec<CompileError>,
}

impl Compilation {
    pub fn new(pool: &Pool, environment: Root<Environment>) -> Self {
        Self {
            pool: pool.clone(),
            environment,
            current_namespace: Namespace::empty(),
            current_class: Vec::new(),
            source_map: SourceMap::new(),
            position: Position::default(),
            errors: Vec::new(),
        }
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Adds a diagnostic, prefixed with the current location chain.
    pub fn add_error(&mut self, message: impl Into<String>) {
        let prefix = self.source_map.describe(self.position);
        self.errors
            .push(CompileError(format!("{prefix}: {}", message.into())));
    }

    /// Forwards an error into the sink, passing values through; keeps
    /// composition terse at call sites.
    pub fn register_errors<T>(&mut self, value: Result<T, String>) -> Option<T> {
        match value {
            Ok(value) => Some(value),
            Err(message) => {
                self.add_error(message);
                None
            }
        }
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }
}

/// Compiles an in-memory source against `environment`.
pub fn compile_string(
    source: &str,
    pool: &Pool,
    environment: Root<Environment>,
) -> Result<Rc<Expression>, CompileErrors> {
    let mut compilation = Compilation::new(pool, environment);
    match lex_string(source, &mut compilation.source_map) {
        Ok(tokens) => finish_compilation(compilation, tokens),
        Err(error) => {
            compilation.set_position(error.position);
            compilation.add_error(error.message);
            Err(CompileErrors(compilation.errors))
        }
    }
}

/// Compiles a file (includes resolve relative to it).
pub fn compile_file(
    path: &Path,
    pool: &Pool,
    environment: Root<Environment>,
) -> Result<Rc<Expression>, CompileErrors> {
    let mut compilation = Compilation::new(pool, environment);
    match lex_file(path, &mut compilation.source_map) {
        Ok(tokens) => finish_compilation(compilation, tokens),
        Err(error) => {
            compilation.set_position(error.position);
            compilation.add_error(error.message);
            Err(CompileErrors(compilation.errors))
        }
    }
}

fn finish_compilation(
    mut compilation: Compilation,
    tokens: Vec<SpannedToken>,
) -> Result<Rc<Expression>, CompileErrors> {
    let program = match grammar::ProgramParser::new().parse(tokens) {
        Ok(program) => program,
        Err(error) => {
            let (position, message) = describe_parse_error(&error);
            compilation.set_position(position);
            compilation.add_error(message);
            return Err(CompileErrors(compilation.errors));
        }
    };
    let root = lower_stmt_list(&mut compilation, &program);
    if !compilation.errors.is_empty() {
        return Err(CompileErrors(compilation.errors));
    }
    root.ok_or_else(|| {
        CompileErrors(vec![CompileError("Unexpected empty expression.".to_owned())])
    })
}

fn describe_parse_error(error: &ParseError<Position, Token, LexError>) -> (Position, String) {
    match error {
        ParseError::InvalidToken { location } => (*location, "Invalid token".to_owned()),
        ParseError::UnrecognizedEof { location, .. } => {
            (*location, "Unexpected end of input".to_owned())
        }
        ParseError::UnrecognizedToken {
            token: (location, token, _),
            ..
        } => (*location, format!("Syntax error near {token}")),
        ParseError::ExtraToken {
            token: (location, token, _),
        } => (*location, format!("Unexpected token {token}")),
        ParseError::User { error } => (error.position, error.message.clone()),
    }
}

/// Lowers a statement sequence into a right-leaning append chain (the
/// chain evaluates iteratively, so its shape must not nest leftwards). On
/// failure, lowering continues across the remaining statements so that all
/// diagnostics are collected, but no expression is produced.
fn lower_stmt_list(compilation: &mut Compilation, stmts: &[Stmt]) -> Option<Rc<Expression>> {
    let mut lowered = Vec::with_capacity(stmts.len());
    let mut failed = false;
    for stmt in stmts {
        match lower_stmt(compilation, stmt) {
            None => failed = true,
            Some(expr) => lowered.push(expr),
        }
    }
    if failed {
        return None;
    }
    let mut result: Option<Rc<Expression>> = None;
    for expr in lowered.into_iter().rev() {
        result = match result {
            None => Some(expr),
            Some(rest) => Some(Rc::new(new_append_expression(compilation, expr, rest)?)),
        };
    }
    Some(result.unwrap_or_else(|| Rc::new(new_void_expression(&compilation.pool))))
}

/// Statement-position branches yield no value, so both arms of an `if` are
/// capped with void; this keeps branch types equal while preserving the
/// return types an inner `return` contributes.
fn cap_with_void(
    compilation: &mut Compilation,
    expr: Rc<Expression>,
) -> Option<Rc<Expression>> {
    let void = Rc::new(new_void_expression(&compilation.pool));
    new_append_expression(compilation, expr, void).map(Rc::new)
}

fn lower_stmt(compilation: &mut Compilation, stmt: &Stmt) -> Option<Rc<Expression>> {
    match stmt {
        Stmt::Expr(expr) => lower_expr(compilation, expr),
        Stmt::VarDef {
            position,
            type_name,
            name,
            init,
        } => {
            compilation.set_position(*position);
            match init {
                Some(init) => {
                    let value = lower_expr(compilation, init)?;
                    compilation.set_position(*position);
                    new_define_expression(compilation, type_name, name.clone(), value)
                        .map(Rc::new)
                }
                None => {
                    new_declare_expression(compilation, type_name, name.clone()).map(Rc::new)
                }
            }
        }
        Stmt::FuncDef {
            position,
            return_type,
            name,
            params,
            body,
        } => {
            compilation.set_position(*position);
            lower_func_def(compilation, return_type, name, params, body)
        }
        Stmt::Block(stmts) => {
            let parent = compilation.environment.clone();
            compilation.environment = Environment::new_child(parent.ptr());
            let result = lower_stmt_list(compilation, stmts);
            compilation.environment = parent;
            result
        }
        Stmt::If {
            position,
            condition,
            true_branch,
            false_branch,
        } => {
            let condition = lower_expr(compilation, condition);
            let true_case = lower_stmt(compilation, true_branch)
                .and_then(|expr| cap_with_void(compilation, expr));
            let false_case = match false_branch {
                Some(branch) => lower_stmt(compilation, branch)
                    .and_then(|expr| cap_with_void(compilation, expr)),
                None => Some(Rc::new(new_void_expression(&compilation.pool))),
            };
            compilation.set_position(*position);
            new_if_expression(compilation, condition?, true_case?, false_case?).map(Rc::new)
        }
        Stmt::While {
            position,
            condition,
            body,
        } => {
            let condition = lower_expr(compilation, condition);
            let body = lower_stmt(compilation, body);
            compilation.set_position(*position);
            new_while_expression(compilation, condition?, body?).map(Rc::new)
        }
        Stmt::For {
            position,
            init,
            condition,
            step,
            body,
        } => {
            // The loop variable's scope is the `for` statement.
            let parent = compilation.environment.clone();
            compilation.environment = Environment::new_child(parent.ptr());
            let init_expr = lower_stmt(compilation, init);
            let condition = lower_expr(compilation, condition);
            let step = lower_expr(compilation, step);
            let body = lower_stmt(compilation, body);
            compilation.environment = parent;
            compilation.set_position(*position);
            new_for_expression(compilation, init_expr?, condition?, step?, body?).map(Rc::new)
        }
        Stmt::Return { position, value } => {
            compilation.set_position(*position);
            let value = match value {
                Some(value) => lower_expr(compilation, value)?,
                None => Rc::new(new_void_expression(&compilation.pool)),
            };
            Some(Rc::new(new_return_expression(value)))
        }
        Stmt::NamespaceDecl {
            position,
            name,
            body,
        } => {
            compilation.set_position(*position);
            start_namespace_declaration(compilation, name.clone());
            let body = lower_stmt_list(compilation, body);
            new_namespace_expression(compilation, body).map(Rc::new)
        }
        Stmt::ClassDecl {
            position,
            name,
            body,
        } => {
            compilation.set_position(*position);
            start_class_declaration(compilation, name);
            let body = lower_stmt_list(compilation, body);
            let had_body = body.is_some();
            finish_class_declaration(compilation, body);
            had_body.then(|| Rc::new(new_void_expression(&compilation.pool)))
        }
    }
}

fn resolve_params(
    compilation: &mut Compilation,
    params: &[Param],
) -> Option<(Vec<Type>, Vec<Identifier>)> {
    let mut input_types = Vec::with_capacity(params.len());
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        match compilation.environment.value().lookup_type(&param.type_name) {
            Some(vm_type) => {
                input_types.push(vm_type);
                names.push(param.name.clone());
            }
            None => {
                compilation.add_error(format!("Unknown type: \"{}\"", param.type_name));
                return None;
            }
        }
    }
    Some((input_types, names))
}

/// Compiles a function body against a child environment holding the
/// parameters, then closes it into a lambda expression.
fn lower_function_body(
    compilation: &mut Compilation,
    output_type: Type,
    input_types: Vec<Type>,
    names: Vec<Identifier>,
    body: &[Stmt],
) -> Option<LambdaExpression> {
    let function_type = FunctionType {
        output: Box::new(output_type),
        inputs: input_types.clone(),
        purity: PurityType::UNKNOWN,
    };
    let parent = compilation.environment.clone();
    compilation.environment = Environment::new_child(parent.ptr());
    for (vm_type, name) in input_types.iter().zip(&names) {
        compilation
            .environment
            .value()
            .define_uninitialized(name.clone(), vm_type.clone());
    }
    let body_expr = lower_stmt_list(compilation, body);
    compilation.environment = parent;
    let body_expr = body_expr?;
    compilation.register_errors(LambdaExpression::new(
        function_type,
        Rc::new(names),
        body_expr,
    ))
}

fn lower_func_def(
    compilation: &mut Compilation,
    return_type: &Identifier,
    name: &Identifier,
    params: &[Param],
    body: &[Stmt],
) -> Option<Rc<Expression>> {
    let Some(output_type) = compilation.environment.value().lookup_type(return_type) else {
        compilation.add_error(format!("Unknown return type: \"{return_type}\""));
        return None;
    };
    let (input_types, names) = resolve_params(compilation, params)?;
    // Declare the function before compiling its body, so it can recurse.
    compilation.environment.value().define_uninitialized(
        name.clone(),
        Type::Function(FunctionType {
            output: Box::new(output_type.clone()),
            inputs: input_types.clone(),
            purity: PurityType::UNKNOWN,
        }),
    );
    let lambda = lower_function_body(compilation, output_type, input_types, names, body)?;
    Some(Rc::new(define_function_binding(
        name.clone(),
        Rc::new(Expression::Lambda(lambda)),
    )))
}

fn lower_expr(compilation: &mut Compilation, node: &ExprNode) -> Option<Rc<Expression>> {
    compilation.set_position(node.position);
    let lowered = match &node.expr {
        SurfaceExpr::Number(value) => Some(new_constant_expression(Value::new_number(
            &compilation.pool,
            value.clone(),
        ))),
        SurfaceExpr::Str(value) => Some(new_constant_expression(Value::new_string(
            &compilation.pool,
            value.clone(),
        ))),
        SurfaceExpr::Bool(value) => Some(new_constant_expression(Value::new_bool(
            &compilation.pool,
            *value,
        ))),
        SurfaceExpr::Name(path) => new_variable_lookup(compilation, path.clone()),
        SurfaceExpr::Call { callee, args } => {
            let callee = lower_expr(compilation, callee);
            let mut lowered_args = Vec::with_capacity(args.len());
            let mut failed = false;
            for arg in args {
                match lower_expr(compilation, arg) {
                    Some(arg) => lowered_args.push(arg),
                    None => failed = true,
                }
            }
            compilation.set_position(node.position);
            if failed {
                None
            } else {
                new_function_call(compilation, callee?, lowered_args)
            }
        }
        SurfaceExpr::Method { object, name } => {
            let object = lower_expr(compilation, object);
            compilation.set_position(node.position);
            new_method_lookup(compilation, object?, name.clone())
        }
        SurfaceExpr::Binary { op, lhs, rhs } => {
            let lhs = lower_expr(compilation, lhs);
            let rhs = lower_expr(compilation, rhs);
            compilation.set_position(node.position);
            lower_binary(compilation, *op, lhs?, rhs?)
        }
        SurfaceExpr::Logical { identity, lhs, rhs } => {
            let lhs = lower_expr(compilation, lhs);
            let rhs = lower_expr(compilation, rhs);
            compilation.set_position(node.position);
            new_logical_expression(compilation, *identity, lhs?, rhs?)
        }
        SurfaceExpr::Not(expr) => {
            let expr = lower_expr(compilation, expr);
            compilation.set_position(node.position);
            new_negate_expression_bool(compilation, expr?)
        }
        SurfaceExpr::Negate(expr) => {
            let expr = lower_expr(compilation, expr);
            compilation.set_position(node.position);
            new_negate_expression_number(compilation, expr?)
        }
        SurfaceExpr::Assign { name, op, value } => {
            let value = lower_expr(compilation, value);
            compilation.set_position(node.position);
            let value = value?;
            let value = match op {
                None => value,
                Some(op) => {
                    let current = new_variable_lookup(compilation, vec![name.clone()])?;
                    Rc::new(lower_binary(compilation, *op, Rc::new(current), value)?)
                }
            };
            new_assign_expression(compilation, name.clone(), value)
        }
        SurfaceExpr::Ternary {
            condition,
            true_case,
            false_case,
        } => {
            let condition = lower_expr(compilation, condition);
            let true_case = lower_expr(compilation, true_case);
            let false_case = lower_expr(compilation, false_case);
            compilation.set_position(node.position);
            new_if_expression(compilation, condition?, true_case?, false_case?)
        }
        SurfaceExpr::Lambda {
            params,
            return_type,
            body,
        } => {
            let Some(output_type) = compilation.environment.value().lookup_type(return_type)
            else {
                compilation.add_error(format!("Unknown return type: \"{return_type}\""));
                return None;
            };
            let (input_types, names) = resolve_params(compilation, params)?;
            lower_function_body(compilation, output_type, input_types, names, body)
                .map(Expression::Lambda)
        }
    };
    lowered.map(Rc::new)
}

fn lower_binary(
    compilation: &mut Compilation,
    op: BinaryOp,
    lhs: Rc<Expression>,
    rhs: Rc<Expression>,
) -> Option<Expression> {
    match op {
        BinaryOp::Add => new_addition(compilation, lhs, rhs),
        BinaryOp::Subtract => new_subtraction(compilation, lhs, rhs),
        BinaryOp::Multiply => new_multiplication(compilation, lhs, rhs),
        BinaryOp::Divide => new_division(compilation, lhs, rhs),
        BinaryOp::Equals => new_equality(compilation, false, lhs, rhs),
        BinaryOp::NotEquals => new_equality(compilation, true, lhs, rhs),
        BinaryOp::LessThan => new_comparison(compilation, ComparisonKind::LessThan, lhs, rhs),
        BinaryOp::LessOrEqual => {
            new_comparison(compilation, ComparisonKind::LessOrEqual, lhs, rhs)
        }
        BinaryOp::GreaterThan => {
            new_comparison(compilation, ComparisonKind::GreaterThan, lhs, rhs)
        }
        BinaryOp::GreaterOrEqual => {
            new_comparison(compilation, ComparisonKind::GreaterOrEqual, lhs, rhs)
        }
    }
}
