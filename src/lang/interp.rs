//! Tree-walking interpreter
//!
//! Holds the persistent global environment and implements
//! [`crate::console::Engine`] for the console.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::console::adapter::{Engine, ErrorKind, Execution, UserError};
use crate::console::error::ExecError;
use crate::console::sink::OutputSink;
use crate::console::snapshot::Snapshot;
use crate::lang::ast::{BinOp, Expr, Literal, Stmt, UnOp};
use crate::lang::parser::parse;
use crate::lang::value::{Builtin, Function, Value};

type Ref = Arc<Value>;
type Scope = IndexMap<String, Ref>;
type EvalResult<T> = Result<T, UserError>;

pub const DEFAULT_MAX_LOOP_ITERATIONS: u64 = 1_000_000;
const MAX_CALL_DEPTH: usize = 100;
/// Bound on nested `eval` frames across all active calls.
const MAX_EVAL_NESTING: usize = 500;
/// Longest string `*` may build, in bytes.
pub const MAX_STRING_LEN: usize = 1 << 24;

enum Flow {
    Normal,
    Return(Ref),
}

/// Interpreter
pub struct Interpreter {
    globals: Scope,
    builtins: IndexMap<&'static str, Ref>,
    output: Arc<dyn OutputSink>,
    max_loop_iterations: u64,
    depth: usize,
    nesting: usize,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("max_loop_iterations", &self.max_loop_iterations)
            .finish()
    }
}

impl Interpreter {
    /// `print` writes to `output`.
    pub fn new(output: Arc<dyn OutputSink>) -> Self {
        let builtins = Builtin::ALL
            .iter()
            .map(|b| (b.name(), Arc::new(Value::Builtin(*b))))
            .collect();
        Self {
            globals: Scope::new(),
            builtins,
            output,
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            depth: 0,
            nesting: 0,
        }
    }

    pub fn with_max_loop_iterations(
        mut self,
        limit: u64,
    ) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    pub fn global(
        &self,
        name: &str,
    ) -> Option<&Ref> {
        self.globals.get(name)
    }

    /// Run `source`; the value of a trailing expression statement is
    /// returned unless it is `None`.
    pub fn run(
        &mut self,
        source: &str,
    ) -> EvalResult<Option<Ref>> {
        let program =
            parse(source).map_err(|e| UserError::new(ErrorKind::Syntax, e.to_string()))?;
        self.depth = 0;
        self.nesting = 0;

        let Some((last, init)) = program.split_last() else {
            return Ok(None);
        };

        for stmt in init {
            self.exec_top(stmt)?;
        }

        if let Stmt::Expr(expr) = last {
            let value = self.eval(expr, &mut None)?;
            return Ok((!matches!(*value, Value::None)).then_some(value));
        }
        self.exec_top(last)?;
        Ok(None)
    }

    fn exec_top(
        &mut self,
        stmt: &Stmt,
    ) -> EvalResult<()> {
        match self.exec(stmt, &mut None)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(UserError::new(
                ErrorKind::Syntax,
                "'return' outside function",
            )),
        }
    }

    fn exec_block(
        &mut self,
        body: &[Stmt],
        locals: &mut Option<Scope>,
    ) -> EvalResult<Flow> {
        for stmt in body {
            if let Flow::Return(value) = self.exec(stmt, locals)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(
        &mut self,
        stmt: &Stmt,
        locals: &mut Option<Scope>,
    ) -> EvalResult<Flow> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, locals)?;
            }
            Stmt::Assign(name, expr) => {
                let value = self.eval(expr, locals)?;
                self.bind(name, value, locals);
            }
            Stmt::Del(name) => {
                let removed = match locals {
                    Some(scope) => scope.shift_remove(name),
                    None => self.globals.shift_remove(name),
                };
                if removed.is_none() {
                    return Err(name_error(name));
                }
            }
            Stmt::Pass => {}
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, locals)?,
                    None => Arc::new(Value::None),
                };
                return Ok(Flow::Return(value));
            }
            Stmt::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond, locals)?.truthy() {
                        return self.exec_block(body, locals);
                    }
                }
                return self.exec_block(orelse, locals);
            }
            Stmt::While { cond, body } => {
                let mut iterations = 0u64;
                while self.eval(cond, locals)?.truthy() {
                    iterations += 1;
                    if iterations > self.max_loop_iterations {
                        return Err(UserError::new(
                            ErrorKind::Runtime,
                            format!(
                                "loop exceeded {} iterations",
                                self.max_loop_iterations
                            ),
                        ));
                    }
                    if let Flow::Return(value) = self.exec_block(body, locals)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Def { name, params, body } => {
                let function = Value::Function(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Arc::clone(body),
                });
                self.bind(name, Arc::new(function), locals);
            }
        }
        Ok(Flow::Normal)
    }

    fn bind(
        &mut self,
        name: &str,
        value: Ref,
        locals: &mut Option<Scope>,
    ) {
        trace!(name, "bind");
        match locals {
            Some(scope) => scope.insert(name.to_string(), value),
            None => self.globals.insert(name.to_string(), value),
        };
    }

    fn lookup(
        &self,
        name: &str,
        locals: &Option<Scope>,
    ) -> EvalResult<Ref> {
        locals
            .as_ref()
            .and_then(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
            .or_else(|| self.builtins.get(name))
            .cloned()
            .ok_or_else(|| name_error(name))
    }

    fn eval(
        &mut self,
        expr: &Expr,
        locals: &mut Option<Scope>,
    ) -> EvalResult<Ref> {
        if self.nesting >= MAX_EVAL_NESTING {
            return Err(UserError::new(
                ErrorKind::Recursion,
                "maximum recursion depth exceeded",
            ));
        }
        self.nesting += 1;
        let result = self.eval_expr(expr, locals);
        self.nesting -= 1;
        result
    }

    fn eval_expr(
        &mut self,
        expr: &Expr,
        locals: &mut Option<Scope>,
    ) -> EvalResult<Ref> {
        match expr {
            Expr::Literal(lit) => Ok(Arc::new(match lit {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Str(s) => Value::Str(s.clone()),
            })),
            Expr::Name(name) => self.lookup(name, locals),
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, locals)?;
                match (op, &*value) {
                    (UnOp::Not, v) => Ok(Arc::new(Value::Bool(!v.truthy()))),
                    (UnOp::Neg, Value::Int(n)) => n
                        .checked_neg()
                        .map(|n| Arc::new(Value::Int(n)))
                        .ok_or_else(overflow),
                    (UnOp::Neg, Value::Bool(b)) => Ok(Arc::new(Value::Int(-i64::from(*b)))),
                    (UnOp::Neg, v) => Err(UserError::new(
                        ErrorKind::Type,
                        format!("bad operand type for unary -: '{}'", v.type_name()),
                    )),
                }
            }
            Expr::And(left, right) => {
                let left = self.eval(left, locals)?;
                if !left.truthy() {
                    return Ok(left);
                }
                self.eval(right, locals)
            }
            Expr::Or(left, right) => {
                let left = self.eval(left, locals)?;
                if left.truthy() {
                    return Ok(left);
                }
                self.eval(right, locals)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, locals)?;
                let right = self.eval(right, locals)?;
                binary(*op, &left, &right).map(Arc::new)
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(callee, locals)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, locals)?);
                }
                self.call(&callee, values)
            }
        }
    }

    fn call(
        &mut self,
        callee: &Value,
        args: Vec<Ref>,
    ) -> EvalResult<Ref> {
        match callee {
            Value::Builtin(builtin) => self.call_builtin(*builtin, args),
            Value::Function(function) => {
                if args.len() != function.params.len() {
                    return Err(UserError::new(
                        ErrorKind::Type,
                        format!(
                            "{}() takes {} positional arguments but {} were given",
                            function.name,
                            function.params.len(),
                            args.len()
                        ),
                    ));
                }
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(UserError::new(
                        ErrorKind::Recursion,
                        "maximum recursion depth exceeded",
                    ));
                }

                let scope: Scope = function.params.iter().cloned().zip(args).collect();
                let mut locals = Some(scope);
                let body = Arc::clone(&function.body);

                self.depth += 1;
                let flow = self.exec_block(&body, &mut locals);
                self.depth -= 1;

                match flow? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Arc::new(Value::None)),
                }
            }
            other => Err(UserError::new(
                ErrorKind::Type,
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Ref>,
    ) -> EvalResult<Ref> {
        let single = |args: &[Ref]| -> EvalResult<Ref> {
            match args {
                [one] => Ok(Arc::clone(one)),
                _ => Err(UserError::new(
                    ErrorKind::Type,
                    format!(
                        "{}() takes exactly one argument ({} given)",
                        builtin.name(),
                        args.len()
                    ),
                )),
            }
        };

        let value = match builtin {
            Builtin::Print => {
                let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
                self.output.write(&line.join(" "));
                self.output.write("\n");
                Value::None
            }
            Builtin::Len => match &*single(&args)? {
                Value::Str(s) => Value::Int(s.chars().count() as i64),
                other => {
                    return Err(UserError::new(
                        ErrorKind::Type,
                        format!("object of type '{}' has no len()", other.type_name()),
                    ))
                }
            },
            Builtin::Str => Value::Str(single(&args)?.to_string()),
            Builtin::Repr => Value::Str(single(&args)?.repr()),
        };
        Ok(Arc::new(value))
    }
}

fn name_error(name: &str) -> UserError {
    UserError::new(ErrorKind::Name, format!("name '{}' is not defined", name))
}

fn overflow() -> UserError {
    UserError::new(ErrorKind::Runtime, "integer overflow")
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn binary(
    op: BinOp,
    left: &Value,
    right: &Value,
) -> EvalResult<Value> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(left.equals(right))),
        BinOp::Ne => return Ok(Value::Bool(!left.equals(right))),
        _ => {}
    }

    if let (Some(a), Some(b)) = (as_int(left), as_int(right)) {
        return int_binary(op, a, b);
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if as_int(n).is_some() => {
            let count = as_int(n).unwrap_or_default().max(0);
            let count = usize::try_from(count).unwrap_or(usize::MAX);
            match s.len().checked_mul(count) {
                Some(len) if len <= MAX_STRING_LEN => Ok(Value::Str(s.repeat(count))),
                _ => Err(UserError::new(
                    ErrorKind::Runtime,
                    "repeated string is too long",
                )),
            }
        }
        (BinOp::Lt, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Le, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a <= b)),
        (BinOp::Gt, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a > b)),
        (BinOp::Ge, Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a >= b)),
        _ => Err(UserError::new(
            ErrorKind::Type,
            format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

fn int_binary(
    op: BinOp,
    a: i64,
    b: i64,
) -> EvalResult<Value> {
    let zero_div = || UserError::new(ErrorKind::ZeroDivision, "integer division or modulo by zero");
    let int = |n: Option<i64>| n.map(Value::Int).ok_or_else(overflow);

    match op {
        BinOp::Add => int(a.checked_add(b)),
        BinOp::Sub => int(a.checked_sub(b)),
        BinOp::Mul => int(a.checked_mul(b)),
        BinOp::FloorDiv | BinOp::Mod => {
            if b == 0 {
                return Err(zero_div());
            }
            let mut q = a.checked_div(b).ok_or_else(overflow)?;
            if (a % b != 0) && ((a < 0) != (b < 0)) {
                q -= 1;
            }
            if op == BinOp::FloorDiv {
                Ok(Value::Int(q))
            } else {
                int(b.checked_mul(q).and_then(|p| a.checked_sub(p)))
            }
        }
        BinOp::Lt => Ok(Value::Bool(a < b)),
        BinOp::Le => Ok(Value::Bool(a <= b)),
        BinOp::Gt => Ok(Value::Bool(a > b)),
        BinOp::Ge => Ok(Value::Bool(a >= b)),
        BinOp::Eq => Ok(Value::Bool(a == b)),
        BinOp::Ne => Ok(Value::Bool(a != b)),
    }
}

impl Engine for Interpreter {
    type Value = Value;

    fn execute(
        &mut self,
        source: &str,
    ) -> Result<Execution<Value>, ExecError> {
        let value = self.run(source)?;
        Ok(Execution { value })
    }

    fn represent(
        &self,
        value: &Value,
    ) -> String {
        value.repr()
    }

    fn environment(&self) -> Snapshot<Value> {
        self.globals
            .iter()
            .map(|(name, value)| (name.clone(), Arc::clone(value)))
            .collect()
    }

    fn is_callable(
        &self,
        value: &Value,
    ) -> bool {
        value.is_callable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::sink::Transcript;

    fn interp() -> (Interpreter, Transcript) {
        let transcript = Transcript::new();
        (Interpreter::new(Arc::new(transcript.clone())), transcript)
    }

    fn eval(
        interp: &mut Interpreter,
        source: &str,
    ) -> Option<String> {
        interp.run(source).unwrap().map(|v| v.repr())
    }

    #[test]
    fn test_arithmetic() {
        let (mut it, _) = interp();
        assert_eq!(eval(&mut it, "1 + 2 * 3").as_deref(), Some("7"));
        assert_eq!(eval(&mut it, "-7 // 2").as_deref(), Some("-4"));
        assert_eq!(eval(&mut it, "-7 % 2").as_deref(), Some("1"));
        assert_eq!(eval(&mut it, "'ab' * 2").as_deref(), Some("'abab'"));
        assert_eq!(eval(&mut it, "1 < 2 and 'x'").as_deref(), Some("'x'"));
        assert_eq!(eval(&mut it, "not 0").as_deref(), Some("True"));
    }

    #[test]
    fn test_last_expression_only() {
        let (mut it, _) = interp();
        assert_eq!(eval(&mut it, "x = 5"), None);
        assert_eq!(eval(&mut it, "x; x + 1").as_deref(), Some("6"));
        assert_eq!(eval(&mut it, "None"), None);
    }

    #[test]
    fn test_functions_and_print() {
        let (mut it, transcript) = interp();
        it.run("def add(a, b):\n    return a + b").unwrap();
        assert_eq!(eval(&mut it, "add(2, 3)").as_deref(), Some("5"));
        it.run("print('sum', add(1, 1))").unwrap();
        assert_eq!(transcript.text(), "sum 2\n");

        let err = it.run("add(1)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_while_and_if() {
        let (mut it, _) = interp();
        it.run("n = 0\ntotal = 0\nwhile n < 5:\n    n = n + 1\n    if n % 2 == 0:\n        total = total + n\n    elif n == 5:\n        total = total + 100")
            .unwrap();
        assert_eq!(eval(&mut it, "total").as_deref(), Some("106"));
    }

    #[test]
    fn test_errors() {
        let (mut it, _) = interp();
        assert_eq!(
            it.run("y").unwrap_err().to_string(),
            "NameError: name 'y' is not defined"
        );
        assert_eq!(it.run("1 // 0").unwrap_err().kind, ErrorKind::ZeroDivision);
        assert_eq!(it.run("1 + 'a'").unwrap_err().kind, ErrorKind::Type);
        assert_eq!(it.run("x = ").unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(it.run("return 1").unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(
            it.run("def f():\n    return f()\nf()").unwrap_err().kind,
            ErrorKind::Recursion
        );
    }

    #[test]
    fn test_string_repeat_limit() {
        let (mut it, _) = interp();
        let err = it.run("'ab' * 9223372036854775807").unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError: repeated string is too long");
        assert_eq!(eval(&mut it, "'ab' * -3").as_deref(), Some("''"));
        assert_eq!(eval(&mut it, "len('xyz' * 1000)").as_deref(), Some("3000"));
    }

    #[test]
    fn test_deep_input_is_a_syntax_error() {
        let (mut it, _) = interp();
        let parens = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(it.run(&parens).unwrap_err().kind, ErrorKind::Syntax);
        let chain = vec!["1"; 200_000].join(" + ");
        assert_eq!(it.run(&chain).unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(
            it.run(&format!("{}True", "not ".repeat(200_000)))
                .unwrap_err()
                .kind,
            ErrorKind::Syntax
        );
    }

    #[test]
    fn test_nested_evaluation_across_calls_is_bounded() {
        let (mut it, _) = interp();
        let body = format!("{}f(n){}", "-(".repeat(20), ")".repeat(20));
        it.run(&format!("def f(n):\n    return {}", body)).unwrap();
        assert_eq!(it.run("f(1)").unwrap_err().kind, ErrorKind::Recursion);
        assert_eq!(eval(&mut it, "1 + 1").as_deref(), Some("2"));
    }

    #[test]
    fn test_input_is_not_a_builtin() {
        let (mut it, _) = interp();
        assert_eq!(it.run("input()").unwrap_err().kind, ErrorKind::Name);
    }

    #[test]
    fn test_loop_guard() {
        let (it, _) = interp();
        let mut it = it.with_max_loop_iterations(10);
        assert_eq!(it.run("while True: pass").unwrap_err().kind, ErrorKind::Runtime);
    }

    #[test]
    fn test_identity_shared_on_alias() {
        let (mut it, _) = interp();
        it.run("x = 'v'; y = x").unwrap();
        assert!(Arc::ptr_eq(it.global("x").unwrap(), it.global("y").unwrap()));
    }

    #[test]
    fn test_environment_excludes_builtins() {
        let (mut it, _) = interp();
        it.run("def f(): pass").unwrap();
        let env = it.environment();
        assert_eq!(env.names().collect::<Vec<_>>(), vec!["f"]);
        assert!(it.is_callable(env.get("f").unwrap()));
    }
}
