//! Template parsing and rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::context::Context;
use crate::error::{TemplateError, TemplateResult};
use crate::expr::{BinaryOp, Expr, Filter, Method, Test};
use crate::parser::{self, Node};
use crate::syntax::{self, WhitespaceOptions};
use crate::value::Value;

/// What to do when a template emits a variable the context lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedPolicy {
    /// Fail with [`TemplateError::UndefinedVariable`].
    #[default]
    Strict,
    /// Emit an empty string.
    Lenient,
}

/// Options applied when a template is parsed and rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateOptions {
    pub undefined: UndefinedPolicy,
    pub whitespace: WhitespaceOptions,
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lenient(mut self) -> Self {
        self.undefined = UndefinedPolicy::Lenient;
        self
    }

    /// Set both `trim_blocks` and `lstrip_blocks`.
    pub fn trim_spaces(mut self, trim: bool) -> Self {
        self.whitespace.trim_blocks = trim;
        self.whitespace.lstrip_blocks = trim;
        self
    }

    pub fn keep_trailing_newline(mut self, keep: bool) -> Self {
        self.whitespace.keep_trailing_newline = keep;
        self
    }
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
    options: TemplateOptions,
}

impl Template {
    /// Parse a template. Syntax errors surface here, never at render time.
    pub fn parse(
        name: impl Into<String>,
        source: &str,
        options: TemplateOptions,
    ) -> TemplateResult<Self> {
        let name = name.into();
        let segments = syntax::tokenize(&name, source, options.whitespace)?;
        let nodes = parser::parse(&name, segments)?;
        debug!("Parsed template {} ({} top-level nodes)", name, nodes.len());
        Ok(Self {
            name,
            nodes,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> TemplateOptions {
        self.options
    }

    /// Render with the template's own undefined policy.
    pub fn render(&self, context: &Context) -> TemplateResult<String> {
        self.render_with(context, self.options.undefined)
    }

    /// Render with an explicit undefined policy.
    pub fn render_with(&self, context: &Context, policy: UndefinedPolicy) -> TemplateResult<String> {
        let mut state = RenderState {
            template: &self.name,
            policy,
            context,
            frames: Vec::new(),
            line: 1,
        };
        let mut out = String::new();
        state.nodes(&self.nodes, &mut out)?;
        Ok(out)
    }
}

struct RenderState<'a> {
    template: &'a str,
    policy: UndefinedPolicy,
    context: &'a Context,
    frames: Vec<BTreeMap<String, Value>>,
    line: usize,
}

impl RenderState<'_> {
    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Render {
            template: self.template.to_string(),
            line: self.line,
            message: message.into(),
        }
    }

    fn undefined(&self, name: &str) -> TemplateError {
        TemplateError::UndefinedVariable {
            template: self.template.to_string(),
            line: self.line,
            name: name.to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Value {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return value.clone();
            }
        }
        self.context.get(name).cloned().unwrap_or(Value::Undefined)
    }

    fn assign(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), value);
            }
            None => {
                self.frames.push(BTreeMap::from([(name.to_string(), value)]));
            }
        }
    }

    /// Display a value, applying the undefined policy.
    fn display(&self, value: &Value, source: &str) -> TemplateResult<String> {
        match (value, self.policy) {
            (Value::Undefined, UndefinedPolicy::Strict) => Err(self.undefined(source)),
            _ => Ok(value.to_string()),
        }
    }

    fn nodes(&mut self, nodes: &[Node], out: &mut String) -> TemplateResult<()> {
        for node in nodes {
            self.node(node, out)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node, out: &mut String) -> TemplateResult<()> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Emit { expr, source, line } => {
                self.line = *line;
                let value = self.eval(expr)?;
                let text = self.display(&value, source)?;
                out.push_str(&text);
            }
            Node::If {
                branches,
                otherwise,
                line,
            } => {
                for (cond, body) in branches {
                    self.line = *line;
                    if self.eval(cond)?.is_truthy() {
                        return self.nodes(body, out);
                    }
                }
                self.nodes(otherwise, out)?;
            }
            Node::For {
                targets,
                iter,
                body,
                otherwise,
                line,
            } => {
                self.line = *line;
                let items = self.iterate(iter)?;
                if items.is_empty() {
                    return self.nodes(otherwise, out);
                }
                let length = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    let mut frame = BTreeMap::new();
                    self.line = *line;
                    self.bind(targets, item, &mut frame)?;
                    frame.insert("loop".to_string(), loop_value(index, length));
                    self.frames.push(frame);
                    let result = self.nodes(body, out);
                    self.frames.pop();
                    result?;
                }
            }
            Node::Set { name, expr, line } => {
                self.line = *line;
                let value = self.eval(expr)?;
                self.assign(name, value);
            }
        }
        Ok(())
    }

    fn iterate(&self, iter: &Expr) -> TemplateResult<Vec<Value>> {
        match self.eval(iter)? {
            Value::Seq(items) => Ok(items),
            Value::Map(map) => Ok(map.into_keys().map(Value::Str).collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Null => Ok(Vec::new()),
            Value::Undefined => match self.policy {
                UndefinedPolicy::Strict => Err(self.undefined(&describe_expr(iter))),
                UndefinedPolicy::Lenient => Ok(Vec::new()),
            },
            other => Err(self.error(format!("cannot iterate over {}", other.type_name()))),
        }
    }

    fn bind(
        &self,
        targets: &[String],
        item: Value,
        frame: &mut BTreeMap<String, Value>,
    ) -> TemplateResult<()> {
        if let [single] = targets {
            frame.insert(single.clone(), item);
            return Ok(());
        }
        match item {
            Value::Seq(parts) if parts.len() == targets.len() => {
                for (target, part) in targets.iter().zip(parts) {
                    frame.insert(target.clone(), part);
                }
                Ok(())
            }
            other => Err(self.error(format!(
                "cannot unpack {} into {} loop variables",
                other.type_name(),
                targets.len()
            ))),
        }
    }

    fn eval(&self, expr: &Expr) -> TemplateResult<Value> {
        Ok(match expr {
            Expr::Literal(value) => value.clone(),
            Expr::List(items) => Value::Seq(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<TemplateResult<_>>()?,
            ),
            Expr::Var(name) => self.lookup(name),
            Expr::Attr(target, name) => self.eval(target)?.get(name),
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                index_value(&target, &index)
            }
            Expr::Call(target, method) => match self.eval(target)? {
                Value::Map(map) => match method {
                    Method::Keys => Value::Seq(map.into_keys().map(Value::Str).collect()),
                    Method::Values => Value::Seq(map.into_values().collect()),
                    Method::Items => Value::Seq(
                        map.into_iter()
                            .map(|(k, v)| Value::Seq(vec![Value::Str(k), v]))
                            .collect(),
                    ),
                },
                Value::Undefined => Value::Undefined,
                other => {
                    return Err(self.error(format!("{} has no {:?} method", other.type_name(), method)))
                }
            },
            Expr::Not(inner) => Value::Bool(!self.eval(inner)?.is_truthy()),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(i) => Value::Int(i.checked_neg().ok_or_else(|| self.error("integer overflow"))?),
                Value::Float(f) => Value::Float(-f),
                other => return Err(self.error(format!("cannot negate {}", other.type_name()))),
            },
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs)?,
            Expr::Test {
                expr,
                test,
                negated,
            } => {
                let value = self.eval(expr)?;
                let result = match test {
                    Test::Defined => value.is_defined(),
                    Test::Undefined => !value.is_defined(),
                    Test::None => value == Value::Null,
                    Test::String => matches!(value, Value::Str(_)),
                    Test::Number => matches!(value, Value::Int(_) | Value::Float(_)),
                    Test::Sequence => matches!(value, Value::Seq(_)),
                    Test::Mapping => matches!(value, Value::Map(_)),
                };
                Value::Bool(result != *negated)
            }
            Expr::Filter { expr, filter, args } => {
                let value = self.eval(expr)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<TemplateResult<Vec<_>>>()?;
                self.filter(*filter, value, &args, expr)?
            }
        })
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> TemplateResult<Value> {
        match op {
            BinaryOp::Or => {
                let left = self.eval(lhs)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                return self.eval(rhs);
            }
            BinaryOp::And => {
                let left = self.eval(lhs)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                return self.eval(rhs);
            }
            _ => {}
        }

        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;
        Ok(match op {
            BinaryOp::Eq => Value::Bool(values_equal(&left, &right)),
            BinaryOp::Ne => Value::Bool(!values_equal(&left, &right)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = compare(&left, &right).ok_or_else(|| {
                    self.error(format!(
                        "cannot compare {} with {}",
                        left.type_name(),
                        right.type_name()
                    ))
                })?;
                Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }
            BinaryOp::In | BinaryOp::NotIn => {
                let found = match &right {
                    Value::Seq(items) => items.iter().any(|item| values_equal(item, &left)),
                    Value::Map(map) => left.as_str().is_some_and(|k| map.contains_key(k)),
                    Value::Str(s) => match &left {
                        Value::Undefined => match self.policy {
                            UndefinedPolicy::Strict => return Err(self.undefined(&describe_expr(lhs))),
                            UndefinedPolicy::Lenient => false,
                        },
                        Value::Null => false,
                        other => s.contains(&other.to_string()),
                    },
                    Value::Undefined | Value::Null => false,
                    other => {
                        return Err(self.error(format!("'in' is not supported for {}", other.type_name())))
                    }
                };
                Value::Bool(found == (op == BinaryOp::In))
            }
            BinaryOp::Concat => {
                let mut s = self.display(&left, &describe_expr(lhs))?;
                let _ = write!(s, "{}", self.display(&right, &describe_expr(rhs))?);
                Value::Str(s)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => self.arithmetic(op, left, right)?,
            BinaryOp::Or | BinaryOp::And => unreachable!("short-circuit operators handled above"),
        })
    }

    fn arithmetic(&self, op: BinaryOp, left: Value, right: Value) -> TemplateResult<Value> {
        match (op, &left, &right) {
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (BinaryOp::Add, Value::Seq(a), Value::Seq(b)) => {
                Ok(Value::Seq(a.iter().chain(b.iter()).cloned().collect()))
            }
            (_, Value::Int(a), Value::Int(b)) => {
                let result = match op {
                    BinaryOp::Add => a.checked_add(*b),
                    BinaryOp::Sub => a.checked_sub(*b),
                    _ => a.checked_mul(*b),
                };
                result
                    .map(Value::Int)
                    .ok_or_else(|| self.error("integer overflow"))
            }
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    _ => a * b,
                })),
                _ => Err(self.error(format!(
                    "unsupported operand types {} and {}",
                    left.type_name(),
                    right.type_name()
                ))),
            },
        }
    }

    fn filter(&self, filter: Filter, value: Value, args: &[Value], source: &Expr) -> TemplateResult<Value> {
        if filter == Filter::Default {
            let fallback = args.first().cloned().unwrap_or_else(|| Value::Str(String::new()));
            let on_falsy = args.get(1).is_some_and(Value::is_truthy);
            let replace = !value.is_defined() || (on_falsy && !value.is_truthy());
            return Ok(if replace { fallback } else { value });
        }
        if !value.is_defined() {
            return match self.policy {
                UndefinedPolicy::Strict => Err(self.undefined(&describe_expr(source))),
                UndefinedPolicy::Lenient => Ok(Value::Undefined),
            };
        }

        Ok(match filter {
            Filter::Join => {
                let sep = args.first().map(|s| s.to_string()).unwrap_or_default();
                match value {
                    Value::Seq(items) => Value::Str(
                        items.iter().map(|item| item.to_string()).collect::<Vec<_>>().join(&sep),
                    ),
                    other => Value::Str(other.to_string()),
                }
            }
            Filter::Length => match value.len() {
                Some(n) => Value::Int(n as i64),
                None => return Err(self.error(format!("{} has no length", value.type_name()))),
            },
            Filter::Lower => Value::Str(value.to_string().to_lowercase()),
            Filter::Upper => Value::Str(value.to_string().to_uppercase()),
            Filter::Trim => Value::Str(value.to_string().trim().to_string()),
            Filter::ToJson => Value::Str(value.to_json().to_string()),
            Filter::String => Value::Str(value.to_string()),
            Filter::Int => Value::Int(match &value {
                Value::Int(i) => *i,
                Value::Float(f) => f.trunc() as i64,
                Value::Bool(b) => i64::from(*b),
                Value::Str(s) => s.trim().parse::<i64>().unwrap_or(0),
                _ => 0,
            }),
            Filter::Default => unreachable!("default handled above"),
        })
    }
}

fn loop_value(index: usize, length: usize) -> Value {
    let mut map = BTreeMap::new();
    map.insert("index".to_string(), Value::Int(index as i64 + 1));
    map.insert("index0".to_string(), Value::Int(index as i64));
    map.insert("revindex".to_string(), Value::Int((length - index) as i64));
    map.insert("first".to_string(), Value::Bool(index == 0));
    map.insert("last".to_string(), Value::Bool(index + 1 == length));
    map.insert("length".to_string(), Value::Int(length as i64));
    Value::Map(map)
}

fn index_value(target: &Value, index: &Value) -> Value {
    match (target, index) {
        (Value::Map(map), Value::Str(key)) => map.get(key).cloned().unwrap_or(Value::Undefined),
        (Value::Map(map), Value::Int(i)) => map.get(&i.to_string()).cloned().unwrap_or(Value::Undefined),
        (Value::Seq(items), Value::Int(i)) => {
            let idx = if *i < 0 { items.len() as i64 + i } else { *i };
            usize::try_from(idx)
                .ok()
                .and_then(|idx| items.get(idx))
                .cloned()
                .unwrap_or(Value::Undefined)
        }
        _ => Value::Undefined,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Short rendering of an expression for error messages.
fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Var(name) => name.clone(),
        Expr::Attr(target, name) => format!("{}.{}", describe_expr(target), name),
        Expr::Index(target, index) => match index.as_ref() {
            Expr::Literal(Value::Str(key)) => format!("{}['{}']", describe_expr(target), key),
            Expr::Literal(value) => format!("{}[{}]", describe_expr(target), value),
            _ => format!("{}[...]", describe_expr(target)),
        },
        Expr::Filter { expr, .. } | Expr::Test { expr, .. } => describe_expr(expr),
        _ => "expression".to_string(),
    }
}
