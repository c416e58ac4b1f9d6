//! Arithmetic bounds resolution.
//!
//! Template bounds may reference named constants (`SLIDE_WIDTH`,
//! template parameters) and the resolved geometry of other containers
//! (`title.height`, `content.left`). Containers are resolved in
//! dependency order; a reference cycle is a fatal error.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::template::{
    BoundsSpec, Container, DimensionSpec, ExprValue, PositionSpec,
};

use super::error::{LayoutError, LayoutResult};
use super::types::Bounds;

static CONTAINER_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\.(width|height|left|top)").unwrap());

/// Everything an expression may name.
pub struct ExprContext<'a> {
    pub constants: &'a BTreeMap<String, f64>,
    pub resolved: &'a BTreeMap<String, Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Ref(String, Field),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Width,
    Height,
    Left,
    Top,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let text = &expr[start..i];
                let number = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number \"{text}\""))?;
                tokens.push(Token::Number(number));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
                {
                    i += 1;
                }
                let name = expr[start..i].to_string();
                if i < bytes.len() && bytes[i] as char == '.' {
                    let field_start = i + 1;
                    let mut j = field_start;
                    while j < bytes.len() && (bytes[j] as char).is_ascii_alphabetic() {
                        j += 1;
                    }
                    let field = match &expr[field_start..j] {
                        "width" => Field::Width,
                        "height" => Field::Height,
                        "left" => Field::Left,
                        "top" => Field::Top,
                        other => return Err(format!("unknown field \"{other}\" on \"{name}\"")),
                    };
                    tokens.push(Token::Ref(name, field));
                    i = j;
                } else {
                    tokens.push(Token::Ident(name));
                }
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ctx: &'a ExprContext<'a>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err("unbalanced parenthesis".to_string()),
                }
            }
            Some(Token::Ident(name)) => self
                .ctx
                .constants
                .get(&name)
                .copied()
                .ok_or_else(|| format!("unknown identifier \"{name}\"")),
            Some(Token::Ref(name, field)) => {
                let bounds = self
                    .ctx
                    .resolved
                    .get(&name)
                    .ok_or_else(|| format!("unresolved container \"{name}\""))?;
                Ok(match field {
                    Field::Width => bounds.width as f64,
                    Field::Height => bounds.height as f64,
                    Field::Left => bounds.left as f64,
                    Field::Top => bounds.top as f64,
                })
            }
            other => Err(match other {
                Some(token) => format!("unexpected token {token:?}"),
                None => "unexpected end of expression".to_string(),
            }),
        }
    }
}

/// Evaluate one arithmetic expression.
pub fn evaluate(expr: &str, ctx: &ExprContext<'_>) -> LayoutResult<f64> {
    let tokens =
        tokenize(expr).map_err(|reason| LayoutError::expression(expr, reason))?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        ctx,
    };
    let value = parser
        .expr()
        .map_err(|reason| LayoutError::expression(expr, reason))?;
    if parser.pos != tokens.len() {
        return Err(LayoutError::expression(expr, "trailing input"));
    }
    Ok(value)
}

fn eval_operand(operand: &ExprValue, ctx: &ExprContext<'_>) -> LayoutResult<f64> {
    match operand {
        ExprValue::Number(n) => Ok(*n),
        ExprValue::Text(text) => evaluate(text, ctx),
    }
}

/// Resolve a width or height. `fill` takes the parent extent; `min` is
/// applied before `max`.
pub fn resolve_dimension(
    spec: &DimensionSpec,
    ctx: &ExprContext<'_>,
    parent_extent: f64,
) -> LayoutResult<f64> {
    match spec {
        DimensionSpec::Literal(v) => Ok(*v),
        DimensionSpec::Expr(e) => {
            let mut value = match &e.expr {
                ExprValue::Number(n) => *n,
                ExprValue::Text(text) if text == "fill" => parent_extent,
                ExprValue::Text(text) => evaluate(text, ctx)?,
            };
            if let Some(min) = &e.min {
                value = value.max(eval_operand(min, ctx)?);
            }
            if let Some(max) = &e.max {
                value = value.min(eval_operand(max, ctx)?);
            }
            Ok(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Resolve a left or top coordinate. Keywords place the container
/// inside its parent; `after`/`before` chain off `relativeTo`.
pub fn resolve_position(
    spec: Option<&PositionSpec>,
    ctx: &ExprContext<'_>,
    axis: Axis,
    own_extent: f64,
    parent: Bounds,
) -> LayoutResult<f64> {
    let Some(spec) = spec else {
        return Ok(0.0);
    };
    let (parent_start, parent_extent) = match axis {
        Axis::Horizontal => (parent.left as f64, parent.width as f64),
        Axis::Vertical => (parent.top as f64, parent.height as f64),
    };
    match spec {
        PositionSpec::Literal(v) => Ok(*v),
        PositionSpec::Expr(e) => {
            let base = match e.expr.as_str() {
                "center" => parent_start + (parent_extent - own_extent) / 2.0,
                "start" => parent_start,
                "end" => parent_start + parent_extent - own_extent,
                "after" | "before" => {
                    let relative_id = e.relative_to.as_deref().ok_or_else(|| {
                        LayoutError::expression(
                            &e.expr,
                            "positioning keyword requires relativeTo",
                        )
                    })?;
                    let relative = ctx
                        .resolved
                        .get(relative_id)
                        .ok_or_else(|| LayoutError::MissingContainer(relative_id.to_string()))?;
                    let (rel_start, rel_extent) = match axis {
                        Axis::Horizontal => (relative.left as f64, relative.width as f64),
                        Axis::Vertical => (relative.top as f64, relative.height as f64),
                    };
                    if e.expr == "after" {
                        rel_start + rel_extent
                    } else {
                        rel_start - own_extent
                    }
                }
                text => evaluate(text, ctx)?,
            };
            Ok(base + e.offset)
        }
    }
}

/// Resolve a full bounds spec: dimensions first so position keywords
/// can center against a known size.
pub fn resolve_bounds(
    spec: &BoundsSpec,
    ctx: &ExprContext<'_>,
    parent: Bounds,
) -> LayoutResult<Bounds> {
    let width = match &spec.width {
        Some(w) => resolve_dimension(w, ctx, parent.width as f64)?,
        None => {
            return Err(LayoutError::expression("width", "dimension is required"));
        }
    };
    let height = match &spec.height {
        Some(h) => resolve_dimension(h, ctx, parent.height as f64)?,
        None => {
            return Err(LayoutError::expression("height", "dimension is required"));
        }
    };
    let left = resolve_position(spec.left.as_ref(), ctx, Axis::Horizontal, width, parent)?;
    let top = resolve_position(spec.top.as_ref(), ctx, Axis::Vertical, height, parent)?;
    Ok(Bounds::new(left as f32, top as f32, width as f32, height as f32))
}

fn refs_in(text: &str, deps: &mut BTreeSet<String>) {
    for caps in CONTAINER_REF.captures_iter(text) {
        deps.insert(caps[1].to_string());
    }
}

fn operand_refs(operand: &ExprValue, deps: &mut BTreeSet<String>) {
    if let ExprValue::Text(text) = operand {
        refs_in(text, deps);
    }
}

/// Container ids a bounds spec depends on.
pub fn dependencies(spec: &BoundsSpec) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    for dim in [&spec.width, &spec.height].into_iter().flatten() {
        if let DimensionSpec::Expr(e) = dim {
            operand_refs(&e.expr, &mut deps);
            if let Some(min) = &e.min {
                operand_refs(min, &mut deps);
            }
            if let Some(max) = &e.max {
                operand_refs(max, &mut deps);
            }
        }
    }
    for pos in [&spec.left, &spec.top].into_iter().flatten() {
        if let PositionSpec::Expr(e) = pos {
            refs_in(&e.expr, &mut deps);
            if let Some(relative) = &e.relative_to {
                deps.insert(relative.clone());
            }
        }
    }
    deps
}

fn visit(
    id: &str,
    deps: &BTreeMap<String, BTreeSet<String>>,
    visiting: &mut BTreeSet<String>,
    visited: &mut BTreeSet<String>,
    order: &mut Vec<String>,
) -> LayoutResult<()> {
    if visited.contains(id) {
        return Ok(());
    }
    if !visiting.insert(id.to_string()) {
        return Err(LayoutError::CircularDependency(id.to_string()));
    }
    if let Some(targets) = deps.get(id) {
        for target in targets {
            // Only expression-bound containers participate; literal and
            // positioned containers resolve elsewhere.
            if deps.contains_key(target) {
                visit(target, deps, visiting, visited, order)?;
            }
        }
    }
    visiting.remove(id);
    visited.insert(id.to_string());
    order.push(id.to_string());
    Ok(())
}

/// Resolve every container that declares `bounds`, in dependency order.
/// Containers relying purely on `positioning` are skipped here; they
/// resolve after every expression, so expressions cannot reference
/// them and such a reference is rejected by name.
pub fn resolve_template_bounds(
    containers: &BTreeMap<String, Container>,
    constants: &BTreeMap<String, f64>,
    parent: Bounds,
) -> LayoutResult<BTreeMap<String, Bounds>> {
    let mut resolved: BTreeMap<String, Bounds> = BTreeMap::new();
    let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (id, container) in containers {
        if let Some(spec) = &container.bounds {
            deps.insert(id.clone(), dependencies(spec));
        }
    }

    let mut order = Vec::new();
    let mut visiting = BTreeSet::new();
    let mut visited = BTreeSet::new();
    for id in deps.keys() {
        visit(id, &deps, &mut visiting, &mut visited, &mut order)?;
    }

    for id in &order {
        let container = containers
            .get(id)
            .ok_or_else(|| LayoutError::MissingContainer(id.clone()))?;
        let spec = container
            .bounds
            .as_ref()
            .ok_or_else(|| LayoutError::MissingGeometry(id.clone()))?;
        for dep in deps.get(id).into_iter().flatten() {
            if resolved.contains_key(dep) {
                continue;
            }
            if !containers.contains_key(dep) {
                return Err(LayoutError::MissingContainer(dep.clone()));
            }
            // Known container without expression bounds, so it uses
            // relative positioning and resolves after this pass.
            return Err(LayoutError::expression(
                format!("{id}.bounds"),
                format!(
                    "container \"{dep}\" uses relative positioning; \
                     only expression-bound containers can be referenced"
                ),
            ));
        }
        let ctx = ExprContext {
            constants,
            resolved: &resolved,
        };
        let bounds = resolve_bounds(spec, &ctx, parent)?;
        resolved.insert(id.clone(), bounds);
    }
    Ok(resolved)
}
