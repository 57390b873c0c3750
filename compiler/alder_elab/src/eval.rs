//! Constant evaluation.
//!
//! A tree walk over bound expressions. The [`EvalContext`] carries a
//! frame stack for function evaluation, a step counter bounding total
//! work, and a silence flag for probing callers. Failure is the
//! sticky [`ConstantValue::Bad`] sentinel: once produced, it
//! propagates without further diagnostics until evaluation unwinds.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use alder_diagnostic::{DiagCode, Diagnostic};
use alder_num::{ConstantRange, ConstantValue, Logic, SvInt};
use alder_source::SourceRange;
use alder_syntax::{Name, SyntaxKind};

use crate::bind::{BinaryOp, BindContext, ExprKind, RangeSelectKind, UnaryOp};
use crate::symbol::{ExprId, SymbolId, SymbolKind, SyntaxRef};
use crate::types::Type;
use crate::Compilation;

/// Bound on total evaluation steps, catching runaway recursion.
const STEP_LIMIT: u32 = 100_000;

/// Per-evaluation state.
pub struct EvalContext {
    steps: Cell<u32>,
    limit_reported: Cell<bool>,
    silent: bool,
    /// Local bindings for function evaluation, innermost last.
    frames: RefCell<Vec<FxHashMap<SymbolId, ConstantValue>>>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            steps: Cell::new(0),
            limit_reported: Cell::new(false),
            silent: false,
            frames: RefCell::new(Vec::new()),
        }
    }

    /// A context that emits no diagnostics; used by width probes.
    pub fn silent() -> Self {
        EvalContext {
            silent: true,
            ..Self::new()
        }
    }

    pub fn push_frame(&self, locals: FxHashMap<SymbolId, ConstantValue>) {
        self.frames.borrow_mut().push(locals);
    }

    pub fn pop_frame(&self) {
        self.frames.borrow_mut().pop();
    }

    fn lookup_local(&self, symbol: SymbolId) -> Option<ConstantValue> {
        for frame in self.frames.borrow().iter().rev() {
            if let Some(value) = frame.get(&symbol) {
                return Some(value.clone());
            }
        }
        None
    }

    /// Count a step; false once the limit is reached.
    fn step(&self, comp: &Compilation, range: SourceRange) -> bool {
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        if steps > STEP_LIMIT {
            if !self.silent && !self.limit_reported.replace(true) {
                comp.diagnostics()
                    .add(Diagnostic::new(DiagCode::ConstEvalExceededLimit, range));
            }
            false
        } else {
            true
        }
    }

    fn diag(&self, comp: &Compilation, code: DiagCode, range: SourceRange) {
        if !self.silent {
            comp.diagnostics().add(Diagnostic::new(code, range));
        }
    }
}

fn logic_bit(l: Logic) -> ConstantValue {
    ConstantValue::Integer(SvInt::filled(l, 1, false))
}

/// Evaluate a bound expression to a constant.
pub fn eval(comp: &Compilation, expr: ExprId, ctx: &EvalContext) -> ConstantValue {
    let e = comp.expr(expr);
    if !ctx.step(comp, e.range) {
        return ConstantValue::Bad;
    }
    if let Some(constant) = &e.constant {
        return constant.clone();
    }

    match &e.kind {
        ExprKind::Invalid => ConstantValue::Bad,
        ExprKind::IntegerLiteral(v) => ConstantValue::Integer(v.clone()),
        ExprKind::RealLiteral(v) | ExprKind::TimeLiteral(v) => ConstantValue::Real(*v),
        ExprKind::StringLiteral(name) => {
            ConstantValue::Str(comp.interner().get(*name).into())
        }
        ExprKind::UnbasedUnsizedLiteral(bit) => logic_bit(*bit),
        ExprKind::DataType(_) => ConstantValue::Bad,
        ExprKind::NamedValue(symbol) => eval_named(comp, *symbol, e.range, ctx),
        ExprKind::Unary(op, operand) => {
            let value = eval(comp, *operand, ctx);
            if value.is_bad() {
                return ConstantValue::Bad;
            }
            eval_unary(*op, value)
        }
        ExprKind::Binary(op, lhs, rhs) => {
            let lv = eval(comp, *lhs, ctx);
            let rv = eval(comp, *rhs, ctx);
            if lv.is_bad() || rv.is_bad() {
                return ConstantValue::Bad;
            }
            eval_binary(*op, lv, rv)
        }
        ExprKind::Conditional {
            cond,
            if_true,
            if_false,
        } => {
            let c = eval(comp, *cond, ctx);
            if c.is_bad() {
                return ConstantValue::Bad;
            }
            match c.to_logic() {
                Logic::One => eval(comp, *if_true, ctx),
                Logic::Zero => eval(comp, *if_false, ctx),
                _ => {
                    // Unknown selector: merge the branches bitwise,
                    // X where they disagree.
                    let t = eval(comp, *if_true, ctx);
                    let f = eval(comp, *if_false, ctx);
                    match (t, f) {
                        (ConstantValue::Integer(a), ConstantValue::Integer(b)) => {
                            let width = a.width().max(b.width());
                            let a = a.resize(width);
                            let b = b.resize(width);
                            let mut merged = SvInt::zero(width);
                            for i in 0..width {
                                let bit = if a.get_bit(i) == b.get_bit(i) {
                                    a.get_bit(i)
                                } else {
                                    Logic::X
                                };
                                merged = merged.with_bit(i, bit);
                            }
                            ConstantValue::Integer(merged)
                        }
                        _ => ConstantValue::Bad,
                    }
                }
            }
        }
        ExprKind::Concat(parts) => {
            let mut values = Vec::with_capacity(parts.len());
            for &part in parts {
                match eval(comp, part, ctx) {
                    ConstantValue::Integer(v) => values.push(v),
                    _ => return ConstantValue::Bad,
                }
            }
            ConstantValue::Integer(SvInt::concat(&values))
        }
        ExprKind::Replication { count, elements } => {
            let n = match eval(comp, *count, ctx) {
                ConstantValue::Integer(v) => match v.as_u32() {
                    Some(n) => n,
                    None => return ConstantValue::Bad,
                },
                _ => return ConstantValue::Bad,
            };
            let mut values = Vec::with_capacity(elements.len());
            for &part in elements {
                match eval(comp, part, ctx) {
                    ConstantValue::Integer(v) => values.push(v),
                    _ => return ConstantValue::Bad,
                }
            }
            ConstantValue::Integer(SvInt::concat(&values).replicate(n))
        }
        ExprKind::ElementSelect { value, index } => {
            let base_ty = comp.expr(*value).ty;
            let v = eval(comp, *value, ctx);
            let i = eval(comp, *index, ctx);
            let (ConstantValue::Integer(v), ConstantValue::Integer(i)) = (v, i) else {
                return ConstantValue::Bad;
            };
            let elem_width = element_width(comp, base_ty);
            let Some(index) = i.as_i32() else {
                return ConstantValue::Integer(SvInt::all_x(elem_width));
            };
            let pos = translate_select_index(comp, base_ty, index);
            match pos {
                Some(pos) => ConstantValue::Integer(extract_bits(&v, pos * elem_width, elem_width)),
                None => ConstantValue::Integer(SvInt::all_x(elem_width)),
            }
        }
        ExprKind::RangeSelect {
            value,
            select_kind,
            left,
            right,
        } => {
            let base_ty = comp.expr(*value).ty;
            let v = eval(comp, *value, ctx);
            let l = eval(comp, *left, ctx);
            let r = eval(comp, *right, ctx);
            let (ConstantValue::Integer(v), ConstantValue::Integer(l), ConstantValue::Integer(r)) =
                (v, l, r)
            else {
                return ConstantValue::Bad;
            };
            let (Some(l), Some(r)) = (l.as_i32(), r.as_i32()) else {
                return ConstantValue::Bad;
            };
            let elem_width = element_width(comp, base_ty);

            let (low_index, width) = match select_kind {
                RangeSelectKind::Simple => {
                    let width = l.abs_diff(r) + 1;
                    (l.min(r), width)
                }
                RangeSelectKind::IndexedUp => (l, r as u32),
                RangeSelectKind::IndexedDown => (l - (r - 1), r as u32),
            };
            match translate_select_index(comp, base_ty, low_index) {
                Some(pos) => ConstantValue::Integer(extract_bits(
                    &v,
                    pos * elem_width,
                    width * elem_width,
                )),
                None => ConstantValue::Integer(SvInt::all_x(width * elem_width)),
            }
        }
        ExprKind::MemberAccess { .. } => {
            ctx.diag(comp, DiagCode::ExpressionNotConstant, e.range);
            ConstantValue::Bad
        }
        ExprKind::Call {
            subroutine,
            system_name,
            args,
        } => eval_call(comp, *subroutine, *system_name, args, e.range, ctx),
        ExprKind::Conversion { operand } => {
            let value = eval(comp, *operand, ctx);
            if value.is_bad() {
                return ConstantValue::Bad;
            }
            convert_value(comp, value, e.ty)
        }
        ExprKind::Assignment { .. } => {
            ctx.diag(comp, DiagCode::ExpressionNotConstant, e.range);
            ConstantValue::Bad
        }
        ExprKind::Inside { value, ranges } => {
            let v = eval(comp, *value, ctx);
            if v.is_bad() {
                return ConstantValue::Bad;
            }
            let ConstantValue::Integer(v) = v else {
                return ConstantValue::Bad;
            };
            let mut any_unknown = false;
            for (lo, hi) in ranges {
                let lo_v = match eval(comp, *lo, ctx) {
                    ConstantValue::Integer(x) => x,
                    _ => return ConstantValue::Bad,
                };
                match hi {
                    None => match v.logical_eq(&lo_v) {
                        Logic::One => return logic_bit(Logic::One),
                        Logic::Zero => {}
                        _ => any_unknown = true,
                    },
                    Some(hi) => {
                        let hi_v = match eval(comp, *hi, ctx) {
                            ConstantValue::Integer(x) => x,
                            _ => return ConstantValue::Bad,
                        };
                        let ge_lo = lo_v.less_than(&v).or_eq(&lo_v, &v);
                        let le_hi = v.less_than(&hi_v).or_eq(&v, &hi_v);
                        match ge_lo.and(le_hi) {
                            Logic::One => return logic_bit(Logic::One),
                            Logic::Zero => {}
                            _ => any_unknown = true,
                        }
                    }
                }
            }
            if any_unknown {
                logic_bit(Logic::X)
            } else {
                logic_bit(Logic::Zero)
            }
        }
    }
}

/// `a < b || a == b` in three-valued logic; tiny extension trait so
/// the inside-range code above reads naturally.
trait OrEq {
    fn or_eq(self, a: &SvInt, b: &SvInt) -> Logic;
}

impl OrEq for Logic {
    fn or_eq(self, a: &SvInt, b: &SvInt) -> Logic {
        self.or(a.logical_eq(b))
    }
}

fn eval_named(
    comp: &Compilation,
    symbol: SymbolId,
    range: SourceRange,
    ctx: &EvalContext,
) -> ConstantValue {
    if let Some(local) = ctx.lookup_local(symbol) {
        return local;
    }
    match &comp.symbol(symbol).kind {
        SymbolKind::Parameter(_) => comp.parameter_value(symbol),
        SymbolKind::EnumValue(_) => comp.enum_value(symbol),
        SymbolKind::Variable { is_const: true, .. } => {
            // A const variable's initializer is usable as a constant.
            match comp.variable_initializer(symbol) {
                Some(init) => eval(comp, init, ctx),
                None => {
                    ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
                    ConstantValue::Bad
                }
            }
        }
        _ => {
            ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
            ConstantValue::Bad
        }
    }
}

fn eval_unary(op: UnaryOp, value: ConstantValue) -> ConstantValue {
    let ConstantValue::Integer(v) = value else {
        // Real-valued unary minus/plus still work.
        if let ConstantValue::Real(r) = value {
            return match op {
                UnaryOp::Minus => ConstantValue::Real(-r),
                UnaryOp::Plus => ConstantValue::Real(r),
                UnaryOp::LogicalNot => {
                    ConstantValue::Integer(SvInt::from_u64(u64::from(r == 0.0), 1, false))
                }
                _ => ConstantValue::Bad,
            };
        }
        return ConstantValue::Bad;
    };
    match op {
        UnaryOp::Plus => ConstantValue::Integer(v),
        UnaryOp::Minus => ConstantValue::Integer(v.negate()),
        UnaryOp::BitwiseNot => ConstantValue::Integer(v.not()),
        UnaryOp::LogicalNot => logic_bit(v.to_logic().not()),
        UnaryOp::ReductionAnd => logic_bit(v.reduction_and()),
        UnaryOp::ReductionOr => logic_bit(v.reduction_or()),
        UnaryOp::ReductionXor => logic_bit(v.reduction_xor()),
        UnaryOp::ReductionNand => logic_bit(v.reduction_and().not()),
        UnaryOp::ReductionNor => logic_bit(v.reduction_or().not()),
        UnaryOp::ReductionXnor => logic_bit(v.reduction_xor().not()),
        // Increment/decrement have side effects; not constants.
        UnaryOp::Increment | UnaryOp::Decrement => ConstantValue::Bad,
    }
}

fn eval_binary(op: BinaryOp, lhs: ConstantValue, rhs: ConstantValue) -> ConstantValue {
    use BinaryOp::*;

    // Real arithmetic when either side is real.
    if let (ConstantValue::Real(_), _) | (_, ConstantValue::Real(_)) = (&lhs, &rhs) {
        return eval_real_binary(op, lhs, rhs);
    }

    let (ConstantValue::Integer(a), ConstantValue::Integer(b)) = (lhs, rhs) else {
        return ConstantValue::Bad;
    };

    let result = match op {
        Add => ConstantValue::Integer(a.add(&b)),
        Sub => ConstantValue::Integer(a.sub(&b)),
        Mul => ConstantValue::Integer(a.mul(&b)),
        Div => ConstantValue::Integer(a.div(&b)),
        Mod => ConstantValue::Integer(a.rem(&b)),
        Pow => ConstantValue::Integer(a.pow(&b)),
        And => ConstantValue::Integer(a.and(&b)),
        Or => ConstantValue::Integer(a.or(&b)),
        Xor => ConstantValue::Integer(a.xor(&b)),
        Xnor => ConstantValue::Integer(a.xnor(&b)),
        LogicalAnd => logic_bit(a.to_logic().and(b.to_logic())),
        LogicalOr => logic_bit(a.to_logic().or(b.to_logic())),
        Eq => logic_bit(a.logical_eq(&b)),
        Neq => logic_bit(a.logical_eq(&b).not()),
        CaseEq => logic_bit(if a.case_eq(&b) { Logic::One } else { Logic::Zero }),
        CaseNeq => logic_bit(if a.case_eq(&b) { Logic::Zero } else { Logic::One }),
        WildcardEq => logic_bit(wildcard_eq(&a, &b)),
        WildcardNeq => logic_bit(wildcard_eq(&a, &b).not()),
        Lt => logic_bit(a.less_than(&b)),
        Gt => logic_bit(b.less_than(&a)),
        Le => logic_bit(b.less_than(&a).not()),
        Ge => logic_bit(a.less_than(&b).not()),
        Shl | Shr | AShr => {
            if b.has_unknown() {
                return ConstantValue::Integer(SvInt::all_x(a.width()));
            }
            let amount = b.as_u32().unwrap_or(u32::MAX);
            let shifted = match op {
                Shl => a.shl(amount.min(a.width())),
                AShr => a.ashr(amount.min(a.width())),
                _ => a.lshr(amount.min(a.width())),
            };
            ConstantValue::Integer(shifted)
        }
    };
    result
}

fn eval_real_binary(op: BinaryOp, lhs: ConstantValue, rhs: ConstantValue) -> ConstantValue {
    use BinaryOp::*;
    let to_real = |v: &ConstantValue| -> Option<f64> {
        match v {
            ConstantValue::Real(r) => Some(*r),
            ConstantValue::Integer(i) => i.as_i64().map(|x| x as f64),
            _ => None,
        }
    };
    let (Some(a), Some(b)) = (to_real(&lhs), to_real(&rhs)) else {
        return ConstantValue::Bad;
    };
    let bool_bit = |b: bool| ConstantValue::Integer(SvInt::from_u64(u64::from(b), 1, false));
    match op {
        Add => ConstantValue::Real(a + b),
        Sub => ConstantValue::Real(a - b),
        Mul => ConstantValue::Real(a * b),
        Div => ConstantValue::Real(a / b),
        Pow => ConstantValue::Real(a.powf(b)),
        Eq => bool_bit(a == b),
        Neq => bool_bit(a != b),
        Lt => bool_bit(a < b),
        Le => bool_bit(a <= b),
        Gt => bool_bit(a > b),
        Ge => bool_bit(a >= b),
        LogicalAnd => bool_bit(a != 0.0 && b != 0.0),
        LogicalOr => bool_bit(a != 0.0 || b != 0.0),
        _ => ConstantValue::Bad,
    }
}

/// `==?`: X/Z bits of the right operand are wildcards.
fn wildcard_eq(a: &SvInt, b: &SvInt) -> Logic {
    let width = a.width().max(b.width());
    let a = a.resize(width);
    let b = b.resize(width);
    let mut unknown = false;
    for i in 0..width {
        let bb = b.get_bit(i);
        if bb.is_unknown() {
            continue;
        }
        match a.get_bit(i) {
            bit if bit == bb => {}
            bit if bit.is_unknown() => unknown = true,
            _ => return Logic::Zero,
        }
    }
    if unknown {
        Logic::X
    } else {
        Logic::One
    }
}

fn eval_call(
    comp: &Compilation,
    subroutine: Option<SymbolId>,
    system_name: Option<Name>,
    args: &[ExprId],
    range: SourceRange,
    ctx: &EvalContext,
) -> ConstantValue {
    if let Some(name) = system_name {
        return eval_system_call(comp, name, args, range, ctx);
    }
    let Some(subroutine) = subroutine else {
        return ConstantValue::Bad;
    };

    // Constant functions: supported when the body reduces to a single
    // return expression (possibly inside one begin/end block).
    let SymbolKind::Subroutine(data) = &comp.symbol(subroutine).kind else {
        return ConstantValue::Bad;
    };
    if data.is_task {
        ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
        return ConstantValue::Bad;
    }

    let return_expr = *data.return_expr.get_or_init(|| {
        let ret_syntax = find_return_expr(comp, &data.body)?;
        let bind = BindContext::new(comp, data.scope);
        Some(bind.bind(ret_syntax))
    });
    let Some(return_expr) = return_expr else {
        ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
        return ConstantValue::Bad;
    };

    // Evaluate actuals in the caller's context, then bind them to the
    // formals in a fresh frame.
    let mut frame = FxHashMap::default();
    for (formal, &actual) in data.args.iter().zip(args.iter()) {
        let value = eval(comp, actual, ctx);
        if value.is_bad() {
            return ConstantValue::Bad;
        }
        frame.insert(*formal, value);
    }
    ctx.push_frame(frame);
    let result = eval(comp, return_expr, ctx);
    ctx.pop_frame();
    result
}

/// Locate `return <expr>;` in a subroutine body consisting of a single
/// return, possibly wrapped in one sequential block.
fn find_return_expr(comp: &Compilation, body: &[SyntaxRef]) -> Option<SyntaxRef> {
    let mut items: Vec<SyntaxRef> = body.to_vec();
    if items.len() == 1 {
        let only = items[0];
        if comp.tree(only.tree).kind(only.node) == SyntaxKind::SequentialBlockStatement {
            items = comp
                .tree(only.tree)
                .child_nodes(only.node)
                .map(|node| SyntaxRef {
                    tree: only.tree,
                    node,
                })
                .collect();
        }
    }

    let mut result = None;
    for item in items {
        let tree = comp.tree(item.tree);
        match tree.kind(item.node) {
            SyntaxKind::ReturnStatement => {
                let expr = tree
                    .child_nodes(item.node)
                    .find(|&n| tree.kind(n).is_expression())?;
                if result.is_some() {
                    return None; // more than one return
                }
                result = Some(SyntaxRef {
                    tree: item.tree,
                    node: expr,
                });
            }
            SyntaxKind::DataDeclaration | SyntaxKind::NamedBlockClause => {}
            _ => return None,
        }
    }
    result
}

fn eval_system_call(
    comp: &Compilation,
    name: Name,
    args: &[ExprId],
    range: SourceRange,
    ctx: &EvalContext,
) -> ConstantValue {
    let text = comp.interner().get(name);
    match text {
        "$clog2" => {
            let Some(&arg) = args.first() else {
                return ConstantValue::Bad;
            };
            let value = eval(comp, arg, ctx);
            let ConstantValue::Integer(v) = value else {
                return ConstantValue::Bad;
            };
            if v.has_unknown() {
                return ConstantValue::Integer(SvInt::all_x(32));
            }
            // Ceiling log2: highest set bit of (v - 1), plus one.
            let n = if v.is_zero() {
                0
            } else {
                let vm1 = v.sub(&SvInt::from_u64(1, v.width(), false));
                let mut bits = 0u32;
                for i in (0..vm1.width()).rev() {
                    if vm1.get_bit(i) == Logic::One {
                        bits = i + 1;
                        break;
                    }
                }
                bits
            };
            ConstantValue::Integer(SvInt::from_u64(u64::from(n), 32, true))
        }
        "$bits" => {
            let Some(&arg) = args.first() else {
                return ConstantValue::Bad;
            };
            let ty = comp.expr(arg).ty;
            match comp.type_bit_width(ty) {
                Some(width) => {
                    ConstantValue::Integer(SvInt::from_u64(u64::from(width), 32, true))
                }
                None => ConstantValue::Bad,
            }
        }
        "$low" | "$high" | "$left" | "$right" | "$size" | "$increment" => {
            let Some(&arg) = args.first() else {
                return ConstantValue::Bad;
            };
            let ty = comp.expr(arg).ty;
            match outermost_range(comp, ty) {
                Some(bounds) => {
                    let v = match text {
                        "$left" => bounds.left,
                        "$right" => bounds.right,
                        "$low" => bounds.lower(),
                        "$high" => bounds.upper(),
                        "$size" => bounds.width() as i32,
                        _ => {
                            if bounds.is_descending() {
                                1
                            } else {
                                -1
                            }
                        }
                    };
                    ConstantValue::Integer(SvInt::from_i64(i64::from(v), 32))
                }
                None => {
                    // Dynamic shapes answer these queries at run time
                    // only.
                    ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
                    ConstantValue::Bad
                }
            }
        }
        // Enum methods; the receiver is the first argument.
        "first" | "last" => {
            let Some(&arg) = args.first() else {
                return ConstantValue::Bad;
            };
            let Type::Enum { members, .. } = comp.type_kind(comp.expr(arg).ty) else {
                ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
                return ConstantValue::Bad;
            };
            let member = if text == "first" {
                members.first()
            } else {
                members.last()
            };
            match member {
                Some(&m) => comp.enum_value(m),
                None => ConstantValue::Bad,
            }
        }
        "num" => {
            let Some(&arg) = args.first() else {
                return ConstantValue::Bad;
            };
            let Type::Enum { members, .. } = comp.type_kind(comp.expr(arg).ty) else {
                ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
                return ConstantValue::Bad;
            };
            ConstantValue::Integer(SvInt::from_u64(members.len() as u64, 32, true))
        }
        _ => {
            // Simulation-only system tasks are not constants.
            ctx.diag(comp, DiagCode::ExpressionNotConstant, range);
            ConstantValue::Bad
        }
    }
}

/// The outermost dimension bounds of a type, for the array query
/// subroutines. `None` for dynamic shapes, whose bounds exist only at
/// run time.
fn outermost_range(comp: &Compilation, ty: crate::types::TypeId) -> Option<ConstantRange> {
    match comp.type_kind(ty) {
        Type::PackedArray { range, .. } | Type::FixedArray { range, .. } => Some(range),
        Type::Integral { width, .. } | Type::PackedStruct { width, .. } => {
            Some(ConstantRange::new(width as i32 - 1, 0))
        }
        Type::Enum { base, .. } => outermost_range(comp, base),
        _ => None,
    }
}

fn convert_value(comp: &Compilation, value: ConstantValue, target: crate::types::TypeId) -> ConstantValue {
    match (&value, comp.type_kind(target)) {
        (ConstantValue::Integer(_), Type::Real(_)) => match value {
            ConstantValue::Integer(v) => match v.as_i64() {
                Some(i) => ConstantValue::Real(i as f64),
                None => ConstantValue::Bad,
            },
            _ => unreachable!(),
        },
        (ConstantValue::Real(r), _) if comp.type_is_integral(target) => {
            let width = comp.type_bit_width(target).unwrap_or(32);
            // Implicit real-to-integer conversion rounds.
            ConstantValue::Integer(SvInt::from_i64(r.round() as i64, width))
        }
        _ => comp.convert_constant(value, target),
    }
}

fn element_width(comp: &Compilation, ty: crate::types::TypeId) -> u32 {
    match comp.type_kind(ty) {
        Type::PackedArray { element, .. } => comp.type_bit_width(element).unwrap_or(1),
        _ => 1,
    }
}

/// Map a user-facing index to a zero-based element position using the
/// type's declared range; `None` when out of bounds.
fn translate_select_index(
    comp: &Compilation,
    ty: crate::types::TypeId,
    index: i32,
) -> Option<u32> {
    match comp.type_kind(ty) {
        Type::PackedArray { range, .. } | Type::FixedArray { range, .. } => {
            range.translate_index(index)
        }
        Type::Integral { width, .. } => {
            if index >= 0 && (index as u32) < width {
                Some(index as u32)
            } else {
                None
            }
        }
        Type::Enum { base, .. } => translate_select_index(comp, base, index),
        _ => None,
    }
}

/// Extract `width` bits starting at `low`; bits beyond the value read
/// as X, matching out-of-range select semantics.
fn extract_bits(v: &SvInt, low: u32, width: u32) -> SvInt {
    let width = width.max(1);
    let mut out = SvInt::zero(width);
    for i in 0..width {
        let pos = low + i;
        let bit = if pos < v.width() {
            v.get_bit(pos)
        } else {
            Logic::X
        };
        if bit != Logic::Zero {
            out = out.with_bit(i, bit);
        }
    }
    out
}
