//! Expression binding.
//!
//! A [`BindContext`] is an immutable configuration value: the current
//! scope plus a flag set. Flags propagate to child bindings except the
//! non-sticky ones (`INSIDE_CONCATENATION`, `ALLOW_DATA_TYPE`), which
//! [`BindContext::reset`] clears.
//!
//! The binder lowers expression syntax into typed [`Expression`]
//! nodes. Type determination follows the self/context-determination
//! rules for integers: operand widths propagate outward pairwise, and
//! the result is finally converted to the assignment target's type.

use bitflags::bitflags;

use alder_diagnostic::{DiagCode, Diagnostic};
use alder_num::{ConstantRange, ConstantValue, Logic, SvInt};
use alder_source::SourceRange;
use alder_syntax::{ident_of, Name, SyntaxKind, TokenKind, TokenValue};

use crate::eval::EvalContext;
use crate::scope::ScopeId;
use crate::symbol::{ExprId, SymbolId, SymbolKind, SyntaxRef};
use crate::types::{builtin, Type, TypeId};
use crate::Compilation;

bitflags! {
    /// Binding configuration flags.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct BindFlags: u32 {
        /// The expression must be a compile-time constant.
        const CONSTANT = 1 << 0;
        /// Inside a concatenation; unsized literals are illegal here.
        /// Non-sticky.
        const INSIDE_CONCATENATION = 1 << 1;
        /// A data type may appear where an expression is expected
        /// (associative-array dimensions). Non-sticky.
        const ALLOW_DATA_TYPE = 1 << 2;
        /// Binding inside procedural code.
        const PROCEDURAL = 1 << 3;
        /// Assignment operators are allowed at the top level.
        const ASSIGNMENT_ALLOWED = 1 << 4;
    }
}

impl BindFlags {
    const NON_STICKY: BindFlags = BindFlags::INSIDE_CONCATENATION.union(BindFlags::ALLOW_DATA_TYPE);
}

/// Unary operators of bound expressions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
    LogicalNot,
    BitwiseNot,
    ReductionAnd,
    ReductionOr,
    ReductionXor,
    ReductionNand,
    ReductionNor,
    ReductionXnor,
    Increment,
    Decrement,
}

/// Binary operators of bound expressions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    And,
    Or,
    Xor,
    Xnor,
    LogicalAnd,
    LogicalOr,
    Eq,
    Neq,
    CaseEq,
    CaseNeq,
    WildcardEq,
    WildcardNeq,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    AShr,
}

/// Range-select flavors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RangeSelectKind {
    /// `[left:right]`
    Simple,
    /// `[base +: width]`
    IndexedUp,
    /// `[base -: width]`
    IndexedDown,
}

/// A bound, typed expression node.
#[derive(Clone, Debug)]
pub struct Expression {
    pub kind: ExprKind,
    pub ty: TypeId,
    /// Constant folded at bind time, when trivially available.
    pub constant: Option<ConstantValue>,
    pub range: SourceRange,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    /// Produced for unbindable syntax; downstream stays silent.
    Invalid,
    IntegerLiteral(SvInt),
    RealLiteral(f64),
    TimeLiteral(f64),
    StringLiteral(Name),
    UnbasedUnsizedLiteral(Logic),
    NamedValue(SymbolId),
    DataType(TypeId),
    Unary(UnaryOp, ExprId),
    Binary(BinaryOp, ExprId, ExprId),
    Conditional {
        cond: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },
    Concat(Vec<ExprId>),
    Replication {
        count: ExprId,
        elements: Vec<ExprId>,
    },
    ElementSelect {
        value: ExprId,
        index: ExprId,
    },
    RangeSelect {
        value: ExprId,
        select_kind: RangeSelectKind,
        left: ExprId,
        right: ExprId,
    },
    MemberAccess {
        value: ExprId,
        name: Name,
    },
    Call {
        subroutine: Option<SymbolId>,
        system_name: Option<Name>,
        args: Vec<ExprId>,
    },
    Conversion {
        operand: ExprId,
    },
    Assignment {
        lhs: ExprId,
        rhs: ExprId,
        non_blocking: bool,
    },
    Inside {
        value: ExprId,
        /// Single values and `[lo:hi]` pairs.
        ranges: Vec<(ExprId, Option<ExprId>)>,
    },
}

impl Expression {
    /// Whether this expression can be assigned to.
    pub fn is_lvalue(&self, comp: &Compilation) -> bool {
        match &self.kind {
            ExprKind::NamedValue(symbol) => matches!(
                comp.symbol(*symbol).kind,
                SymbolKind::Variable { .. }
                    | SymbolKind::Net { .. }
                    | SymbolKind::FormalArgument { .. }
                    | SymbolKind::Port(_)
                    | SymbolKind::ModportPort { .. }
            ),
            ExprKind::ElementSelect { value, .. } | ExprKind::RangeSelect { value, .. } => {
                comp.expr(*value).is_lvalue(comp)
            }
            ExprKind::MemberAccess { value, .. } => comp.expr(*value).is_lvalue(comp),
            ExprKind::Concat(parts) => parts.iter().all(|p| comp.expr(*p).is_lvalue(comp)),
            _ => false,
        }
    }
}

/// Dimension classification.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DimensionKind {
    Unknown,
    /// `[left:right]`
    Range,
    /// `[N]`, meaning `[0:N-1]`.
    AbbreviatedRange,
    Dynamic,
    Associative,
    Queue,
}

/// Result of evaluating a dimension specifier.
#[derive(Clone, Debug)]
pub struct EvaluatedDimension {
    pub kind: DimensionKind,
    pub range: Option<ConstantRange>,
    pub associative_type: Option<TypeId>,
    pub queue_max_size: Option<u32>,
}

impl EvaluatedDimension {
    fn unknown() -> Self {
        EvaluatedDimension {
            kind: DimensionKind::Unknown,
            range: None,
            associative_type: None,
            queue_max_size: None,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(
            self.kind,
            DimensionKind::Range | DimensionKind::AbbreviatedRange
        )
    }
}

/// The immutable per-binding configuration.
#[derive(Copy, Clone)]
pub struct BindContext<'a> {
    pub comp: &'a Compilation,
    pub scope: ScopeId,
    pub flags: BindFlags,
}

impl<'a> BindContext<'a> {
    pub fn new(comp: &'a Compilation, scope: ScopeId) -> Self {
        BindContext {
            comp,
            scope,
            flags: BindFlags::empty(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: BindFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// A child context with non-sticky flags cleared and `added` set.
    #[must_use]
    pub fn reset(&self, added: BindFlags) -> Self {
        let mut ctx = *self;
        ctx.flags &= !BindFlags::NON_STICKY;
        ctx.flags |= added;
        ctx
    }

    fn add_diag(&self, code: DiagCode, range: SourceRange) -> bool {
        self.comp.diagnostics().add(Diagnostic::new(code, range));
        false
    }

    // === Requirement checks ===

    pub fn require_lvalue(&self, expr: &Expression, range: SourceRange) -> bool {
        if expr.is_lvalue(self.comp) {
            true
        } else if matches!(expr.kind, ExprKind::Invalid) {
            // Already diagnosed at bind time.
            false
        } else {
            self.add_diag(DiagCode::ExpressionNotAssignable, range)
        }
    }

    pub fn require_integral(&self, value: &ConstantValue, range: SourceRange) -> bool {
        if value.is_bad() {
            return false;
        }
        if value.is_integer() {
            true
        } else {
            self.add_diag(DiagCode::ValueMustBeIntegral, range)
        }
    }

    pub fn require_no_unknowns(&self, value: &SvInt, range: SourceRange) -> bool {
        if value.has_unknown() {
            self.add_diag(DiagCode::ValueMustNotBeUnknown, range)
        } else {
            true
        }
    }

    pub fn require_positive(&self, value: &SvInt, range: SourceRange) -> bool {
        if value.is_negative() {
            self.add_diag(DiagCode::ValueMustBePositive, range)
        } else {
            true
        }
    }

    pub fn require_gt_zero(&self, value: Option<i32>, range: SourceRange) -> bool {
        match value {
            None => false,
            Some(v) if v <= 0 => self.add_diag(DiagCode::ValueMustBePositive, range),
            Some(_) => true,
        }
    }

    /// Check a bit width against the implementation maximum.
    pub fn require_valid_bit_width(&self, width: u32, range: SourceRange) -> Option<u32> {
        if width == 0 || width > SvInt::MAX_BITS {
            self.comp.diagnostics().add(
                Diagnostic::new(DiagCode::ValueExceedsMaxBitWidth, range)
                    .with_arg(i64::from(width))
                    .with_arg(i64::from(SvInt::MAX_BITS)),
            );
            None
        } else {
            Some(width)
        }
    }

    // === Constant evaluation entry points ===

    /// Bind (with the constant flag) and coerce to a 32-bit signed
    /// integer. Produces `ValueOutOfRange` when the value does not
    /// fit.
    pub fn eval_integer_syntax(&self, syntax: SyntaxRef) -> Option<i32> {
        let expr = self.reset(BindFlags::CONSTANT).bind(syntax);
        self.eval_integer(expr)
    }

    pub fn eval_integer(&self, expr: ExprId) -> Option<i32> {
        let range = self.comp.expr(expr).range;
        let eval_ctx = EvalContext::new();
        let value = crate::eval::eval(self.comp, expr, &eval_ctx);
        if !self.require_integral(&value, range) {
            return None;
        }
        let integer = value.integer()?.clone();
        if !self.require_no_unknowns(&integer, range) {
            return None;
        }
        match integer.as_i32() {
            Some(v) => Some(v),
            None => {
                self.comp.diagnostics().add(
                    Diagnostic::new(DiagCode::ValueOutOfRange, range)
                        .with_arg(integer.to_string())
                        .with_arg(i32::MIN)
                        .with_arg(i32::MAX),
                );
                None
            }
        }
    }

    /// Classify and evaluate a `[...]` dimension.
    pub fn eval_dimension(&self, dim: SyntaxRef, require_range: bool) -> EvaluatedDimension {
        let tree = self.comp.tree(dim.tree);
        let dim_range = tree.range(dim.node);
        let specifier = tree.child_nodes(dim.node).next();

        let mut result = match specifier {
            None => EvaluatedDimension {
                kind: DimensionKind::Dynamic,
                ..EvaluatedDimension::unknown()
            },
            Some(spec) => match tree.kind(spec) {
                SyntaxKind::WildcardDimensionSpecifier => EvaluatedDimension {
                    kind: DimensionKind::Associative,
                    ..EvaluatedDimension::unknown()
                },
                SyntaxKind::QueueDimensionSpecifier => {
                    let mut queue = EvaluatedDimension {
                        kind: DimensionKind::Queue,
                        ..EvaluatedDimension::unknown()
                    };
                    if let Some(max_expr) = tree.child_nodes(spec).next() {
                        let expr_range = tree.range(max_expr);
                        let value = self.eval_integer_syntax(SyntaxRef {
                            tree: dim.tree,
                            node: max_expr,
                        });
                        if self.require_gt_zero(value, expr_range) {
                            queue.queue_max_size = value.map(|v| v as u32);
                        }
                    }
                    queue
                }
                SyntaxKind::RangeDimensionSpecifier => self.eval_range_dimension(SyntaxRef {
                    tree: dim.tree,
                    node: spec,
                }),
                _ => EvaluatedDimension::unknown(),
            },
        };

        if require_range && !result.is_range() && result.kind != DimensionKind::Unknown {
            self.add_diag(DiagCode::DimensionRequiresConstRange, dim_range);
            result.kind = DimensionKind::Unknown;
        }
        result
    }

    fn eval_range_dimension(&self, spec: SyntaxRef) -> EvaluatedDimension {
        let tree = self.comp.tree(spec.tree);
        let Some(select) = tree.child_nodes(spec.node).next() else {
            return EvaluatedDimension::unknown();
        };
        let select_range = tree.range(select);

        match tree.kind(select) {
            SyntaxKind::BitSelect => {
                let Some(expr_node) = tree.child_nodes(select).next() else {
                    return EvaluatedDimension::unknown();
                };
                let expr = self
                    .reset(BindFlags::CONSTANT | BindFlags::ALLOW_DATA_TYPE)
                    .bind(SyntaxRef {
                        tree: spec.tree,
                        node: expr_node,
                    });
                // A data type here means an associative array
                // dimension rather than a sized one.
                if let ExprKind::DataType(ty) = self.comp.expr(expr).kind {
                    return EvaluatedDimension {
                        kind: DimensionKind::Associative,
                        associative_type: Some(ty),
                        ..EvaluatedDimension::unknown()
                    };
                }
                let value = self.eval_integer(expr);
                if !self.require_gt_zero(value, select_range) {
                    return EvaluatedDimension::unknown();
                }
                let size = value.unwrap_or(1);
                EvaluatedDimension {
                    kind: DimensionKind::AbbreviatedRange,
                    range: Some(ConstantRange::new(0, size - 1)),
                    ..EvaluatedDimension::unknown()
                }
            }
            SyntaxKind::SimpleRangeSelect => {
                let mut exprs = tree.child_nodes(select);
                let left_node = exprs.next();
                let right_node = exprs.next();
                let (Some(left_node), Some(right_node)) = (left_node, right_node) else {
                    return EvaluatedDimension::unknown();
                };
                let left = self.eval_integer_syntax(SyntaxRef {
                    tree: spec.tree,
                    node: left_node,
                });
                let right = self.eval_integer_syntax(SyntaxRef {
                    tree: spec.tree,
                    node: right_node,
                });
                let (Some(left), Some(right)) = (left, right) else {
                    return EvaluatedDimension::unknown();
                };
                EvaluatedDimension {
                    kind: DimensionKind::Range,
                    range: Some(ConstantRange::new(left, right)),
                    ..EvaluatedDimension::unknown()
                }
            }
            _ => {
                self.add_diag(DiagCode::InvalidDimensionRange, select_range);
                EvaluatedDimension::unknown()
            }
        }
    }

    /// Evaluate a packed dimension: demands the full `[hi:lo]` form
    /// with non-negative bounds.
    pub fn eval_packed_dimension(&self, dim: SyntaxRef) -> Option<ConstantRange> {
        let dim_range = self.comp.tree(dim.tree).range(dim.node);
        let result = self.eval_dimension(dim, true);
        if !result.is_range() {
            return None;
        }
        if result.kind == DimensionKind::AbbreviatedRange {
            self.add_diag(DiagCode::PackedDimsRequireFullRange, dim_range);
        }
        let range = result.range?;
        // Packed vector bounds must not be negative; a parameterized
        // msb that underflows zero is the classic way to hit this.
        if range.left < 0 || range.right < 0 {
            self.add_diag(DiagCode::ValueMustBePositive, dim_range);
        }
        Some(range)
    }

    // === Binding ===

    /// Lower expression syntax to a bound expression. Never fails:
    /// unbindable syntax produces an `Invalid` node after a
    /// diagnostic, and downstream consumers stay silent about it.
    pub fn bind(&self, syntax: SyntaxRef) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let range = tree.range(syntax.node);
        let kind = tree.kind(syntax.node);

        match kind {
            SyntaxKind::IntegerLiteralExpression => {
                let value = tree
                    .child_tokens(syntax.node)
                    .next()
                    .and_then(|t| match t.value {
                        TokenValue::Integer(id) => Some(tree.tokens().literal(id).clone()),
                        _ => None,
                    })
                    .unwrap_or_else(|| SvInt::zero(32));
                let ty = self.comp.integral_type(
                    value.width(),
                    value.is_signed(),
                    value.has_unknown(),
                );
                self.alloc(
                    ExprKind::IntegerLiteral(value.clone()),
                    ty,
                    Some(ConstantValue::Integer(value)),
                    range,
                )
            }
            SyntaxKind::RealLiteralExpression => {
                let value = tree
                    .child_tokens(syntax.node)
                    .next()
                    .and_then(|t| match t.value {
                        TokenValue::Real(v) => Some(v),
                        _ => None,
                    })
                    .unwrap_or(0.0);
                self.alloc(
                    ExprKind::RealLiteral(value),
                    builtin::REAL,
                    Some(ConstantValue::Real(value)),
                    range,
                )
            }
            SyntaxKind::TimeLiteralExpression => {
                let value = tree
                    .child_tokens(syntax.node)
                    .next()
                    .and_then(|t| match t.value {
                        TokenValue::Time(v, _) => Some(v),
                        _ => None,
                    })
                    .unwrap_or(0.0);
                self.alloc(
                    ExprKind::TimeLiteral(value),
                    builtin::REAL_TIME,
                    Some(ConstantValue::Real(value)),
                    range,
                )
            }
            SyntaxKind::StringLiteralExpression => {
                let value = tree
                    .child_tokens(syntax.node)
                    .next()
                    .and_then(|t| match t.value {
                        TokenValue::Str(s) => Some(s),
                        _ => None,
                    })
                    .unwrap_or(Name::EMPTY);
                let text = self.comp.interner().get(value);
                self.alloc(
                    ExprKind::StringLiteral(value),
                    builtin::STRING,
                    Some(ConstantValue::Str(text.into())),
                    range,
                )
            }
            SyntaxKind::UnbasedUnsizedLiteralExpression => {
                let bit = tree
                    .child_tokens(syntax.node)
                    .next()
                    .and_then(|t| match t.value {
                        TokenValue::Bit(b) => Some(b),
                        _ => None,
                    })
                    .unwrap_or(Logic::Zero);
                self.alloc(
                    ExprKind::UnbasedUnsizedLiteral(bit),
                    builtin::LOGIC,
                    Some(ConstantValue::Integer(SvInt::filled(bit, 1, false))),
                    range,
                )
            }
            SyntaxKind::NullLiteralExpression => self.alloc(
                ExprKind::IntegerLiteral(SvInt::zero(32)),
                builtin::INT,
                Some(ConstantValue::Integer(SvInt::zero(32))),
                range,
            ),
            SyntaxKind::IdentifierName => self.bind_identifier(syntax, range),
            SyntaxKind::ScopedName => self.bind_scoped_name(syntax, range),
            SyntaxKind::MemberAccessExpression => self.bind_member_access(syntax, range),
            SyntaxKind::UnitScopeName | SyntaxKind::RootScopeName => {
                let symbol = if kind == SyntaxKind::RootScopeName {
                    self.comp.root_symbol()
                } else {
                    self.comp.scope(self.comp.unit_scope()).owner
                };
                self.alloc(ExprKind::NamedValue(symbol), builtin::ERROR, None, range)
            }
            SyntaxKind::SystemName => {
                let name = tree
                    .child_tokens(syntax.node)
                    .next()
                    .and_then(|t| t.ident_name())
                    .unwrap_or(Name::EMPTY);
                self.alloc(
                    ExprKind::Call {
                        subroutine: None,
                        system_name: Some(name),
                        args: Vec::new(),
                    },
                    builtin::INT,
                    None,
                    range,
                )
            }
            SyntaxKind::ParenthesizedExpression => match tree.child_nodes(syntax.node).next() {
                Some(inner) => self.bind(SyntaxRef {
                    tree: syntax.tree,
                    node: inner,
                }),
                None => self.invalid(range),
            },
            SyntaxKind::PrefixUnaryExpression | SyntaxKind::PostfixUnaryExpression => {
                self.bind_unary(syntax, range)
            }
            SyntaxKind::BinaryExpression => self.bind_binary(syntax, range),
            SyntaxKind::ConditionalExpression => self.bind_conditional(syntax, range),
            SyntaxKind::ConcatenationExpression => self.bind_concat(syntax, range),
            SyntaxKind::MultipleConcatenationExpression => self.bind_replication(syntax, range),
            SyntaxKind::ElementSelectExpression => self.bind_element_select(syntax, range),
            SyntaxKind::InvocationExpression => self.bind_call(syntax, range),
            SyntaxKind::CastExpression => self.bind_cast(syntax, range),
            SyntaxKind::AssignmentExpression => self.bind_assignment(syntax, range),
            SyntaxKind::InsideExpression => self.bind_inside(syntax, range),
            SyntaxKind::TypeReference => {
                if !self.flags.contains(BindFlags::ALLOW_DATA_TYPE) {
                    self.add_diag(DiagCode::ExpectedExpression, range);
                    return self.invalid(range);
                }
                let ty = match tree.child_nodes(syntax.node).next() {
                    Some(node) => self.resolve_type_syntax(SyntaxRef {
                        tree: syntax.tree,
                        node,
                    }),
                    None => builtin::ERROR,
                };
                self.alloc(ExprKind::DataType(ty), ty, None, range)
            }
            // Streaming, assignment patterns, and tagged unions bind
            // loosely: operands are checked, the result is opaque.
            SyntaxKind::StreamingConcatenationExpression
            | SyntaxKind::AssignmentPatternExpression
            | SyntaxKind::TaggedUnionExpression => {
                let nodes: Vec<_> = tree.child_nodes(syntax.node).collect();
                for node in nodes {
                    if self.comp.tree(syntax.tree).kind(node).is_expression() {
                        self.bind(SyntaxRef {
                            tree: syntax.tree,
                            node,
                        });
                    }
                }
                self.alloc(ExprKind::Invalid, builtin::ERROR, None, range)
            }
            _ => {
                self.add_diag(DiagCode::ExpectedExpression, range);
                self.invalid(range)
            }
        }
    }

    fn alloc(
        &self,
        kind: ExprKind,
        ty: TypeId,
        constant: Option<ConstantValue>,
        range: SourceRange,
    ) -> ExprId {
        self.comp.alloc_expr(Expression {
            kind,
            ty,
            constant,
            range,
        })
    }

    fn invalid(&self, range: SourceRange) -> ExprId {
        self.alloc(ExprKind::Invalid, builtin::ERROR, None, range)
    }

    fn bind_identifier(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let Some(name) = ident_of(tree, syntax.node) else {
            return self.invalid(range);
        };
        let Some(symbol) = self.comp.lookup_unqualified(self.scope, name, range) else {
            return self.invalid(range);
        };
        let ty = self.comp.value_type(symbol, self);
        self.alloc(ExprKind::NamedValue(symbol), ty, None, range)
    }

    fn bind_scoped_name(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let Some(base_node) = tree.child_nodes(syntax.node).next() else {
            return self.invalid(range);
        };
        let Some(member_name) = tree
            .child_tokens(syntax.node)
            .find(|t| t.kind == TokenKind::Identifier)
            .and_then(|t| t.ident_name())
        else {
            return self.invalid(range);
        };

        let target = match tree.kind(base_node) {
            SyntaxKind::IdentifierName => {
                let Some(pkg_name) = ident_of(tree, base_node) else {
                    return self.invalid(range);
                };
                self.comp
                    .lookup_package_qualified(pkg_name, member_name, range)
            }
            SyntaxKind::UnitScopeName => {
                let unit = self.comp.scope(self.comp.unit_scope()).owner;
                self.comp.lookup_member(unit, member_name, range)
            }
            SyntaxKind::RootScopeName => {
                let root = self.comp.root_symbol();
                self.comp.lookup_member(root, member_name, range)
            }
            SyntaxKind::ScopedName => {
                let base = self.bind(SyntaxRef {
                    tree: syntax.tree,
                    node: base_node,
                });
                match self.comp.expr(base).kind {
                    ExprKind::NamedValue(base_symbol) => {
                        self.comp.lookup_member(base_symbol, member_name, range)
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        match target {
            Some(symbol) => {
                let ty = self.comp.value_type(symbol, self);
                self.alloc(ExprKind::NamedValue(symbol), ty, None, range)
            }
            None => self.invalid(range),
        }
    }

    fn bind_member_access(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let Some(value_node) = tree.child_nodes(syntax.node).next() else {
            return self.invalid(range);
        };
        let Some(member_name) = tree
            .child_tokens(syntax.node)
            .find(|t| t.kind == TokenKind::Identifier)
            .and_then(|t| t.ident_name())
        else {
            return self.invalid(range);
        };
        let value = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: value_node,
        });
        let value_expr = self.comp.expr(value);

        // Hierarchical path: instance.member, interface_port.signal,
        // instance.modport.signal.
        if let ExprKind::NamedValue(base) = value_expr.kind {
            let base = match &self.comp.symbol(base).kind {
                SymbolKind::InterfacePort(data) => data.connection.get().copied().unwrap_or(base),
                _ => base,
            };
            if matches!(
                self.comp.symbol(base).kind,
                SymbolKind::Instance { .. }
                    | SymbolKind::Modport { .. }
                    | SymbolKind::Package { .. }
                    | SymbolKind::Root { .. }
                    | SymbolKind::CompilationUnit { .. }
            ) {
                return match self.comp.lookup_member(base, member_name, range) {
                    Some(symbol) => {
                        let ty = self.comp.value_type(symbol, self);
                        self.alloc(ExprKind::NamedValue(symbol), ty, None, range)
                    }
                    None => self.invalid(range),
                };
            }
        }

        // Struct field access.
        let field_ty = match self.comp.type_kind(value_expr.ty) {
            Type::PackedStruct { fields, .. } | Type::UnpackedStruct { fields } => fields
                .iter()
                .find(|(name, _)| *name == member_name)
                .map(|&(_, ty)| ty),
            _ => None,
        };
        match field_ty {
            Some(ty) => self.alloc(
                ExprKind::MemberAccess {
                    value,
                    name: member_name,
                },
                ty,
                None,
                range,
            ),
            None => {
                if !self.comp.type_is_error(value_expr.ty) {
                    self.comp.diagnostics().add(
                        Diagnostic::new(DiagCode::NotAMember, range)
                            .with_arg(self.comp.interner().get(member_name))
                            .with_arg("expression"),
                    );
                }
                self.invalid(range)
            }
        }
    }

    fn bind_unary(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let Some(operand_node) = tree.child_nodes(syntax.node).next() else {
            return self.invalid(range);
        };
        let op_token = tree.child_tokens(syntax.node).next().map(|t| t.kind);
        let operand = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: operand_node,
        });
        let operand_expr = self.comp.expr(operand);

        let op = match op_token {
            Some(TokenKind::Plus) => UnaryOp::Plus,
            Some(TokenKind::Minus) => UnaryOp::Minus,
            Some(TokenKind::Bang) => UnaryOp::LogicalNot,
            Some(TokenKind::Tilde) => UnaryOp::BitwiseNot,
            Some(TokenKind::Amp) => UnaryOp::ReductionAnd,
            Some(TokenKind::Pipe) => UnaryOp::ReductionOr,
            Some(TokenKind::Caret) => UnaryOp::ReductionXor,
            Some(TokenKind::TildeAmp) => UnaryOp::ReductionNand,
            Some(TokenKind::TildePipe) => UnaryOp::ReductionNor,
            Some(TokenKind::TildeCaret) => UnaryOp::ReductionXnor,
            Some(TokenKind::PlusPlus) => UnaryOp::Increment,
            Some(TokenKind::MinusMinus) => UnaryOp::Decrement,
            _ => return self.invalid(range),
        };

        if matches!(op, UnaryOp::Increment | UnaryOp::Decrement) {
            self.require_lvalue(&operand_expr, range);
        }

        let ty = match op {
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitwiseNot => operand_expr.ty,
            UnaryOp::Increment | UnaryOp::Decrement => operand_expr.ty,
            _ => self.single_bit_type(operand_expr.ty),
        };
        self.alloc(ExprKind::Unary(op, operand), ty, None, range)
    }

    fn bind_binary(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let mut nodes = tree.child_nodes(syntax.node);
        let (Some(lhs_node), Some(rhs_node)) = (nodes.next(), nodes.next()) else {
            return self.invalid(range);
        };
        let op_token = tree.child_tokens(syntax.node).next().map(|t| t.kind);

        let lhs = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: lhs_node,
        });
        let rhs = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: rhs_node,
        });
        let lhs_expr = self.comp.expr(lhs);
        let rhs_expr = self.comp.expr(rhs);

        use BinaryOp::*;
        let op = match op_token {
            Some(TokenKind::Plus) => Add,
            Some(TokenKind::Minus) => Sub,
            Some(TokenKind::Star) => Mul,
            Some(TokenKind::Slash) => Div,
            Some(TokenKind::Percent) => Mod,
            Some(TokenKind::DoubleStar) => Pow,
            Some(TokenKind::Amp) => And,
            Some(TokenKind::Pipe) => Or,
            Some(TokenKind::Caret) => Xor,
            Some(TokenKind::TildeCaret) => Xnor,
            Some(TokenKind::AmpAmp) => LogicalAnd,
            Some(TokenKind::PipePipe) => LogicalOr,
            Some(TokenKind::EqEq) => Eq,
            Some(TokenKind::NotEq) => Neq,
            Some(TokenKind::CaseEq) => CaseEq,
            Some(TokenKind::CaseNotEq) => CaseNeq,
            Some(TokenKind::WildcardEq) => WildcardEq,
            Some(TokenKind::WildcardNotEq) => WildcardNeq,
            Some(TokenKind::Lt) => Lt,
            Some(TokenKind::LtEq) => Le,
            Some(TokenKind::Gt) => Gt,
            Some(TokenKind::GtEq) => Ge,
            Some(TokenKind::LeftShift) => Shl,
            Some(TokenKind::RightShift) => Shr,
            Some(TokenKind::ArithLeftShift) => Shl,
            Some(TokenKind::ArithRightShift) => AShr,
            _ => return self.invalid(range),
        };

        let ty = match op {
            Add | Sub | Mul | Div | Mod | And | Or | Xor | Xnor => {
                self.common_integral_type(lhs_expr.ty, rhs_expr.ty, range)
            }
            Pow | Shl | Shr | AShr => lhs_expr.ty,
            _ => {
                // Comparisons and logical operators: one bit, four
                // state if either side is.
                let four_state = self.comp.type_is_four_state(lhs_expr.ty)
                    || self.comp.type_is_four_state(rhs_expr.ty);
                self.comp.integral_type(1, false, four_state)
            }
        };
        self.alloc(ExprKind::Binary(op, lhs, rhs), ty, None, range)
    }

    /// Pairwise type determination for arithmetic/bitwise operators:
    /// result width is the larger operand width, signedness only if
    /// both are signed.
    fn common_integral_type(&self, a: TypeId, b: TypeId, range: SourceRange) -> TypeId {
        if self.comp.type_is_error(a) || self.comp.type_is_error(b) {
            return builtin::ERROR;
        }
        let (Some(wa), Some(wb)) = (self.comp.type_bit_width(a), self.comp.type_bit_width(b))
        else {
            self.add_diag(DiagCode::BadBinaryExpression, range);
            return builtin::ERROR;
        };
        let width = wa.max(wb);
        let signed = self.comp.type_is_signed(a) && self.comp.type_is_signed(b);
        let four_state =
            self.comp.type_is_four_state(a) || self.comp.type_is_four_state(b);
        self.comp.integral_type(width, signed, four_state)
    }

    fn single_bit_type(&self, operand: TypeId) -> TypeId {
        self.comp
            .integral_type(1, false, self.comp.type_is_four_state(operand))
    }

    fn bind_conditional(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let mut nodes = tree.child_nodes(syntax.node);
        let (Some(c), Some(t), Some(f)) = (nodes.next(), nodes.next(), nodes.next()) else {
            return self.invalid(range);
        };
        let cond = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: c,
        });
        let if_true = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: t,
        });
        let if_false = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: f,
        });
        let ty = self.common_integral_type(
            self.comp.expr(if_true).ty,
            self.comp.expr(if_false).ty,
            range,
        );
        self.alloc(
            ExprKind::Conditional {
                cond,
                if_true,
                if_false,
            },
            ty,
            None,
            range,
        )
    }

    fn bind_concat(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let nodes: Vec<_> = tree.child_nodes(syntax.node).collect();
        let ctx = self.reset(BindFlags::INSIDE_CONCATENATION);
        let parts: Vec<ExprId> = nodes
            .into_iter()
            .map(|node| {
                ctx.bind(SyntaxRef {
                    tree: syntax.tree,
                    node,
                })
            })
            .collect();

        let mut width = 0u32;
        let mut four_state = false;
        let mut ok = true;
        for &part in &parts {
            let ty = self.comp.expr(part).ty;
            match self.comp.type_bit_width(ty) {
                Some(w) => width += w,
                None => ok = false,
            }
            four_state |= self.comp.type_is_four_state(ty);
        }
        let ty = if ok && width > 0 {
            self.comp.integral_type(width, false, four_state)
        } else {
            builtin::ERROR
        };
        self.alloc(ExprKind::Concat(parts), ty, None, range)
    }

    fn bind_replication(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let nodes: Vec<_> = tree.child_nodes(syntax.node).collect();
        let Some((&count_node, element_nodes)) = nodes.split_first() else {
            return self.invalid(range);
        };
        let count = self.reset(BindFlags::CONSTANT).bind(SyntaxRef {
            tree: syntax.tree,
            node: count_node,
        });
        let count_value = self.eval_integer(count);
        let ctx = self.reset(BindFlags::INSIDE_CONCATENATION);
        let elements: Vec<ExprId> = element_nodes
            .iter()
            .map(|&node| {
                ctx.bind(SyntaxRef {
                    tree: syntax.tree,
                    node,
                })
            })
            .collect();

        let elem_width: Option<u32> = elements
            .iter()
            .map(|&e| self.comp.type_bit_width(self.comp.expr(e).ty))
            .sum();
        let ty = match (count_value, elem_width) {
            (Some(n), Some(w)) if n > 0 => {
                let total = (n as u32).saturating_mul(w);
                match self.require_valid_bit_width(total, range) {
                    Some(total) => self.comp.integral_type(total, false, true),
                    None => builtin::ERROR,
                }
            }
            _ => builtin::ERROR,
        };
        self.alloc(
            ExprKind::Replication { count, elements },
            ty,
            None,
            range,
        )
    }

    fn bind_element_select(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let mut nodes = tree.child_nodes(syntax.node);
        let Some(value_node) = nodes.next() else {
            return self.invalid(range);
        };
        let select_wrap = nodes.next();
        let value = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: value_node,
        });
        let value_ty = self.comp.expr(value).ty;

        let Some(select_node) = select_wrap
            .and_then(|w| self.comp.tree(syntax.tree).child_nodes(w).next())
        else {
            return self.invalid(range);
        };
        let tree = self.comp.tree(syntax.tree);
        let select_kind = tree.kind(select_node);
        let sub_nodes: Vec<_> = tree.child_nodes(select_node).collect();

        match select_kind {
            SyntaxKind::BitSelect => {
                let Some(&index_node) = sub_nodes.first() else {
                    return self.invalid(range);
                };
                let index = self.reset(BindFlags::empty()).bind(SyntaxRef {
                    tree: syntax.tree,
                    node: index_node,
                });
                let ty = self.element_type_of(value_ty);
                self.alloc(ExprKind::ElementSelect { value, index }, ty, None, range)
            }
            SyntaxKind::SimpleRangeSelect
            | SyntaxKind::AscendingRangeSelect
            | SyntaxKind::DescendingRangeSelect => {
                let (Some(&left_node), Some(&right_node)) =
                    (sub_nodes.first(), sub_nodes.get(1))
                else {
                    return self.invalid(range);
                };
                let select_kind = match select_kind {
                    SyntaxKind::AscendingRangeSelect => RangeSelectKind::IndexedUp,
                    SyntaxKind::DescendingRangeSelect => RangeSelectKind::IndexedDown,
                    _ => RangeSelectKind::Simple,
                };
                let left = self.bind(SyntaxRef {
                    tree: syntax.tree,
                    node: left_node,
                });
                let right = self
                    .reset(BindFlags::CONSTANT)
                    .bind(SyntaxRef {
                        tree: syntax.tree,
                        node: right_node,
                    });

                // Width: constant distance for [l:r]; the right-hand
                // width operand for indexed forms. Probing must not
                // leak diagnostics for non-constant selects.
                let quiet = EvalContext::silent();
                let width = match select_kind {
                    RangeSelectKind::Simple => {
                        let l = crate::eval::eval(self.comp, left, &quiet)
                            .integer()
                            .and_then(SvInt::as_i32);
                        let r = crate::eval::eval(self.comp, right, &quiet)
                            .integer()
                            .and_then(SvInt::as_i32);
                        match (l, r) {
                            (Some(l), Some(r)) => Some(l.abs_diff(r) + 1),
                            _ => None,
                        }
                    }
                    _ => crate::eval::eval(self.comp, right, &quiet)
                        .integer()
                        .and_then(SvInt::as_u32),
                };
                let elem = self.element_type_of(value_ty);
                let ty = match width {
                    Some(w) if w > 0 => {
                        let range_shape = ConstantRange::new(w as i32 - 1, 0);
                        if self.comp.type_is_integral(value_ty) {
                            self.comp.packed_array_type(elem, range_shape)
                        } else {
                            self.comp.intern_type(Type::FixedArray {
                                element: elem,
                                range: range_shape,
                            })
                        }
                    }
                    _ => builtin::ERROR,
                };
                self.alloc(
                    ExprKind::RangeSelect {
                        value,
                        select_kind,
                        left,
                        right,
                    },
                    ty,
                    None,
                    range,
                )
            }
            _ => self.invalid(range),
        }
    }

    /// The type produced by indexing a value once.
    fn element_type_of(&self, ty: TypeId) -> TypeId {
        match self.comp.type_kind(ty) {
            Type::PackedArray { element, .. } => element,
            Type::FixedArray { element, .. }
            | Type::DynamicArray { element }
            | Type::AssociativeArray { element, .. }
            | Type::Queue { element, .. } => element,
            Type::Integral { four_state, .. } => self.comp.integral_type(1, false, four_state),
            Type::Enum { base, .. } => self.element_type_of(base),
            _ => builtin::ERROR,
        }
    }

    fn bind_call(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let mut nodes = tree.child_nodes(syntax.node);
        let Some(callee_node) = nodes.next() else {
            return self.invalid(range);
        };
        let arg_list = nodes.next();

        // Bind arguments (ordered and named alike).
        let mut args = Vec::new();
        if let Some(arg_list) = arg_list {
            let arg_nodes: Vec<_> = tree.child_nodes(arg_list).collect();
            for arg in arg_nodes {
                let tree = self.comp.tree(syntax.tree);
                if let Some(expr_node) = tree.child_nodes(arg).next() {
                    // System functions take data types as arguments
                    // ($bits(logic [7:0])).
                    args.push(
                        self.reset(BindFlags::ALLOW_DATA_TYPE).bind(SyntaxRef {
                            tree: syntax.tree,
                            node: expr_node,
                        }),
                    );
                }
            }
        }

        let tree = self.comp.tree(syntax.tree);
        match tree.kind(callee_node) {
            SyntaxKind::SystemName => {
                let name = tree
                    .child_tokens(callee_node)
                    .next()
                    .and_then(|t| t.ident_name())
                    .unwrap_or(Name::EMPTY);
                self.alloc(
                    ExprKind::Call {
                        subroutine: None,
                        system_name: Some(name),
                        args,
                    },
                    builtin::INT,
                    None,
                    range,
                )
            }
            SyntaxKind::IdentifierName | SyntaxKind::ScopedName => {
                let callee = self.bind(SyntaxRef {
                    tree: syntax.tree,
                    node: callee_node,
                });
                match self.comp.expr(callee).kind {
                    ExprKind::NamedValue(symbol)
                        if matches!(
                            self.comp.symbol(symbol).kind,
                            SymbolKind::Subroutine(_)
                        ) =>
                    {
                        let ty = self.comp.subroutine_return_type(symbol, self);
                        self.alloc(
                            ExprKind::Call {
                                subroutine: Some(symbol),
                                system_name: None,
                                args,
                            },
                            ty,
                            None,
                            range,
                        )
                    }
                    ExprKind::NamedValue(symbol) => {
                        self.comp.diagnostics().add(
                            Diagnostic::new(DiagCode::NotASubroutine, range).with_arg(
                                self.comp
                                    .interner()
                                    .get(self.comp.symbol(symbol).name),
                            ),
                        );
                        self.invalid(range)
                    }
                    _ => self.invalid(range),
                }
            }
            SyntaxKind::MemberAccessExpression => {
                // Built-in enum methods: `e.first()`, `e.last()`,
                // `e.num()`.
                let method_name = tree
                    .child_tokens(callee_node)
                    .find(|t| t.kind == TokenKind::Identifier)
                    .and_then(|t| t.ident_name());
                let value_node = tree.child_nodes(callee_node).next();
                let (Some(method_name), Some(value_node)) = (method_name, value_node) else {
                    return self.invalid(range);
                };
                let value = self.bind(SyntaxRef {
                    tree: syntax.tree,
                    node: value_node,
                });
                let value_ty = self.comp.expr(value).ty;
                let method_text = self.comp.interner().get(method_name);
                let on_enum = matches!(self.comp.type_kind(value_ty), Type::Enum { .. });

                if on_enum && matches!(method_text, "first" | "last" | "num") {
                    // The value expression rides along as the first
                    // argument so evaluation can reach the enum type.
                    let ty = if method_text == "num" {
                        builtin::INT
                    } else {
                        value_ty
                    };
                    let mut all_args = vec![value];
                    all_args.extend(args);
                    self.alloc(
                        ExprKind::Call {
                            subroutine: None,
                            system_name: Some(method_name),
                            args: all_args,
                        },
                        ty,
                        None,
                        range,
                    )
                } else {
                    if !self.comp.type_is_error(value_ty) {
                        self.comp.diagnostics().add(
                            Diagnostic::new(DiagCode::NotASubroutine, range)
                                .with_arg(method_text),
                        );
                    }
                    self.invalid(range)
                }
            }
            _ => self.invalid(range),
        }
    }

    fn bind_cast(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let nodes: Vec<_> = tree.child_nodes(syntax.node).collect();
        let (Some(&target_node), Some(&operand_node)) = (nodes.first(), nodes.get(1)) else {
            return self.invalid(range);
        };
        let operand = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: operand_node,
        });
        let operand_ty = self.comp.expr(operand).ty;

        let tree = self.comp.tree(syntax.tree);
        let target_ty = match tree.kind(target_node) {
            SyntaxKind::TypeReference => match tree.child_nodes(target_node).next() {
                Some(node) => self.resolve_type_syntax(SyntaxRef {
                    tree: syntax.tree,
                    node,
                }),
                None => builtin::ERROR,
            },
            SyntaxKind::IntegerLiteralExpression => {
                // Size cast: `16'(x)` keeps the operand's signedness.
                let width_ref = SyntaxRef {
                    tree: syntax.tree,
                    node: target_node,
                };
                match self.eval_integer_syntax(width_ref) {
                    Some(w) if w > 0 => {
                        let signed = self.comp.type_is_signed(operand_ty);
                        let four_state = self.comp.type_is_four_state(operand_ty);
                        match self.require_valid_bit_width(w as u32, range) {
                            Some(w) => self.comp.integral_type(w, signed, four_state),
                            None => builtin::ERROR,
                        }
                    }
                    _ => builtin::ERROR,
                }
            }
            SyntaxKind::IdentifierName | SyntaxKind::ScopedName => {
                self.resolve_type_syntax(SyntaxRef {
                    tree: syntax.tree,
                    node: target_node,
                })
            }
            _ => builtin::ERROR,
        };
        self.alloc(ExprKind::Conversion { operand }, target_ty, None, range)
    }

    fn bind_assignment(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        // Skip an intra-assignment timing control between the sides.
        let expr_nodes: Vec<_> = tree
            .child_nodes(syntax.node)
            .filter(|&n| tree.kind(n).is_expression())
            .collect();
        let (Some(&lhs_node), Some(&rhs_node)) = (expr_nodes.first(), expr_nodes.last()) else {
            return self.invalid(range);
        };
        if lhs_node == rhs_node {
            return self.invalid(range);
        }
        let non_blocking = tree
            .child_tokens(syntax.node)
            .any(|t| t.kind == TokenKind::LtEq);

        let lhs = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: lhs_node,
        });
        let rhs = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: rhs_node,
        });
        let lhs_expr = self.comp.expr(lhs);
        self.require_lvalue(&lhs_expr, lhs_expr.range);
        self.alloc(
            ExprKind::Assignment {
                lhs,
                rhs,
                non_blocking,
            },
            lhs_expr.ty,
            None,
            range,
        )
    }

    fn bind_inside(&self, syntax: SyntaxRef, range: SourceRange) -> ExprId {
        let tree = self.comp.tree(syntax.tree);
        let mut nodes = tree.child_nodes(syntax.node);
        let Some(value_node) = nodes.next() else {
            return self.invalid(range);
        };
        let list_node = nodes.next();
        let value = self.bind(SyntaxRef {
            tree: syntax.tree,
            node: value_node,
        });

        let mut ranges = Vec::new();
        if let Some(list_node) = list_node {
            let items: Vec<_> = tree.child_nodes(list_node).collect();
            for item in items {
                let tree = self.comp.tree(syntax.tree);
                if tree.kind(item) == SyntaxKind::ValueRangeExpression {
                    let mut bounds = tree.child_nodes(item);
                    let (Some(lo), Some(hi)) = (bounds.next(), bounds.next()) else {
                        continue;
                    };
                    let lo = self.bind(SyntaxRef {
                        tree: syntax.tree,
                        node: lo,
                    });
                    let hi = self.bind(SyntaxRef {
                        tree: syntax.tree,
                        node: hi,
                    });
                    ranges.push((lo, Some(hi)));
                } else {
                    let single = self.bind(SyntaxRef {
                        tree: syntax.tree,
                        node: item,
                    });
                    ranges.push((single, None));
                }
            }
        }
        let four_state = self.comp.type_is_four_state(self.comp.expr(value).ty);
        let ty = self.comp.integral_type(1, false, four_state);
        self.alloc(ExprKind::Inside { value, ranges }, ty, None, range)
    }
}

// === Type resolution and symbol value APIs ===

impl BindContext<'_> {
    /// Resolve a data type syntax node to a type, evaluating packed
    /// dimensions in this context.
    pub fn resolve_type_syntax(&self, syntax: SyntaxRef) -> TypeId {
        let comp = self.comp;
        let tree = comp.tree(syntax.tree);
        let node = syntax.node;
        let range = tree.range(node);

        match tree.kind(node) {
            SyntaxKind::IntegerVectorType => {
                let four_state = !tree
                    .child_tokens(node)
                    .any(|t| t.kind == TokenKind::Bit);
                let signed = tree.child_tokens(node).any(|t| t.kind == TokenKind::Signed);
                let base = comp.integral_type(1, signed, four_state);
                self.apply_packed_dimensions(base, syntax)
            }
            SyntaxKind::IntegerAtomType => {
                let keyword = tree.child_tokens(node).next().map(|t| t.kind);
                let base = match keyword {
                    Some(TokenKind::Byte) => builtin::BYTE,
                    Some(TokenKind::ShortInt) => builtin::SHORT_INT,
                    Some(TokenKind::LongInt) => builtin::LONG_INT,
                    Some(TokenKind::Integer) => builtin::INTEGER,
                    Some(TokenKind::Time) => builtin::TIME,
                    _ => builtin::INT,
                };
                // `unsigned` (or redundant `signed`) overrides the
                // atom's default signedness.
                let signing = tree
                    .child_tokens(node)
                    .find(|t| matches!(t.kind, TokenKind::Signed | TokenKind::Unsigned))
                    .map(|t| t.kind == TokenKind::Signed);
                match signing {
                    Some(signed) if signed != comp.type_is_signed(base) => {
                        let width = comp.type_bit_width(base).unwrap_or(32);
                        comp.integral_type(width, signed, comp.type_is_four_state(base))
                    }
                    _ => base,
                }
            }
            SyntaxKind::FloatingType => {
                let keyword = tree.child_tokens(node).next().map(|t| t.kind);
                match keyword {
                    Some(TokenKind::ShortReal) => builtin::SHORT_REAL,
                    Some(TokenKind::RealTime) => builtin::REAL_TIME,
                    _ => builtin::REAL,
                }
            }
            SyntaxKind::StringType => builtin::STRING,
            SyntaxKind::VoidType => builtin::VOID,
            SyntaxKind::EventType => builtin::EVENT,
            SyntaxKind::EnumType => {
                let base = match tree
                    .child_nodes(node)
                    .find(|&n| tree.kind(n).is_data_type())
                {
                    Some(base_node) => self.resolve_type_syntax(SyntaxRef {
                        tree: syntax.tree,
                        node: base_node,
                    }),
                    None => builtin::INT,
                };
                let members = comp.enum_members_of(syntax);
                comp.intern_type(Type::Enum { base, members })
            }
            SyntaxKind::StructUnionType => self.resolve_struct_type(syntax),
            SyntaxKind::NamedType => {
                let Some(name) = ident_of(tree, node) else {
                    return builtin::ERROR;
                };
                // `pkg::type_name` scoped types.
                let idents: Vec<Name> = tree
                    .child_tokens(node)
                    .filter(|t| t.kind == TokenKind::Identifier)
                    .filter_map(|t| t.ident_name())
                    .collect();
                let has_scope = tree
                    .child_tokens(node)
                    .any(|t| t.kind == TokenKind::DoubleColon);
                let symbol = if has_scope && idents.len() >= 2 {
                    comp.lookup_package_qualified(idents[0], idents[1], range)
                } else {
                    comp.lookup_unqualified(self.scope, name, range)
                };
                let Some(symbol) = symbol else {
                    return builtin::ERROR;
                };
                let base = match &comp.symbol(symbol).kind {
                    SymbolKind::TypeAlias { target } => {
                        comp.resolve_declared_type(target, self.scope)
                    }
                    _ => {
                        comp.diagnostics().add(
                            Diagnostic::new(DiagCode::ExpectedDataType, range)
                                .with_arg(comp.interner().get(name)),
                        );
                        builtin::ERROR
                    }
                };
                self.apply_packed_dimensions(base, syntax)
            }
            SyntaxKind::ImplicitType => {
                let signed = tree.child_tokens(node).any(|t| t.kind == TokenKind::Signed);
                let base = comp.integral_type(1, signed, true);
                self.apply_packed_dimensions(base, syntax)
            }
            _ => builtin::ERROR,
        }
    }

    fn resolve_struct_type(&self, syntax: SyntaxRef) -> TypeId {
        let comp = self.comp;
        let tree = comp.tree(syntax.tree);
        let Some(view) = alder_syntax::StructTypeView::cast(tree, syntax.node) else {
            return builtin::ERROR;
        };
        let packed = view.is_packed(tree);
        let member_nodes: Vec<_> = view.members(tree).collect();

        let mut fields: Vec<(Name, TypeId)> = Vec::new();
        for member in member_nodes {
            let tree = comp.tree(syntax.tree);
            let field_type_node = tree
                .child_nodes(member)
                .find(|&n| tree.kind(n).is_data_type());
            let field_ty = match field_type_node {
                Some(n) => self.resolve_type_syntax(SyntaxRef {
                    tree: syntax.tree,
                    node: n,
                }),
                None => builtin::ERROR,
            };
            let tree = comp.tree(syntax.tree);
            let declarators: Vec<Name> = tree
                .children_of_kind(member, SyntaxKind::Declarator)
                .filter_map(|d| ident_of(tree, d))
                .collect();
            for name in declarators {
                fields.push((name, field_ty));
            }
        }

        if packed {
            let mut width = 0u32;
            for &(_, ty) in &fields {
                match comp.type_bit_width(ty) {
                    Some(w) => width += w,
                    None => return builtin::ERROR,
                }
            }
            comp.intern_type(Type::PackedStruct { fields, width })
        } else {
            comp.intern_type(Type::UnpackedStruct { fields })
        }
    }

    /// Fold packed dimensions written on a type, rightmost innermost.
    fn apply_packed_dimensions(&self, base: TypeId, syntax: SyntaxRef) -> TypeId {
        let comp = self.comp;
        let tree = comp.tree(syntax.tree);
        let dims: Vec<_> = tree
            .children_of_kind(syntax.node, SyntaxKind::VariableDimension)
            .collect();

        let mut ty = base;
        for &dim in dims.iter().rev() {
            let Some(range) = self.eval_packed_dimension(SyntaxRef {
                tree: syntax.tree,
                node: dim,
            }) else {
                return builtin::ERROR;
            };
            let elem_width = comp.type_bit_width(ty).unwrap_or(1);
            let dim_range = comp.tree(syntax.tree).range(dim);
            if self
                .require_valid_bit_width(elem_width.saturating_mul(range.width()), dim_range)
                .is_none()
            {
                return builtin::ERROR;
            }
            ty = comp.packed_array_type(ty, range);
        }
        ty
    }

    /// Wrap a type in unpacked dimensions from a declarator,
    /// rightmost innermost.
    fn apply_unpacked_dimensions(&self, base: TypeId, declarator: SyntaxRef) -> TypeId {
        let comp = self.comp;
        let tree = comp.tree(declarator.tree);
        let dims: Vec<_> = tree
            .children_of_kind(declarator.node, SyntaxKind::VariableDimension)
            .collect();

        let mut ty = base;
        for &dim in dims.iter().rev() {
            let evaluated = self.eval_dimension(
                SyntaxRef {
                    tree: declarator.tree,
                    node: dim,
                },
                false,
            );
            ty = match evaluated.kind {
                DimensionKind::Range | DimensionKind::AbbreviatedRange => {
                    match evaluated.range {
                        Some(range) => comp.intern_type(Type::FixedArray {
                            element: ty,
                            range,
                        }),
                        None => builtin::ERROR,
                    }
                }
                DimensionKind::Dynamic => comp.intern_type(Type::DynamicArray { element: ty }),
                DimensionKind::Associative => comp.intern_type(Type::AssociativeArray {
                    element: ty,
                    index: evaluated.associative_type,
                }),
                DimensionKind::Queue => comp.intern_type(Type::Queue {
                    element: ty,
                    max_bound: evaluated.queue_max_size,
                }),
                DimensionKind::Unknown => builtin::ERROR,
            };
        }
        ty
    }
}

impl Compilation {
    /// Resolve a declared type (type syntax plus declarator unpacked
    /// dimensions), memoized per declaration.
    pub fn resolve_declared_type(
        &self,
        declared: &crate::symbol::DeclaredType,
        scope: ScopeId,
    ) -> TypeId {
        *declared.resolved.get_or_init(|| {
            let ctx = BindContext::new(self, scope);
            let base = match declared.type_syntax {
                Some(ts) => ctx.resolve_type_syntax(ts),
                // A fully implicit type defaults to a 1-bit logic.
                None => builtin::LOGIC,
            };
            match declared.declarator {
                Some(declarator) => ctx.apply_unpacked_dimensions(base, declarator),
                None => base,
            }
        })
    }

    /// The type of a value symbol, as seen by an expression that
    /// names it.
    pub fn value_type(&self, symbol: SymbolId, ctx: &BindContext<'_>) -> TypeId {
        let scope = self.symbol(symbol).parent.unwrap_or(ctx.scope);
        match &self.symbol(symbol).kind {
            SymbolKind::Parameter(data) => {
                if data.declared.type_syntax.is_some() {
                    self.resolve_declared_type(&data.declared, scope)
                } else {
                    // Implicitly typed parameters take the type of
                    // their value.
                    match self.parameter_value(symbol) {
                        ConstantValue::Integer(v) => {
                            self.integral_type(v.width(), v.is_signed(), v.has_unknown())
                        }
                        ConstantValue::Real(_) => builtin::REAL,
                        ConstantValue::Str(_) => builtin::STRING,
                        ConstantValue::Bad => builtin::ERROR,
                    }
                }
            }
            SymbolKind::Net { declared, .. } => self.resolve_declared_type(declared, scope),
            SymbolKind::Variable { declared, .. } => self.resolve_declared_type(declared, scope),
            SymbolKind::FormalArgument { declared, .. } => {
                self.resolve_declared_type(declared, scope)
            }
            SymbolKind::EnumValue(data) => self.enum_base_type(symbol, data),
            SymbolKind::Port(data) => match data.internal_symbol.get() {
                Some(&internal) => self.value_type(internal, ctx),
                None => builtin::LOGIC,
            },
            SymbolKind::ModportPort { internal, .. } => match internal.get() {
                Some(&internal) => self.value_type(internal, ctx),
                None => builtin::ERROR,
            },
            SymbolKind::Subroutine(_) => self.subroutine_return_type(symbol, ctx),
            _ => builtin::ERROR,
        }
    }

    pub fn subroutine_return_type(&self, symbol: SymbolId, _ctx: &BindContext<'_>) -> TypeId {
        let scope = self.symbol(symbol).parent.unwrap_or(self.root_scope());
        match &self.symbol(symbol).kind {
            SymbolKind::Subroutine(data) => {
                if data.is_task {
                    builtin::VOID
                } else if data.return_type.type_syntax.is_some() {
                    self.resolve_declared_type(&data.return_type, scope)
                } else {
                    builtin::LOGIC
                }
            }
            _ => builtin::ERROR,
        }
    }

    fn enum_base_type(&self, symbol: SymbolId, data: &crate::symbol::EnumValueData) -> TypeId {
        *data.base.get_or_init(|| {
            let scope = self.symbol(symbol).parent.unwrap_or(self.root_scope());
            match data.base_syntax {
                Some(ts) => {
                    let ctx = BindContext::new(self, scope);
                    ctx.resolve_type_syntax(ts)
                }
                None => builtin::INT,
            }
        })
    }

    /// The value of a parameter: `eval(override ?? initializer)` in
    /// the owning scope, memoized. Self-referential parameters
    /// produce `Bad` with one diagnostic.
    pub fn parameter_value(&self, symbol: SymbolId) -> ConstantValue {
        let SymbolKind::Parameter(data) = &self.symbol(symbol).kind else {
            return ConstantValue::Bad;
        };
        if let Some(value) = data.value.get() {
            return value.clone();
        }
        if data.evaluating.replace(true) {
            self.diagnostics().add(
                Diagnostic::new(
                    DiagCode::ExpressionNotConstant,
                    SourceRange::point(self.symbol(symbol).location),
                )
                .with_arg(self.interner().get(self.symbol(symbol).name)),
            );
            return ConstantValue::Bad;
        }

        let owning_scope = self.symbol(symbol).parent.unwrap_or(self.root_scope());
        let value = match (&data.override_expr, data.initializer) {
            (Some((syntax, override_scope)), _) => {
                self.eval_parameter_expr(symbol, *syntax, *override_scope)
            }
            (None, Some(init)) => self.eval_parameter_expr(symbol, init, owning_scope),
            (None, None) => {
                self.diagnostics().add(
                    Diagnostic::new(
                        DiagCode::ExpressionNotConstant,
                        SourceRange::point(self.symbol(symbol).location),
                    )
                    .with_arg(self.interner().get(self.symbol(symbol).name)),
                );
                ConstantValue::Bad
            }
        };

        data.evaluating.set(false);
        data.value.get_or_init(|| value).clone()
    }

    fn eval_parameter_expr(
        &self,
        symbol: SymbolId,
        syntax: SyntaxRef,
        scope: ScopeId,
    ) -> ConstantValue {
        let ctx = BindContext::new(self, scope).with_flags(BindFlags::CONSTANT);
        let expr = ctx.bind(syntax);
        let eval_ctx = EvalContext::new();
        let value = crate::eval::eval(self, expr, &eval_ctx);

        // Convert to the declared type, when there is one.
        let SymbolKind::Parameter(data) = &self.symbol(symbol).kind else {
            return value;
        };
        if data.declared.type_syntax.is_none() {
            return value;
        }
        let owning_scope = self.symbol(symbol).parent.unwrap_or(self.root_scope());
        let target = self.resolve_declared_type(&data.declared, owning_scope);
        self.convert_constant(value, target)
    }

    /// Convert a constant to a target type's width and signedness.
    pub fn convert_constant(&self, value: ConstantValue, target: TypeId) -> ConstantValue {
        match (&value, self.type_bit_width(target)) {
            (ConstantValue::Integer(v), Some(width)) => {
                let resized = v.resize(width).as_signed(self.type_is_signed(target));
                ConstantValue::Integer(resized)
            }
            _ => value,
        }
    }

    /// The value of an enum member: its initializer, or the previous
    /// member's value plus one (zero for the first).
    pub fn enum_value(&self, symbol: SymbolId) -> ConstantValue {
        let SymbolKind::EnumValue(data) = &self.symbol(symbol).kind else {
            return ConstantValue::Bad;
        };
        if let Some(value) = data.value.get() {
            return value.clone();
        }
        if data.evaluating.replace(true) {
            return ConstantValue::Bad;
        }

        let scope = self.symbol(symbol).parent.unwrap_or(self.root_scope());
        let base = self.enum_base_type(symbol, data);
        let width = self.type_bit_width(base).unwrap_or(32);
        let signed = self.type_is_signed(base);

        let value = match (data.initializer, data.previous) {
            (Some(init), _) => {
                let ctx = BindContext::new(self, scope).with_flags(BindFlags::CONSTANT);
                let expr = ctx.bind(init);
                let eval_ctx = EvalContext::new();
                let value = crate::eval::eval(self, expr, &eval_ctx);
                match value {
                    ConstantValue::Integer(v) => {
                        if v.has_unknown() {
                            self.diagnostics().add(Diagnostic::new(
                                DiagCode::EnumValueUnknownBits,
                                self.expr(expr).range,
                            ));
                        }
                        ConstantValue::Integer(v.resize(width).as_signed(signed))
                    }
                    other => other,
                }
            }
            (None, Some(previous)) => match self.enum_value(previous) {
                ConstantValue::Integer(v) => ConstantValue::Integer(
                    v.add(&SvInt::from_u64(1, v.width(), v.is_signed()))
                        .resize(width)
                        .as_signed(signed),
                ),
                _ => ConstantValue::Bad,
            },
            (None, None) => {
                ConstantValue::Integer(SvInt::zero(width).as_signed(signed))
            }
        };

        data.evaluating.set(false);
        data.value.get_or_init(|| value).clone()
    }

    /// The bound initializer of a variable, if it has one.
    pub fn variable_initializer(&self, symbol: SymbolId) -> Option<ExprId> {
        let SymbolKind::Variable {
            initializer,
            initializer_expr,
            ..
        } = &self.symbol(symbol).kind
        else {
            return None;
        };
        *initializer_expr.get_or_init(|| {
            let init = (*initializer)?;
            let scope = self.symbol(symbol).parent?;
            let ctx = BindContext::new(self, scope);
            Some(ctx.bind(init))
        })
    }

    /// The bound assignment of a continuous assign symbol.
    pub fn continuous_assign_expr(&self, symbol: SymbolId) -> Option<ExprId> {
        let SymbolKind::ContinuousAssign { assignment, bound } = &self.symbol(symbol).kind
        else {
            return None;
        };
        let scope = self.symbol(symbol).parent?;
        Some(*bound.get_or_init(|| {
            let ctx = BindContext::new(self, scope).with_flags(BindFlags::ASSIGNMENT_ALLOWED);
            ctx.bind(*assignment)
        }))
    }

    /// A port's bound external connection, if one was provided.
    pub fn port_connection(&self, symbol: SymbolId) -> Option<ExprId> {
        let SymbolKind::Port(data) = &self.symbol(symbol).kind else {
            return None;
        };
        *data.external_expr.get_or_init(|| {
            let external = data.external.borrow().clone()?;
            match external {
                crate::symbol::ExternalConnection::Expr(syntax, scope) => {
                    let ctx = BindContext::new(self, scope);
                    Some(ctx.bind(syntax))
                }
                crate::symbol::ExternalConnection::Implicit(scope) => {
                    let name = self.symbol(symbol).name;
                    let target = self.lookup_unqualified_quiet(scope, name)?;
                    let ctx = BindContext::new(self, scope);
                    let ty = self.value_type(target, &ctx);
                    Some(self.alloc_expr(Expression {
                        kind: ExprKind::NamedValue(target),
                        ty,
                        constant: None,
                        range: SourceRange::point(self.symbol(symbol).location),
                    }))
                }
                crate::symbol::ExternalConnection::Open => None,
            }
        })
    }

    /// The bound internal connection of an explicit port
    /// (`.name(expr)` in the header), bound against the body scope.
    pub fn port_internal_connection(&self, symbol: SymbolId) -> Option<ExprId> {
        let SymbolKind::Port(data) = &self.symbol(symbol).kind else {
            return None;
        };
        let syntax = data.internal_connection?;
        let scope = self.symbol(symbol).parent?;
        let ctx = BindContext::new(self, scope);
        Some(ctx.bind(syntax))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_non_sticky_flags() {
        let interner: &'static alder_syntax::StringInterner =
            Box::leak(Box::new(alder_syntax::StringInterner::new()));
        let comp = Compilation::new(interner);
        let ctx = BindContext::new(&comp, comp.root_scope()).with_flags(
            BindFlags::CONSTANT | BindFlags::INSIDE_CONCATENATION | BindFlags::ALLOW_DATA_TYPE,
        );

        let child = ctx.reset(BindFlags::empty());
        assert!(child.flags.contains(BindFlags::CONSTANT));
        assert!(!child.flags.contains(BindFlags::INSIDE_CONCATENATION));
        assert!(!child.flags.contains(BindFlags::ALLOW_DATA_TYPE));

        let with_added = ctx.reset(BindFlags::ALLOW_DATA_TYPE);
        assert!(with_added.flags.contains(BindFlags::ALLOW_DATA_TYPE));
        assert!(with_added.flags.contains(BindFlags::CONSTANT));
    }

    #[test]
    fn require_checks_record_diagnostics() {
        let interner: &'static alder_syntax::StringInterner =
            Box::leak(Box::new(alder_syntax::StringInterner::new()));
        let comp = Compilation::new(interner);
        let ctx = BindContext::new(&comp, comp.root_scope());
        let range = SourceRange::NONE;

        assert!(!ctx.require_integral(&ConstantValue::Real(1.5), range));
        assert!(comp.diagnostics().contains(DiagCode::ValueMustBeIntegral));

        // Bad short-circuits without a diagnostic of its own.
        let before = comp.diagnostics().len();
        assert!(!ctx.require_integral(&ConstantValue::Bad, range));
        assert_eq!(comp.diagnostics().len(), before);

        assert!(!ctx.require_no_unknowns(&SvInt::all_x(4), range));
        assert!(comp
            .diagnostics()
            .contains(DiagCode::ValueMustNotBeUnknown));

        assert!(!ctx.require_gt_zero(Some(0), range));
        assert!(!ctx.require_gt_zero(Some(-3), range));
        assert!(ctx.require_gt_zero(Some(1), range));
        assert!(comp.diagnostics().contains(DiagCode::ValueMustBePositive));
    }

    #[test]
    fn bit_width_limit() {
        let interner: &'static alder_syntax::StringInterner =
            Box::leak(Box::new(alder_syntax::StringInterner::new()));
        let comp = Compilation::new(interner);
        let ctx = BindContext::new(&comp, comp.root_scope());

        assert_eq!(ctx.require_valid_bit_width(8, SourceRange::NONE), Some(8));
        assert_eq!(
            ctx.require_valid_bit_width(SvInt::MAX_BITS, SourceRange::NONE),
            Some(SvInt::MAX_BITS)
        );
        assert_eq!(
            ctx.require_valid_bit_width(SvInt::MAX_BITS + 1, SourceRange::NONE),
            None
        );
        assert!(comp
            .diagnostics()
            .contains(DiagCode::ValueExceedsMaxBitWidth));
    }
}
