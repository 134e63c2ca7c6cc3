//! The expression AST.
//!
//! Everything that can appear in a WHERE clause, a select list or an
//! assignment is a variant of [`Expression`]. Nodes are built through the
//! fluent constructors ([`col`], [`raw`], [`assign`], the aggregate
//! functions) and combined with the methods on [`Column`], [`Predicate`]
//! and friends.

use crate::table::{ColumnSrc, Subquery};
use crate::value::Value;

/// Binary and unary operators the renderer knows how to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Gt,
    And,
    Or,
    Not,
    Add,
    Mul,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Not => "NOT",
            Op::Add => "+",
            Op::Mul => "*",
        }
    }
}

/// One node of the expression tree.
#[derive(Debug)]
pub enum Expression {
    Column(Column),
    Value(Value),
    Raw(Raw),
    Aggregate(Aggregate),
    Math(Box<MathExpr>),
    Predicate(Box<Predicate>),
    Subquery(Subquery),
    SubqueryExpr(SubqueryExpr),
}

impl Expression {
    /// Node name used in error messages.
    pub(crate) fn node_name(&self) -> &'static str {
        match self {
            Expression::Column(_) => "Column",
            Expression::Value(_) => "Value",
            Expression::Raw(_) => "Raw",
            Expression::Aggregate(_) => "Aggregate",
            Expression::Math(_) => "MathExpr",
            Expression::Predicate(_) => "Predicate",
            Expression::Subquery(_) => "Subquery",
            Expression::SubqueryExpr(_) => "SubqueryExpr",
        }
    }

    /// Composite nodes are parenthesized when they appear as an operand.
    pub(crate) fn is_composite(&self) -> bool {
        matches!(self, Expression::Predicate(_) | Expression::Math(_))
    }
}

/// Anything that can become an operand. Implemented for AST nodes and for
/// plain Rust scalars, which enter the tree as bound [`Value`] arguments.
pub trait IntoExpr {
    fn into_expr(self) -> Expression;
}

impl IntoExpr for Expression {
    fn into_expr(self) -> Expression {
        self
    }
}

macro_rules! impl_into_expr_for_scalar {
    ($($t:ty)*) => {$(
        impl IntoExpr for $t {
            fn into_expr(self) -> Expression {
                Expression::Value(self.into())
            }
        }
    )*};
}

impl_into_expr_for_scalar!(bool i8 i16 i32 i64 u8 u16 u32 f32 f64 String Vec<u8>);

impl IntoExpr for &str {
    fn into_expr(self) -> Expression {
        Expression::Value(self.into())
    }
}

impl<T: Into<Value>> IntoExpr for Option<T> {
    fn into_expr(self) -> Expression {
        Expression::Value(self.into())
    }
}

impl IntoExpr for Value {
    fn into_expr(self) -> Expression {
        Expression::Value(self)
    }
}

/// A reference to an entity field, optionally qualified by a table or
/// subquery source and optionally aliased in a select list.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) src: Option<ColumnSrc>,
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
}

/// References a field of the statement's root model by struct-field name.
pub fn col(name: impl Into<String>) -> Column {
    Column {
        src: None,
        name: name.into(),
        alias: None,
    }
}

impl Column {
    pub(crate) fn with_src(src: ColumnSrc, name: String) -> Column {
        Column {
            src: Some(src),
            name,
            alias: None,
        }
    }

    /// Select-list alias, rendered as `AS`.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn eq(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(Expression::Column(self), Op::Eq, rhs.into_expr())
    }

    pub fn lt(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(Expression::Column(self), Op::Lt, rhs.into_expr())
    }

    pub fn gt(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(Expression::Column(self), Op::Gt, rhs.into_expr())
    }

    pub fn add(self, rhs: impl IntoExpr) -> MathExpr {
        MathExpr {
            left: Expression::Column(self),
            op: Op::Add,
            right: rhs.into_expr(),
        }
    }

    pub fn mul(self, rhs: impl IntoExpr) -> MathExpr {
        MathExpr {
            left: Expression::Column(self),
            op: Op::Mul,
            right: rhs.into_expr(),
        }
    }
}

impl IntoExpr for Column {
    fn into_expr(self) -> Expression {
        Expression::Column(self)
    }
}

impl From<Column> for Expression {
    fn from(c: Column) -> Self {
        Expression::Column(c)
    }
}

/// A boolean condition. `left` and `op` may be absent: a raw fragment used
/// as a predicate has neither, a NOT has no left operand.
#[derive(Debug)]
pub struct Predicate {
    pub(crate) left: Option<Expression>,
    pub(crate) op: Option<Op>,
    pub(crate) right: Option<Expression>,
}

impl Predicate {
    fn binary(left: Expression, op: Op, right: Expression) -> Predicate {
        Predicate {
            left: Some(left),
            op: Some(op),
            right: Some(right),
        }
    }

    pub fn and(self, rhs: Predicate) -> Predicate {
        Predicate::binary(self.into_expr(), Op::And, rhs.into_expr())
    }

    pub fn or(self, rhs: Predicate) -> Predicate {
        Predicate::binary(self.into_expr(), Op::Or, rhs.into_expr())
    }
}

/// Negates a predicate.
pub fn not(p: Predicate) -> Predicate {
    Predicate {
        left: None,
        op: Some(Op::Not),
        right: Some(p.into_expr()),
    }
}

impl IntoExpr for Predicate {
    fn into_expr(self) -> Expression {
        Expression::Predicate(Box::new(self))
    }
}

impl From<Predicate> for Expression {
    fn from(p: Predicate) -> Self {
        p.into_expr()
    }
}

/// An arithmetic expression, usable on either side of a comparison and in
/// assignments.
#[derive(Debug)]
pub struct MathExpr {
    pub(crate) left: Expression,
    pub(crate) op: Op,
    pub(crate) right: Expression,
}

impl MathExpr {
    pub fn add(self, rhs: impl IntoExpr) -> MathExpr {
        MathExpr {
            left: self.into_expr(),
            op: Op::Add,
            right: rhs.into_expr(),
        }
    }

    pub fn mul(self, rhs: impl IntoExpr) -> MathExpr {
        MathExpr {
            left: self.into_expr(),
            op: Op::Mul,
            right: rhs.into_expr(),
        }
    }

    pub fn eq(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(self.into_expr(), Op::Eq, rhs.into_expr())
    }

    pub fn lt(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(self.into_expr(), Op::Lt, rhs.into_expr())
    }

    pub fn gt(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(self.into_expr(), Op::Gt, rhs.into_expr())
    }
}

impl IntoExpr for MathExpr {
    fn into_expr(self) -> Expression {
        Expression::Math(Box::new(self))
    }
}

impl From<MathExpr> for Expression {
    fn from(m: MathExpr) -> Self {
        m.into_expr()
    }
}

/// A verbatim SQL fragment with bound arguments. The renderer splices the
/// text without inspection.
#[derive(Debug, Clone)]
pub struct Raw {
    pub(crate) sql: String,
    pub(crate) args: Vec<Value>,
}

/// A raw SQL fragment. Arguments are attached with [`Raw::bind`].
pub fn raw(sql: impl Into<String>) -> Raw {
    Raw {
        sql: sql.into(),
        args: Vec::new(),
    }
}

impl Raw {
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Uses the fragment as a standalone condition.
    pub fn as_predicate(self) -> Predicate {
        Predicate {
            left: Some(Expression::Raw(self)),
            op: None,
            right: None,
        }
    }
}

impl IntoExpr for Raw {
    fn into_expr(self) -> Expression {
        Expression::Raw(self)
    }
}

impl From<Raw> for Expression {
    fn from(r: Raw) -> Self {
        Expression::Raw(r)
    }
}

/// An aggregate function call over one field.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub(crate) src: Option<ColumnSrc>,
    pub(crate) func: &'static str,
    pub(crate) arg: String,
    pub(crate) alias: Option<String>,
}

macro_rules! aggregate_fns {
    ($(($fn_name:ident, $sql_name:literal)),* $(,)?) => {$(
        #[doc = concat!("The `", $sql_name, "` aggregate over one field.")]
        pub fn $fn_name(field: impl Into<String>) -> Aggregate {
            Aggregate {
                src: None,
                func: $sql_name,
                arg: field.into(),
                alias: None,
            }
        }
    )*};
}

aggregate_fns![
    (avg, "AVG"),
    (max, "MAX"),
    (min, "MIN"),
    (count, "COUNT"),
    (sum, "SUM"),
];

impl Aggregate {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub(crate) fn set_src(&mut self, src: ColumnSrc) {
        self.src = Some(src);
    }

    pub fn eq(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(Expression::Aggregate(self), Op::Eq, rhs.into_expr())
    }

    pub fn lt(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(Expression::Aggregate(self), Op::Lt, rhs.into_expr())
    }

    pub fn gt(self, rhs: impl IntoExpr) -> Predicate {
        Predicate::binary(Expression::Aggregate(self), Op::Gt, rhs.into_expr())
    }
}

impl IntoExpr for Aggregate {
    fn into_expr(self) -> Expression {
        Expression::Aggregate(self)
    }
}

impl From<Aggregate> for Expression {
    fn from(a: Aggregate) -> Self {
        Expression::Aggregate(a)
    }
}

/// A subquery prefixed by a quantifier keyword, valid only as the right
/// operand of a comparison.
#[derive(Debug)]
pub struct SubqueryExpr {
    pub(crate) keyword: &'static str,
    pub(crate) sub: Subquery,
}

/// `ANY (subquery)`.
pub fn any_of(sub: Subquery) -> SubqueryExpr {
    SubqueryExpr {
        keyword: "ANY",
        sub,
    }
}

/// `ALL (subquery)`.
pub fn all_of(sub: Subquery) -> SubqueryExpr {
    SubqueryExpr {
        keyword: "ALL",
        sub,
    }
}

/// `SOME (subquery)`.
pub fn some_of(sub: Subquery) -> SubqueryExpr {
    SubqueryExpr {
        keyword: "SOME",
        sub,
    }
}

impl IntoExpr for SubqueryExpr {
    fn into_expr(self) -> Expression {
        Expression::SubqueryExpr(self)
    }
}

impl IntoExpr for Subquery {
    fn into_expr(self) -> Expression {
        Expression::Subquery(self)
    }
}

/// An explicit assignment in a SET list or an upsert.
#[derive(Debug)]
pub struct Assignment {
    pub(crate) field: String,
    pub(crate) value: Expression,
}

/// Assigns an expression to the named field's column.
pub fn assign(field: impl Into<String>, value: impl IntoExpr) -> Assignment {
    Assignment {
        field: field.into(),
        value: value.into_expr(),
    }
}

/// The forms accepted by SET lists and upsert update lists.
#[derive(Debug)]
pub enum Assignable {
    /// Assign the named field its value from the statement's entity.
    Column(Column),
    /// Assign an explicit expression.
    Assign(Assignment),
    /// A verbatim fragment, spliced as-is.
    Raw(Raw),
}

impl Assignable {
    pub(crate) fn node_name(&self) -> &'static str {
        match self {
            Assignable::Column(_) => "Column",
            Assignable::Assign(_) => "Assignment",
            Assignable::Raw(_) => "Raw",
        }
    }
}

impl From<Column> for Assignable {
    fn from(c: Column) -> Self {
        Assignable::Column(c)
    }
}

impl From<Assignment> for Assignable {
    fn from(a: Assignment) -> Self {
        Assignable::Assign(a)
    }
}

impl From<Raw> for Assignable {
    fn from(r: Raw) -> Self {
        Assignable::Raw(r)
    }
}
