use super::{Select, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// AND a set of expressions
    And(Vec<Expr>),

    /// Binary expression
    BinaryOp(ExprBinaryOp),

    /// `CASE [operand] WHEN .. THEN .. ELSE .. END`
    Case(ExprCase),

    /// Cast an expression to a different type
    Cast(ExprCast),

    /// A column, optionally qualified by a table name or alias
    Column(ExprColumn),

    /// The `DEFAULT` keyword in an insert row or assignment
    Default,

    /// `EXISTS (subquery)`
    Exists(Box<Select>),

    /// Function call
    Func(ExprFunc),

    /// `expr [NOT] IN (list)`
    InList(ExprInList),

    /// `(exprs) [NOT] IN (subquery)`
    InSubquery(ExprInSubquery),

    /// `expr IS [NOT] NULL`
    IsNull(ExprIsNull),

    /// Aggregates the rows of the enclosing query into a JSON array
    JsonAgg(Box<Expr>),

    /// Builds a JSON object from key/value pairs
    JsonObject(ExprJsonObject),

    /// `expr [NOT] LIKE pattern`
    Like(ExprLike),

    /// Negates a boolean expression
    Not(Box<Expr>),

    /// OR a set of expressions
    Or(Vec<Expr>),

    /// `*`, only valid as a function argument
    Star,

    /// A scalar subquery
    Subquery(Box<Select>),

    /// A constant value
    Value(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,

    /// `||` concatenation (Postgres arrays)
    Concat,

    /// `->` JSON element, result is JSON
    JsonGet,

    /// `->>` JSON element, result is text
    JsonGetText,

    /// `#>` JSON path, result is JSON
    JsonPath,

    /// `#>>` JSON path, result is text
    JsonPathText,

    /// `@>` containment
    Contains,

    /// `&&` array overlap
    Overlaps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprBinaryOp {
    pub lhs: Box<Expr>,
    pub op: BinaryOp,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprCase {
    pub operand: Option<Box<Expr>>,
    pub whens: Vec<(Expr, Expr)>,
    pub otherwise: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprCast {
    pub expr: Box<Expr>,
    pub ty: CastType,
}

/// Target types for [`Expr::Cast`]; each flavor picks its own spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Json,
    Timestamp,
    TextArray,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExprColumn {
    /// Table name or alias qualifying the column
    pub table: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunc {
    pub name: String,
    pub args: Vec<Expr>,
    pub distinct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprInList {
    pub expr: Box<Expr>,
    pub list: Vec<Expr>,
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprInSubquery {
    pub exprs: Vec<Expr>,
    pub query: Box<Select>,
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprIsNull {
    pub expr: Box<Expr>,
    pub negate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprJsonObject {
    pub fields: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprLike {
    pub expr: Box<Expr>,
    pub pattern: Box<Expr>,

    /// Use the provider's native case-insensitive operator (`ILIKE`)
    pub insensitive: bool,
    pub negate: bool,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Concat
        )
    }
}

impl Expr {
    pub const TRUE: Expr = Expr::Value(Value::Bool(true));
    pub const FALSE: Expr = Expr::Value(Value::Bool(false));
    pub const NULL: Expr = Expr::Value(Value::Null);

    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Expr {
        Expr::Column(ExprColumn {
            table: Some(table.into()),
            name: name.into(),
        })
    }

    pub fn unqualified(name: impl Into<String>) -> Expr {
        Expr::Column(ExprColumn {
            table: None,
            name: name.into(),
        })
    }

    pub fn value(value: impl Into<Value>) -> Expr {
        Expr::Value(value.into())
    }

    pub fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
        Expr::BinaryOp(ExprBinaryOp {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        })
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(lhs, BinaryOp::Eq, rhs)
    }

    pub fn ne(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(lhs, BinaryOp::Ne, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(lhs, BinaryOp::Lt, rhs)
    }

    pub fn le(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(lhs, BinaryOp::Le, rhs)
    }

    pub fn gt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(lhs, BinaryOp::Gt, rhs)
    }

    pub fn ge(lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(lhs, BinaryOp::Ge, rhs)
    }

    /// Conjunction that drops `TRUE` operands and collapses on `FALSE`.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut operands = vec![];
        for expr in exprs {
            match expr {
                expr if expr.is_true() => {}
                expr if expr.is_false() => return Expr::FALSE,
                Expr::And(nested) => operands.extend(nested),
                expr => operands.push(expr),
            }
        }

        match operands.len() {
            0 => Expr::TRUE,
            1 => operands.pop().unwrap_or(Expr::TRUE),
            _ => Expr::And(operands),
        }
    }

    /// Disjunction that drops `FALSE` operands and collapses on `TRUE`.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut operands = vec![];
        for expr in exprs {
            match expr {
                expr if expr.is_false() => {}
                expr if expr.is_true() => return Expr::TRUE,
                Expr::Or(nested) => operands.extend(nested),
                expr => operands.push(expr),
            }
        }

        match operands.len() {
            0 => Expr::FALSE,
            1 => operands.pop().unwrap_or(Expr::FALSE),
            _ => Expr::Or(operands),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Expr {
        match expr {
            expr if expr.is_true() => Expr::FALSE,
            expr if expr.is_false() => Expr::TRUE,
            Expr::Not(inner) => *inner,
            expr => Expr::Not(Box::new(expr)),
        }
    }

    pub fn is_null(expr: Expr) -> Expr {
        Expr::IsNull(ExprIsNull {
            expr: Box::new(expr),
            negate: false,
        })
    }

    pub fn is_not_null(expr: Expr) -> Expr {
        Expr::IsNull(ExprIsNull {
            expr: Box::new(expr),
            negate: true,
        })
    }

    pub fn in_list(expr: Expr, list: Vec<Expr>) -> Expr {
        if list.is_empty() {
            return Expr::FALSE;
        }
        Expr::InList(ExprInList {
            expr: Box::new(expr),
            list,
            negate: false,
        })
    }

    pub fn not_in_list(expr: Expr, list: Vec<Expr>) -> Expr {
        if list.is_empty() {
            return Expr::TRUE;
        }
        Expr::InList(ExprInList {
            expr: Box::new(expr),
            list,
            negate: true,
        })
    }

    pub fn in_subquery(exprs: Vec<Expr>, query: Select) -> Expr {
        Expr::InSubquery(ExprInSubquery {
            exprs,
            query: Box::new(query),
            negate: false,
        })
    }

    pub fn like(expr: Expr, pattern: Expr, insensitive: bool) -> Expr {
        Expr::Like(ExprLike {
            expr: Box::new(expr),
            pattern: Box::new(pattern),
            insensitive,
            negate: false,
        })
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Func(ExprFunc {
            name: name.into(),
            args,
            distinct: false,
        })
    }

    pub fn count_star() -> Expr {
        Expr::func("COUNT", vec![Expr::Star])
    }

    pub fn cast(expr: Expr, ty: CastType) -> Expr {
        Expr::Cast(ExprCast {
            expr: Box::new(expr),
            ty,
        })
    }

    pub fn subquery(query: Select) -> Expr {
        Expr::Subquery(Box::new(query))
    }

    pub fn exists(query: Select) -> Expr {
        Expr::Exists(Box::new(query))
    }

    pub fn json_object(fields: Vec<(String, Expr)>) -> Expr {
        Expr::JsonObject(ExprJsonObject { fields })
    }

    pub fn coalesce(exprs: Vec<Expr>) -> Expr {
        Expr::func("COALESCE", exprs)
    }

    pub fn lower(expr: Expr) -> Expr {
        Expr::func("LOWER", vec![expr])
    }

    pub fn case(whens: Vec<(Expr, Expr)>, otherwise: Option<Expr>) -> Expr {
        Expr::Case(ExprCase {
            operand: None,
            whens,
            otherwise: otherwise.map(Box::new),
        })
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expr::Value(Value::Bool(true)))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expr::Value(Value::Bool(false)))
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Expr::Column(_))
    }

    pub fn as_column(&self) -> Option<&ExprColumn> {
        match self {
            Expr::Column(column) => Some(column),
            _ => None,
        }
    }
}

impl From<ExprColumn> for Expr {
    fn from(value: ExprColumn) -> Self {
        Expr::Column(value)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_collapses_constants() {
        let a = Expr::column("User", "a");
        assert_eq!(Expr::and([Expr::TRUE, a.clone()]), a);
        assert_eq!(Expr::and([a.clone(), Expr::FALSE]), Expr::FALSE);
        assert_eq!(Expr::and(Vec::new()), Expr::TRUE);
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let a = Expr::column("User", "a");
        let b = Expr::column("User", "b");
        let c = Expr::column("User", "c");
        let nested = Expr::and([a.clone(), b.clone()]);
        assert_eq!(Expr::and([nested, c.clone()]), Expr::And(vec![a, b, c]));
    }

    #[test]
    fn or_collapses_constants() {
        let a = Expr::column("User", "a");
        assert_eq!(Expr::or([Expr::FALSE, a.clone()]), a);
        assert_eq!(Expr::or([a, Expr::TRUE]), Expr::TRUE);
        assert_eq!(Expr::or(Vec::new()), Expr::FALSE);
    }

    #[test]
    fn empty_in_lists() {
        let a = Expr::column("User", "a");
        assert_eq!(Expr::in_list(a.clone(), vec![]), Expr::FALSE);
        assert_eq!(Expr::not_in_list(a, vec![]), Expr::TRUE);
    }

    #[test]
    fn double_negation() {
        let a = Expr::column("User", "a");
        assert_eq!(Expr::not(Expr::not(a.clone())), a);
        assert_eq!(Expr::not(Expr::TRUE), Expr::FALSE);
    }
}
