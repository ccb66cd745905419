use super::{Comma, Delimited, Flavor, Ident, Literal, Params, ToSql};

use quill_core::stmt::{self, BinaryOp, Expr};

impl ToSql for &Expr {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use Expr::*;

        match self {
            And(operands) => {
                fmt!(f, "(" Delimited(operands, " AND ") ")");
            }
            BinaryOp(expr) => {
                let lhs = &*expr.lhs;
                let rhs = &*expr.rhs;
                if expr.op.is_arithmetic() {
                    fmt!(f, "(" lhs " " expr.op " " rhs ")");
                } else {
                    fmt!(f, lhs " " expr.op " " rhs);
                }
            }
            Case(expr) => {
                fmt!(f, "CASE");
                if let Some(operand) = expr.operand.as_deref() {
                    fmt!(f, " " operand);
                }
                for (when, then) in &expr.whens {
                    fmt!(f, " WHEN " when " THEN " then);
                }
                if let Some(otherwise) = expr.otherwise.as_deref() {
                    fmt!(f, " ELSE " otherwise);
                }
                fmt!(f, " END");
            }
            Cast(cast) => {
                let expr = &*cast.expr;
                match (f.serializer.flavor, cast.ty) {
                    // SQLite has no JSON type; `json()` validates and minifies text
                    (Flavor::Sqlite, stmt::CastType::Json) => fmt!(f, "json(" expr ")"),
                    _ => fmt!(f, "CAST(" expr " AS " cast.ty ")"),
                }
            }
            Column(column) => column.to_sql(f),
            Default => fmt!(f, "DEFAULT"),
            Exists(query) => {
                let query = &**query;
                fmt!(f, "EXISTS (" query ")");
            }
            Func(func) => {
                let distinct = if func.distinct { "DISTINCT " } else { "" };
                fmt!(f, func.name.as_str() "(" distinct Comma(&func.args) ")");
            }
            InList(expr) => {
                let lhs = &*expr.expr;
                let op = if expr.negate { " NOT IN (" } else { " IN (" };
                fmt!(f, lhs op Comma(&expr.list) ")");
            }
            InSubquery(expr) => {
                let op = if expr.negate { " NOT IN (" } else { " IN (" };
                match &expr.exprs[..] {
                    [single] => fmt!(f, single),
                    exprs => fmt!(f, "(" Comma(exprs) ")"),
                }
                let query = &*expr.query;
                fmt!(f, op query ")");
            }
            IsNull(expr) => {
                let operand = &*expr.expr;
                if expr.negate {
                    fmt!(f, operand " IS NOT NULL");
                } else {
                    fmt!(f, operand " IS NULL");
                }
            }
            JsonAgg(expr) => {
                let func = match f.serializer.flavor {
                    Flavor::Sqlite => "json_group_array(",
                    Flavor::Postgresql => "jsonb_agg(",
                    Flavor::Mysql => "JSON_ARRAYAGG(",
                };
                let expr = &**expr;
                fmt!(f, func expr ")");
            }
            JsonObject(expr) => {
                let func = match f.serializer.flavor {
                    Flavor::Sqlite => "json_object(",
                    Flavor::Postgresql => "jsonb_build_object(",
                    Flavor::Mysql => "JSON_OBJECT(",
                };
                let pairs = Comma(expr.fields.iter().map(|(key, value)| {
                    let key = Literal(key.as_str());
                    (key, ", ", value)
                }));
                fmt!(f, func pairs ")");
            }
            Like(expr) => {
                let op = match (expr.negate, expr.insensitive && f.serializer.is_postgresql()) {
                    (false, false) => " LIKE ",
                    (false, true) => " ILIKE ",
                    (true, false) => " NOT LIKE ",
                    (true, true) => " NOT ILIKE ",
                };
                let escape = if f.serializer.is_mysql() {
                    " ESCAPE '\\\\'"
                } else {
                    " ESCAPE '\\'"
                };
                let operand = &*expr.expr;
                let pattern = &*expr.pattern;
                fmt!(f, operand op pattern escape);
            }
            Not(expr) => {
                let expr = &**expr;
                fmt!(f, "NOT (" expr ")");
            }
            Or(operands) => {
                fmt!(f, "(" Delimited(operands, " OR ") ")");
            }
            Star => fmt!(f, "*"),
            Subquery(query) => {
                let query = &**query;
                fmt!(f, "(" query ")");
            }
            Value(value) => value.to_sql(f),
        }
    }
}

impl ToSql for &stmt::ExprColumn {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match &self.table {
            Some(table) => fmt!(f, Ident(table) "." Ident(&self.name)),
            None => fmt!(f, Ident(&self.name)),
        }
    }
}

impl ToSql for BinaryOp {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        f.dst.push_str(match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Concat => "||",
            BinaryOp::JsonGet => "->",
            BinaryOp::JsonGetText => "->>",
            BinaryOp::JsonPath => "#>",
            BinaryOp::JsonPathText => "#>>",
            BinaryOp::Contains => "@>",
            BinaryOp::Overlaps => "&&",
        })
    }
}
