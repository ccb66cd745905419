#![allow(unused_variables)]

use super::{
    Assignment, Delete, Distinct, Expr, ExprColumn, Insert, Join, OrderByExpr, Select, SelectItem,
    Statement, TableName, TableRef, Update, Value,
};

/// Read-only traversal of a statement tree.
///
/// Every method defaults to walking its children; implementors override the
/// nodes they care about and call the matching free function to keep going.
pub trait Visit {
    fn visit_statement(&mut self, i: &Statement) {
        visit_statement(self, i);
    }

    fn visit_select(&mut self, i: &Select) {
        visit_select(self, i);
    }

    fn visit_select_item(&mut self, i: &SelectItem) {
        visit_select_item(self, i);
    }

    fn visit_table_ref(&mut self, i: &TableRef) {
        visit_table_ref(self, i);
    }

    fn visit_table_name(&mut self, i: &TableName) {}

    fn visit_join(&mut self, i: &Join) {
        visit_join(self, i);
    }

    fn visit_order_by_expr(&mut self, i: &OrderByExpr) {
        visit_order_by_expr(self, i);
    }

    fn visit_insert(&mut self, i: &Insert) {
        visit_insert(self, i);
    }

    fn visit_update(&mut self, i: &Update) {
        visit_update(self, i);
    }

    fn visit_assignment(&mut self, i: &Assignment) {
        visit_assignment(self, i);
    }

    fn visit_delete(&mut self, i: &Delete) {
        visit_delete(self, i);
    }

    fn visit_expr(&mut self, i: &Expr) {
        visit_expr(self, i);
    }

    fn visit_expr_column(&mut self, i: &ExprColumn) {}

    fn visit_value(&mut self, i: &Value) {}
}

impl<V: Visit> Visit for &mut V {
    fn visit_statement(&mut self, i: &Statement) {
        Visit::visit_statement(&mut **self, i);
    }

    fn visit_select(&mut self, i: &Select) {
        Visit::visit_select(&mut **self, i);
    }

    fn visit_select_item(&mut self, i: &SelectItem) {
        Visit::visit_select_item(&mut **self, i);
    }

    fn visit_table_ref(&mut self, i: &TableRef) {
        Visit::visit_table_ref(&mut **self, i);
    }

    fn visit_table_name(&mut self, i: &TableName) {
        Visit::visit_table_name(&mut **self, i);
    }

    fn visit_join(&mut self, i: &Join) {
        Visit::visit_join(&mut **self, i);
    }

    fn visit_order_by_expr(&mut self, i: &OrderByExpr) {
        Visit::visit_order_by_expr(&mut **self, i);
    }

    fn visit_insert(&mut self, i: &Insert) {
        Visit::visit_insert(&mut **self, i);
    }

    fn visit_update(&mut self, i: &Update) {
        Visit::visit_update(&mut **self, i);
    }

    fn visit_assignment(&mut self, i: &Assignment) {
        Visit::visit_assignment(&mut **self, i);
    }

    fn visit_delete(&mut self, i: &Delete) {
        Visit::visit_delete(&mut **self, i);
    }

    fn visit_expr(&mut self, i: &Expr) {
        Visit::visit_expr(&mut **self, i);
    }

    fn visit_expr_column(&mut self, i: &ExprColumn) {
        Visit::visit_expr_column(&mut **self, i);
    }

    fn visit_value(&mut self, i: &Value) {
        Visit::visit_value(&mut **self, i);
    }
}

pub fn visit_statement<V>(v: &mut V, node: &Statement)
where
    V: Visit + ?Sized,
{
    match node {
        Statement::Query(stmt) => v.visit_select(stmt),
        Statement::Insert(stmt) => v.visit_insert(stmt),
        Statement::Update(stmt) => v.visit_update(stmt),
        Statement::Delete(stmt) => v.visit_delete(stmt),
    }
}

pub fn visit_select<V>(v: &mut V, node: &Select)
where
    V: Visit + ?Sized,
{
    if let Distinct::On(exprs) = &node.distinct {
        for expr in exprs {
            v.visit_expr(expr);
        }
    }
    for item in &node.items {
        v.visit_select_item(item);
    }
    for table in &node.from {
        v.visit_table_ref(table);
    }
    for join in &node.joins {
        v.visit_join(join);
    }
    if let Some(filter) = &node.filter {
        v.visit_expr(filter);
    }
    for expr in &node.group_by {
        v.visit_expr(expr);
    }
    if let Some(having) = &node.having {
        v.visit_expr(having);
    }
    for order_by in &node.order_by {
        v.visit_order_by_expr(order_by);
    }
}

pub fn visit_select_item<V>(v: &mut V, node: &SelectItem)
where
    V: Visit + ?Sized,
{
    if let SelectItem::Expr { expr, .. } = node {
        v.visit_expr(expr);
    }
}

pub fn visit_table_ref<V>(v: &mut V, node: &TableRef)
where
    V: Visit + ?Sized,
{
    match node {
        TableRef::Table(table) => v.visit_table_name(table),
        TableRef::Derived { query, .. } => v.visit_select(query),
        TableRef::Function { func, .. } => {
            for arg in &func.args {
                v.visit_expr(arg);
            }
        }
    }
}

pub fn visit_join<V>(v: &mut V, node: &Join)
where
    V: Visit + ?Sized,
{
    v.visit_table_ref(&node.table);
    v.visit_expr(&node.on);
}

pub fn visit_order_by_expr<V>(v: &mut V, node: &OrderByExpr)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.expr);
}

pub fn visit_insert<V>(v: &mut V, node: &Insert)
where
    V: Visit + ?Sized,
{
    v.visit_table_name(&node.table);
    for row in &node.rows {
        for expr in row {
            v.visit_expr(expr);
        }
    }
    for item in &node.returning {
        v.visit_select_item(item);
    }
}

pub fn visit_update<V>(v: &mut V, node: &Update)
where
    V: Visit + ?Sized,
{
    v.visit_table_name(&node.table);
    for assignment in &node.assignments {
        v.visit_assignment(assignment);
    }
    if let Some(filter) = &node.filter {
        v.visit_expr(filter);
    }
    for item in &node.returning {
        v.visit_select_item(item);
    }
}

pub fn visit_assignment<V>(v: &mut V, node: &Assignment)
where
    V: Visit + ?Sized,
{
    v.visit_expr(&node.value);
}

pub fn visit_delete<V>(v: &mut V, node: &Delete)
where
    V: Visit + ?Sized,
{
    v.visit_table_name(&node.table);
    if let Some(filter) = &node.filter {
        v.visit_expr(filter);
    }
    for item in &node.returning {
        v.visit_select_item(item);
    }
}

pub fn visit_expr<V>(v: &mut V, node: &Expr)
where
    V: Visit + ?Sized,
{
    match node {
        Expr::And(exprs) | Expr::Or(exprs) => {
            for expr in exprs {
                v.visit_expr(expr);
            }
        }
        Expr::BinaryOp(expr) => {
            v.visit_expr(&expr.lhs);
            v.visit_expr(&expr.rhs);
        }
        Expr::Case(expr) => {
            if let Some(operand) = &expr.operand {
                v.visit_expr(operand);
            }
            for (when, then) in &expr.whens {
                v.visit_expr(when);
                v.visit_expr(then);
            }
            if let Some(otherwise) = &expr.otherwise {
                v.visit_expr(otherwise);
            }
        }
        Expr::Cast(expr) => v.visit_expr(&expr.expr),
        Expr::Column(expr) => v.visit_expr_column(expr),
        Expr::Default | Expr::Star => {}
        Expr::Exists(query) | Expr::Subquery(query) => v.visit_select(query),
        Expr::Func(expr) => {
            for arg in &expr.args {
                v.visit_expr(arg);
            }
        }
        Expr::InList(expr) => {
            v.visit_expr(&expr.expr);
            for item in &expr.list {
                v.visit_expr(item);
            }
        }
        Expr::InSubquery(expr) => {
            for item in &expr.exprs {
                v.visit_expr(item);
            }
            v.visit_select(&expr.query);
        }
        Expr::IsNull(expr) => v.visit_expr(&expr.expr),
        Expr::JsonAgg(expr) | Expr::Not(expr) => v.visit_expr(expr),
        Expr::JsonObject(expr) => {
            for (_, value) in &expr.fields {
                v.visit_expr(value);
            }
        }
        Expr::Like(expr) => {
            v.visit_expr(&expr.expr);
            v.visit_expr(&expr.pattern);
        }
        Expr::Value(value) => v.visit_value(value),
    }
}

/// Calls `f` for every expression in `node`, children first.
pub fn for_each_expr<F>(node: &Statement, f: F)
where
    F: FnMut(&Expr),
{
    struct ForEach<F> {
        f: F,
    }

    impl<F> Visit for ForEach<F>
    where
        F: FnMut(&Expr),
    {
        fn visit_expr(&mut self, node: &Expr) {
            visit_expr(self, node);
            (self.f)(node);
        }
    }

    ForEach { f }.visit_statement(node);
}

/// Calls `f` for every table referenced anywhere in `node`.
pub fn for_each_table<F>(node: &Statement, f: F)
where
    F: FnMut(&TableName),
{
    struct ForEach<F> {
        f: F,
    }

    impl<F> Visit for ForEach<F>
    where
        F: FnMut(&TableName),
    {
        fn visit_table_name(&mut self, node: &TableName) {
            (self.f)(node);
        }
    }

    ForEach { f }.visit_statement(node);
}
