use super::{Expr, ExprFunc};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub distinct: Distinct,

    pub items: Vec<SelectItem>,

    /// `FROM` sources, joined with commas when more than one
    pub from: Vec<TableRef>,

    pub joins: Vec<Join>,

    pub filter: Option<Expr>,

    pub group_by: Vec<Expr>,

    pub having: Option<Expr>,

    pub order_by: Vec<OrderByExpr>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Distinct {
    #[default]
    None,
    All,
    /// `DISTINCT ON (exprs)`, Postgres only
    On(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    All,

    /// `alias.*`
    AllFrom(String),

    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Table(TableName),
    Derived { query: Box<Select>, alias: String },

    /// A table-valued function such as SQLite's `json_each`
    Function { func: ExprFunc, alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub name: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: Direction,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl Select {
    pub fn from(table: TableRef) -> Select {
        Select {
            from: vec![table],
            ..Select::default()
        }
    }

    pub fn item(mut self, expr: Expr, alias: Option<&str>) -> Select {
        self.items.push(SelectItem::Expr {
            expr,
            alias: alias.map(str::to_string),
        });
        self
    }

    pub fn and_filter(&mut self, expr: Expr) {
        let filter = match self.filter.take() {
            Some(existing) => Expr::and([existing, expr]),
            None => expr,
        };
        self.filter = if filter.is_true() { None } else { Some(filter) };
    }
}

impl SelectItem {
    pub fn expr(expr: Expr) -> SelectItem {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> SelectItem {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }
}

impl TableRef {
    pub fn table(name: impl Into<String>, alias: Option<String>) -> TableRef {
        TableRef::Table(TableName {
            name: name.into(),
            schema: None,
            alias,
        })
    }

    pub fn derived(query: Select, alias: impl Into<String>) -> TableRef {
        TableRef::Derived {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    /// The name columns of this source are qualified with.
    pub fn qualifier(&self) -> &str {
        match self {
            TableRef::Table(table) => table.alias.as_deref().unwrap_or(&table.name),
            TableRef::Derived { alias, .. } | TableRef::Function { alias, .. } => alias,
        }
    }
}

impl Direction {
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

impl NullsOrder {
    pub fn reverse(self) -> NullsOrder {
        match self {
            NullsOrder::First => NullsOrder::Last,
            NullsOrder::Last => NullsOrder::First,
        }
    }
}

impl OrderByExpr {
    pub fn new(expr: Expr, direction: Direction) -> OrderByExpr {
        OrderByExpr {
            expr,
            direction,
            nulls: None,
        }
    }

    /// The same ordering key sorted the opposite way.
    pub fn reverse(self) -> OrderByExpr {
        OrderByExpr {
            expr: self.expr,
            direction: self.direction.reverse(),
            nulls: self.nulls.map(NullsOrder::reverse),
        }
    }
}
