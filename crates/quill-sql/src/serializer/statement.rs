use super::{Comma, Flavor, Ident, Params, ToSql};

use quill_core::stmt::{self, Distinct, Statement};

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            Statement::Query(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
            Statement::Delete(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Select {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "SELECT ");

        match &self.distinct {
            Distinct::None => {}
            Distinct::All => fmt!(f, "DISTINCT "),
            Distinct::On(exprs) => fmt!(f, "DISTINCT ON (" Comma(exprs) ") "),
        }

        if self.items.is_empty() {
            fmt!(f, "*");
        } else {
            fmt!(f, Comma(&self.items));
        }

        if !self.from.is_empty() {
            fmt!(f, " FROM " Comma(&self.from));
        }

        for join in &self.joins {
            join.to_sql(f);
        }

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(&self.group_by));
        }

        if let Some(having) = &self.having {
            fmt!(f, " HAVING " having);
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => fmt!(f, " LIMIT " limit " OFFSET " offset),
            (Some(limit), None) => fmt!(f, " LIMIT " limit),
            (None, Some(offset)) => match f.serializer.flavor {
                // Both require a LIMIT before OFFSET
                Flavor::Sqlite => fmt!(f, " LIMIT -1 OFFSET " offset),
                Flavor::Mysql => fmt!(f, " LIMIT 18446744073709551615 OFFSET " offset),
                Flavor::Postgresql => fmt!(f, " OFFSET " offset),
            },
            (None, None) => {}
        }
    }
}

impl ToSql for &stmt::SelectItem {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            stmt::SelectItem::All => fmt!(f, "*"),
            stmt::SelectItem::AllFrom(table) => fmt!(f, Ident(table) ".*"),
            stmt::SelectItem::Expr { expr, alias } => {
                let alias = alias.as_ref().map(|alias| (" AS ", Ident(alias)));
                fmt!(f, expr alias);
            }
        }
    }
}

impl ToSql for &stmt::TableRef {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            stmt::TableRef::Table(table) => table.to_sql(f),
            stmt::TableRef::Derived { query, alias } => {
                let query = &**query;
                fmt!(f, "(" query ") AS " Ident(alias));
            }
            stmt::TableRef::Function { func, alias } => {
                fmt!(f, func.name.as_str() "(" Comma(&func.args) ") AS " Ident(alias));
            }
        }
    }
}

impl ToSql for &stmt::TableName {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if let Some(schema) = &self.schema {
            fmt!(f, Ident(schema) ".");
        }
        fmt!(f, Ident(&self.name));

        if let Some(alias) = &self.alias {
            if *alias != self.name {
                fmt!(f, " AS " Ident(alias));
            }
        }
    }
}

impl ToSql for &stmt::Join {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let kind = match self.kind {
            stmt::JoinKind::Inner => " INNER JOIN ",
            stmt::JoinKind::Left => " LEFT JOIN ",
        };
        fmt!(f, kind self.table " ON " self.on);
    }
}

impl ToSql for &stmt::OrderByExpr {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let direction = match self.direction {
            stmt::Direction::Asc => " ASC",
            stmt::Direction::Desc => " DESC",
        };

        match self.nulls {
            None => fmt!(f, self.expr direction),
            // MySQL sorts NULL first ascending; emulate with an IS NULL key
            Some(nulls) if f.serializer.is_mysql() => {
                let nulls = match nulls {
                    stmt::NullsOrder::First => " IS NULL DESC, ",
                    stmt::NullsOrder::Last => " IS NULL ASC, ",
                };
                fmt!(f, self.expr nulls self.expr direction);
            }
            Some(stmt::NullsOrder::First) => fmt!(f, self.expr direction " NULLS FIRST"),
            Some(stmt::NullsOrder::Last) => fmt!(f, self.expr direction " NULLS LAST"),
        }
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let ignore = self.on_conflict.is_some() && f.serializer.is_mysql();
        let insert = if ignore { "INSERT IGNORE INTO " } else { "INSERT INTO " };
        let table = InsertTable(&self.table);

        if self.is_default_values() {
            if f.serializer.is_mysql() {
                let rows = Comma(self.rows.iter().map(|_| "()"));
                fmt!(f, insert table " () VALUES " rows);
            } else {
                fmt!(f, insert table " DEFAULT VALUES");
            }
        } else {
            let columns = Comma(self.columns.iter().map(Ident));
            let rows = Comma(self.rows.iter().map(|row| ("(", Comma(row), ")")));
            fmt!(f, insert table " (" columns ") VALUES " rows);
        }

        if self.on_conflict.is_some() && !f.serializer.is_mysql() {
            fmt!(f, " ON CONFLICT DO NOTHING");
        }

        Returning(&self.returning).to_sql(f);
    }
}

/// The target of an `INSERT`, which never carries an alias.
struct InsertTable<'a>(&'a stmt::TableName);

impl ToSql for InsertTable<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if let Some(schema) = &self.0.schema {
            fmt!(f, Ident(schema) ".");
        }
        fmt!(f, Ident(&self.0.name));
    }
}

struct Returning<'a>(&'a [stmt::SelectItem]);

impl ToSql for Returning<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if !self.0.is_empty() {
            fmt!(f, " RETURNING " Comma(self.0));
        }
    }
}

impl ToSql for &stmt::Update {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let assignments = Comma(&self.assignments);
        let table = &self.table;
        fmt!(f, "UPDATE " table " SET " assignments);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if let Some(limit) = self.limit {
            fmt!(f, " LIMIT " limit);
        }

        Returning(&self.returning).to_sql(f);
    }
}

impl ToSql for &stmt::Assignment {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let value = &self.value;
        fmt!(f, Ident(&self.column) " = " value);
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let table = &self.table;
        fmt!(f, "DELETE FROM " table);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if let Some(limit) = self.limit {
            fmt!(f, " LIMIT " limit);
        }

        Returning(&self.returning).to_sql(f);
    }
}
