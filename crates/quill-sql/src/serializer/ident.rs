use super::{Flavor, Formatter, Params, ToSql};

/// A quoted identifier: `"name"`, or `` `name` `` on MySQL.
pub(super) struct Ident<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        let quote = match f.serializer.flavor {
            Flavor::Mysql => '`',
            Flavor::Postgresql | Flavor::Sqlite => '"',
        };

        f.dst.push(quote);
        for ch in self.0.as_ref().chars() {
            if ch == quote {
                f.dst.push(quote);
            }
            f.dst.push(ch);
        }
        f.dst.push(quote);
    }
}

/// A single-quoted string literal, used for JSON object keys and other
/// constants that must not become bound parameters.
pub(super) struct Literal<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Literal<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        f.dst.push('\'');
        for ch in self.0.as_ref().chars() {
            match ch {
                '\'' => f.dst.push_str("''"),
                '\\' if f.serializer.is_mysql() => f.dst.push_str("\\\\"),
                ch => f.dst.push(ch),
            }
        }
        f.dst.push('\'');
    }
}
