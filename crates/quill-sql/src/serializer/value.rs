use super::{Params, ToSql};

use quill_core::stmt;

impl ToSql for &stmt::Value {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            stmt::Value::Null => fmt!(f, "NULL"),
            stmt::Value::Bool(true) => fmt!(f, "TRUE"),
            stmt::Value::Bool(false) => fmt!(f, "FALSE"),
            value => {
                let placeholder = f.params.push(value);
                fmt!(f, placeholder)
            }
        }
    }
}
