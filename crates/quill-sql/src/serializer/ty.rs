use super::{Flavor, Params, ToSql};

use quill_core::stmt::CastType;

impl ToSql for CastType {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use CastType::*;

        let ty = match (f.serializer.flavor, self) {
            (Flavor::Sqlite, Text) => "TEXT",
            (Flavor::Sqlite, Integer | Boolean) => "INTEGER",
            (Flavor::Sqlite, Float) => "REAL",
            (Flavor::Sqlite, Decimal) => "DECIMAL",
            (Flavor::Sqlite, Json | Timestamp | TextArray) => "TEXT",

            (Flavor::Postgresql, Text) => "TEXT",
            (Flavor::Postgresql, Integer) => "BIGINT",
            (Flavor::Postgresql, Float) => "DOUBLE PRECISION",
            (Flavor::Postgresql, Decimal) => "DECIMAL",
            (Flavor::Postgresql, Boolean) => "BOOLEAN",
            (Flavor::Postgresql, Json) => "jsonb",
            (Flavor::Postgresql, Timestamp) => "TIMESTAMP(3)",
            (Flavor::Postgresql, TextArray) => "TEXT[]",

            (Flavor::Mysql, Text | TextArray) => "CHAR",
            (Flavor::Mysql, Integer) => "SIGNED",
            (Flavor::Mysql, Float) => "DOUBLE",
            (Flavor::Mysql, Decimal) => "DECIMAL(65, 30)",
            (Flavor::Mysql, Boolean) => "UNSIGNED",
            (Flavor::Mysql, Json) => "JSON",
            (Flavor::Mysql, Timestamp) => "DATETIME(3)",
        };

        f.dst.push_str(ty);
    }
}
