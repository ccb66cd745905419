/// What a SQL backend can express natively.
///
/// Query construction consults these flags to choose between native syntax
/// and an emulation.
#[derive(Debug)]
pub struct Capability {
    /// `UPDATE .. LIMIT n`
    pub update_with_limit: bool,

    /// `DELETE .. LIMIT n`
    pub delete_with_limit: bool,

    /// `SELECT DISTINCT ON (..)`
    pub distinct_on: bool,

    /// `INSERT/UPDATE/DELETE .. RETURNING`
    pub returning: bool,

    /// `INSERT INTO t DEFAULT VALUES`
    pub insert_default_values: bool,

    /// The `DEFAULT` keyword inside a `VALUES` row
    pub default_as_field_value: bool,

    /// How duplicate rows are skipped on insert
    pub insert_ignore: InsertIgnore,

    /// Native `ILIKE`
    pub ilike: bool,

    /// Native array columns
    pub native_arrays: bool,

    /// `NULLS FIRST` / `NULLS LAST` in `ORDER BY`
    pub nulls_ordering: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertIgnore {
    /// `ON CONFLICT DO NOTHING`
    OnConflict,

    /// `INSERT IGNORE`
    Ignore,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        update_with_limit: false,
        delete_with_limit: false,
        distinct_on: false,
        returning: true,
        insert_default_values: true,
        default_as_field_value: false,
        insert_ignore: InsertIgnore::OnConflict,
        ilike: false,
        native_arrays: false,
        nulls_ordering: true,
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        distinct_on: true,
        default_as_field_value: true,
        ilike: true,
        native_arrays: true,
        ..Self::SQLITE
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        update_with_limit: true,
        delete_with_limit: true,
        returning: false,
        insert_default_values: false,
        default_as_field_value: true,
        insert_ignore: InsertIgnore::Ignore,
        nulls_ordering: false,
        ..Self::SQLITE
    };
}
