use super::Serializer;

use quill_core::schema::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Postgresql,
    Sqlite,
    Mysql,
}

impl Serializer {
    pub fn sqlite() -> Serializer {
        Serializer::new(Flavor::Sqlite)
    }

    pub fn postgresql() -> Serializer {
        Serializer::new(Flavor::Postgresql)
    }

    pub fn mysql() -> Serializer {
        Serializer::new(Flavor::Mysql)
    }
}

impl From<Provider> for Flavor {
    fn from(provider: Provider) -> Flavor {
        match provider {
            Provider::Sqlite => Flavor::Sqlite,
            Provider::Postgresql => Flavor::Postgresql,
            Provider::Mysql => Flavor::Mysql,
        }
    }
}
