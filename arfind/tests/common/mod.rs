use arfind::prelude::*;

pub mod db {
    pub struct GreenSmoothie;
    pub struct Customer;

    #[arfind::model("green_smoothies")]
    impl GreenSmoothie {
        fn id() -> i64;
        fn name() -> String;
        fn customer_id() -> Option<i64>;
    }

    #[arfind::model("customers")]
    impl Customer {
        fn id() -> i64;
        fn first_name() -> String;
        fn last_name() -> Option<String>;
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE customers (id INTEGER PRIMARY KEY, first_name TEXT NOT NULL, last_name TEXT)",
    "CREATE TABLE green_smoothies (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        customer_id INTEGER REFERENCES customers (id)
    )",
    "INSERT INTO customers (id, first_name, last_name) VALUES (1, 'Jerry', 'Seinfeld')",
    "INSERT INTO green_smoothies (id, name, customer_id) VALUES (1, 'Banana', 1)",
];

/// A fresh in-memory database with one customer and one smoothie.
///
/// The returned repository is the one registered in the context, under
/// its own name `sqlite3` and as the default.
#[allow(dead_code)]
pub async fn setup() -> ArfindResult<(Context, Repository<Sqlite>)> {
    let repository =
        Repository::<Sqlite>::connect(&RepositoryConfig::new("sqlite3", "sqlite::memory:")).await?;

    for statement in SCHEMA {
        repository.execute(statement, &[]).await?;
    }

    Ok((Context::new(repository.clone()), repository))
}
