//! Statement generation across the public API.

mod common;
use common::*;

use oxide_sqlgen::generator::{
    select_upsert_keys, BulkDeleteOptions, CreateTableOptions, IndexOptions, InsertOptions, Join,
    JoinKind, Lock, OrderBy, RemoveIndexOptions, SelectColumn, SelectOptions, TruncateOptions,
    UpdateOptions, UpsertOptions,
};
use oxide_sqlgen::{
    combine_binds, map_bind_parameters, sql, BindValues, Condition, DialectKind, ErrorKind, Value,
};

#[test]
fn sqlite_schema_lifecycle() {
    let generator = generator(DialectKind::Sqlite);
    let model = users_model();

    let create = generator
        .create_table(&model, &CreateTableOptions::default())
        .unwrap();
    assert!(create.starts_with("CREATE TABLE IF NOT EXISTS `users` ("));
    assert!(create.contains("`email` VARCHAR(255) NOT NULL UNIQUE"));

    let index = generator
        .add_index("users", &IndexOptions::new(["first_name"]))
        .unwrap();
    assert_eq!(index, "CREATE INDEX `users_first_name` ON `users` (`first_name`)");
    let remove = generator
        .remove_index("users", "users_first_name", &RemoveIndexOptions::default())
        .unwrap();
    assert_eq!(remove, "DROP INDEX `users_first_name`");

    assert_eq!(
        generator
            .truncate_table("users", &TruncateOptions::default())
            .unwrap(),
        vec!["DELETE FROM `users`".to_string()]
    );
}

#[test]
fn postgres_insert_binds_map_to_numbered_parameters() {
    let generator = generator(DialectKind::Postgres);
    let model = users_model();
    let result = generator
        .insert(
            "users",
            &row([("email", sql::value("a@b.c")), ("active", sql::value(false))]),
            &InsertOptions {
                model: Some(&model),
                ..InsertOptions::default()
            },
        )
        .unwrap();
    let mapped = map_bind_parameters(&result.query, generator.dialect()).unwrap();
    assert_eq!(
        mapped.sql,
        "INSERT INTO \"users\" (\"email\",\"active\") VALUES ($1,$2);"
    );
    let bind = result.bind.unwrap();
    let ordered: Vec<&Value> = mapped
        .bind_order
        .unwrap()
        .iter()
        .map(|name| &bind[name.as_str()])
        .collect();
    assert_eq!(ordered, vec![&Value::from("a@b.c"), &Value::Bool(false)]);
}

#[test]
fn positional_caller_binds_keep_their_numbers() {
    let mut generated = indexmap::IndexMap::new();
    generated.insert("oxide_1".to_string(), Value::Int(3));
    let combined = combine_binds(Some(BindValues::positional(["x"])), generated);
    assert_eq!(combined.get("1"), Some(&Value::from("x")));
    assert_eq!(combined.get("oxide_1"), Some(&Value::Int(3)));
}

#[test]
fn update_then_select_with_lock() {
    let model = users_model();
    let postgres = generator(DialectKind::Postgres);
    let condition = Condition::eq(sql::attribute("email").unwrap(), "a@b.c");

    let update = postgres
        .update(
            "users",
            &row([("firstName", sql::value("Ann"))]),
            Some(&condition),
            &UpdateOptions {
                model: Some(&model),
                inline_values: true,
                ..UpdateOptions::default()
            },
        )
        .unwrap();
    assert_eq!(
        update.query,
        "UPDATE \"users\" SET \"first_name\"='Ann' WHERE \"email\" = 'a@b.c'"
    );
    assert_eq!(update.bind, None);

    let select = postgres
        .select(
            "users",
            &SelectOptions {
                model: Some(&model),
                columns: vec![SelectColumn::attribute("id"), SelectColumn::attribute("firstName")],
                joins: vec![Join::new(
                    JoinKind::Inner,
                    "teams",
                    Condition::eq(sql::col("teams.owner_id"), sql::col("users.id")),
                )],
                where_clause: Some(condition),
                order_by: vec![OrderBy::asc(sql::attribute("id").unwrap())],
                limit: Some(1),
                lock: Some(Lock::update().skip_locked()),
                ..SelectOptions::default()
            },
        )
        .unwrap();
    assert_eq!(
        select,
        "SELECT \"id\", \"first_name\" AS \"firstName\" FROM \"users\" INNER JOIN \"teams\" ON \"teams\".\"owner_id\" = \"users\".\"id\" WHERE \"email\" = 'a@b.c' ORDER BY \"id\" ASC LIMIT 1 FOR UPDATE SKIP LOCKED;"
    );
}

#[test]
fn upsert_key_selection_follows_declaration_order() {
    let model = memberships_model();
    // user_id is in both unique indexes; the composite one is declared first
    assert_eq!(
        select_upsert_keys(&model, &["user_id".into()], &[]),
        vec!["team_id", "user_id"]
    );
    assert_eq!(
        select_upsert_keys(&model, &["role".into(), "user_id".into()], &[]),
        vec!["team_id", "user_id"]
    );
    assert_eq!(select_upsert_keys(&model, &["role".into()], &[]), vec!["id"]);
    assert_eq!(
        select_upsert_keys(&model, &["role".into()], &["userId".into()]),
        vec!["user_id"]
    );
}

#[test]
fn upsert_across_dialects() {
    let model = memberships_model();
    let insert = row([
        ("teamId", sql::value(1)),
        ("userId", sql::value(2)),
        ("role", sql::value("admin")),
    ]);
    let update = row([("role", sql::value("admin")), ("userId", sql::value(2))]);
    let options = UpsertOptions {
        inline_values: true,
        ..UpsertOptions::new(&model)
    };

    assert_eq!(
        generator(DialectKind::Sqlite)
            .upsert("memberships", &insert, &update, &options)
            .unwrap()
            .query,
        "INSERT INTO `memberships` (`team_id`,`user_id`,`role`) VALUES (1,2,'admin') ON CONFLICT (`team_id`,`user_id`) DO UPDATE SET `role`=EXCLUDED.`role`,`user_id`=EXCLUDED.`user_id`;"
    );
    assert_eq!(
        generator(DialectKind::MariaDb)
            .upsert("memberships", &insert, &update, &options)
            .unwrap()
            .query,
        "INSERT INTO `memberships` (`team_id`,`user_id`,`role`) VALUES (1,2,'admin') ON DUPLICATE KEY UPDATE `role`='admin',`user_id`=2;"
    );
    let err = generator(DialectKind::Oracle)
        .upsert("memberships", &insert, &update, &options)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
}

#[test]
fn limited_delete_falls_back_to_primary_key_subquery() {
    let model = memberships_model();
    let options = BulkDeleteOptions {
        model: Some(&model),
        where_clause: Some(Condition::eq(sql::col("role"), "guest")),
        limit: Some(3),
        ..BulkDeleteOptions::default()
    };
    assert_eq!(
        generator(DialectKind::MsSql).bulk_delete("memberships", &options).unwrap(),
        "DELETE FROM [memberships] WHERE [id] IN (SELECT [id] FROM [memberships] WHERE [role] = N'guest' ORDER BY [id] OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY)"
    );
}
