//! End-to-end tests against an in-memory SQLite database.

use futures_util::FutureExt;
use squill::prelude::*;
use squill::sqlite::SqliteConnection;

#[derive(Entity, Debug, Default, Clone, PartialEq)]
struct TestModel {
    id: i64,
    first_name: String,
    age: i8,
    last_name: Option<String>,
}

fn tom() -> TestModel {
    TestModel {
        id: 1,
        first_name: "Tom".to_string(),
        age: 18,
        last_name: Some("Jerry".to_string()),
    }
}

async fn setup(strategy: Strategy) -> Database {
    let conn = SqliteConnection::open_in_memory().unwrap();
    let db = Database::builder()
        .dialect(Sqlite)
        .strategy(strategy)
        .middleware(LogMiddleware::new())
        .connect(conn);
    db.raw_query::<TestModel>(
        "CREATE TABLE test_model (\
         id INTEGER PRIMARY KEY, \
         first_name TEXT NOT NULL, \
         age INTEGER NOT NULL, \
         last_name TEXT)",
    )
    .exec(&db)
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn insert_and_select_round_trip_both_strategies() {
    for strategy in [Strategy::Safe, Strategy::Fast] {
        let db = setup(strategy).await;
        let outcome = db.insert::<TestModel>().values([tom()]).exec(&db).await.unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, 1);

        let got = db
            .select::<TestModel>()
            .filter([col("id").eq(1)])
            .get(&db)
            .await
            .unwrap();
        assert_eq!(got, tom());
    }
}

#[tokio::test]
async fn select_missing_row_is_no_rows() {
    let db = setup(Strategy::Safe).await;
    let err = db
        .select::<TestModel>()
        .filter([col("id").eq(99)])
        .get(&db)
        .await
        .unwrap_err();
    assert!(err.is_no_rows());
}

#[tokio::test]
async fn get_multi_respects_order_by() {
    let db = setup(Strategy::Fast).await;
    let rows = (1..=3).map(|i| TestModel {
        id: i,
        first_name: format!("user{i}"),
        age: (30 - i) as i8,
        last_name: None,
    });
    db.insert::<TestModel>().values(rows).exec(&db).await.unwrap();

    let by_age = db
        .select::<TestModel>()
        .order_by([squill::qb::select::asc("age")])
        .get_multi(&db)
        .await
        .unwrap();
    let ids: Vec<i64> = by_age.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn upsert_updates_on_conflict() {
    let db = setup(Strategy::Safe).await;
    db.insert::<TestModel>().values([tom()]).exec(&db).await.unwrap();

    let replacement = TestModel {
        first_name: "Thomas".to_string(),
        ..tom()
    };
    db.insert::<TestModel>()
        .values([replacement])
        .on_duplicate_key()
        .conflict_columns(["id"])
        .update([col("first_name")])
        .exec(&db)
        .await
        .unwrap();

    let got = db
        .select::<TestModel>()
        .filter([col("id").eq(1)])
        .get(&db)
        .await
        .unwrap();
    assert_eq!(got.first_name, "Thomas");
    assert_eq!(got.age, 18);
}

#[tokio::test]
async fn update_and_delete() {
    let db = setup(Strategy::Safe).await;
    db.insert::<TestModel>().values([tom()]).exec(&db).await.unwrap();

    let outcome = db
        .update(TestModel { age: 19, ..tom() })
        .set([col("age")])
        .filter([col("id").eq(1)])
        .exec(&db)
        .await
        .unwrap();
    assert_eq!(outcome.rows_affected, 1);

    let got = db
        .select::<TestModel>()
        .filter([col("id").eq(1)])
        .get(&db)
        .await
        .unwrap();
    assert_eq!(got.age, 19);

    let outcome = db
        .delete::<TestModel>()
        .filter([col("id").eq(1)])
        .exec(&db)
        .await
        .unwrap();
    assert_eq!(outcome.rows_affected, 1);
    assert!(db.select::<TestModel>().get(&db).await.unwrap_err().is_no_rows());
}

#[tokio::test]
async fn aggregate_query_through_raw_mapping() {
    let db = setup(Strategy::Safe).await;
    let rows = (1..=4).map(|i| TestModel {
        id: i,
        first_name: format!("user{i}"),
        age: 20,
        last_name: None,
    });
    db.insert::<TestModel>().values(rows).exec(&db).await.unwrap();

    // COUNT lands in a column aliased onto the id field.
    let counted = db
        .select::<TestModel>()
        .select([squill::expr::count("id").alias("id").into()])
        .get(&db)
        .await
        .unwrap();
    assert_eq!(counted.id, 4);
}

#[tokio::test]
async fn transaction_rollback_reverts_writes() {
    let db = setup(Strategy::Safe).await;
    let result: squill::Result<()> = db
        .transaction(|tx| {
            async move {
                tx.insert::<TestModel>().values([tom()]).exec(tx).await?;
                Err(squill::Error::NoRows)
            }
            .boxed()
        })
        .await;
    assert!(result.unwrap_err().is_no_rows());
    assert!(db.select::<TestModel>().get(&db).await.unwrap_err().is_no_rows());
}

#[tokio::test]
async fn transaction_commit_persists_writes() {
    let db = setup(Strategy::Fast).await;
    db.transaction(|tx| {
        async move { tx.insert::<TestModel>().values([tom()]).exec(tx).await }.boxed()
    })
    .await
    .unwrap();
    let got = db.select::<TestModel>().get(&db).await.unwrap();
    assert_eq!(got, tom());
}
