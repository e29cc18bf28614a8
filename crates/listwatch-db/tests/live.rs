//! Live integration tests for listwatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx
//! test harness, so `DATABASE_URL` must point at a server that allows
//! creating databases. Run with `cargo test -p listwatch-db -- --ignored`.

use chrono::NaiveDate;
use listwatch_core::{Listing, MissingSellerRef, TakenDownRef};
use listwatch_db::{
    complete_crawl_run, create_crawl_run, get_crawl_run, list_active_seeds, list_crawl_runs,
    list_missing_seller_urls, list_recent_exports, list_taken_down_adverts, mark_adverts_seen, record_export,
    register_region, resolve_sellers, start_crawl_run, upsert_listings, DbError, NewCrawlExport,
    RunType, TriggerSource,
};

const TEMPLATE: &str = "https://poshmark.com/search?query={0}&type=listings&src=dir";

fn listing(url: &str, title: &str) -> Listing {
    Listing {
        seller: "poshmark".to_string(),
        region: "NA".to_string(),
        country: "United States".to_string(),
        domain: "poshmark.com".to_string(),
        currency: "USD".to_string(),
        keyword: "dress".to_string(),
        company_id: 7,
        created_at: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        url: url.to_string(),
        title: title.to_string(),
        description: String::new(),
        price: "$10".to_string(),
        pic: String::new(),
        shipping_address: String::new(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn register_region_is_idempotent(pool: sqlx::PgPool) {
    assert!(register_region(&pool, "NA", "United States").await.unwrap());
    assert!(!register_region(&pool, "NA", "United States").await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn list_active_seeds_filters_template_and_inactive(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO seeds (keyword, company_id, search_template, regions, is_active) VALUES \
         ('dress', 7, $1, 'NA', true), \
         ('coat', 8, $1, '', false), \
         ('shoe', 9, 'https://other.example/{0}', '', true)",
    )
    .bind(TEMPLATE)
    .execute(&pool)
    .await
    .unwrap();

    let seeds = list_active_seeds(&pool, TEMPLATE).await.unwrap();
    assert_eq!(seeds.len(), 1);
    let seed = seeds.into_iter().next().unwrap().into_seed();
    assert_eq!(seed.keyword, "dress");
    assert!(seed.target_url.contains("query=dress"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn rechecks_round_trip(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO adverts (domain, url, product, status) VALUES \
         ('poshmark.com', 'https://poshmark.com/listing/a', 'Tote', 'taken_down'), \
         ('poshmark.com', 'https://poshmark.com/listing/b', 'Belt', 'active')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO missing_sellers (domain, url) VALUES \
         ('poshmark.com', 'https://poshmark.com/listing/c')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let adverts = list_taken_down_adverts(&pool, "poshmark.com").await.unwrap();
    assert_eq!(adverts.len(), 1);
    let live: Vec<TakenDownRef> = adverts.into_iter().map(TakenDownRef::from).collect();
    assert_eq!(mark_adverts_seen(&pool, &live).await.unwrap(), 1);
    assert!(list_taken_down_adverts(&pool, "poshmark.com").await.unwrap().is_empty());

    let urls = list_missing_seller_urls(&pool, "poshmark.com").await.unwrap();
    assert_eq!(urls, vec!["https://poshmark.com/listing/c".to_string()]);
    let resolved = vec![MissingSellerRef {
        url: urls[0].clone(),
        seller: "amy".to_string(),
    }];
    assert_eq!(resolve_sellers(&pool, &resolved).await.unwrap(), 1);
    assert!(list_missing_seller_urls(&pool, "poshmark.com").await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn upsert_listings_updates_same_day_rows(pool: sqlx::PgPool) {
    upsert_listings(&pool, &[listing("https://poshmark.com/listing/a", "Old")])
        .await
        .unwrap();
    upsert_listings(&pool, &[listing("https://poshmark.com/listing/a", "New")])
        .await
        .unwrap();

    let titles: Vec<String> = sqlx::query_scalar("SELECT title FROM listings")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(titles, vec!["New".to_string()]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn record_export_accepts_empty_set(pool: sqlx::PgPool) {
    let export = NewCrawlExport {
        spider_name: "PoshmarkUSSpider",
        region: "NA",
        country: "United States",
        domain: "poshmark.com",
        seller: "poshmark",
    };
    let id = record_export(&pool, export, &[]).await.unwrap();
    let count: i32 = sqlx::query_scalar("SELECT listing_count FROM crawl_exports WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let recent = list_recent_exports(&pool, "PoshmarkUSSpider", 5).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, id);
    assert!(list_recent_exports(&pool, "OtherSpider", 5).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn crawl_run_lifecycle(pool: sqlx::PgPool) {
    let run = create_crawl_run(&pool, RunType::Crawl, TriggerSource::Cli)
        .await
        .unwrap();
    assert_eq!(run.status, "queued");

    let err = complete_crawl_run(&pool, run.id, 3).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidCrawlRunTransition { .. }));

    start_crawl_run(&pool, run.id).await.unwrap();
    complete_crawl_run(&pool, run.id, 3).await.unwrap();

    let row = get_crawl_run(&pool, run.id).await.unwrap();
    assert_eq!(row.status, "succeeded");
    assert_eq!(row.records_processed, 3);

    let runs = list_crawl_runs(&pool, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].public_id, row.public_id);
}
