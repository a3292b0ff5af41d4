use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use tracing::{debug, warn};

use crate::app::{Result, SkinshelfError};
use crate::domain::{CatalogRecord, PriceSource, SkinType};
use crate::store::{CatalogQuery, CatalogStore, QueryFilter, WriteOutcome, WriteReport};

const COLUMNS: &str = "id, name, brand, price, price_source, benefit, skin_type, \
                       ingredients, warnings, image, rating, created_at";

const INSERT_SQL: &str = "INSERT INTO products (id, name, brand, price, price_source, benefit, skin_type,
                              ingredients, warnings, image, rating, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

const INSERT_IF_ABSENT_SQL: &str = "INSERT INTO products (id, name, brand, price, price_source, benefit, skin_type,
                              ingredients, warnings, image, rating, created_at)
     SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
     WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = ?2 AND brand = ?3)";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| SkinshelfError::StoreUnavailable(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            SkinshelfError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CatalogRecord> {
        let skin_type = row
            .get::<_, String>(6)?
            .parse::<SkinType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

        Ok(CatalogRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            brand: row.get(2)?,
            price: row.get(3)?,
            price_source: row
                .get::<_, String>(4)
                .ok()
                .and_then(|s| PriceSource::parse(&s))
                .unwrap_or(PriceSource::Element),
            benefit: row.get(5)?,
            skin_type,
            ingredients: serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
            warnings: serde_json::from_str(&row.get::<_, String>(8)?).unwrap_or_default(),
            image: row.get(9)?,
            rating: row.get(10)?,
            created_at: row
                .get::<_, String>(11)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    /// Run `sql` (one of the insert statements) for `record`, assigning an id
    /// if it has none. Returns the id and the number of rows written.
    fn write_record(conn: &Connection, sql: &str, record: &CatalogRecord) -> Result<(String, usize)> {
        record.validate()?;

        let mut record = record.clone();
        let id = record.ensure_id().to_string();

        let changed = conn.execute(
            sql,
            params![
                id,
                record.name,
                record.brand,
                record.price,
                record.price_source.as_str(),
                record.benefit,
                record.skin_type.as_str(),
                serde_json::to_string(&record.ingredients)?,
                serde_json::to_string(&record.warnings)?,
                record.image,
                record.rating,
                record.created_at.to_rfc3339()
            ],
        )?;

        Ok((id, changed))
    }
}

impl CatalogStore for SqliteStore {
    fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn clear_all(&self) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM products", [])?;
        Ok(removed)
    }

    fn insert(&self, record: &CatalogRecord) -> Result<String> {
        let conn = self.conn()?;
        let (id, _) = Self::write_record(&conn, INSERT_SQL, record)?;
        Ok(id)
    }

    fn replace_all(&self, records: &[CatalogRecord]) -> Result<WriteReport> {
        let conn = self.conn()?;

        let mut report = WriteReport {
            cleared: conn.execute("DELETE FROM products", [])?,
            ..Default::default()
        };

        for record in records {
            match Self::write_record(&conn, INSERT_SQL, record) {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    warn!(name = %record.name, error = %e, "Failed to insert record");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn upsert_if_absent(&self, record: &CatalogRecord) -> Result<WriteOutcome> {
        let conn = self.conn()?;
        let (id, changed) = Self::write_record(&conn, INSERT_IF_ABSENT_SQL, record)?;

        if changed == 0 {
            debug!(name = %record.name, brand = %record.brand, "Record already present");
            Ok(WriteOutcome::Skipped)
        } else {
            Ok(WriteOutcome::Inserted(id))
        }
    }

    fn find_by_name_brand(&self, name: &str, brand: &str) -> Result<Option<CatalogRecord>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM products WHERE name = ?1 AND brand = ?2 ORDER BY rowid LIMIT 1",
                    COLUMNS
                ),
                params![name, brand],
                Self::row_to_record,
            )
            .optional()?;

        Ok(result)
    }

    fn find_by_skin_type(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>> {
        let mut sql = format!("SELECT {} FROM products WHERE skin_type = ?", COLUMNS);
        let mut values: Vec<Value> = vec![Value::Text(query.skin_type.as_str().to_string())];

        let mut clauses: Vec<String> = Vec::new();
        for filter in &query.filters {
            match filter {
                QueryFilter::MaxPrice(max) => {
                    clauses.push("price <= ?".to_string());
                    values.push(Value::Integer(*max));
                }
                QueryFilter::TextMatch(matches) => {
                    let mut parts = Vec::new();
                    for m in matches {
                        for alt in m.alternatives() {
                            parts.push(format!("{} LIKE ? ESCAPE '\\'", m.field.column()));
                            values.push(Value::Text(format!("%{}%", escape_like(alt))));
                        }
                    }
                    if !parts.is_empty() {
                        clauses.push(format!("({})", parts.join(" OR ")));
                    }
                }
            }
        }

        if !clauses.is_empty() {
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }
        sql.push_str(" ORDER BY rowid LIMIT ?");
        values.push(Value::Integer(query.limit as i64));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn all_records(&self) -> Result<Vec<CatalogRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!("SELECT {} FROM products ORDER BY rowid", COLUMNS))?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{TextField, TextMatch};

    fn record(name: &str, brand: &str, price: i64, skin_type: SkinType) -> CatalogRecord {
        CatalogRecord::new(name, brand, price, skin_type)
    }

    #[test]
    fn test_insert_assigns_id_and_round_trips() {
        let store = SqliteStore::in_memory().unwrap();
        let mut r = record("보습 에센스", "라운드랩", 15000, SkinType::Dry);
        r.ingredients = vec!["세라마이드".into(), "히알루론산".into()];
        r.warnings = vec!["눈가 주의".into()];
        r.image = Some("라운드랩_보습_에센스.jpg".into());
        r.price_source = PriceSource::Fallback;

        let id = store.insert(&r).unwrap();
        assert_eq!(id.len(), 36);

        let found = store.find_by_name_brand("보습 에센스", "라운드랩").unwrap().unwrap();
        assert_eq!(found.id.as_deref(), Some(id.as_str()));
        assert_eq!(found.ingredients, r.ingredients);
        assert_eq!(found.warnings, r.warnings);
        assert_eq!(found.image, r.image);
        assert_eq!(found.skin_type, SkinType::Dry);
        assert_eq!(found.price_source, PriceSource::Fallback);
        assert_eq!(found.rating, 4.5);
    }

    #[test]
    fn test_insert_keeps_existing_id() {
        let store = SqliteStore::in_memory().unwrap();
        let mut r = record("a", "b", 100, SkinType::Oily);
        r.id = Some("fixed-id".into());
        assert_eq!(store.insert(&r).unwrap(), "fixed-id");
    }

    #[test]
    fn test_insert_rejects_invalid_records() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.insert(&record("", "b", 100, SkinType::Oily)),
            Err(SkinshelfError::InvalidRecord(_))
        ));
        assert!(matches!(
            store.insert(&record("a", "b", 0, SkinType::Oily)),
            Err(SkinshelfError::InvalidRecord(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_schema_enforces_invariants() {
        let store = SqliteStore::in_memory().unwrap();
        let conn = store.conn().unwrap();
        let bad_skin = conn.execute(
            "INSERT INTO products (id, name, brand, price, benefit, skin_type, created_at)
             VALUES ('x', 'n', 'b', 100, 'b', 'normal', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(bad_skin.is_err());
        let bad_price = conn.execute(
            "INSERT INTO products (id, name, brand, price, benefit, skin_type, created_at)
             VALUES ('y', 'n', 'b', -1, 'b', 'dry', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(bad_price.is_err());
    }

    #[test]
    fn test_replace_all_wipes_previous_catalog() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&record("old", "b", 100, SkinType::Oily)).unwrap();
        store.insert(&record("older", "b", 100, SkinType::Oily)).unwrap();

        let report = store
            .replace_all(&[
                record("new", "b", 200, SkinType::Dry),
                record("", "broken", 200, SkinType::Dry),
            ])
            .unwrap();

        assert_eq!(report.cleared, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 1);
        let all = store.all_records().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "new");
    }

    #[test]
    fn test_replace_all_with_nothing_empties_catalog() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&record("old", "b", 100, SkinType::Oily)).unwrap();

        let report = store.replace_all(&[]).unwrap();
        assert_eq!(report.cleared, 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_if_absent_dedups_by_name_and_brand() {
        let store = SqliteStore::in_memory().unwrap();
        let r = record("수분 크림", "에스트라", 25000, SkinType::Dry);

        assert!(matches!(store.upsert_if_absent(&r).unwrap(), WriteOutcome::Inserted(_)));
        assert_eq!(store.upsert_if_absent(&r).unwrap(), WriteOutcome::Skipped);
        assert_eq!(store.count().unwrap(), 1);

        // Same name, different brand is a different product
        let other = record("수분 크림", "일리윤", 18000, SkinType::Dry);
        assert!(matches!(store.upsert_if_absent(&other).unwrap(), WriteOutcome::Inserted(_)));
        assert_eq!(store.count().unwrap(), 2);
    }

    fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        let mut essence = record("히알루론 에센스", "A", 32000, SkinType::Dry);
        essence.benefit = "탄력".into();
        store.insert(&essence).unwrap();
        store.insert(&record("수분 토너", "B", 12000, SkinType::Dry)).unwrap();
        store.insert(&record("세라마이드 크림", "C", 45000, SkinType::Dry)).unwrap();
        store.insert(&record("모공 토너", "D", 9000, SkinType::Oily)).unwrap();
        store
    }

    fn names(records: Vec<CatalogRecord>) -> Vec<String> {
        records.into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_find_by_skin_type_without_filters() {
        let store = seeded();
        let found = store.find_by_skin_type(&CatalogQuery::new(SkinType::Dry)).unwrap();
        assert_eq!(names(found), vec!["히알루론 에센스", "수분 토너", "세라마이드 크림"]);
        assert!(store
            .find_by_skin_type(&CatalogQuery::new(SkinType::Sensitive))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_find_by_skin_type_price_ceiling() {
        let store = seeded();
        let q = CatalogQuery::new(SkinType::Dry).with_filter(QueryFilter::MaxPrice(30000));
        assert_eq!(names(store.find_by_skin_type(&q).unwrap()), vec!["수분 토너"]);
    }

    #[test]
    fn test_find_by_skin_type_text_match_over_benefit_or_name() {
        let store = seeded();
        let q = CatalogQuery::new(SkinType::Dry).with_filter(QueryFilter::TextMatch(vec![
            TextMatch::new(TextField::Benefit, "탄력|주름"),
            TextMatch::new(TextField::Name, "크림"),
        ]));
        assert_eq!(
            names(store.find_by_skin_type(&q).unwrap()),
            vec!["히알루론 에센스", "세라마이드 크림"]
        );
    }

    #[test]
    fn test_find_by_skin_type_filters_are_or_combined() {
        let store = seeded();
        let q = CatalogQuery::new(SkinType::Dry)
            .with_filter(QueryFilter::MaxPrice(15000))
            .with_filter(QueryFilter::TextMatch(vec![TextMatch::new(TextField::Name, "크림")]))
            .with_limit(10);
        assert_eq!(
            names(store.find_by_skin_type(&q).unwrap()),
            vec!["수분 토너", "세라마이드 크림"]
        );
    }

    #[test]
    fn test_find_by_skin_type_limit_and_case() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&record("Vitamin SERUM", "x", 10000, SkinType::Oily)).unwrap();
        store.insert(&record("Clay Mask", "x", 10000, SkinType::Oily)).unwrap();
        let q = CatalogQuery::new(SkinType::Oily)
            .with_filter(QueryFilter::TextMatch(vec![TextMatch::new(TextField::Name, "serum")]));
        assert_eq!(names(store.find_by_skin_type(&q).unwrap()), vec!["Vitamin SERUM"]);

        let limited = CatalogQuery::new(SkinType::Oily).with_limit(1);
        assert_eq!(store.find_by_skin_type(&limited).unwrap().len(), 1);
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&record("100% 순수", "x", 10000, SkinType::Oily)).unwrap();
        store.insert(&record("순수 토너", "x", 10000, SkinType::Oily)).unwrap();
        let q = CatalogQuery::new(SkinType::Oily)
            .with_filter(QueryFilter::TextMatch(vec![TextMatch::new(TextField::Name, "%")]));
        assert_eq!(names(store.find_by_skin_type(&q).unwrap()), vec!["100% 순수"]);
        assert_eq!(escape_like("a_b"), "a\\_b");
    }

    #[test]
    fn test_file_backed_store_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.db");
        {
            let store = SqliteStore::new(&path).unwrap();
            store.ping().unwrap();
            store.insert(&record("a", "b", 100, SkinType::Oily)).unwrap();
        }
        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
