//! # Snapshot Repository
//!
//! Stores the engine state as rows: one table per collection plus
//! `stock_levels` for the per-location quantities.
//!
//! ## Save = Replace
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  DELETE stock_levels, products, documents, movements, customers        │
//! │  INSERT products + stock_levels                                         │
//! │  INSERT documents   (payload JSON, position = registry order)           │
//! │  INSERT movements   (position = ledger order)                           │
//! │  INSERT customers                                                       │
//! │                                                                         │
//! │  COMMIT ── or nothing: a failed save leaves the previous snapshot       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Documents are stored whole as JSON; the type, status and number columns
//! are copies used for lookups and the uniqueness index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockroom_core::{
    CustomerProfile, Document, InventorySnapshot, LocationId, MovementKind, MovementRecord,
    Product,
};

/// Deletion order respects the stock_levels → products foreign key.
const CLEAR_STATEMENTS: [&str; 5] = [
    "DELETE FROM stock_levels",
    "DELETE FROM products",
    "DELETE FROM documents",
    "DELETE FROM movements",
    "DELETE FROM customers",
];

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub products: i64,
    pub stock_levels: i64,
    pub documents: i64,
    pub movements: i64,
    pub customers: i64,
}

impl TableCounts {
    pub fn is_empty(&self) -> bool {
        *self == TableCounts::default()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: SqlitePool,
}

impl SnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SnapshotRepository { pool }
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Replaces the stored state with `snapshot`, atomically.
    pub async fn save(&self, snapshot: &InventorySnapshot) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for statement in CLEAR_STATEMENTS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        for product in &snapshot.products {
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, sku, name, category, description, min_quantity,
                    price_cents, promo_price_cents, offers, last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&product.id)
            .bind(&product.sku)
            .bind(&product.name)
            .bind(&product.category)
            .bind(&product.description)
            .bind(product.min_quantity)
            .bind(product.price_cents)
            .bind(product.promo_price_cents)
            .bind(&product.offers)
            .bind(product.last_updated)
            .execute(&mut *tx)
            .await?;

            for (location, quantity) in &product.stocks {
                sqlx::query(
                    "INSERT INTO stock_levels (product_id, location, quantity) VALUES (?1, ?2, ?3)",
                )
                .bind(&product.id)
                .bind(location.as_str())
                .bind(*quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        for (position, document) in snapshot.documents.iter().enumerate() {
            let payload = serde_json::to_string(document)?;
            sqlx::query(
                r#"
                INSERT INTO documents (
                    id, number, normalized_number, doc_type, status,
                    source, issued_at, total_cents, payload, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&document.id)
            .bind(&document.number)
            .bind(document.normalized_number())
            .bind(document.document_type())
            .bind(document.status)
            .bind(document.source.as_str())
            .bind(document.date)
            .bind(document.total_cents)
            .bind(payload)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        for (position, row) in snapshot.movements.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO movements (
                    position, id, product_id, product_name, sku, location,
                    kind, quantity_delta, timestamp, reference, note
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(position as i64)
            .bind(&row.id)
            .bind(&row.product_id)
            .bind(&row.product_name)
            .bind(&row.sku)
            .bind(row.location.as_str())
            .bind(row.kind)
            .bind(row.quantity_delta)
            .bind(row.timestamp)
            .bind(&row.reference)
            .bind(&row.note)
            .execute(&mut *tx)
            .await?;
        }

        for (position, customer) in snapshot.customers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO customers (
                    id, name, email, phone, address,
                    last_visit, lifetime_spend_cents, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&customer.id)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.address)
            .bind(customer.last_visit)
            .bind(customer.lifetime_spend_cents)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            products = snapshot.products.len(),
            documents = snapshot.documents.len(),
            movements = snapshot.movements.len(),
            customers = snapshot.customers.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Rebuilds the last saved snapshot. An empty database gives an empty
    /// snapshot.
    pub async fn load(&self) -> DbResult<InventorySnapshot> {
        let mut products: BTreeMap<String, Product> = sqlx::query(
            r#"
            SELECT id, sku, name, category, description, min_quantity,
                   price_cents, promo_price_cents, offers, last_updated
            FROM products
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(product_from_row)
        .map(|p| p.map(|p| (p.id.clone(), p)))
        .collect::<DbResult<_>>()?;

        let levels = sqlx::query("SELECT product_id, location, quantity FROM stock_levels")
            .fetch_all(&self.pool)
            .await?;
        for level in &levels {
            let product_id: String = level.try_get("product_id")?;
            let location: String = level.try_get("location")?;
            let quantity: i64 = level.try_get("quantity")?;
            let product = products
                .get_mut(&product_id)
                .ok_or_else(|| DbError::corrupt("stock_levels", format!("orphan product {}", product_id)))?;
            product.stocks.insert(LocationId::new(location), quantity);
        }

        let documents = sqlx::query("SELECT payload FROM documents ORDER BY position")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                let payload: String = row.try_get("payload")?;
                Ok(serde_json::from_str::<Document>(&payload)?)
            })
            .collect::<DbResult<Vec<_>>>()?;

        let movements = sqlx::query(
            r#"
            SELECT id, product_id, product_name, sku, location, kind,
                   quantity_delta, timestamp, reference, note
            FROM movements
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(movement_from_row)
        .collect::<DbResult<Vec<_>>>()?;

        let customers = sqlx::query(
            r#"
            SELECT id, name, email, phone, address, last_visit, lifetime_spend_cents
            FROM customers
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(customer_from_row)
        .collect::<DbResult<Vec<_>>>()?;

        let snapshot = InventorySnapshot {
            products: products.into_values().collect(),
            documents,
            movements,
            customers,
        };
        debug!(
            products = snapshot.products.len(),
            documents = snapshot.documents.len(),
            movements = snapshot.movements.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    pub async fn counts(&self) -> DbResult<TableCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM products)     AS products,
                (SELECT COUNT(*) FROM stock_levels) AS stock_levels,
                (SELECT COUNT(*) FROM documents)    AS documents,
                (SELECT COUNT(*) FROM movements)    AS movements,
                (SELECT COUNT(*) FROM customers)    AS customers
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TableCounts {
            products: row.try_get("products")?,
            stock_levels: row.try_get("stock_levels")?,
            documents: row.try_get("documents")?,
            movements: row.try_get("movements")?,
            customers: row.try_get("customers")?,
        })
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn product_from_row(row: &SqliteRow) -> DbResult<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        stocks: BTreeMap::new(),
        min_quantity: row.try_get("min_quantity")?,
        price_cents: row.try_get("price_cents")?,
        promo_price_cents: row.try_get("promo_price_cents")?,
        offers: row.try_get("offers")?,
        last_updated: row.try_get::<DateTime<Utc>, _>("last_updated")?,
    })
}

fn movement_from_row(row: &SqliteRow) -> DbResult<MovementRecord> {
    let location: String = row.try_get("location")?;
    Ok(MovementRecord {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        sku: row.try_get("sku")?,
        location: LocationId::new(location),
        kind: row.try_get::<MovementKind, _>("kind")?,
        quantity_delta: row.try_get("quantity_delta")?,
        timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
        reference: row.try_get("reference")?,
        note: row.try_get("note")?,
    })
}

fn customer_from_row(row: &SqliteRow) -> DbResult<CustomerProfile> {
    Ok(CustomerProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        last_visit: row.try_get::<DateTime<Utc>, _>("last_visit")?,
        lifetime_spend_cents: row.try_get("lifetime_spend_cents")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{
        CustomerContact, EngineConfig, LineItem, Money, ProductDraft, ReconciliationEngine,
    };

    async fn repo() -> SnapshotRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().snapshots()
    }

    fn busy_engine() -> ReconciliationEngine {
        let mut engine = ReconciliationEngine::new(EngineConfig::default()).unwrap();
        let sofa = engine
            .upsert_product(ProductDraft {
                sku: "SOFA-3".into(),
                name: "Three Seater".into(),
                category: "Living".into(),
                min_quantity: 1,
                price_cents: 4_500_000,
                promo_price_cents: Some(3_999_000),
                offers: Some("Free delivery".into()),
                opening_stock: Some(6),
                ..Default::default()
            })
            .unwrap();
        let master = LocationId::new("Master");
        let line = |qty| LineItem::new(&sofa.id, "SOFA-3", "Three Seater", qty, Money::from_cents(3_999_000));

        engine
            .issue(
                Document::sale("d1", "R-1", master.clone(), vec![line(1)])
                    .with_customer(CustomerContact::named("Mr Li").with_email("li@example.mu")),
            )
            .unwrap();
        engine
            .issue(Document::transfer("d2", "T-1", master, LocationId::new("Cascavelle"), vec![line(2)]))
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn test_empty_database_loads_empty_snapshot() {
        let repo = repo().await;
        assert!(repo.load().await.unwrap().is_empty());
        assert!(repo.counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_restores_everything() {
        let repo = repo().await;
        let snapshot = busy_engine().snapshot();

        repo.save(&snapshot).await.unwrap();
        let loaded = repo.load().await.unwrap();

        assert_eq!(loaded, snapshot);
        let counts = repo.counts().await.unwrap();
        assert_eq!(counts.products, 1);
        assert_eq!(counts.stock_levels, 2);
        assert_eq!(counts.documents, 2);
        assert_eq!(counts.movements, 4);
        assert_eq!(counts.customers, 1);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_state() {
        let repo = repo().await;
        repo.save(&busy_engine().snapshot()).await.unwrap();

        let mut engine = busy_engine();
        engine.wipe();
        repo.save(&engine.snapshot()).await.unwrap();

        assert!(repo.counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_snapshot() {
        let repo = repo().await;
        let good = busy_engine().snapshot();
        repo.save(&good).await.unwrap();

        let mut bad = good.clone();
        let mut twin = bad.documents[0].clone();
        twin.id = "other".into();
        twin.number = " r-1 ".into();
        bad.documents.push(twin);

        let err = repo.save(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(repo.load().await.unwrap(), good);
    }
}
