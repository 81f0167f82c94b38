//! SQLite sink backend
//!
//! Each stream gets its own connection to the same database file. All three
//! are driven from the single writer thread, so inserts never contend.

use crate::model::{AggregateRecord, DetailRecord, SellerRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, SinkResult};
use rusqlite::{params, Connection};
use std::marker::PhantomData;
use std::path::Path;

pub const DATABASE_FILE: &str = "harvest.db";

/// Appends records of type `R` to their table
pub struct SqliteSink<R> {
    conn: Connection,
    _record: PhantomData<fn(&R)>,
}

impl<R> SqliteSink<R> {
    /// Opens the database, creating the schema on first use
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            _record: PhantomData,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            _record: PhantomData,
        })
    }

    #[cfg(test)]
    fn count(&self, table: &str) -> i64 {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn insert_detail(conn: &Connection, record: &DetailRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO listings (product_id, seller_key, tcg_id, printing, condition,
                               direct_quantity, quantity, price, shipping_price, listing_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.item_id.as_str(),
            record.seller_key,
            to_sql_int(record.condition_sku_id),
            record.printing,
            record.condition,
            to_sql_int(record.direct_quantity),
            to_sql_int(record.quantity),
            record.price,
            record.shipping_price,
            record.listing_date.to_string(),
        ],
    )
}

impl RecordSink<AggregateRecord> for SqliteSink<AggregateRecord> {
    fn append(&mut self, record: &AggregateRecord) -> SinkResult<()> {
        self.conn.execute(
            "INSERT INTO products (product_id, total_results, conditions, listing_types, printings)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.item_id.as_str(),
                to_sql_int(record.total_results),
                serde_json::to_string(&record.condition_counts)?,
                serde_json::to_string(&record.listing_type_counts)?,
                serde_json::to_string(&record.printing_counts)?,
            ],
        )?;
        Ok(())
    }
}

impl RecordSink<DetailRecord> for SqliteSink<DetailRecord> {
    fn append(&mut self, record: &DetailRecord) -> SinkResult<()> {
        insert_detail(&self.conn, record)?;
        Ok(())
    }

    // One transaction per product so its listings land together or not at all
    fn append_all(&mut self, records: &[DetailRecord]) -> SinkResult<()> {
        let tx = self.conn.transaction()?;
        for record in records {
            insert_detail(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl RecordSink<SellerRecord> for SqliteSink<SellerRecord> {
    fn append(&mut self, record: &SellerRecord) -> SinkResult<()> {
        self.conn.execute(
            "INSERT INTO sellers (seller_key, seller_id, seller_name, seller_rating,
                                  seller_sales, verified, gold_star)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.seller_key,
                record.seller_id,
                record.seller_name,
                record.rating,
                to_sql_int(record.sales_count),
                record.verified,
                record.gold_status,
            ],
        )?;
        Ok(())
    }
}
