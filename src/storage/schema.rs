//! Database schema for the SQLite sink backend
//!
//! Three append-only tables mirroring the warehouse layout: `products`,
//! `listings` and `sellers`. Count maps are stored as JSON text.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id TEXT NOT NULL,
    total_results INTEGER NOT NULL,
    conditions TEXT NOT NULL,
    listing_types TEXT NOT NULL,
    printings TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_product ON products(product_id);

CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id TEXT NOT NULL,
    seller_key TEXT NOT NULL,
    tcg_id INTEGER NOT NULL,
    printing TEXT NOT NULL,
    condition TEXT NOT NULL,
    direct_quantity INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    price REAL NOT NULL,
    shipping_price REAL NOT NULL,
    listing_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_product ON listings(product_id);
CREATE INDEX IF NOT EXISTS idx_listings_seller ON listings(seller_key);

CREATE TABLE IF NOT EXISTS sellers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seller_key TEXT NOT NULL,
    seller_id TEXT NOT NULL,
    seller_name TEXT NOT NULL,
    seller_rating REAL NOT NULL,
    seller_sales INTEGER NOT NULL,
    verified INTEGER NOT NULL,
    gold_star INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sellers_key ON sellers(seller_key);
"#;

/// Creates the tables if they do not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
