// All repository functions are generic over `E: Executor<'e, Database = Postgres>`
// so they accept both a `&PgPool` (direct query) and a `&mut Transaction` (atomic operations).
// Identifiers travel as text and are cast to `uuid` in SQL; a malformed id fails the query.

pub mod achievement;
pub mod activity;
pub mod enrollment;
pub mod points;
