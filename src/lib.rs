//! SQLite-backed user records.
//!
//! # Intention
//!
//! - Keep one `users` table in a local SQLite file.
//! - Seed it with a fixed batch on every run, list it, and print it.
//!
//! # Architectural Boundaries
//!
//! - Schema description and DDL generation live in [`sqlite`].
//! - Connection lifecycle and queries live in [`store`].
//! - The binary only wires logging and stdout to [`run`].

pub mod error;
pub mod sqlite;
pub mod store;

use std::io::Write;

use tracing::warn;

pub use error::StoreError;
pub use sqlite::{Schema, StoreConfig};
pub use store::{render, NewUser, RecordStore, User, HEADER, SEED_BATCH};

/// Execute one full pass against the store described by `config`: open,
/// ensure schema, seed, fetch, render to `out`, close.
///
/// The connection is released on every path once it has been opened. When a
/// step fails, its error wins over a later failure to close.
pub fn run<W: Write>(config: &StoreConfig, out: &mut W) -> Result<Vec<User>, StoreError> {
    let mut store = RecordStore::open(config)?;

    let outcome = store
        .ensure_schema()
        .and_then(|()| store.seed(&SEED_BATCH))
        .and_then(|_| store.fetch_all())
        .and_then(|users| {
            render(out, &users)?;
            Ok(users)
        });

    let closed = store.close();
    match (outcome, closed) {
        (Ok(users), Ok(())) => Ok(users),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "close failed after an earlier error");
            Err(err)
        }
    }
}
