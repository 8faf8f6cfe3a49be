//! The repository: every piece of durable state goes through [`Database`].
//!
//! A single SQLite connection behind a mutex is the arbiter of durable
//! state. Each public method is one transaction; compound operations
//! (catalog merges, bulk imports) stay inside a single call.

mod config_kv;
mod error;
mod games;
mod names;
mod recommendations;
mod reminders;
mod schema;
mod strikes;
mod trivia;

pub use error::{DbError, Result};
pub use games::NewGame;
pub use names::parse_legacy_array;
pub use reminders::NewReminder;
pub use trivia::NewQuestion;

use std::sync::Mutex;

use rusqlite::Connection;

/// Typed persistence contract for strikes, games, reminders, trivia, and
/// configuration.
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
    /// The streamer identity; strike writes against it are refused.
    pub(crate) strike_exempt: u64,
}

impl Database {
    /// Open (or create) the database file and initialise the schema.
    pub fn open(path: &str, strike_exempt: u64) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Bounded wait on a locked database; a call never blocks forever.
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        schema::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            strike_exempt,
        })
    }

    /// In-memory database for tests.
    pub fn open_in_memory(strike_exempt: u64) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            strike_exempt,
        })
    }
}
