//! Database persistence layer for the devnet chain

use crate::chain::state::RuntimeState;
use crate::chain::types::{BlockNumber, Hash};
use crate::devnet::block::{Block, BlockHeader};
use crate::error::KittyError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The last block together with the state after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHead {
    pub block: Block,
    pub state: RuntimeState,
    pub spec_version: u32,
}

/// Abstraction for persistence backends. A block and the state it produced
/// are always saved together.
pub trait Persistence: Send + Sync {
    fn save_block(&self, block: &Block, state: &RuntimeState, spec_version: u32) -> Result<(), KittyError>;
    fn load_head(&self) -> Result<Option<StoredHead>, KittyError>;
    fn load_block(&self, number: BlockNumber) -> Result<Option<Block>, KittyError>;
    fn block_count(&self) -> Result<u64, KittyError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

fn poisoned<T>(_: T) -> KittyError {
    KittyError::DatabaseError("Mutex poisoned".to_string())
}

fn to_hash(bytes: Vec<u8>) -> rusqlite::Result<Hash> {
    let array: [u8; 32] = bytes.try_into().map_err(|_| rusqlite::Error::InvalidQuery)?;
    Ok(Hash(array))
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, KittyError> {
        let conn = Connection::open(path)
            .map_err(|e| KittyError::DatabaseError(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, KittyError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, KittyError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                number INTEGER PRIMARY KEY,
                hash BLOB NOT NULL,
                parent_hash BLOB NOT NULL,
                timestamp INTEGER NOT NULL,
                extrinsics_root BLOB NOT NULL,
                state_root BLOB NOT NULL,
                extrinsics BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| KittyError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS head (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                number INTEGER NOT NULL,
                spec_version INTEGER NOT NULL,
                state BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| KittyError::DatabaseError(format!("Failed to create head table: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn read_block(conn: &Connection, number: BlockNumber) -> Result<Option<Block>, KittyError> {
        let row = conn
            .query_row(
                "SELECT parent_hash, timestamp, extrinsics_root, state_root, extrinsics
                 FROM blocks WHERE number = ?1",
                params![number as i64],
                |row| {
                    let timestamp: i64 = row.get(1)?;
                    Ok((
                        to_hash(row.get(0)?)?,
                        timestamp as u64,
                        to_hash(row.get(2)?)?,
                        to_hash(row.get(3)?)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((parent_hash, timestamp, extrinsics_root, state_root, extrinsics)) = row else {
            return Ok(None);
        };
        Ok(Some(Block {
            header: BlockHeader {
                number,
                parent_hash,
                timestamp,
                extrinsics_root,
                state_root,
            },
            extrinsics: bincode::deserialize(&extrinsics)?,
        }))
    }
}

impl Persistence for Database {
    /// Atomically saves a block and the head state it produced.
    fn save_block(&self, block: &Block, state: &RuntimeState, spec_version: u32) -> Result<(), KittyError> {
        let extrinsics = bincode::serialize(&block.extrinsics)?;
        let state_blob = bincode::serialize(state)?;

        let conn = self.conn.lock().map_err(poisoned)?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            KittyError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        tx.execute(
            "INSERT OR REPLACE INTO blocks (number, hash, parent_hash, timestamp, extrinsics_root, state_root, extrinsics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                block.header.number as i64,
                block.hash().0.to_vec(),
                block.header.parent_hash.0.to_vec(),
                block.header.timestamp as i64,
                block.header.extrinsics_root.0.to_vec(),
                block.header.state_root.0.to_vec(),
                extrinsics,
            ],
        )
        .map_err(|e| KittyError::DatabaseError(format!("Failed to save block: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO head (id, number, spec_version, state) VALUES (0, ?1, ?2, ?3)",
            params![block.header.number as i64, spec_version, state_blob],
        )
        .map_err(|e| KittyError::DatabaseError(format!("Failed to save head state: {}", e)))?;

        tx.commit().map_err(|e| {
            KittyError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;
        Ok(())
    }

    fn load_head(&self) -> Result<Option<StoredHead>, KittyError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let head = conn
            .query_row(
                "SELECT number, spec_version, state FROM head WHERE id = 0",
                [],
                |row| {
                    let number: i64 = row.get(0)?;
                    let spec_version: u32 = row.get(1)?;
                    let state: Vec<u8> = row.get(2)?;
                    Ok((number as u64, spec_version, state))
                },
            )
            .optional()?;

        let Some((number, spec_version, state)) = head else {
            return Ok(None);
        };
        let block = Self::read_block(&conn, number)?.ok_or_else(|| {
            KittyError::DatabaseError(format!("Head block #{} is missing", number))
        })?;
        Ok(Some(StoredHead {
            block,
            state: bincode::deserialize(&state)?,
            spec_version,
        }))
    }

    fn load_block(&self, number: BlockNumber) -> Result<Option<Block>, KittyError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        Self::read_block(&conn, number)
    }

    fn block_count(&self) -> Result<u64, KittyError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blocks: Arc<Mutex<Vec<Block>>>,
    head: Arc<Mutex<Option<(RuntimeState, u32)>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_block(&self, block: &Block, state: &RuntimeState, spec_version: u32) -> Result<(), KittyError> {
        let mut blocks = self.blocks.lock().map_err(poisoned)?;
        blocks.retain(|b| b.number() != block.number());
        blocks.push(block.clone());

        *self.head.lock().map_err(poisoned)? = Some((state.clone(), spec_version));
        Ok(())
    }

    fn load_head(&self) -> Result<Option<StoredHead>, KittyError> {
        let blocks = self.blocks.lock().map_err(poisoned)?;
        let head = self.head.lock().map_err(poisoned)?;
        let (Some(block), Some((state, spec_version))) = (blocks.iter().max_by_key(|b| b.number()), head.as_ref()) else {
            return Ok(None);
        };
        Ok(Some(StoredHead {
            block: block.clone(),
            state: state.clone(),
            spec_version: *spec_version,
        }))
    }

    fn load_block(&self, number: BlockNumber) -> Result<Option<Block>, KittyError> {
        let blocks = self.blocks.lock().map_err(poisoned)?;
        Ok(blocks.iter().find(|b| b.number() == number).cloned())
    }

    fn block_count(&self) -> Result<u64, KittyError> {
        Ok(self.blocks.lock().map_err(poisoned)?.len() as u64)
    }
}
