//! Database layer
//!
//! This module provides the storage engine behind the article API.
//! It supports:
//! - SQLite (default, single file or in-memory)
//! - MySQL
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The pool handle (`DatabasePool`) is opened once at startup and passed
//! explicitly to repositories, the seed loader and the services. Caller
//! filters are parsed into a typed predicate tree ([`filter`]) and compiled
//! into parameterised SQL by the repositories.
//!
//! # Usage
//!
//! ```ignore
//! use articlebox::config::DatabaseConfig;
//! use articlebox::db::{create_pool, migrations, seed};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! seed::run_seed(&pool, &config.seed).await?;
//! ```

pub mod filter;
pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod seed;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
