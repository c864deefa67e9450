//! # Repository Module
//!
//! SQLite implementations behind the engine's store seams.
//!
//! ## Available Repositories
//!
//! - [`cart::SqliteCartStore`] - Cart units of work (`CartStore`)
//! - [`product::ProductRepository`] - Product catalog and listing
//! - [`comment::CommentRepository`] - Product comments

pub mod cart;
pub mod comment;
pub mod product;
