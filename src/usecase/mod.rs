//! Use cases invoked by the transport layer.
//!
//! [`ListingService`] covers the read path, [`EditingService`] the write
//! path. Both depend only on the [`Repository`](crate::store::Repository)
//! trait and surface every failure as an [`AppError`](crate::errors::AppError)
//! without retrying.

mod editing;
mod listing;

pub use editing::EditingService;
pub use listing::ListingService;
