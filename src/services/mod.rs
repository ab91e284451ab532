pub mod orders;
pub mod products;
pub mod restaurants;
pub mod schedules;

use mongodb::error::{Error, ErrorKind};

use crate::ports::StoreError;

pub(crate) fn store_error(e: Error) -> StoreError {
    match *e.kind {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            StoreError::connection(e.to_string())
        }
        _ => StoreError::query(e.to_string()),
    }
}
