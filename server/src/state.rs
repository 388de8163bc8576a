use std::sync::Arc;

use bincode::{Decode, Encode};

use crate::masks::MaskStore;
use crate::middleware::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MaskStore>,
    pub limiter: Arc<RateLimiter>,
}

/// Everything the storage backends persist, written as one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Encode, Decode)]
pub struct PersistentStoreData {
    pub next_id: i64,
    pub masks: Vec<StoredMask>,
}

/// One mask row. `points_json` is kept opaque; only the API layer looks inside it.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct StoredMask {
    pub id: i64,
    pub model_id: i64,
    pub name: String,
    pub kind: String,
    pub opacity: f64,
    pub points_json: String,
    pub created_at_ms: u64,
}
