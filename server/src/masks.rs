use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use wallmask_shared::{Mask, MaskId, MaskPatch, ModelId, NewMask, Point, UpdatedMask};

use crate::state::{PersistentStoreData, StoredMask};
use crate::storage::{Storage, StorageError};

/// In-memory view of the mask table, written through to a [`Storage`] backend.
///
/// Mutations are applied to a copy of the snapshot and only become visible once the
/// backend has accepted it, so a failed write leaves the store as it was.
pub struct MaskStore {
    data: RwLock<PersistentStoreData>,
    storage: Arc<dyn Storage>,
}

impl MaskStore {
    /// Checks the backend is reachable and loads its snapshot.
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        storage.ping().await?;
        let mut data = storage.load().await?;
        let max_id = data.masks.iter().map(|mask| mask.id).max().unwrap_or(0);
        data.next_id = data.next_id.max(max_id + 1).max(1);
        log::info!("Loaded {} masks", data.masks.len());
        Ok(Self {
            data: RwLock::new(data),
            storage,
        })
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        self.storage.ping().await
    }

    /// Masks of one model, newest first.
    pub async fn list(&self, model_id: ModelId) -> Result<Vec<Mask>, StorageError> {
        let data = self.data.read().await;
        let mut rows = data
            .masks
            .iter()
            .filter(|mask| mask.model_id == model_id)
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.into_iter().map(to_mask).collect()
    }

    pub async fn create(&self, new_mask: NewMask) -> Result<Mask, StorageError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let id = next.next_id;
        next.next_id += 1;
        let row = StoredMask {
            id,
            model_id: new_mask.model_id,
            name: new_mask.name,
            kind: new_mask.kind,
            opacity: new_mask.opacity,
            points_json: encode_points(&new_mask.points),
            created_at_ms: now_ms(),
        };
        let mask = Mask {
            id,
            model_id: row.model_id,
            name: row.name.clone(),
            kind: row.kind.clone(),
            opacity: row.opacity,
            points: new_mask.points,
        };
        next.masks.push(row);
        self.storage.save(&next).await?;
        *data = next;
        log::debug!("Created mask {id} for model {}", mask.model_id);
        Ok(mask)
    }

    /// Returns `None` when no mask has this id.
    pub async fn update(
        &self,
        id: MaskId,
        patch: MaskPatch,
    ) -> Result<Option<UpdatedMask>, StorageError> {
        let mut data = self.data.write().await;
        let Some(index) = data.masks.iter().position(|mask| mask.id == id) else {
            return Ok(None);
        };
        let mut next = data.clone();
        let row = &mut next.masks[index];
        row.name = patch.name.clone();
        row.opacity = patch.opacity;
        row.points_json = encode_points(&patch.points);
        self.storage.save(&next).await?;
        *data = next;
        log::debug!("Updated mask {id}");
        Ok(Some(UpdatedMask {
            id,
            name: patch.name,
            opacity: patch.opacity,
            points: patch.points,
        }))
    }

    /// Returns `false` when no mask has this id.
    pub async fn delete(&self, id: MaskId) -> Result<bool, StorageError> {
        let mut data = self.data.write().await;
        let Some(index) = data.masks.iter().position(|mask| mask.id == id) else {
            return Ok(false);
        };
        let mut next = data.clone();
        next.masks.remove(index);
        self.storage.save(&next).await?;
        *data = next;
        log::debug!("Deleted mask {id}");
        Ok(true)
    }
}

fn to_mask(row: &StoredMask) -> Result<Mask, StorageError> {
    let points = serde_json::from_str::<Vec<Point>>(&row.points_json).map_err(|error| {
        StorageError::CorruptPoints {
            id: row.id,
            reason: error.to_string(),
        }
    })?;
    Ok(Mask {
        id: row.id,
        model_id: row.model_id,
        name: row.name.clone(),
        kind: row.kind.clone(),
        opacity: row.opacity,
        points,
    })
}

fn encode_points(points: &[Point]) -> String {
    // Vec<Point> of finite floats always serializes.
    serde_json::to_string(points).unwrap_or_else(|_| "[]".to_string())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
