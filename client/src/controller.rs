//! Async persistence actions over a shared [`MaskSession`].
//!
//! Each action reads what it needs, releases the borrow, awaits the façade and
//! only then borrows again to apply the result. A failure leaves the session as
//! it was before the call.

use std::cell::RefCell;

use wallmask_shared::{MaskId, DEFAULT_MODEL_ID};

use crate::api::{ApiError, MaskFacade};
use crate::logging;
use crate::session::MaskSession;

pub async fn load_masks<F>(session: &RefCell<MaskSession>, facade: &F) -> Result<usize, ApiError>
where
    F: MaskFacade + ?Sized,
{
    let masks = facade.list(DEFAULT_MODEL_ID).await?;
    let count = masks.len();
    session.borrow_mut().set_masks(masks);
    Ok(count)
}

/// Returns the new id, or `None` when saving is not enabled.
pub async fn save_new<F>(
    session: &RefCell<MaskSession>,
    facade: &F,
) -> Result<Option<MaskId>, ApiError>
where
    F: MaskFacade + ?Sized,
{
    let payload = session.borrow().new_mask_payload();
    let Some(payload) = payload else {
        return Ok(None);
    };
    let created = facade.create(&payload).await?;
    let id = created.id;
    session.borrow_mut().apply_created(created);
    Ok(Some(id))
}

/// Returns the updated id, or `None` when updating is not enabled.
pub async fn update_selected<F>(
    session: &RefCell<MaskSession>,
    facade: &F,
) -> Result<Option<MaskId>, ApiError>
where
    F: MaskFacade + ?Sized,
{
    let payload = session.borrow().update_payload();
    let Some((id, patch)) = payload else {
        return Ok(None);
    };
    let updated = facade.update(id, &patch).await?;
    if !session.borrow_mut().apply_updated(updated) {
        logging::info(&format!("mask {id} was updated after leaving the list"));
    }
    Ok(Some(id))
}

pub async fn delete_mask<F>(
    session: &RefCell<MaskSession>,
    facade: &F,
    id: MaskId,
) -> Result<(), ApiError>
where
    F: MaskFacade + ?Sized,
{
    facade.delete(id).await?;
    session.borrow_mut().apply_deleted(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use async_trait::async_trait;
    use pollster::block_on;
    use wallmask_shared::{Mask, MaskPatch, ModelId, NewMask, Point, UpdatedMask};

    use super::*;
    use crate::editor::EditorMode;
    use crate::session::tests::{closed_triangle, saved};

    /// In-memory stand-in for the HTTP API.
    #[derive(Default)]
    struct FakeFacade {
        masks: RefCell<Vec<Mask>>,
        next_id: Cell<MaskId>,
        fail_with: RefCell<Option<ApiError>>,
        calls: Cell<usize>,
    }

    impl FakeFacade {
        fn failing(error: ApiError) -> Self {
            let facade = Self::default();
            facade.fail_with.replace(Some(error));
            facade
        }

        fn check(&self) -> Result<(), ApiError> {
            self.calls.set(self.calls.get() + 1);
            match self.fail_with.borrow().clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait(?Send)]
    impl MaskFacade for FakeFacade {
        async fn list(&self, model_id: ModelId) -> Result<Vec<Mask>, ApiError> {
            self.check()?;
            Ok(self
                .masks
                .borrow()
                .iter()
                .filter(|mask| mask.model_id == model_id)
                .cloned()
                .collect())
        }

        async fn create(&self, mask: &NewMask) -> Result<Mask, ApiError> {
            self.check()?;
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let created = Mask {
                id,
                model_id: mask.model_id,
                name: mask.name.clone(),
                kind: mask.kind.clone(),
                opacity: mask.opacity,
                points: mask.points.clone(),
            };
            self.masks.borrow_mut().insert(0, created.clone());
            Ok(created)
        }

        async fn update(&self, id: MaskId, patch: &MaskPatch) -> Result<UpdatedMask, ApiError> {
            self.check()?;
            let mut masks = self.masks.borrow_mut();
            let mask = masks
                .iter_mut()
                .find(|mask| mask.id == id)
                .ok_or(ApiError::NotFound)?;
            mask.name = patch.name.clone();
            mask.opacity = patch.opacity;
            mask.points = patch.points.clone();
            Ok(UpdatedMask {
                id,
                name: patch.name.clone(),
                opacity: patch.opacity,
                points: patch.points.clone(),
            })
        }

        async fn delete(&self, id: MaskId) -> Result<(), ApiError> {
            self.check()?;
            let mut masks = self.masks.borrow_mut();
            let before = masks.len();
            masks.retain(|mask| mask.id != id);
            if masks.len() == before {
                return Err(ApiError::NotFound);
            }
            Ok(())
        }
    }

    #[test]
    fn save_then_select_round_trips() {
        let facade = FakeFacade::default();
        let session = RefCell::new(closed_triangle());
        session.borrow_mut().set_name("W1");
        let saved_points = session.borrow().new_mask_payload().unwrap().points;

        let id = block_on(save_new(&session, &facade)).unwrap().unwrap();
        assert_eq!(session.borrow().selected(), Some(id));
        assert_eq!(session.borrow().editor().mode(), EditorMode::Edit);

        session.borrow_mut().reset();
        block_on(load_masks(&session, &facade)).unwrap();
        session.borrow_mut().select(id).unwrap();

        let session = session.borrow();
        assert_eq!(session.editor().points(), saved_points.as_slice());
        assert_eq!(session.name(), "W1");
        assert!(session.editor().is_closed());
    }

    #[test]
    fn disabled_actions_do_not_call_the_facade() {
        let facade = FakeFacade::default();
        let session = RefCell::new(closed_triangle());
        assert_eq!(block_on(save_new(&session, &facade)), Ok(None));
        assert_eq!(block_on(update_selected(&session, &facade)), Ok(None));
        assert_eq!(facade.calls.get(), 0);
    }

    #[test]
    fn failed_update_leaves_the_list_unchanged() {
        let points = vec![
            Point::new(10.0, 10.0),
            Point::new(90.0, 10.0),
            Point::new(50.0, 80.0),
        ];
        let facade = FakeFacade::failing(ApiError::Server(500));
        let session = RefCell::new(MaskSession::new());
        session
            .borrow_mut()
            .set_masks(vec![saved(4, "W4", points)]);
        session.borrow_mut().select(4).unwrap();
        session.borrow_mut().set_name("renamed");
        let list_before = session.borrow().masks().to_vec();

        let result = block_on(update_selected(&session, &facade));
        assert_eq!(result, Err(ApiError::Server(500)));
        assert_eq!(session.borrow().masks(), list_before.as_slice());
        assert_eq!(session.borrow().name(), "renamed");
    }

    #[test]
    fn update_replaces_the_entry_by_id() {
        let facade = FakeFacade::default();
        let session = RefCell::new(closed_triangle());
        session.borrow_mut().set_name("W1");
        let id = block_on(save_new(&session, &facade)).unwrap().unwrap();

        session.borrow_mut().set_name("W1 final");
        session.borrow_mut().set_opacity(0.75);
        assert_eq!(block_on(update_selected(&session, &facade)), Ok(Some(id)));

        let session = session.borrow();
        assert_eq!(session.masks().len(), 1);
        assert_eq!(session.masks()[0].name, "W1 final");
        assert_eq!(session.masks()[0].opacity, 0.75);
    }

    #[test]
    fn delete_resets_only_when_selected() {
        let facade = FakeFacade::default();
        let session = RefCell::new(closed_triangle());
        session.borrow_mut().set_name("first");
        let first = block_on(save_new(&session, &facade)).unwrap().unwrap();
        session.borrow_mut().set_name("second");
        let second = block_on(save_new(&session, &facade)).unwrap().unwrap();
        assert_eq!(session.borrow().selected(), Some(second));

        block_on(delete_mask(&session, &facade, first)).unwrap();
        assert_eq!(session.borrow().selected(), Some(second));
        assert!(session.borrow().has_polygon());

        block_on(delete_mask(&session, &facade, second)).unwrap();
        assert_eq!(session.borrow().selected(), None);
        assert!(session.borrow().masks().is_empty());
        assert!(!session.borrow().has_polygon());
    }

    #[test]
    fn failed_delete_keeps_everything() {
        let facade = FakeFacade::failing(ApiError::Transport("offline".into()));
        let session = RefCell::new(MaskSession::new());
        session.borrow_mut().set_masks(vec![saved(1, "a", vec![])]);
        let before = session.borrow().clone();
        assert!(block_on(delete_mask(&session, &facade, 1)).is_err());
        assert_eq!(*session.borrow(), before);
    }

    #[test]
    fn failed_load_keeps_the_current_list() {
        let facade = FakeFacade::failing(ApiError::NotFound);
        let session = RefCell::new(MaskSession::new());
        session.borrow_mut().set_masks(vec![saved(1, "a", vec![])]);
        assert!(block_on(load_masks(&session, &facade)).is_err());
        assert_eq!(session.borrow().masks().len(), 1);
    }
}
