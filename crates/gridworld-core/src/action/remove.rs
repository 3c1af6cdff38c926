use crate::action::in_range;
use crate::{
    Action, ActionArgs, ActionFailure, ActionKind, ActionResult, EntityId, SenseRange, WorldState,
};

/// Deletes the entity given by `object_id` within `remove_range` (default 1),
/// together with everything it carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveObject;

impl RemoveObject {
    pub const SUCCESS: &'static str = "Remove action success";
}

impl Action for RemoveObject {
    fn kind(&self) -> ActionKind {
        ActionKind::RemoveObject
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        args: &ActionArgs,
    ) -> Result<(), ActionFailure> {
        let object = args.object_id().ok_or(ActionFailure::NoObjectSpecified)?;
        if !world.contains(object) {
            return Err(ActionFailure::ObjectNotFound(object));
        }
        if object == actor {
            return Err(ActionFailure::CannotRemoveSelf);
        }
        let range = args.range(ActionArgs::REMOVE_RANGE, SenseRange::Limited(1.0));
        if !in_range(world, actor, object, range) {
            return Err(ActionFailure::NotInRange);
        }
        Ok(())
    }

    fn is_feasible(&self, world: &WorldState, actor: EntityId) -> bool {
        world
            .store()
            .iter()
            .any(|e| self.is_possible(world, actor, &ActionArgs::target(e.id())).is_ok())
    }

    fn mutate(&self, world: &mut WorldState, _actor: EntityId, args: &ActionArgs) -> ActionResult {
        let Some(object) = args.object_id() else {
            return ActionFailure::NoObjectSpecified.into();
        };
        match world.remove(object) {
            Ok(_) => ActionResult::success(Self::SUCCESS),
            Err(_) => ActionFailure::ObjectNotFound(object).into(),
        }
    }
}
