use crate::action::in_range;
use crate::{
    Action, ActionArgs, ActionFailure, ActionKind, ActionResult, EntityId, GridShape, Location,
    SenseRange, WorldState,
};

const DEFAULT_REACH: SenseRange = SenseRange::Limited(1.0);

/// Picks up a movable, uncarried entity given by `object_id` within
/// `grab_range` (default 1). Nothing can grab an entity that is carrying it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrabObject;

impl GrabObject {
    pub const SUCCESS: &'static str = "Grab action success";
}

impl Action for GrabObject {
    fn kind(&self) -> ActionKind {
        ActionKind::GrabObject
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        args: &ActionArgs,
    ) -> Result<(), ActionFailure> {
        let object = args.object_id().ok_or(ActionFailure::NoObjectSpecified)?;
        let entity = world
            .get(object)
            .ok_or(ActionFailure::ObjectNotFound(object))?;
        if object == actor {
            return Err(ActionFailure::CannotGrabSelf);
        }
        if world.holds(object, actor) {
            return Err(ActionFailure::CannotGrabHolder);
        }
        if !in_range(world, actor, object, args.range(ActionArgs::GRAB_RANGE, DEFAULT_REACH)) {
            return Err(ActionFailure::NotInRange);
        }
        if !entity.movable {
            return Err(ActionFailure::ObjectNotMovable);
        }
        if entity.is_carried() {
            return Err(ActionFailure::ObjectAlreadyCarried);
        }
        Ok(())
    }

    fn is_feasible(&self, world: &WorldState, actor: EntityId) -> bool {
        world.store().iter().any(|e| {
            let args = ActionArgs::target(e.id());
            self.is_possible(world, actor, &args).is_ok()
        })
    }

    fn mutate(&self, world: &mut WorldState, actor: EntityId, args: &ActionArgs) -> ActionResult {
        let Some(object) = args.object_id() else {
            return ActionFailure::NoObjectSpecified.into();
        };
        match world.attach(actor, object) {
            Ok(()) => ActionResult::success(Self::SUCCESS),
            Err(_) => ActionFailure::NotPossible.into(),
        }
    }
}

/// Sets down a carried entity (`object_id`, default the last one grabbed).
///
/// The entity lands on the nearest cell within `drop_range` (default 1) of the
/// holder, the holder's own cell first, where it does not break occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropObject;

impl DropObject {
    pub const SUCCESS: &'static str = "Drop action success";

    fn item(world: &WorldState, actor: EntityId, args: &ActionArgs) -> Result<EntityId, ActionFailure> {
        let carrying = world
            .get(actor)
            .and_then(|e| e.avatar())
            .map(|a| a.carrying())
            .ok_or(ActionFailure::AgentRemoved)?;
        let last = *carrying.last().ok_or(ActionFailure::NothingCarried)?;
        match args.object_id() {
            Some(id) if carrying.contains(&id) => Ok(id),
            Some(id) => Err(ActionFailure::NotCarrying(id)),
            None => Ok(last),
        }
    }

    fn drop_location(
        world: &WorldState,
        actor: EntityId,
        item: EntityId,
        args: &ActionArgs,
    ) -> Option<Location> {
        let origin = world.location_of(actor)?;
        let solid = world.get(item).is_some_and(|e| !e.traversable);
        if !solid {
            return Some(origin);
        }

        let range = args.range(ActionArgs::DROP_RANGE, DEFAULT_REACH);
        let shape = world.shape();
        let extent = i64::from(shape.width.max(shape.height));
        let reach = match range {
            SenseRange::Limited(r) => (r.floor() as i64).clamp(0, extent),
            SenseRange::Unlimited => extent,
        };

        // Square rings around the origin. Every cell of ring `k` is at least
        // `k` away, so the search stops once the best free cell is closer
        // than the next ring.
        let mut best: Option<(f64, Location)> = None;
        for k in 0..=reach {
            for cell in ring(origin, k, shape) {
                let distance = origin.distance(cell);
                if !range.contains(distance) || world.intraversable_at(cell, None).is_some() {
                    continue;
                }
                let closer = best.is_none_or(|(d, at)| {
                    distance.total_cmp(&d).then(cell.cmp(&at)).is_lt()
                });
                if closer {
                    best = Some((distance, cell));
                }
            }
            if best.is_some_and(|(d, _)| d < (k + 1) as f64) {
                break;
            }
        }
        best.map(|(_, cell)| cell)
    }
}

impl Action for DropObject {
    fn kind(&self) -> ActionKind {
        ActionKind::DropObject
    }

    fn is_possible(
        &self,
        world: &WorldState,
        actor: EntityId,
        args: &ActionArgs,
    ) -> Result<(), ActionFailure> {
        let item = Self::item(world, actor, args)?;
        Self::drop_location(world, actor, item, args)
            .map(|_| ())
            .ok_or(ActionFailure::DropLocationOccupied)
    }

    fn mutate(&self, world: &mut WorldState, actor: EntityId, args: &ActionArgs) -> ActionResult {
        let placed = Self::item(world, actor, args).and_then(|item| {
            let at = Self::drop_location(world, actor, item, args)
                .ok_or(ActionFailure::DropLocationOccupied)?;
            Ok((item, at))
        });
        let (item, at) = match placed {
            Ok(found) => found,
            Err(failure) => return failure.into(),
        };
        match world.detach(actor, item, at) {
            Ok(()) => ActionResult::success(Self::SUCCESS),
            Err(_) => ActionFailure::NotPossible.into(),
        }
    }
}

/// On-grid cells at Chebyshev distance exactly `k` from `origin`.
fn ring(origin: Location, k: i64, shape: GridShape) -> Vec<Location> {
    let (ox, oy) = (i64::from(origin.x), i64::from(origin.y));
    let max_x = i64::from(shape.width).min(i64::from(i32::MAX) + 1) - 1;
    let max_y = i64::from(shape.height).min(i64::from(i32::MAX) + 1) - 1;
    let on_grid = |x: i64, y: i64| (0..=max_x).contains(&x) && (0..=max_y).contains(&y);
    if k == 0 {
        return if on_grid(ox, oy) { vec![origin] } else { Vec::new() };
    }

    let mut cells = Vec::new();
    for y in [oy - k, oy + k] {
        if (0..=max_y).contains(&y) {
            for x in (ox - k).max(0)..=(ox + k).min(max_x) {
                cells.push(Location::new(x as i32, y as i32));
            }
        }
    }
    for x in [ox - k, ox + k] {
        if (0..=max_x).contains(&x) {
            for y in (oy - k + 1).max(0)..=(oy + k - 1).min(max_y) {
                cells.push(Location::new(x as i32, y as i32));
            }
        }
    }
    cells
}
