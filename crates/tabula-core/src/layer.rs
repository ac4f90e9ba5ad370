//! Floor-scoped ordered shape containers.
//!
//! A [`Layer`] owns the draw order of its shapes, the snap index of their
//! points and a dirty flag. It never owns shapes themselves; those live in the
//! [`ShapeRegistry`](crate::id::ShapeRegistry) and are passed in through a
//! [`SyncContext`].

use crate::floor::{FloorId, LayerKey, LayerName};
use crate::history::Operation;
use crate::id::{LocalId, ShapeRegistry};
use crate::render::{DrawScene, Painter};
use crate::session::SyncContext;
use crate::snap::SnapIndex;
use crate::sync::{ClientMessage, InvalidationMode, SyncMode};
use crate::systems::{BlockerKind, CompositeSystem};
use futures::channel::oneshot;
use kurbo::Point;

/// Filter for [`Layer::get_shapes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeQuery {
    pub skip_ui_helpers: bool,
    pub include_composites: bool,
}

impl Default for ShapeQuery {
    fn default() -> Self {
        Self {
            skip_ui_helpers: true,
            include_composites: false,
        }
    }
}

/// Options for [`Layer::remove_shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOptions {
    pub sync: SyncMode,
    /// Rebuild vision triangulation right away.
    pub recalculate: bool,
    /// Release the local id and the shape itself.
    pub drop_shape_id: bool,
}

impl RemoveOptions {
    /// Full removal: recalculate vision and drop the id.
    pub fn new(sync: SyncMode) -> Self {
        Self {
            sync,
            recalculate: true,
            drop_shape_id: true,
        }
    }
}

#[derive(Debug)]
pub struct Layer {
    floor: FloorId,
    floor_name: String,
    name: LayerName,
    index: usize,
    valid: bool,
    light_requested: bool,
    debug: bool,
    pub player_editable: bool,
    pub selectable: bool,
    /// Draw order, back to front.
    shapes: Vec<LocalId>,
    points: SnapIndex,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Layer {
    pub fn new(
        floor: FloorId,
        floor_name: &str,
        name: LayerName,
        index: usize,
        debug: bool,
    ) -> Self {
        Self {
            floor,
            floor_name: floor_name.to_string(),
            name,
            index,
            valid: true,
            light_requested: false,
            debug,
            player_editable: name.player_editable(),
            selectable: name.selectable(),
            shapes: Vec::new(),
            points: SnapIndex::new(),
            waiters: Vec::new(),
        }
    }

    pub fn key(&self) -> LayerKey {
        LayerKey::new(self.floor, self.name)
    }

    pub fn name(&self) -> LayerName {
        self.name
    }

    pub fn floor(&self) -> FloorId {
        self.floor
    }

    pub fn floor_name(&self) -> &str {
        &self.floor_name
    }

    /// Position within the floor's layer stack.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Raw draw order, UI helpers included.
    pub fn shape_ids(&self) -> &[LocalId] {
        &self.shapes
    }

    pub fn contains(&self, id: LocalId) -> bool {
        self.shapes.contains(&id)
    }

    pub fn index_of(&self, id: LocalId) -> Option<usize> {
        self.shapes.iter().position(|s| *s == id)
    }

    pub fn snap_index(&self) -> &SnapIndex {
        &self.points
    }

    /// Shapes of this layer in draw order.
    pub fn get_shapes(
        &self,
        registry: &ShapeRegistry,
        composites: &dyn CompositeSystem,
        query: ShapeQuery,
    ) -> Vec<LocalId> {
        let shapes: Vec<LocalId> = self
            .shapes
            .iter()
            .copied()
            .filter(|id| {
                !query.skip_ui_helpers
                    || !registry.get(*id).is_some_and(|s| s.options.ui_helper)
            })
            .collect();
        if query.include_composites {
            composites.expand(&shapes)
        } else {
            shapes
        }
    }

    pub fn size(
        &self,
        registry: &ShapeRegistry,
        composites: &dyn CompositeSystem,
        query: ShapeQuery,
    ) -> usize {
        self.get_shapes(registry, composites, query).len()
    }

    /// Append a registered shape to this layer.
    pub fn add_shape(
        &mut self,
        cx: &mut SyncContext<'_>,
        id: LocalId,
        sync: SyncMode,
        invalidate: InvalidationMode,
    ) {
        let key = self.key();
        if self.shapes.contains(&id) {
            log::warn!("Shape {id} is already part of {key}");
            return;
        }
        let Some(shape) = cx.registry.get_mut(id) else {
            log::error!("Attempted to add unregistered shape {id} to {key}");
            return;
        };
        shape.layer = Some(key);
        let global = shape.global_id;
        self.shapes.push(id);

        let Some(props) = cx.systems.properties.get(id) else {
            log::error!("Missing shape properties for {id}");
            return;
        };

        let recalculate = invalidate.invalidates();
        cx.systems
            .vision
            .set_blocker(BlockerKind::Vision, self.floor, id, props.blocks_vision, recalculate);
        cx.systems.vision.set_blocker(
            BlockerKind::Movement,
            self.floor,
            id,
            props.blocks_movement,
            recalculate,
        );

        let Some(shape) = cx.registry.get(id) else {
            return;
        };
        if shape.snappable {
            for point in shape.points() {
                self.points.insert(point, id);
            }
        }
        for aura in shape.auras.iter().filter(|a| a.active && a.vision_source) {
            cx.systems.vision.add_vision_source(self.floor, id, aura.uuid);
        }

        if props.is_token && cx.systems.access.has_vision_access(id, false) {
            cx.systems.access.add_owned_token(id);
        }

        let emit = sync.emits() && !shape.prevent_sync;
        let descriptor = (emit || sync.records()).then(|| {
            shape.to_descriptor(&props, cx.systems.access.owners(id), &self.floor_name)
        });

        if emit {
            if let Some(shape) = descriptor.clone() {
                cx.outbox.send(ClientMessage::ShapeAdd {
                    shape,
                    temporary: sync.is_temporary(),
                });
            }
        }

        if invalidate.invalidates() {
            self.invalidate(invalidate.skips_light());
        }

        if cx.is_active(key)
            && cx.selection.focused().is_none()
            && cx.selection.last_focused() == Some(global)
        {
            cx.selection.push(id);
        }

        if sync.records() {
            if let Some(desc) = descriptor {
                cx.recorder.add_operation(Operation::ShapeAdd { shapes: vec![desc] });
            }
        }
    }

    /// Take a shape out of this layer. Returns `false` if it was not a member.
    pub fn remove_shape(
        &mut self,
        cx: &mut SyncContext<'_>,
        id: LocalId,
        options: RemoveOptions,
    ) -> bool {
        let key = self.key();
        let Some(index) = self.index_of(id) else {
            log::error!("Attempted to remove shape {id} not in layer {key}");
            return false;
        };
        let Some(shape) = cx.registry.get(id) else {
            log::error!("Layer {key} references unknown shape {id}");
            self.shapes.remove(index);
            return false;
        };
        let global = shape.global_id;
        let group_leader = shape.group_leader;
        let prevent_sync = shape.prevent_sync;
        let points = shape.points();
        let props = cx.systems.properties.get(id).unwrap_or_default();
        let triggers_vision_recalc = shape.triggers_vision_recalc(&props);

        if cx.locations.is_spawn_location(global) {
            let spawns = cx
                .locations
                .spawn_locations()
                .iter()
                .copied()
                .filter(|s| *s != global)
                .collect();
            let location = cx.locations.active_location;
            cx.locations
                .set_spawn_locations(spawns, location, true, cx.outbox);
        }

        self.shapes.remove(index);

        if let Some(leader) = group_leader {
            cx.systems.groups.remove_member(leader, global);
        }

        if options.sync.emits() && !prevent_sync {
            cx.outbox.send(ClientMessage::ShapesRemove {
                uuids: vec![global],
                temporary: options.sync.is_temporary(),
            });
        }

        let vision = &mut cx.systems.vision;
        vision.remove_blocker(BlockerKind::Vision, self.floor, id, options.recalculate);
        vision.remove_blocker(BlockerKind::Movement, self.floor, id, options.recalculate);
        vision.remove_vision_sources(self.floor, id);

        cx.systems.access.remove_owned_token(id);

        if options.drop_shape_id {
            cx.registry.drop_id(id);
            cx.systems.properties.drop_shape(id);
            cx.systems.access.drop_shape(id);
        } else if let Some(shape) = cx.registry.get_mut(id) {
            shape.layer = None;
        }
        cx.systems.markers.remove_marker(id, true);

        for point in points {
            self.points.remove(point, id);
        }

        if cx.is_active(key) {
            cx.selection.remove(id);
        }

        if options.sync.records() {
            cx.systems.initiative.remove_initiative(id, false);
        }
        self.invalidate(!triggers_vision_recalc);
        true
    }

    /// Move a shape to `destination` in the draw order.
    pub fn move_shape_order(
        &mut self,
        cx: &mut SyncContext<'_>,
        id: LocalId,
        destination: usize,
        sync: SyncMode,
    ) {
        let Some(old) = self.index_of(id) else {
            log::warn!("Attempted to reorder shape {id} not in layer {}", self.key());
            return;
        };
        if old == destination {
            return;
        }
        self.shapes.remove(old);
        let destination = destination.min(self.shapes.len());
        self.shapes.insert(destination, id);

        if sync.emits() {
            if let Some(shape) = cx.registry.get(id).filter(|s| !s.prevent_sync) {
                cx.outbox.send(ClientMessage::ShapeOrderSet {
                    uuid: shape.global_id,
                    index: destination,
                    temporary: sync.is_temporary(),
                });
            }
        }
        self.invalidate(true);
    }

    /// Update the snap index after a member's geometry changed.
    pub(crate) fn reindex(&mut self, id: LocalId, old: &[Point], new: &[Point]) {
        self.points.reindex(id, old, new);
    }

    /// Mark the layer dirty, optionally requesting a lighting recompute of its floor.
    pub fn invalidate(&mut self, skip_light_update: bool) {
        if self.debug {
            log::debug!("Invalidate layer {}", self.key());
        }
        self.valid = false;
        if !skip_light_update {
            self.light_requested = true;
        }
    }

    pub(crate) fn take_light_request(&mut self) -> bool {
        std::mem::take(&mut self.light_requested)
    }

    /// Resolves after the next completed draw, or is canceled if the layer
    /// is dropped first.
    pub fn wait_valid(&mut self) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        self.waiters.push(sender);
        receiver
    }

    /// Redraw the layer if it is dirty.
    pub fn draw(&mut self, painter: &mut dyn Painter, scene: &DrawScene<'_>, do_clear: bool) {
        if self.valid {
            return;
        }
        let key = self.key();
        if self.debug {
            log::debug!("Draw layer {key}");
        }
        if do_clear {
            painter.clear();
        }

        let viewport = painter.viewport();
        let is_active = scene.active_layer == Some(key);
        let mut visible = Vec::new();

        for &id in &self.shapes {
            let Some(shape) = scene.registry.get(id) else {
                continue;
            };
            if shape.options.skip_draw {
                continue;
            }
            if !shape.visible_in(viewport, true) {
                continue;
            }
            if self.name == LayerName::Lighting && !is_active {
                continue;
            }

            painter.draw_auras(shape);

            let invisible = scene
                .systems
                .properties
                .get(id)
                .is_some_and(|p| p.is_invisible);
            if invisible && !scene.systems.access.has_vision_access(id, true) {
                continue;
            }
            if !scene.filters.admits(shape) {
                continue;
            }
            visible.push(shape);
        }

        for shape in visible {
            shape.draw(painter);
        }

        if is_active && scene.selection.has_selection() {
            for &id in scene.selection.get() {
                if let Some(shape) = scene.registry.get(id) {
                    shape.draw_selection(painter, scene.selection_color, scene.selection_width);
                }
            }
        }

        if scene.shadowed_layer == Some(key) {
            painter.fill_screen(scene.floor_shadow);
        }

        self.valid = true;
        for waiter in self.waiters.drain(..) {
            // The receiver may have been dropped by an impatient caller.
            let _ = waiter.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::config::ClientConfig;
    use crate::render::{PaintCall, RecordingPainter};
    use crate::shapes::{Rectangle, Shape, ShapeKind};
    use crate::systems::ShapeProperties;
    use kurbo::Rect;
    use uuid::Uuid;

    fn board() -> (Board, LayerKey) {
        let mut board = Board::new(ClientConfig::default());
        board.add_floor("ground");
        let key = board.floors().key_by_name("ground", LayerName::Tokens).unwrap();
        (board, key)
    }

    fn rect(x: f64) -> Shape {
        Shape::new(
            Uuid::new_v4(),
            ShapeKind::Rectangle(Rectangle::new(Point::new(x, 0.0), 10.0, 10.0)),
        )
    }

    #[test]
    fn test_new_layer_is_valid_and_empty() {
        let layer = Layer::new(FloorId(0), "ground", LayerName::Map, 0, false);
        assert!(layer.is_valid());
        assert!(layer.shape_ids().is_empty());
        assert!(layer.player_editable == LayerName::Map.player_editable());
    }

    #[test]
    fn test_get_shapes_skips_ui_helpers() {
        let (mut board, key) = board();
        let plain = board
            .add_shape(key, rect(0.0), ShapeProperties::default(), SyncMode::NoSync)
            .unwrap();
        let mut helper = rect(20.0);
        helper.options.ui_helper = true;
        let helper = board
            .add_shape(key, helper, ShapeProperties::default(), SyncMode::NoSync)
            .unwrap();

        let layer = board.floors().layer(key).unwrap();
        let composites = board.systems().composites.as_ref();
        assert_eq!(
            layer.get_shapes(board.registry(), composites, ShapeQuery::default()),
            vec![plain]
        );
        let all = ShapeQuery {
            skip_ui_helpers: false,
            include_composites: true,
        };
        assert_eq!(layer.get_shapes(board.registry(), composites, all), vec![plain, helper]);
        assert_eq!(layer.size(board.registry(), composites, ShapeQuery::default()), 1);
    }

    #[test]
    fn test_add_shape_ignores_existing_member() {
        let (mut board, key) = board();
        let id = board
            .add_shape(key, rect(0.0), ShapeProperties::default(), SyncMode::NoSync)
            .unwrap();
        let mut session = board.session();
        let layer = session.floors.layer_mut(key).unwrap();
        layer.add_shape(&mut session.cx, id, SyncMode::NoSync, InvalidationMode::No);

        let layer = board.floors().layer(key).unwrap();
        assert_eq!(layer.shape_ids(), &[id]);
        assert_eq!(layer.snap_index().len(), 4);
    }

    #[test]
    fn test_unsnappable_shapes_are_not_indexed() {
        let (mut board, key) = board();
        let mut shape = rect(0.0);
        shape.snappable = false;
        board.add_shape(key, shape, ShapeProperties::default(), SyncMode::NoSync);
        assert!(board.floors().layer(key).unwrap().snap_index().is_empty());
    }

    #[test]
    fn test_token_with_vision_becomes_owned() {
        let (mut board, key) = board();
        let props = ShapeProperties {
            is_token: true,
            ..Default::default()
        };
        let id = board.add_shape(key, rect(0.0), props, SyncMode::NoSync).unwrap();
        assert!(board.systems().access.is_owned_token(id));

        board.remove_shape(id, SyncMode::NoSync);
        assert!(!board.systems().access.is_owned_token(id));
    }

    #[test]
    fn test_draw_skips_offscreen_and_hidden_shapes() {
        let (mut board, key) = board();
        board.add_shape(key, rect(0.0), ShapeProperties::default(), SyncMode::NoSync);
        let mut hidden = rect(20.0);
        hidden.options.skip_draw = true;
        board.add_shape(key, hidden, ShapeProperties::default(), SyncMode::NoSync);

        let mut painter = RecordingPainter::new();
        painter.viewport = Rect::new(-5.0, -5.0, 15.0, 15.0);
        board.add_shape(key, rect(500.0), ShapeProperties::default(), SyncMode::NoSync);
        board.draw_layer(key, &mut painter, true);

        assert_eq!(painter.calls.first(), Some(&PaintCall::Clear));
        assert_eq!(painter.count(|c| matches!(c, PaintCall::Auras(_))), 1);
    }

    #[test]
    fn test_lighting_layer_drawn_only_when_active() {
        let (mut board, _) = board();
        let key = board.floors().key_by_name("ground", LayerName::Lighting).unwrap();
        board.add_shape(key, rect(0.0), ShapeProperties::default(), SyncMode::NoSync);

        let mut painter = RecordingPainter::new();
        board.draw_layer(key, &mut painter, false);
        assert!(painter.calls.is_empty());

        board.select_layer(LayerName::Lighting);
        board.floors_mut().layer_mut(key).unwrap().invalidate(true);
        board.draw_layer(key, &mut painter, false);
        assert_eq!(painter.count(|c| matches!(c, PaintCall::Auras(_))), 1);
    }

    #[test]
    fn test_invalidate_light_request_is_taken_once() {
        let mut layer = Layer::new(FloorId(0), "ground", LayerName::Tokens, 2, true);
        layer.invalidate(true);
        assert!(!layer.take_light_request());
        layer.invalidate(false);
        assert!(layer.take_light_request());
        assert!(!layer.take_light_request());
        assert!(!layer.is_valid());
    }
}
