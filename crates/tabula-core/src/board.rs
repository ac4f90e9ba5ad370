//! The client-side game board.
//!
//! [`Board`] owns every piece of mutable state: the shape registry, the floors
//! and their layers, the subsystems, the outbound queue, the selection and
//! the undo history. Host code calls into it for local edits and inbound
//! server traffic, draws layers through a [`Painter`], and drains the queues
//! it fills (outgoing messages, UI events, image loads).

use crate::clipboard::Clipboard;
use crate::config::ClientConfig;
use crate::error::{ModError, SyncError};
use crate::floor::{FloorId, Floors, LayerKey, LayerName};
use crate::history::{self, Direction, History};
use crate::id::{LocalId, ShapeRegistry};
use crate::layer::RemoveOptions;
use crate::location::{LocationId, LocationSettings};
use crate::mods::{ModEvents, ModLoad};
use crate::render::{DrawScene, LabelFilters, Painter};
use crate::selection::Selection;
use crate::session::{ImageLoad, Recorder, Session, SyncContext};
use crate::shapes::{ServerShape, Shape, TrackerDelta};
use crate::sync::{ClientMessage, InvalidationMode, Outbox, ServerMessage, SyncMode, UiEvent};
use crate::systems::{ShapeProperties, Systems};
use futures::channel::oneshot;
use kurbo::{Point, Vec2};
use uuid::Uuid;

#[derive(Debug)]
pub struct Board {
    config: ClientConfig,
    registry: ShapeRegistry,
    floors: Floors,
    systems: Systems,
    outbox: Outbox,
    selection: Selection,
    locations: LocationSettings,
    history: History,
    clipboard: Clipboard,
    mods: ModEvents,
    screen_center: Point,
    filters: LabelFilters,
    image_loads: Vec<ImageLoad>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Board {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_systems(config, Systems::default())
    }

    /// Board using host-provided subsystems.
    pub fn with_systems(config: ClientConfig, systems: Systems) -> Self {
        Self {
            history: History::with_limit(config.undo_limit),
            config,
            registry: ShapeRegistry::new(),
            floors: Floors::new(),
            systems,
            outbox: Outbox::new(),
            selection: Selection::new(),
            locations: LocationSettings::default(),
            clipboard: Clipboard::new(),
            mods: ModEvents::new(),
            screen_center: Point::ZERO,
            filters: LabelFilters::default(),
            image_loads: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn floors(&self) -> &Floors {
        &self.floors
    }

    pub fn floors_mut(&mut self) -> &mut Floors {
        &mut self.floors
    }

    pub fn systems(&self) -> &Systems {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut Systems {
        &mut self.systems
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Direct access for location messages and spawn-info acks.
    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn locations(&self) -> &LocationSettings {
        &self.locations
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn mods_mut(&mut self) -> &mut ModEvents {
        &mut self.mods
    }

    /// Open a recording session over the board state.
    pub fn session(&mut self) -> Session<'_> {
        self.open_session(false)
    }

    fn open_session(&mut self, replay: bool) -> Session<'_> {
        let active_layer = self.floors.current_layer_key();
        let recorder = if replay {
            Recorder::Replay
        } else {
            Recorder::Live(&mut self.history)
        };
        Session {
            floors: &mut self.floors,
            cx: SyncContext {
                registry: &mut self.registry,
                systems: &mut self.systems,
                outbox: &mut self.outbox,
                selection: &mut self.selection,
                locations: &mut self.locations,
                recorder,
                image_loads: &mut self.image_loads,
                active_layer,
            },
            config: &self.config,
        }
    }

    /// Add a floor carrying the default layer stack.
    pub fn add_floor(&mut self, name: &str) -> FloorId {
        self.floors
            .add_floor(name, &LayerName::DEFAULT_STACK, self.config.debug_layers)
    }

    pub fn select_floor(&mut self, floor: FloorId) -> bool {
        self.session().select_floor(floor)
    }

    pub fn select_layer(&mut self, name: LayerName) {
        self.selection.clear();
        self.floors.select_layer(name);
    }

    /// Active layer key, if the current floor has the current layer.
    pub fn current_layer(&self) -> Option<LayerKey> {
        self.floors.current_layer_key()
    }

    pub fn set_location(&mut self, location: LocationId) {
        self.locations.active_location = location;
    }

    /// Replace the spawn locations of the active location.
    pub fn set_spawn_locations(&mut self, spawns: Vec<Uuid>, sync: bool) {
        let location = self.locations.active_location;
        self.locations
            .set_spawn_locations(spawns, location, sync, &mut self.outbox);
    }

    pub fn add_shape(
        &mut self,
        key: LayerKey,
        shape: Shape,
        properties: ShapeProperties,
        sync: SyncMode,
    ) -> Option<LocalId> {
        self.session()
            .add_shape(key, shape, properties, sync, InvalidationMode::WithLight)
    }

    pub fn add_server_shape(
        &mut self,
        desc: &ServerShape,
        sync: SyncMode,
        invalidate: InvalidationMode,
    ) -> Option<LocalId> {
        self.session().add_server_shape(desc, sync, invalidate)
    }

    /// Load the full contents of a layer sent by the server.
    pub fn set_server_shapes(&mut self, key: LayerKey, shapes: &[ServerShape]) {
        self.session().set_server_shapes(key, shapes);
    }

    pub fn remove_shape(&mut self, id: LocalId, sync: SyncMode) -> bool {
        self.session().remove_shape(id, RemoveOptions::new(sync))
    }

    pub fn move_shape_order(&mut self, id: LocalId, destination: usize, sync: SyncMode) {
        let mut session = self.session();
        let Some(key) = session.layer_key_of(id) else {
            log::warn!("Attempted to reorder shape {id} outside any layer");
            return;
        };
        if let Some(layer) = session.floors.layer_mut(key) {
            layer.move_shape_order(&mut session.cx, id, destination, sync);
        }
    }

    pub fn move_shapes(&mut self, ids: &[LocalId], delta: Vec2, sync: SyncMode) {
        self.session().move_shapes(ids, delta, sync);
    }

    pub fn rotate_shapes(&mut self, ids: &[LocalId], angle: f64, center: Point, sync: SyncMode) {
        self.session().rotate_shapes(ids, angle, center, sync);
    }

    pub fn move_to_layer(&mut self, ids: &[LocalId], target: LayerKey, sync: bool) {
        self.session().move_to_layer(ids, target, sync);
    }

    pub fn move_to_floor(&mut self, ids: &[LocalId], floor: FloorId, sync: bool) {
        self.session().move_to_floor(ids, floor, sync);
    }

    pub fn handle_message(&mut self, message: ServerMessage) {
        self.session().handle_message(message);
    }

    /// Decode and apply one server message.
    pub fn handle_json(&mut self, json: &str) -> Result<(), SyncError> {
        let message: ServerMessage = serde_json::from_str(json)?;
        self.handle_message(message);
        Ok(())
    }

    /// Revert the most recent operation. Returns `false` if there was none.
    pub fn undo(&mut self) -> bool {
        self.replay(Direction::Undo)
    }

    /// Reapply the most recently undone operation.
    pub fn redo(&mut self) -> bool {
        self.replay(Direction::Redo)
    }

    fn replay(&mut self, direction: Direction) -> bool {
        let Some(operation) = self.history.take(direction) else {
            return false;
        };
        {
            let mut session = self.open_session(true);
            history::replay(&mut session, &operation, direction);
        }
        self.history.restore(direction, operation);
        true
    }

    pub fn set_screen_center(&mut self, center: Point) {
        self.screen_center = center;
    }

    pub fn set_label_filters(&mut self, filters: LabelFilters) {
        self.filters = filters;
        for layer in self.floors.layers_mut() {
            layer.invalidate(true);
        }
    }

    pub fn copy(&mut self) {
        let center = self.screen_center;
        let mut clipboard = std::mem::take(&mut self.clipboard);
        self.session().copy_shapes(&mut clipboard, center);
        self.clipboard = clipboard;
    }

    /// Paste into `target` on the current floor, or into the current layer.
    pub fn paste(&mut self, target: Option<LayerName>) -> Vec<LocalId> {
        let center = self.screen_center;
        let mut clipboard = std::mem::take(&mut self.clipboard);
        let pasted = self.session().paste_shapes(&mut clipboard, center, target);
        self.clipboard = clipboard;
        pasted
    }

    pub fn cut(&mut self) {
        let center = self.screen_center;
        let mut clipboard = std::mem::take(&mut self.clipboard);
        self.session().cut_shapes(&mut clipboard, center);
        self.clipboard = clipboard;
    }

    pub fn delete(&mut self) {
        self.session().delete_shapes();
    }

    /// Redraw a layer if it is dirty.
    pub fn draw_layer(&mut self, key: LayerKey, painter: &mut dyn Painter, do_clear: bool) {
        let scene = DrawScene {
            registry: &self.registry,
            systems: &self.systems,
            selection: &self.selection,
            filters: &self.filters,
            active_layer: self.floors.current_layer_key(),
            shadowed_layer: self.floors.shadowed_layer(),
            selection_color: self.config.selection_color.into(),
            selection_width: self.config.selection_width,
            floor_shadow: self.config.floor_shadow.into(),
        };
        let Some(layer) = self.floors.layer_mut(key) else {
            log::warn!("Attempted to draw unknown layer {key}");
            return;
        };
        layer.draw(painter, &scene, do_clear);
    }

    /// Resolves after the next completed draw of `key`.
    pub fn wait_valid(&mut self, key: LayerKey) -> Option<oneshot::Receiver<()>> {
        self.floors.layer_mut(key).map(|layer| layer.wait_valid())
    }

    /// Forward pending lighting requests to the vision system.
    pub fn flush_lighting(&mut self) -> Vec<FloorId> {
        let floors = self.floors.take_light_requests();
        for floor in &floors {
            self.systems.vision.invalidate_light(*floor);
        }
        floors
    }

    pub fn take_outgoing(&mut self) -> Vec<ClientMessage> {
        self.outbox.take_outgoing()
    }

    pub fn take_ui_events(&mut self) -> Vec<UiEvent> {
        self.outbox.take_ui_events()
    }

    /// Images the host must load before the assets using them can be drawn.
    pub fn take_image_loads(&mut self) -> Vec<ImageLoad> {
        std::mem::take(&mut self.image_loads)
    }

    /// An image finished loading: redraw every layer showing it.
    pub fn image_loaded(&mut self, src: &str) {
        let keys: Vec<LayerKey> = self
            .registry
            .iter()
            .filter(|(_, shape)| shape.asset_src() == Some(src))
            .filter_map(|(_, shape)| shape.layer)
            .collect();
        for key in keys {
            if let Some(layer) = self.floors.layer_mut(key) {
                layer.invalidate(true);
            }
        }
    }

    pub fn game_opened(&mut self) {
        let load = ModLoad {
            registry: &self.registry,
            floors: &self.floors,
        };
        self.mods.game_opened(&load);
    }

    pub fn location_loaded(&mut self) -> Result<(), ModError> {
        self.mods.location_loaded()
    }

    /// Change a tracker, letting mods adjust the change first.
    pub fn update_tracker(&mut self, id: LocalId, tracker: Uuid, delta: TrackerDelta) -> bool {
        let Some(current) = self
            .registry
            .get(id)
            .and_then(|shape| shape.trackers.iter().find(|t| t.uuid == tracker))
            .cloned()
        else {
            log::warn!("Shape {id} has no tracker {tracker}");
            return false;
        };
        let delta = self.mods.pre_tracker_update(id, &current, delta);
        let Some(shape) = self.registry.get_mut(id) else {
            return false;
        };
        if let Some(target) = shape.tracker_mut(tracker) {
            target.apply(&delta);
        }
        if let Some(layer) = shape.layer.and_then(|key| self.floors.layer_mut(key)) {
            layer.invalidate(true);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;
    use crate::mods::Mod;
    use crate::render::{PaintCall, RecordingPainter, rgba};
    use crate::shapes::{Aura, Rectangle, ShapeKind, ShapeOwner, Tracker};
    use crate::systems::{AccessControl, BlockerKind};
    use serde_json::json;
    use std::f64::consts::FRAC_PI_2;

    fn board() -> Board {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut board = Board::new(ClientConfig::default());
        board.add_floor("ground");
        board
    }

    fn tokens(board: &Board) -> LayerKey {
        board.floors().key_by_name("ground", LayerName::Tokens).unwrap()
    }

    fn rect_desc(x: f64, y: f64) -> ServerShape {
        ServerShape::new(Uuid::new_v4(), "rect", x, y, "ground", LayerName::Tokens)
            .with("width", json!(10.0))
            .with("height", json!(10.0))
    }

    fn add_rect(board: &mut Board, x: f64, y: f64) -> LocalId {
        board
            .add_server_shape(&rect_desc(x, y), SyncMode::NoSync, InvalidationMode::WithLight)
            .unwrap()
    }

    fn position(board: &Board, id: LocalId) -> Point {
        board.registry().get(id).unwrap().ref_point()
    }

    #[test]
    fn test_move_undo_redo() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        assert!(!board.history().can_undo());

        board.move_shapes(&[id], Vec2::new(10.0, 5.0), SyncMode::FullSync);
        assert_eq!(position(&board, id), Point::new(10.0, 5.0));
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapesPositionUpdate { temporary: false, .. }]
        ));
        assert_eq!(board.history().undo_len(), 1);

        assert!(board.undo());
        assert_eq!(position(&board, id), Point::new(0.0, 0.0));
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapesPositionUpdate { .. }]
        ));
        assert_eq!(board.history().undo_len(), 0);
        assert_eq!(board.history().redo_len(), 1);

        assert!(board.redo());
        assert_eq!(position(&board, id), Point::new(10.0, 5.0));
        assert_eq!(board.history().undo_len(), 1);
        assert_eq!(board.history().redo_len(), 0);
    }

    #[test]
    fn test_undo_redo_on_empty_history() {
        let mut board = board();
        assert!(!board.undo());
        assert!(!board.redo());
    }

    #[test]
    fn test_new_operation_after_undo_discards_redo() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        board.move_shapes(&[id], Vec2::new(10.0, 0.0), SyncMode::FullSync);
        board.undo();
        board.move_shapes(&[id], Vec2::new(0.0, 3.0), SyncMode::FullSync);

        assert!(!board.redo());
        assert_eq!(position(&board, id), Point::new(0.0, 3.0));
    }

    #[test]
    fn test_temporary_moves_are_not_recorded() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        board.move_shapes(&[id], Vec2::new(1.0, 1.0), SyncMode::TempSync);
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapesPositionUpdate { temporary: true, .. }]
        ));
        assert!(!board.history().can_undo());

        board.move_shapes(&[id], Vec2::new(1.0, 1.0), SyncMode::NoSync);
        assert!(board.take_outgoing().is_empty());
        assert_eq!(position(&board, id), Point::new(2.0, 2.0));
    }

    #[test]
    fn test_locked_shapes_do_not_move() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        board.systems_mut().properties.set_locked(id, true);
        board.move_shapes(&[id], Vec2::new(5.0, 5.0), SyncMode::FullSync);
        assert_eq!(position(&board, id), Point::ZERO);
        assert!(!board.history().can_undo());
    }

    #[test]
    fn test_rotation_undo() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        let center = board.registry().get(id).unwrap().center();

        board.rotate_shapes(&[id], FRAC_PI_2, center, SyncMode::FullSync);
        assert!((board.registry().get(id).unwrap().angle - FRAC_PI_2).abs() < 1e-9);

        assert!(board.undo());
        assert!(board.registry().get(id).unwrap().angle.abs() < 1e-9);
        assert!(board.take_ui_events().contains(&UiEvent::RotationHelperReset));

        assert!(board.redo());
        assert!((board.registry().get(id).unwrap().angle - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_about_pivot_undo_restores_position() {
        let mut board = board();
        let id = add_rect(&mut board, 20.0, 0.0);
        let before = board.registry().get(id).unwrap().center();

        board.rotate_shapes(&[id], FRAC_PI_2, Point::ZERO, SyncMode::FullSync);
        let rotated = board.registry().get(id).unwrap().center();
        assert!(rotated.distance(before) > 1.0);

        assert!(board.undo());
        let shape = board.registry().get(id).unwrap();
        assert!(shape.center().distance(before) < 1e-9);
        assert!(shape.angle.abs() < 1e-9);

        assert!(board.redo());
        assert!(board.registry().get(id).unwrap().center().distance(rotated) < 1e-9);
    }

    #[test]
    fn test_undo_redo_multiple_shapes() {
        let mut board = board();
        let a = add_rect(&mut board, 0.0, 0.0);
        let b = add_rect(&mut board, 30.0, 10.0);

        board.move_shapes(&[a, b], Vec2::new(-4.0, 6.0), SyncMode::FullSync);
        assert_eq!(board.history().undo_len(), 1);

        assert!(board.undo());
        assert_eq!(position(&board, a), Point::new(0.0, 0.0));
        assert_eq!(position(&board, b), Point::new(30.0, 10.0));

        assert!(board.redo());
        assert_eq!(position(&board, a), Point::new(-4.0, 6.0));
        assert_eq!(position(&board, b), Point::new(26.0, 16.0));
    }

    #[test]
    fn test_undo_skips_shapes_removed_remotely() {
        let mut board = board();
        let a = add_rect(&mut board, 0.0, 0.0);
        let b = add_rect(&mut board, 30.0, 0.0);
        let gone = board.registry().get(a).unwrap().global_id;
        board.move_shapes(&[a, b], Vec2::new(5.0, 5.0), SyncMode::FullSync);

        board.handle_message(ServerMessage::ShapesRemove(vec![gone]));
        assert!(board.registry().local_id(gone).is_none());

        assert!(board.undo());
        assert_eq!(position(&board, b), Point::new(30.0, 0.0));
        assert!(board.redo());
        assert_eq!(position(&board, b), Point::new(35.0, 5.0));
    }

    #[test]
    fn test_shape_add_undo_redo() {
        let mut board = board();
        let desc = rect_desc(0.0, 0.0);
        board.add_server_shape(&desc, SyncMode::FullSync, InvalidationMode::WithLight);
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapeAdd { temporary: false, .. }]
        ));

        assert!(board.undo());
        assert!(board.registry().local_id(desc.uuid).is_none());
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapesRemove { uuids, .. }] if uuids == &vec![desc.uuid]
        ));

        assert!(board.redo());
        let id = board.registry().local_id(desc.uuid).unwrap();
        assert!(board.floors().layer(tokens(&board)).unwrap().contains(id));
        assert_eq!(board.history().undo_len(), 1);
    }

    #[test]
    fn test_add_remove_are_inverse() {
        let mut board = board();
        let key = tokens(&board);
        let id = add_rect(&mut board, 0.0, 0.0);
        let layer = board.floors().layer(key).unwrap();
        assert_eq!(layer.shape_ids(), &[id]);
        assert_eq!(layer.snap_index().len(), 4);

        assert!(board.remove_shape(id, SyncMode::NoSync));
        let layer = board.floors().layer(key).unwrap();
        assert!(layer.shape_ids().is_empty());
        assert!(layer.snap_index().is_empty());
        assert!(board.registry().is_empty());
        assert!(board.take_outgoing().is_empty());

        assert!(!board.remove_shape(id, SyncMode::NoSync));
    }

    #[test]
    fn test_adding_same_shape_twice_replaces_it() {
        let mut board = board();
        let key = tokens(&board);
        let desc = rect_desc(0.0, 0.0);
        let first = factory::create_shape(&desc).unwrap();
        let second = factory::create_shape(&desc).unwrap();

        board.add_shape(key, first, ShapeProperties::default(), SyncMode::NoSync);
        let id = board
            .add_shape(key, second, ShapeProperties::default(), SyncMode::NoSync)
            .unwrap();
        assert_eq!(board.floors().layer(key).unwrap().shape_ids(), &[id]);
        assert_eq!(board.registry().len(), 1);

        assert!(board.remove_shape(id, SyncMode::NoSync));
        assert!(board.floors().layer(key).unwrap().shape_ids().is_empty());
        assert!(board.registry().is_empty());
        assert!(board.floors().layer(key).unwrap().snap_index().is_empty());
    }

    #[test]
    fn test_shared_snap_point_survives_removal() {
        let mut board = board();
        let key = tokens(&board);
        let a = add_rect(&mut board, 0.0, 0.0);
        let b = add_rect(&mut board, 10.0, 10.0);
        let shared = Point::new(10.0, 10.0);
        assert_eq!(
            board.floors().layer(key).unwrap().snap_index().ids_at(shared).map(|s| s.len()),
            Some(2)
        );

        board.remove_shape(a, SyncMode::NoSync);
        let index = board.floors().layer(key).unwrap().snap_index();
        assert!(index.ids_at(shared).is_some_and(|ids| ids.contains(&b)));
        assert!(index.ids_at(Point::ZERO).is_none());
    }

    #[test]
    fn test_prevent_sync_records_without_emitting() {
        let mut board = board();
        let key = tokens(&board);
        let mut shape = Shape::new(
            Uuid::new_v4(),
            ShapeKind::Rectangle(Rectangle::new(Point::ZERO, 5.0, 5.0)),
        );
        shape.prevent_sync = true;
        let id = board
            .add_shape(key, shape, ShapeProperties::default(), SyncMode::FullSync)
            .unwrap();
        assert!(board.take_outgoing().is_empty());
        assert!(board.history().can_undo());

        board.move_shapes(&[id], Vec2::new(1.0, 0.0), SyncMode::FullSync);
        assert!(board.take_outgoing().is_empty());
        assert_eq!(board.history().undo_len(), 2);
    }

    #[test]
    fn test_temp_sync_add() {
        let mut board = board();
        board.add_server_shape(&rect_desc(0.0, 0.0), SyncMode::TempSync, InvalidationMode::No);
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapeAdd { temporary: true, .. }]
        ));
        assert!(!board.history().can_undo());
    }

    #[test]
    fn test_reorder_to_same_index_is_noop() {
        let mut board = board();
        let key = tokens(&board);
        let a = add_rect(&mut board, 0.0, 0.0);
        let b = add_rect(&mut board, 20.0, 0.0);

        board.move_shape_order(a, 0, SyncMode::FullSync);
        assert!(board.take_outgoing().is_empty());
        assert_eq!(board.floors().layer(key).unwrap().shape_ids(), &[a, b]);

        board.move_shape_order(a, 5, SyncMode::FullSync);
        assert_eq!(board.floors().layer(key).unwrap().shape_ids(), &[b, a]);
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapeOrderSet { index: 1, .. }]
        ));
    }

    #[test]
    fn test_removing_spawn_location_syncs_spawn_list() {
        let mut board = board();
        let desc = rect_desc(0.0, 0.0);
        let other = Uuid::new_v4();
        let id = board
            .add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::No)
            .unwrap();
        board.set_location(3);
        board.set_spawn_locations(vec![desc.uuid, other], false);

        board.remove_shape(id, SyncMode::NoSync);
        assert_eq!(board.locations().spawn_locations(), &[other]);
        let sent = board.take_outgoing();
        let [ClientMessage::LocationOptionsSet(set)] = sent.as_slice() else {
            panic!("unexpected messages {sent:?}");
        };
        assert_eq!(set.location, Some(3));
        assert_eq!(set.options["spawn_locations"], json!([other]));
    }

    #[test]
    fn test_draw_is_idempotent_and_resolves_waiters() {
        let mut board = board();
        let key = tokens(&board);
        add_rect(&mut board, 0.0, 0.0);
        let mut waiter = board.wait_valid(key).unwrap();
        assert!(!board.floors().layer(key).unwrap().is_valid());

        let mut painter = RecordingPainter::new();
        board.draw_layer(key, &mut painter, true);
        assert!(board.floors().layer(key).unwrap().is_valid());
        assert_eq!(waiter.try_recv(), Ok(Some(())));
        let calls = painter.calls.len();
        assert!(calls > 0);

        board.draw_layer(key, &mut painter, true);
        assert_eq!(painter.calls.len(), calls);
    }

    #[test]
    fn test_wait_valid_future_completes_after_draw() {
        let mut board = board();
        let key = tokens(&board);
        add_rect(&mut board, 0.0, 0.0);
        let waiter = board.wait_valid(key).unwrap();
        board.draw_layer(key, &mut RecordingPainter::new(), false);
        assert_eq!(pollster::block_on(waiter), Ok(()));
    }

    #[test]
    fn test_selection_decoration_on_active_layer() {
        let mut board = board();
        let key = tokens(&board);
        let id = add_rect(&mut board, 0.0, 0.0);
        board.selection_mut().push(id);

        let mut painter = RecordingPainter::new();
        board.draw_layer(key, &mut painter, true);
        let selection = rgba(board.config().selection_color.into());
        let width = board.config().selection_width;
        assert_eq!(
            painter.count(|c| *c == PaintCall::Stroke(selection, width)),
            1
        );
    }

    #[test]
    fn test_lower_floor_gets_shadow() {
        let mut board = board();
        let upper = board.add_floor("upper");
        let desc = ServerShape::new(Uuid::new_v4(), "rect", 0.0, 0.0, "ground", LayerName::Draw)
            .with("width", json!(5.0))
            .with("height", json!(5.0));
        board.add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::WithoutLight);
        board.select_floor(upper);

        let key = board.floors().key_by_name("ground", LayerName::Draw).unwrap();
        let mut painter = RecordingPainter::new();
        board.draw_layer(key, &mut painter, true);
        let shadow = rgba(board.config().floor_shadow.into());
        assert_eq!(painter.calls.last(), Some(&PaintCall::Screen(shadow)));
    }

    #[test]
    fn test_invisible_shapes_hidden_without_vision_access() {
        let _ = env_logger::builder().is_test(true).try_init();
        let systems = Systems {
            access: Box::new(AccessControl::player("alice")),
            ..Systems::default()
        };
        let mut board = Board::with_systems(ClientConfig::default(), systems);
        board.add_floor("ground");
        let mut desc = rect_desc(0.0, 0.0);
        desc.is_invisible = true;
        desc.auras.push(Aura::new("glow", 5.0, 0.0));
        board.add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::WithLight);

        let key = tokens(&board);
        let mut painter = RecordingPainter::new();
        board.draw_layer(key, &mut painter, true);
        assert_eq!(painter.count(|c| matches!(c, PaintCall::Auras(_))), 1);
        assert_eq!(painter.count(|c| matches!(c, PaintCall::Fill(_))), 0);
    }

    #[test]
    fn test_auto_select_last_focused_shape() {
        let mut board = board();
        let desc = rect_desc(0.0, 0.0);
        let id = board
            .add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::No)
            .unwrap();
        board.selection_mut().focus(id, desc.uuid);
        board.selection_mut().unfocus();
        board.remove_shape(id, SyncMode::NoSync);
        assert!(!board.selection().has_selection());

        let id = board
            .add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::No)
            .unwrap();
        assert!(board.selection().is_selected(id));
    }

    #[test]
    fn test_missing_properties_degrade() {
        let mut board = board();
        let key = tokens(&board);
        let mut session = board.session();
        let id = session.cx.registry.register(Shape::new(
            Uuid::new_v4(),
            ShapeKind::Rectangle(Rectangle::new(Point::ZERO, 5.0, 5.0)),
        ));
        let layer = session.floors.layer_mut(key).unwrap();
        layer.add_shape(&mut session.cx, id, SyncMode::FullSync, InvalidationMode::WithLight);
        assert!(layer.contains(id));
        assert!(layer.snap_index().is_empty());
        drop(session);

        assert!(board.take_outgoing().is_empty());
        assert!(!board.history().can_undo());
        assert_eq!(board.registry().get(id).unwrap().layer, Some(key));
    }

    #[test]
    fn test_image_loaded_invalidates_without_light() {
        let mut board = board();
        let key = board.floors().key_by_name("ground", LayerName::Map).unwrap();
        let desc = ServerShape::new(Uuid::new_v4(), "assetrect", 0.0, 0.0, "ground", LayerName::Map)
            .with("width", json!(64.0))
            .with("height", json!(64.0))
            .with("src", json!("https://cdn.example.com/static/assets/map.png"));
        board.add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::WithLight);

        let loads = board.take_image_loads();
        assert_eq!(
            loads,
            vec![ImageLoad {
                src: "/static/assets/map.png".to_string(),
                layer: key,
            }]
        );
        board.flush_lighting();
        let mut painter = RecordingPainter::new();
        board.draw_layer(key, &mut painter, true);
        assert_eq!(painter.count(|c| matches!(c, PaintCall::Image(_))), 1);

        board.image_loaded("/static/assets/map.png");
        assert!(!board.floors().layer(key).unwrap().is_valid());
        assert!(board.flush_lighting().is_empty());
    }

    #[test]
    fn test_vision_blocker_requests_lighting() {
        let mut board = board();
        let floor = board.floors().current_floor_id().unwrap();
        let mut desc = rect_desc(0.0, 0.0);
        desc.blocks_vision = true;
        let id = board
            .add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::WithLight)
            .unwrap();
        assert_eq!(board.flush_lighting(), vec![floor]);
        assert!(board.flush_lighting().is_empty());

        assert!(board.systems().vision.is_blocker(
            BlockerKind::Vision,
            floor,
            id
        ));
        board.remove_shape(id, SyncMode::NoSync);
        assert!(!board.systems().vision.is_blocker(
            BlockerKind::Vision,
            floor,
            id
        ));
        assert_eq!(board.flush_lighting(), vec![floor]);
    }

    #[test]
    fn test_paste_uses_fallback_offset_close_to_anchor() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        board.selection_mut().push(id);
        board.copy();
        assert_eq!(board.clipboard().items().len(), 1);

        board.set_screen_center(Point::new(5.0, 5.0));
        let pasted = board.paste(None);
        assert_eq!(pasted.len(), 1);
        assert_eq!(position(&board, pasted[0]), Point::new(10.0, 10.0));
        assert_eq!(board.selection().get(), pasted.as_slice());

        board.set_screen_center(Point::new(105.0, 5.0));
        let pasted = board.paste(None);
        assert_eq!(position(&board, pasted[0]), Point::new(110.0, 10.0));
    }

    #[test]
    fn test_paste_assigns_fresh_ids_and_badges() {
        let mut board = board();
        let mut desc = rect_desc(0.0, 0.0);
        desc.trackers.push(Tracker::new("hp", 10.0, 10.0));
        desc.auras.push(Aura::new("light", 20.0, 10.0));
        let id = board
            .add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::No)
            .unwrap();
        board.selection_mut().push(id);
        board.copy();

        let first = board.paste(None)[0];
        let second = board.paste(None)[0];
        let registry = board.registry();
        let (a, b) = (registry.get(first).unwrap(), registry.get(second).unwrap());
        assert_ne!(a.global_id, desc.uuid);
        assert_ne!(a.global_id, b.global_id);
        assert_ne!(a.trackers[0].uuid, desc.trackers[0].uuid);
        assert_ne!(a.auras[0].uuid, desc.auras[0].uuid);
        assert_eq!(a.badge, 2);
        assert_eq!(b.badge, 3);
        assert_eq!(a.group_leader, Some(desc.uuid));
        assert_eq!(board.systems().groups.members(desc.uuid).len(), 2);

        let sent = board.take_outgoing();
        assert_eq!(
            sent.iter()
                .filter(|m| matches!(m, ClientMessage::GroupMemberAdd { .. }))
                .count(),
            2
        );
        assert_eq!(
            sent.iter()
                .filter(|m| matches!(m, ClientMessage::ShapeAdd { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_paste_without_clipboard() {
        let mut board = board();
        assert!(board.paste(None).is_empty());
        assert!(board.take_outgoing().is_empty());
    }

    #[test]
    fn test_delete_respects_edit_access() {
        let _ = env_logger::builder().is_test(true).try_init();
        let systems = Systems {
            access: Box::new(AccessControl::player("alice")),
            ..Systems::default()
        };
        let mut board = Board::with_systems(ClientConfig::default(), systems);
        board.add_floor("ground");

        let mut owned = rect_desc(0.0, 0.0);
        owned.owners.push(ShapeOwner {
            user: "alice".to_string(),
            edit_access: true,
            vision_access: true,
            movement_access: true,
        });
        let owned = board
            .add_server_shape(&owned, SyncMode::NoSync, InvalidationMode::No)
            .unwrap();
        let foreign = add_rect(&mut board, 20.0, 0.0);
        board.selection_mut().set([owned, foreign]);

        board.delete();
        assert!(!board.registry().contains(owned));
        assert!(board.registry().contains(foreign));
        assert!(!board.selection().has_selection());
        assert_eq!(board.take_ui_events(), vec![UiEvent::SelectionInfoCleared]);
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapesRemove { temporary: false, .. }]
        ));
    }

    #[test]
    fn test_cut_copies_then_deletes() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        board.selection_mut().push(id);
        board.cut();
        assert!(board.registry().is_empty());
        assert_eq!(board.clipboard().items().len(), 1);

        let pasted = board.paste(None);
        assert_eq!(pasted.len(), 1);
    }

    #[test]
    fn test_move_to_layer_emits_change() {
        let mut board = board();
        let id = add_rect(&mut board, 0.0, 0.0);
        let dm = board.floors().key_by_name("ground", LayerName::Dm).unwrap();

        board.move_to_layer(&[id], dm, true);
        assert_eq!(board.registry().get(id).unwrap().layer, Some(dm));
        assert!(!board.floors().layer(tokens(&board)).unwrap().contains(id));
        assert!(matches!(
            board.take_outgoing().as_slice(),
            [ClientMessage::ShapesLayerChange { layer: LayerName::Dm, .. }]
        ));
    }

    #[test]
    fn test_set_server_shapes_clears_selection() {
        let mut board = board();
        let key = tokens(&board);
        let existing = add_rect(&mut board, 0.0, 0.0);
        board.selection_mut().push(existing);

        board.set_server_shapes(key, &[rect_desc(20.0, 0.0), rect_desc(40.0, 0.0)]);
        assert!(!board.selection().has_selection());
        assert_eq!(board.floors().layer(key).unwrap().shape_ids().len(), 3);
        assert!(board.take_outgoing().is_empty());
    }

    #[test]
    fn test_handle_json() {
        let mut board = board();
        let desc = rect_desc(0.0, 0.0);
        let json = serde_json::to_string(&ServerMessage::ShapeAdd(desc.clone())).unwrap();
        board.handle_json(&json).unwrap();
        assert!(board.registry().local_id(desc.uuid).is_some());

        assert!(matches!(
            board.handle_json(r#"{"event": "Shape.Add", "data": 3}"#),
            Err(SyncError::Decode(_))
        ));
    }

    #[test]
    fn test_update_tracker_runs_mods() {
        struct Cap;
        impl Mod for Cap {
            fn pre_tracker_update(
                &mut self,
                _id: LocalId,
                tracker: &Tracker,
                mut delta: TrackerDelta,
            ) -> TrackerDelta {
                delta.value = delta.value.map(|v| v.min(tracker.max_value));
                delta
            }
        }

        let mut board = board();
        let mut desc = rect_desc(0.0, 0.0);
        let tracker = Tracker::new("hp", 5.0, 10.0);
        desc.trackers.push(tracker.clone());
        let id = board
            .add_server_shape(&desc, SyncMode::NoSync, InvalidationMode::No)
            .unwrap();
        board.mods_mut().register("cap", Box::new(Cap));

        let delta = TrackerDelta {
            value: Some(25.0),
            ..Default::default()
        };
        assert!(board.update_tracker(id, tracker.uuid, delta.clone()));
        assert_eq!(board.registry().get(id).unwrap().trackers[0].value, 10.0);
        assert!(!board.update_tracker(id, Uuid::new_v4(), delta));
    }
}
