use canvasfe::{EditorSettings, Effect, Layer, Point, Project, ToolKind};
use image::{Rgba, RgbaImage};

const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn settings(width: u32, height: u32) -> EditorSettings {
    EditorSettings {
        canvas_width: width,
        canvas_height: height,
        ..EditorSettings::default()
    }
}

fn active_pixels(project: &Project) -> &RgbaImage {
    project
        .canvas()
        .active_layer()
        .and_then(|l| l.pixels())
        .expect("active raster layer")
}

#[test]
fn brightness_on_mid_gray_then_exact_undo() {
    let mut project = Project::new(settings(16, 16));
    project.add_layer(Layer::new_raster("gray", 16, 16, GRAY));
    let original = active_pixels(&project).clone();

    assert!(project.apply_effect(&Effect::brightness(255)));
    assert!(
        active_pixels(&project).pixels().all(|p| *p == Rgba([255, 255, 255, 255])),
        "+255 on mid-gray should saturate to white"
    );
    assert_eq!(
        project.history().undo_description(),
        Some("Brightness +255")
    );

    assert!(project.undo());
    assert_eq!(
        active_pixels(&project),
        &original,
        "undo should restore the exact pre-effect buffer"
    );
    assert!(project.can_redo());
}

#[test]
fn degenerate_crop_gesture_records_nothing() {
    let mut project = Project::new(settings(16, 16));
    project.add_layer(Layer::new_raster("bg", 16, 16, GRAY));
    project.set_tool(ToolKind::Crop);
    let depth = project.history().undo_count();

    project.press(Point::new(5, 5));
    project.drag(Point::new(5, 12));
    assert!(!project.release(Point::new(5, 12)));

    assert_eq!(project.history().undo_count(), depth, "zero-width crop must not commit");
    assert_eq!(active_pixels(&project).dimensions(), (16, 16));
    assert_eq!(project.canvas().selection, None);
}

#[test]
fn crop_gesture_commits_once_and_undoes() {
    let mut project = Project::new(settings(16, 16));
    project.add_layer(Layer::new_raster("bg", 16, 16, GRAY));
    project.set_tool(ToolKind::Crop);

    project.press(Point::new(2, 2));
    project.drag(Point::new(6, 6));
    assert!(project.canvas().selection.is_some(), "drag should preview the crop rectangle");
    assert!(project.release(Point::new(10, 8)));
    assert_eq!(active_pixels(&project).dimensions(), (8, 6));
    assert_eq!(project.history().undo_description(), Some("Crop"));

    project.undo();
    assert_eq!(active_pixels(&project).dimensions(), (16, 16));
}

#[test]
fn layers_composite_back_to_front() {
    let mut project = Project::new(settings(8, 8));
    project.add_layer(Layer::new_raster("bottom", 8, 8, RED));
    project.add_layer(Layer::new_raster("top", 4, 4, BLUE));

    let frame = project.render();
    assert_eq!(*frame.get_pixel(1, 1), BLUE, "top layer should cover the bottom one");
    assert_eq!(*frame.get_pixel(6, 6), RED, "bottom layer shows outside the top layer");

    project.set_layer_visible(1, false);
    assert_eq!(*project.render().get_pixel(1, 1), RED);
}

#[test]
fn group_children_composite_in_order() {
    let group = Layer::group(
        "group",
        vec![
            Layer::new_raster("under", 8, 8, RED),
            Layer::new_raster("over", 8, 8, BLUE),
        ],
    );
    let mut project = Project::new(settings(8, 8));
    project.add_layer(group);
    assert_eq!(*project.render().get_pixel(3, 3), BLUE);

    assert!(
        !project.apply_effect(&Effect::Invert),
        "effects do not propagate into groups"
    );
    assert_eq!(project.history().undo_count(), 2);
}

#[test]
fn new_edit_after_undo_discards_redo() {
    let mut project = Project::new(settings(8, 8));
    project.add_layer(Layer::new_raster("bg", 8, 8, GRAY));
    project.apply_effect(&Effect::Invert);
    project.apply_effect(&Effect::Sepia);

    project.undo();
    assert!(project.can_redo());
    project.apply_effect(&Effect::brightness(-30));
    assert!(!project.can_redo());
    assert!(!project.redo());
    assert_eq!(
        project.history().undo_history(),
        vec!["Brightness -30", "Invert Colors", "Add Layer 'bg'", "Initial State"]
    );
}

#[test]
fn undo_stops_at_initial_state() {
    let mut project = Project::new(settings(8, 8));
    project.add_layer(Layer::new_raster("bg", 8, 8, GRAY));

    assert!(project.undo());
    assert!(project.canvas().layers.is_empty());
    assert_eq!(project.canvas().active_layer, None);
    for _ in 0..5 {
        assert!(!project.undo(), "undo at the floor is a no-op");
    }
    assert!(project.canvas().layers.is_empty());
}

#[test]
fn full_round_trip_matches_final_render() {
    let mut project = Project::new(settings(12, 12));
    project.add_layer(Layer::new_raster("a", 12, 12, GRAY));
    project.add_layer(Layer::new_raster("b", 6, 6, RED).with_opacity(0.5));
    project.apply_effect(&Effect::rotate(90.0));
    project.duplicate_active_layer();
    project.rename_layer(0, "base");
    let expected = project.render();

    let mut steps = 0;
    while project.undo() {
        steps += 1;
    }
    assert_eq!(steps, 5);
    while project.redo() {}
    assert_eq!(project.render(), expected);
    assert_eq!(project.canvas().active_layer, Some(2));
}

#[test]
fn retained_effect_values_cannot_change_history() {
    let mut project = Project::new(settings(4, 4));
    project.add_layer(Layer::new_raster("bg", 4, 4, GRAY));
    let mut effect = Effect::brightness(10);
    project.apply_effect(&effect);

    if let Effect::Brightness { delta } = &mut effect {
        *delta = -200;
    }
    let recorded = project.history().current().effect().copied();
    assert_eq!(recorded, Some(Effect::brightness(10)));
}

#[test]
fn imported_bytes_become_a_layer() {
    let raw: Vec<u8> = [9u8, 8, 7, 255].repeat(4);
    let layer = Layer::from_rgba_bytes("import", 2, 2, raw);
    let mut project = Project::new(settings(2, 2));
    project.add_layer(layer);
    assert_eq!(*project.render().get_pixel(1, 1), Rgba([9, 8, 7, 255]));

    let broken = Layer::from_rgba_bytes("broken", 2, 2, vec![1, 2, 3]);
    project.add_layer(broken);
    assert_eq!(
        *project.render().get_pixel(1, 1),
        Rgba([9, 8, 7, 255]),
        "a layer with a bad buffer renders as transparent"
    );
}

#[test]
fn selection_drag_across_the_whole_coordinate_range_renders() {
    let mut project = Project::new(settings(8, 8));
    project.add_layer(Layer::new_raster("bg", 8, 8, GRAY));
    project.set_tool(ToolKind::Select);

    project.press(Point::new(i32::MIN, 0));
    project.drag(Point::new(i32::MAX, 5));
    assert!(!project.release(Point::new(i32::MAX, 5)));
    assert!(project.canvas().selection.is_some());
    assert_eq!(project.render().dimensions(), (8, 8));

    project.press(Point::new(i32::MAX - 5, 0));
    project.drag(Point::new(i32::MAX, 5));
    assert_eq!(project.render().dimensions(), (8, 8));
}

#[test]
fn crop_across_the_whole_coordinate_range_is_ignored() {
    let mut project = Project::new(settings(8, 8));
    project.add_layer(Layer::new_raster("bg", 8, 8, GRAY));
    project.set_tool(ToolKind::Crop);
    let depth = project.history().undo_count();

    project.press(Point::new(i32::MIN, i32::MIN));
    project.drag(Point::new(i32::MAX, i32::MAX));
    assert!(!project.release(Point::new(i32::MAX, i32::MAX)), "oversized crop must not commit");
    assert_eq!(project.history().undo_count(), depth);
    assert_eq!(active_pixels(&project).dimensions(), (8, 8));
}

#[test]
fn single_step_cap_keeps_the_latest_edit_undoable() {
    let mut project = Project::new(EditorSettings {
        max_undo_steps: 1,
        ..settings(4, 4)
    });
    project.add_layer(Layer::new_raster("bg", 4, 4, GRAY));
    project.apply_effect(&Effect::Invert);

    assert!(project.can_undo());
    assert_eq!(project.history().current().description(), "Invert Colors");
    assert!(project.undo());
    assert_eq!(
        project.history().current().description(),
        "Initial State",
        "older edits are evicted, the initial state is not"
    );
}
