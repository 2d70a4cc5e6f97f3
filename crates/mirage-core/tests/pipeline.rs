use mirage_core::landmark::index;
use mirage_core::render::{IDLE_CAPTION, WARNING_CAPTION};
use mirage_core::surface::{Blend, DrawCommand};
use mirage_core::{
    FacePipeline, FrameInput, GenderMode, Landmark, LandmarkSet, MeshTopology, RasterSurface,
    RecordingSurface, ScriptedRandom, SeededRandom, ThemeKind, MESH_POINT_COUNT,
};

/// Elliptical point cloud with the named features placed anatomically and the mouth closed.
fn calm_face() -> LandmarkSet {
    let mut points: Vec<Landmark> = (0..MESH_POINT_COUNT)
        .map(|i| {
            let ring = (i % 6) as f32 / 6.0;
            let a = i as f32 * 0.731;
            Landmark::new(0.5 + 0.18 * ring * a.cos(), 0.52 + 0.26 * ring * a.sin(), 0.0)
        })
        .collect();
    let mut put = |i: usize, x: f32, y: f32| points[i] = Landmark::new(x, y, 0.0);
    put(index::FOREHEAD, 0.5, 0.25);
    put(index::CHIN, 0.5, 0.8);
    put(index::NOSE_TIP, 0.5, 0.5);
    put(index::UPPER_LIP, 0.5, 0.62);
    put(index::LOWER_LIP, 0.5, 0.625);
    put(index::RIGHT_EYE_OUTER, 0.38, 0.42);
    put(index::RIGHT_EYE_INNER, 0.45, 0.42);
    put(index::LEFT_EYE_INNER, 0.55, 0.42);
    put(index::LEFT_EYE_OUTER, 0.62, 0.42);
    LandmarkSet::new(points)
}

fn open_mouth_face() -> LandmarkSet {
    let mut face = calm_face();
    face.points[index::LOWER_LIP] = Landmark::new(0.5, 0.72, 0.0);
    face
}

fn frame<'a>(landmarks: Option<&'a LandmarkSet>, spectrum: Option<&'a [u8]>) -> FrameInput<'a> {
    FrameInput {
        landmarks,
        spectrum,
        theme: ThemeKind::Matrix,
        gender: GenderMode::Neutral,
        time_ms: 0.0,
    }
}

fn recording() -> FacePipeline<RecordingSurface, ScriptedRandom> {
    FacePipeline::new(
        RecordingSurface::new(320, 180),
        MeshTopology::default(),
        ScriptedRandom::constant(0.9),
    )
}

fn screen_passes(surface: &RecordingSurface) -> usize {
    surface
        .commands
        .iter()
        .filter(|c| matches!(c, DrawCommand::StrokeSegments { .. }))
        .filter(|c| c.paint().blend == Blend::Screen)
        .count()
}

#[test]
fn test_stationary_closed_mouth_stays_calm() {
    let mut pipeline = recording();
    let face = calm_face();
    for _ in 0..5 {
        let report = pipeline.process(frame(Some(&face), None));
        assert!(report.face_present);
        assert!(!report.signals.is_warning);
        assert!(!report.signals.is_glitch);
    }
}

#[test]
fn test_loud_audio_forces_glitch_passes() {
    let mut pipeline = recording();
    let face = calm_face();
    let spectrum = [160u8; 128];
    let report = pipeline.process(frame(Some(&face), Some(&spectrum)));
    assert!(report.signals.audio_level > 1.2);
    assert!(report.signals.is_glitch);
    // tessellation + five feature groups, twice
    assert_eq!(screen_passes(pipeline.surface()), 12);
}

#[test]
fn test_open_mouth_raises_warning_hud() {
    let mut pipeline = recording();
    let face = open_mouth_face();
    let report = pipeline.process(frame(Some(&face), None));
    assert!(report.signals.is_warning);
    assert!(pipeline.surface().texts().any(|t| t == WARNING_CAPTION));
    assert_eq!(screen_passes(pipeline.surface()), 12);
}

#[test]
fn test_no_face_draws_acquisition_caption() {
    let mut pipeline = recording();
    let report = pipeline.process(frame(None, Some(&[40u8; 128])));
    assert!(!report.face_present);
    assert!(!report.signals.is_glitch);
    assert!(pipeline.surface().texts().any(|t| t == IDLE_CAPTION));
}

#[test]
fn test_wild_landmark_is_treated_as_no_face() {
    let mut face = calm_face();
    face.points[338] = Landmark::new(1.0e6, 0.3, 0.0);
    let mut pipeline = recording();
    let report = pipeline.process(frame(Some(&face), None));
    assert!(!report.face_present);
    assert!(pipeline.surface().texts().any(|t| t == IDLE_CAPTION));

    let mut raster = FacePipeline::new(
        RasterSurface::new(160, 90),
        MeshTopology::default(),
        ScriptedRandom::constant(0.9),
    );
    assert!(!raster.process(frame(Some(&face), None)).face_present);
    assert!(raster.process(frame(Some(&calm_face()), None)).face_present);
}

#[test]
fn test_trails_converge_for_still_scene() {
    let mut pipeline = FacePipeline::new(
        RasterSurface::new(160, 90),
        MeshTopology::default(),
        ScriptedRandom::constant(0.9),
    );
    let face = calm_face();
    for _ in 0..300 {
        pipeline.process(frame(Some(&face), None));
    }
    let settled = pipeline.surface().image().clone();
    pipeline.process(frame(Some(&face), None));
    assert_eq!(pipeline.surface().image(), &settled);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut pipeline = FacePipeline::new(
            RasterSurface::new(96, 54),
            MeshTopology::default(),
            SeededRandom::from_seed(7),
        );
        let face = calm_face();
        let spectrum = [90u8; 128];
        for i in 0..20 {
            let landmarks = (i % 7 != 3).then_some(&face);
            pipeline.process(frame(landmarks, Some(&spectrum)));
        }
        pipeline.surface().image().clone()
    };
    assert_eq!(run(), run());
}
