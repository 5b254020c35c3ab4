use std::sync::Arc;

use affiche::{
    ArtifactStore, BackgroundSynthesizer, Bounds, CanvasSize, CutoutAsset, CutoutFetch,
    DesignPipeline, EventInfo, GRADIENT_FALLBACK_MODEL, Harmonizer, MemoryStore, Mood, Palette,
    PixelBuffer, RASTER_COMPOSITE_MODEL, RenderContextStore, StylePrefs, artifact_path,
    gradient_background, rasterize,
};

fn event() -> EventInfo {
    EventInfo {
        title: "Neon Rooftop".to_string(),
        city: Some("Berlin".to_string()),
        date: Some("2026-11-20".to_string()),
        audience: Some("club crowd".to_string()),
        genre: Some("house".to_string()),
    }
}

#[test]
fn gradient_scenario_square_dark_palette() {
    let synth = BackgroundSynthesizer::new(None);
    let palette = Palette::new(["#222222", "#555555"]);
    let opt = synth
        .generate("unused", CanvasSize::Square, &palette, None)
        .unwrap();

    assert_eq!(opt.model, GRADIENT_FALLBACK_MODEL);
    assert_eq!((opt.image.width, opt.image.height), (2048, 2048));
    assert_eq!(opt.image.pixel(1000, 0), [0x22, 0x22, 0x22, 255]);
    assert_eq!(opt.image.pixel(1000, 2047), [0x55, 0x55, 0x55, 255]);

    // Deterministic: a second call is byte-identical.
    let again = synth
        .generate("unused", CanvasSize::Square, &palette, None)
        .unwrap();
    assert_eq!(opt.image.data, again.image.data);
}

#[test]
fn rasterize_preserves_canvas_dimensions_for_all_sizes() {
    for size in [CanvasSize::Square, CanvasSize::Story] {
        let bg = gradient_background(size, &Palette::default()).unwrap();
        let out = rasterize(&bg, &[], Mood::Lush).unwrap();
        assert_eq!((out.width, out.height), size.dimensions());
        assert_eq!(out.data, bg.data);
    }
}

#[test]
fn red_square_cutout_scenario() {
    let bg = PixelBuffer::filled(2048, 2048, [0, 0, 0, 255]).unwrap();
    let cut = CutoutAsset {
        id: "red".to_string(),
        image: PixelBuffer::filled(100, 100, [255, 0, 0, 255]).unwrap(),
        bounds: Bounds::new(0, 0, 100, 100),
        z: 1,
        visible: true,
    };
    let out = rasterize(&bg, &[cut], Mood::Minimal).unwrap();

    assert_eq!((out.width, out.height), (2048, 2048));
    assert_eq!(out.pixel(50, 50), [255, 0, 0, 255]);
    // The area just below the cutout carries shadow, not subject color.
    assert_ne!(out.pixel(50, 112), [255, 0, 0, 255]);
}

#[test]
fn full_session_compose_harmonize_and_store_artifacts() {
    let pipeline = DesignPipeline::new(
        BackgroundSynthesizer::new(None),
        Harmonizer::new(None),
        Arc::new(RenderContextStore::new()),
    );
    let store = MemoryStore::new();

    let sources = vec![("dj".to_string(), "mem://dj.png".to_string())];
    let session = pipeline
        .start_session("camp-1", event(), StylePrefs::default(), &sources)
        .unwrap();
    assert_eq!(session.variants.len(), 1);

    let variant = &session.variants[0];
    assert_eq!(variant.cutouts.len(), 1);
    assert_eq!(variant.cutouts[0].bounds.w, 400);

    // Persist the background under the render path convention.
    let bg_png = variant.background.image.encode_png().unwrap();
    let path = artifact_path(&session.campaign_id, &session.render_id, "bg_square.png");
    let url = store.put(&path, &bg_png).unwrap();
    assert!(url.ends_with("bg_square.png"));

    // Harmonize with one decoded cutout; no refiner configured means the
    // deterministic composite comes back.
    let dj = PixelBuffer::filled(200, 300, [220, 180, 40, 255])
        .unwrap()
        .encode_png()
        .unwrap();
    let fetches = vec![CutoutFetch {
        id: "dj".to_string(),
        source: "mem://dj.png".to_string(),
        bytes: dj,
        bounds: variant.cutouts[0].bounds,
        z: 1,
        visible: true,
    }];
    let harmonized = pipeline
        .harmonize_session(&session.render_id, &bg_png, &fetches, Some(9))
        .unwrap();

    assert_eq!(harmonized.model, RASTER_COMPOSITE_MODEL);
    assert_eq!(
        (harmonized.image.width, harmonized.image.height),
        CanvasSize::Square.dimensions()
    );
    // Subject center pixel shows the cutout color.
    let b = variant.cutouts[0].bounds;
    let cx = (b.x + b.w as i32 / 2) as u32;
    let cy = (b.y + b.h as i32 / 2) as u32;
    assert_eq!(harmonized.image.pixel(cx, cy), [220, 180, 40, 255]);

    let comp_png = harmonized.image.encode_png().unwrap();
    store
        .put(
            &artifact_path(&session.campaign_id, &session.render_id, "harmonized_square.png"),
            &comp_png,
        )
        .unwrap();
    assert_eq!(store.len(), 2);

    let ctx = pipeline.contexts().get(&session.render_id).unwrap();
    assert_eq!(
        ctx.extra.get("model_harmonize").map(String::as_str),
        Some(RASTER_COMPOSITE_MODEL)
    );
}

#[test]
fn concurrent_sessions_do_not_share_context() {
    let pipeline = Arc::new(DesignPipeline::new(
        BackgroundSynthesizer::new(None),
        Harmonizer::new(None),
        Arc::new(RenderContextStore::new()),
    ));

    let mut handles = Vec::new();
    for i in 0..4 {
        let pipeline = pipeline.clone();
        handles.push(std::thread::spawn(move || {
            let mut ev = event();
            ev.title = format!("Session {i}");
            let sources = vec![(format!("artist-{i}"), format!("mem://{i}.png"))];
            pipeline
                .start_session(&format!("camp-{i}"), ev, StylePrefs::default(), &sources)
                .unwrap()
        }));
    }

    let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, session) in sessions.iter().enumerate() {
        let ctx = pipeline.contexts().get(&session.render_id).unwrap();
        assert_eq!(ctx.event.title, format!("Session {i}"));
        assert_eq!(ctx.cutouts.len(), 1);
        assert_eq!(ctx.cutouts[0].id, format!("artist-{i}"));
    }
}
