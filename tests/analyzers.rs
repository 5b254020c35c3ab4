use affiche::{
    CanvasSize, Palette, PixelBuffer, analyze, analyze_bytes, gradient_background, optimize,
    optimize_bytes,
};

#[test]
fn gradient_background_scores_reasonably() {
    let bg = gradient_background(CanvasSize::Story, &Palette::default()).unwrap();
    // Analyzers work on any size; downsample first to keep the test fast.
    let small = bg.resize(108, 192).unwrap();
    let report = analyze(&small).unwrap();

    assert_eq!((report.width, report.height), (108, 192));
    assert!(report.score > 0.0 && report.score <= 1.0);
    assert!(!report.grade.is_empty());
    assert!(!report.recommendations.is_empty());
    // A smooth gradient carries almost no residual noise.
    assert!(report.metrics.noise < 10.0);
}

#[test]
fn analyze_and_zones_share_decode_path() {
    let png = PixelBuffer::filled(96, 96, [15, 15, 15, 255])
        .unwrap()
        .encode_png()
        .unwrap();

    let quality = analyze_bytes(&png).unwrap();
    assert!(quality.metrics.brightness < 50.0);

    let placement = optimize_bytes(&png, CanvasSize::Square);
    assert_eq!(placement.zones.len(), 3);
    for zone in &placement.zones {
        assert_eq!(zone.recommended_text_color, "#FFFFFF");
    }
}

#[test]
fn busy_composite_reads_busier_than_its_background() {
    let (w, h) = (128u32, 128u32);
    let flat = PixelBuffer::filled(w, h, [60, 60, 60, 255]).unwrap();

    let mut busy = flat.clone();
    for y in 0..h {
        for x in 0..w {
            if (x / 4 + y / 4) % 2 == 0 {
                let idx = ((y * w + x) as usize) * 4;
                busy.data[idx..idx + 4].copy_from_slice(&[230, 230, 230, 255]);
            }
        }
    }

    let flat_report = optimize(&flat, CanvasSize::Square);
    let busy_report = optimize(&busy, CanvasSize::Square);
    assert!(busy_report.background_complexity > flat_report.background_complexity);

    let flat_quality = analyze(&flat).unwrap();
    let busy_quality = analyze(&busy).unwrap();
    assert!(busy_quality.metrics.contrast > flat_quality.metrics.contrast);
    assert!(busy_quality.metrics.sharpness > flat_quality.metrics.sharpness);
}
