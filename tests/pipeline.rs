//! Integration tests for the compare pipeline pieces that run without a
//! browser or database: URL canonicalization feeding the diff engine and
//! the sentinel handling the job record relies on.

use image::{Rgba, RgbaImage};
use socialshot_lib::models::{DiffArtifact, SIZE_MISMATCH_SENTINEL, canonicalize_url};
use socialshot_lib::services::diff::{self, DiffOutcome};

fn capture_like(width: u32, height: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let value = ((x * 7 + y * 13) % 251) as u8;
        Rgba([value, value.wrapping_add(seed), 200, 255])
    })
}

#[test]
fn unchanged_page_produces_no_comparison() {
    let baseline = capture_like(640, 480, 3);
    let test = baseline.clone();

    // zero differing pixels is the pass condition: the orchestrator records
    // no comparison entry for this link
    assert_eq!(
        diff::compare(&baseline, &test, diff::DEFAULT_THRESHOLD),
        DiffOutcome::Match
    );
}

#[test]
fn altered_capture_produces_exactly_one_failing_comparison() {
    let baseline = capture_like(640, 480, 3);
    let mut test = baseline.clone();
    for x in 100..140 {
        for y in 50..90 {
            test.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
    }

    let DiffOutcome::Diff {
        pixel_count,
        artifact,
    } = diff::compare(&baseline, &test, diff::DEFAULT_THRESHOLD)
    else {
        panic!("expected a pixel diff");
    };

    assert!(pixel_count > 0);
    assert!(pixel_count <= 40 * 40);
    assert_eq!(artifact.dimensions(), (640, 480));

    // the artifact survives the encode step used before upload
    let png = diff::encode_png(&artifact).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (640, 480));
}

#[test]
fn resized_capture_yields_the_sentinel_not_a_count() {
    let baseline = capture_like(640, 480, 3);
    let test = capture_like(640, 520, 3);

    let outcome = diff::compare(&baseline, &test, diff::DEFAULT_THRESHOLD);
    assert!(matches!(outcome, DiffOutcome::SizeMismatch { .. }));

    // the job record stores the reserved location string for this case
    let artifact = DiffArtifact::SizeMismatch;
    assert_eq!(artifact.as_location_str(), SIZE_MISMATCH_SENTINEL);
    assert!(DiffArtifact::from_location(SIZE_MISMATCH_SENTINEL).is_size_mismatch());
}

#[test]
fn add_link_canonicalizes_before_any_capture() {
    // the permalink form is rewritten to the posts form, so the stored URL
    // matches what later job runs and accepts look up
    let stored = canonicalize_url(
        "facebook",
        "https://www.facebook.com/permalink.php?story_fbid=123&id=mypage",
    )
    .unwrap();
    assert_eq!(stored, "https://www.facebook.com/mypage/posts/123");
    assert_eq!(canonicalize_url("facebook", &stored).unwrap(), stored);

    // malformed URLs are rejected before any side effect
    assert!(canonicalize_url("facebook", "https://example.com/post/1").is_err());
}
