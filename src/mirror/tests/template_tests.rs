//! Mirror document rendering tests.

use crate::issue::domain::CanonicalId;
use crate::mirror::domain::{
    MirrorContext, MirrorTemplate,
    marker::{parse_body_marker, parse_title_marker},
};
use rstest::rstest;

fn canonical(value: &str) -> CanonicalId {
    CanonicalId::new(value).expect("valid canonical id")
}

#[rstest]
fn default_template_renders_both_markers() {
    let id = canonical("FAB-400");
    let context = MirrorContext::new(&id, "Fix the widget pipeline", "Full reproduction steps.");

    let document = MirrorTemplate::default()
        .render(&id, &context)
        .expect("rendering should succeed");

    assert_eq!(document.title(), "[CID:FAB-400] Fix the widget pipeline");
    assert_eq!(parse_title_marker(document.title()), Some("FAB-400"));
    assert_eq!(parse_body_marker(document.body()), Some("FAB-400"));
    assert!(document.body().contains("Full reproduction steps."));
    assert!(document.body().contains("FAB-400"));
}

#[rstest]
fn rendering_is_deterministic() {
    let id = canonical("FAB-401");
    let context = MirrorContext::new(&id, "Same summary", "Same details");
    let template = MirrorTemplate::default();

    let first = template
        .render(&id, &context)
        .expect("rendering should succeed");
    let second = template
        .render(&id, &context)
        .expect("rendering should succeed");

    assert_eq!(first, second);
}

#[rstest]
fn custom_template_interpolates_context() {
    let id = canonical("FAB-402");
    let context = MirrorContext::new(&id, "Summary text", "Detail text");
    let template = MirrorTemplate::new(
        "{{ summary }} ({{ canonical_id }})",
        "{{ details }} for {{ canonical_id }}",
    );

    let document = template
        .render(&id, &context)
        .expect("rendering should succeed");

    assert_eq!(document.title(), "[CID:FAB-402] Summary text (FAB-402)");
    assert!(document.body().starts_with("Detail text for FAB-402"));
}

#[rstest]
fn malformed_template_reports_render_error() {
    let id = canonical("FAB-403");
    let context = MirrorContext::new(&id, "Summary", "Details");
    let template = MirrorTemplate::new("{{ summary", "{{ details }}");

    let result = template.render(&id, &context);

    assert!(result.is_err());
}
