use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ChalkboardError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ChalkboardError::choreography("x")
            .to_string()
            .contains("choreography error:")
    );
    assert!(
        ChalkboardError::export("x")
            .to_string()
            .contains("export error:")
    );
    assert!(
        ChalkboardError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn only_cancellation_is_cancelled() {
    assert!(ChalkboardError::ExportCancelled.is_cancelled());
    assert!(!ChalkboardError::export("ffmpeg died").is_cancelled());
    assert!(!ChalkboardError::ExportBusy.is_cancelled());
}

#[test]
fn json_errors_map_to_serde() {
    let err: ChalkboardError = serde_json::from_str::<u32>("{").unwrap_err().into();
    assert!(matches!(err, ChalkboardError::Serde(_)));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ChalkboardError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
