use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SynthError::layout("x")
            .to_string()
            .contains("layout constraint error:")
    );
    assert!(
        SynthError::renderer_contract("x")
            .to_string()
            .contains("renderer contract violation:")
    );
    assert!(
        SynthError::persistence("x")
            .to_string()
            .contains("manifest persistence error:")
    );
    assert!(
        SynthError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn classes_name_the_taxonomy() {
    assert_eq!(SynthError::layout("x").class(), "LayoutConstraintError");
    assert_eq!(
        SynthError::renderer_contract("x").class(),
        "RendererContractViolationError"
    );
    assert_eq!(SynthError::Cancelled.class(), "Cancelled");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SynthError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
