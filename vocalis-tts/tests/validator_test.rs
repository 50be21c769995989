//! Tests for provider-aware validation

use serde_json::json;
use vocalis_tts::{
    ConfigPatch, ConfigValidator, EmotionCatalog, EmotionMode, EngineCatalog, EngineConfig, EngineMeta,
    Violation,
};

fn catalogs() -> (EngineCatalog, EmotionCatalog) {
    (EngineCatalog::default(), EmotionCatalog::default())
}

fn tencent() -> EngineConfig {
    EngineConfig::new("tencent_tts").with_credentials("AKID", "KEY").with_enabled(true)
}

#[test]
fn test_provider_is_immutable() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let err = validator
        .validate_patch(&tencent(), &ConfigPatch::new().provider("edge_tts"))
        .unwrap_err();
    assert_eq!(
        err,
        Violation::ProviderImmutable {
            current: "tencent_tts".to_string(),
            requested: "edge_tts".to_string(),
        }
    );

    // restating the same provider is not a change
    assert!(validator
        .validate_patch(&tencent(), &ConfigPatch::new().provider("tencent_tts"))
        .is_ok());
}

#[test]
fn test_required_fields_consider_existing_values() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let merged = validator
        .validate_patch(&tencent(), &ConfigPatch::new().region("ap-shanghai"))
        .unwrap();
    assert_eq!(merged.region.as_deref(), Some("ap-shanghai"));
    assert_eq!(merged.credentials.secret_key.as_deref(), Some("KEY"));
}

#[test]
fn test_blank_required_field_is_missing() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let mut patch = ConfigPatch::new();
    patch.secret_key = Some("   ".to_string());
    let err = validator.validate_patch(&tencent(), &patch).unwrap_err();
    assert_eq!(err, Violation::missing("secret_key"));
}

#[test]
fn test_required_checked_before_speed() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let mut patch = ConfigPatch::new().speed_ratio(0.0);
    patch.secret_id = Some(String::new());
    assert_eq!(
        validator.validate_patch(&tencent(), &patch).unwrap_err(),
        Violation::missing("secret_id")
    );
}

#[test]
fn test_unknown_extension_passes_through() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let merged = validator
        .validate_patch(&tencent(), &ConfigPatch::new().extension("codec", json!("mp3")))
        .unwrap();
    assert_eq!(merged.extra_params.extensions.get("codec"), Some(&json!("mp3")));
}

#[test]
fn test_extension_cannot_shadow_reserved_attribute() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let err = validator
        .validate_patch(&tencent(), &ConfigPatch::new().extension("speed_ratio", json!(3.0)))
        .unwrap_err();
    assert_eq!(err, Violation::ReservedField { key: "speed_ratio".to_string() });

    let err = validator
        .validate_patch(&tencent(), &ConfigPatch::new().extension("emo_alpha", json!(0.5)))
        .unwrap_err();
    assert_eq!(err, Violation::ReservedField { key: "emo_alpha".to_string() });
}

#[test]
fn test_emotion_on_provider_without_support() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let err = validator
        .validate_patch(&tencent(), &ConfigPatch::new().emotion_mode(EmotionMode::Auto))
        .unwrap_err();
    assert!(matches!(err, Violation::InvalidEmotionConfig(_)));
}

#[test]
fn test_unknown_provider_is_forward_compatible() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let current = EngineConfig::new("future_tts").with_enabled(true);
    let merged = validator
        .validate_patch(
            &current,
            &ConfigPatch::new()
                .emotion_mode(EmotionMode::Manual)
                .extension("style", json!("narration")),
        )
        .unwrap();
    assert_eq!(merged.emotion().default_emotion.as_deref(), Some("happy"));

    let err = validator
        .validate_patch(&current, &ConfigPatch::new().emo_alpha(2.0))
        .unwrap_err();
    assert!(matches!(err, Violation::OutOfRange { ref field, .. } if field == "emo_alpha"));
}

#[test]
fn test_unknown_category_rejected() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let current = EngineConfig::new("index_tts");
    let err = validator
        .validate_patch(
            &current,
            &ConfigPatch::new().emotion_mode(EmotionMode::Manual).default_emotion("ecstatic"),
        )
        .unwrap_err();
    assert!(matches!(err, Violation::InvalidEmotionConfig(_)));
}

#[test]
fn test_speed_ratio_must_be_positive() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = validator
            .validate_patch(&tencent(), &ConfigPatch::new().speed_ratio(bad))
            .unwrap_err();
        assert!(matches!(err, Violation::OutOfRange { ref field, .. } if field == "speed_ratio"));
    }

    let merged = validator
        .validate_patch(&tencent(), &ConfigPatch::new().speed_ratio(0.01))
        .unwrap();
    assert_eq!(merged.speed_ratio, 0.01);
}

#[test]
fn test_validate_new_requires_provider() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let err = validator.validate_new(&EngineConfig::new(" ")).unwrap_err();
    assert_eq!(err, Violation::missing("provider"));
}

#[test]
fn test_validate_new_normalises_manual_mode() {
    let (engines, emotions) = catalogs();
    let validator = ConfigValidator::new(&engines, &emotions);

    let config = EngineConfig::new("index_tts")
        .with_emotion_mode(EmotionMode::Manual)
        .with_emo_alpha(0.4);
    let validated = validator.validate_new(&config).unwrap();
    assert_eq!(validated.emotion().default_emotion.as_deref(), Some("happy"));
    assert_eq!(validated.emotion().emo_alpha, Some(0.4));
}

#[test]
fn test_custom_meta_required_extension() {
    let engines = EngineCatalog::from_metas(vec![EngineMeta::new("azure_tts", "Azure")
        .require(&["secret_key", "endpoint"])]);
    let emotions = EmotionCatalog::default();
    let validator = ConfigValidator::new(&engines, &emotions);

    let config = EngineConfig::new("azure_tts").with_credentials("", "key");
    assert_eq!(
        validator.validate_new(&config).unwrap_err(),
        Violation::missing("endpoint")
    );

    let config = config.with_extension("endpoint", json!("https://tts.example.com"));
    assert!(validator.validate_new(&config).is_ok());
}
