use proptest::prelude::*;
use vocalis_tts::{
    validate_alpha, ConfigPatch, ConfigStore, EmotionCatalog, EmotionMode, EmotionPolicy, EmotionSettings,
    EngineConfig, ErrorKind, Violation,
};

fn mode_strategy() -> impl Strategy<Value = EmotionMode> {
    prop_oneof![
        Just(EmotionMode::Auto),
        Just(EmotionMode::Manual),
        Just(EmotionMode::Disabled),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Activate(usize),
    Disable(usize),
    Enable(usize),
    Remove(usize),
    Add(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..5).prop_map(Op::Activate),
        (0usize..5).prop_map(Op::Disable),
        (0usize..5).prop_map(Op::Enable),
        (0usize..5).prop_map(Op::Remove),
        (0usize..5).prop_map(Op::Add),
    ]
}

proptest! {
    #[test]
    fn test_alpha_in_range_accepted(alpha in 0.0f64..=1.0) {
        prop_assert_eq!(validate_alpha(alpha).unwrap(), alpha);
    }

    #[test]
    fn test_alpha_out_of_range_rejected(alpha in prop_oneof![-1000.0f64..-1e-9, 1.000000001f64..1000.0]) {
        let is_out_of_range = matches!(validate_alpha(alpha), Err(Violation::OutOfRange { .. }));
        prop_assert!(is_out_of_range);
    }

    #[test]
    fn test_speed_ratio_patch(ratio in -10.0f64..10.0) {
        let store = ConfigStore::new();
        store.add("edge", EngineConfig::new("edge_tts")).unwrap();

        let result = store.patch("edge", ConfigPatch::new().speed_ratio(ratio));
        if ratio > 0.0 {
            prop_assert_eq!(result.unwrap().speed_ratio, ratio);
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::OutOfRange);
            prop_assert_eq!(store.get("edge").unwrap().speed_ratio, 1.0);
        }
    }

    #[test]
    fn test_mode_sequences_keep_manual_invariant(
        modes in prop::collection::vec(mode_strategy(), 1..20),
        alpha in prop::option::of(0.0f64..=1.0),
    ) {
        let catalog = EmotionCatalog::default();
        let policy = EmotionPolicy::new(&catalog);
        let mut settings = EmotionSettings::default();

        for mode in modes {
            let patch = EmotionSettings { emotion_mode: Some(mode), default_emotion: None, emo_alpha: alpha };
            settings = policy.apply(&settings, &patch).unwrap();
            prop_assert_eq!(settings.mode(), mode);
            if mode == EmotionMode::Manual {
                let emotion = settings.default_emotion.clone().unwrap();
                prop_assert!(catalog.contains(&emotion));
            }
            prop_assert!(policy.check(&settings).is_ok());
        }
    }

    #[test]
    fn test_emo_alpha_patch_preserves_extensions(alpha in 0.0f64..=1.0, key in "[a-z]{3,10}_x") {
        let store = ConfigStore::new();
        store
            .add("local", EngineConfig::new("index_tts").with_extension(key.clone(), serde_json::json!(true)))
            .unwrap();

        let patched = store.patch("local", ConfigPatch::new().emo_alpha(alpha)).unwrap();
        prop_assert_eq!(patched.emotion().emo_alpha, Some(alpha));
        prop_assert_eq!(patched.extra_params.extensions.get(&key), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_store_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let store = ConfigStore::new();
        for i in 0..5 {
            store.add(&format!("cfg-{}", i), EngineConfig::new("edge_tts").with_enabled(true)).unwrap();
        }

        for op in ops {
            let before = store.list();
            match op {
                Op::Activate(i) => {
                    let id = format!("cfg-{}", i);
                    let result = store.activate(&id);
                    let after = store.list();
                    match result {
                        Ok(_) => prop_assert_eq!(after.active_config_id(), Some(id.as_str())),
                        Err(_) => prop_assert_eq!(after.active_config_id(), before.active_config_id()),
                    }
                }
                Op::Disable(i) => {
                    let _ = store.patch(&format!("cfg-{}", i), ConfigPatch::new().enabled(false));
                }
                Op::Enable(i) => {
                    let _ = store.patch(&format!("cfg-{}", i), ConfigPatch::new().enabled(true));
                }
                Op::Remove(i) => {
                    let _ = store.remove(&format!("cfg-{}", i));
                }
                Op::Add(i) => {
                    let _ = store.add(&format!("cfg-{}", i), EngineConfig::new("edge_tts").with_enabled(true));
                }
            }
            prop_assert!(store.list().check_invariants().is_ok());
        }
    }
}
