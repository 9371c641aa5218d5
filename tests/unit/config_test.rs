//! Tests for configuration validation

use cabinet_lights::config::LightsConfig;
use cabinet_lights::util::Priority;

#[test]
fn test_default_config_is_valid() {
    let cfg = LightsConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.client_priority, Priority::Normal);
    assert_eq!(cfg.dynamic_group_features, vec!["ButtonLights".to_string()]);
}

#[test]
fn test_zero_channel_capacity_is_invalid() {
    let invalid = LightsConfig {
        event_channel_capacity: 0,
        ..LightsConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_blank_thread_name_is_invalid() {
    let invalid = LightsConfig {
        dispatcher_thread_name: "  ".into(),
        ..LightsConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_blank_dynamic_feature_is_invalid() {
    let invalid = LightsConfig {
        dynamic_group_features: vec!["ButtonLights".into(), String::new()],
        ..LightsConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "client_priority": "high",
        "dynamic_group_features": ["ButtonLights", "TopperLights"],
        "event_channel_capacity": 32
    }"#;

    let cfg = LightsConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.client_priority, Priority::High);
    assert!(cfg.has_dynamic_groups("TopperLights"));
    assert_eq!(cfg.event_channel_capacity, 32);
    assert_eq!(cfg.dispatcher_thread_name, "lights-events");
}

#[test]
fn test_config_from_json_rejects_invalid_values() {
    assert!(LightsConfig::from_json_str(r#"{"event_channel_capacity": 0}"#).is_err());
    assert!(LightsConfig::from_json_str(r#"{"client_priority": "urgent"}"#).is_err());
}
