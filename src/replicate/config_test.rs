use std::collections::HashMap;

use super::*;

fn vars(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<&'static str, &'static str> = pairs.iter().copied().collect();
    move |key: &str| map.get(key).map(ToString::to_string)
}

#[test]
fn token_is_required() {
    let err = ReplicateConfig::from_lookup(&vars(&[])).unwrap_err();
    assert!(matches!(err, ServiceError::Config(_)));

    let err = ReplicateConfig::from_lookup(&vars(&[("REPLICATE_API_TOKEN", "  ")])).unwrap_err();
    assert!(matches!(err, ServiceError::Config(_)));
}

#[test]
fn defaults_match_known_models() {
    let cfg = ReplicateConfig::from_lookup(&vars(&[("REPLICATE_API_TOKEN", "r8_test")])).unwrap();
    assert_eq!(cfg.api_token, "r8_test");
    assert_eq!(cfg.api_base, DEFAULT_REPLICATE_API_BASE);
    assert!(cfg.rembg_version.starts_with("cjwbw/rembg:fb8af171"));
    assert!(cfg.sdxl_version.starts_with("stability-ai/sdxl:39ed52f2"));
    assert_eq!(cfg.timeout, Duration::from_secs(180));
    assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
    assert_eq!(cfg.poll_interval, Duration::from_secs(1));
}

#[test]
fn overrides_are_parsed() {
    let cfg = ReplicateConfig::from_lookup(&vars(&[
        ("REPLICATE_API_TOKEN", "t"),
        ("REPLICATE_API_BASE", "http://localhost:9000/v1/"),
        ("REPLICATE_REMBG_VERSION", "me/rembg:abc"),
        ("REPLICATE_SDXL_VERSION", "me/sdxl:def"),
        ("REPLICATE_TIMEOUT_SECS", "30"),
        ("REPLICATE_POLL_INTERVAL_MS", "250"),
    ]))
    .unwrap();
    assert_eq!(cfg.api_base, "http://localhost:9000/v1");
    assert_eq!(cfg.rembg_version, "me/rembg:abc");
    assert_eq!(cfg.sdxl_version, "me/sdxl:def");
    assert_eq!(cfg.timeout, Duration::from_secs(30));
    assert_eq!(cfg.poll_interval, Duration::from_millis(250));
}
