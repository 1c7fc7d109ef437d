use super::*;

#[test]
fn defaults_when_unset() {
    let config = ClientConfig::from_lookup(|_| None).unwrap();
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.relay_url, "ws://127.0.0.1:4000/ws");
    assert!(config.move_interval.is_zero());
}

#[test]
fn reads_url_and_interval() {
    let config = ClientConfig::from_lookup(|key| match key {
        "SKETCH_RELAY_URL" => Some("ws://relay:9000/ws".to_owned()),
        "SKETCH_MOVE_INTERVAL_MS" => Some("40".to_owned()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.relay_url, "ws://relay:9000/ws");
    assert_eq!(config.move_interval, Duration::from_millis(40));
}

#[test]
fn bad_interval_is_an_error() {
    let err = ClientConfig::from_lookup(|key| (key == "SKETCH_MOVE_INTERVAL_MS").then(|| "fast".to_owned()))
        .unwrap_err();
    assert!(matches!(err, ClientError::Config { key: "SKETCH_MOVE_INTERVAL_MS", .. }));
}
