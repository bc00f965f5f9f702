//! Integration tests for sensorbus-common library.

use sensorbus_common::{
    Format, LogFormat, LoggingConfig, Measurement, TelemetryPoint, decode, encode, parse_config,
};

#[test]
fn test_batch_encoding_workflow() {
    // A batch as the forwarder builds it: one temperature and one humidity
    // point per reading, all sharing the batch timestamp.
    let timestamp = 1_718_000_000_000;
    let batch: Vec<TelemetryPoint> = [("106", 25.0, 45.5), ("124", 21.3, 50.25)]
        .into_iter()
        .flat_map(|(device, temperature, humidity)| {
            [
                TelemetryPoint::new(Measurement::Temperature, temperature, timestamp)
                    .with_tag("device_id", device),
                TelemetryPoint::new(Measurement::Humidity, humidity, timestamp)
                    .with_tag("device_id", device),
            ]
        })
        .collect();

    let json_bytes = encode(&batch, Format::Json).expect("JSON encode failed");
    let decoded: Vec<TelemetryPoint> = decode(&json_bytes, Format::Json).expect("JSON decode failed");
    assert_eq!(decoded.len(), 4);
    assert!(decoded.iter().all(|p| p.timestamp == timestamp));
    assert_eq!(decoded[2].tags.get("device_id"), Some(&"124".to_string()));

    let cbor_bytes = encode(&batch, Format::Cbor).expect("CBOR encode failed");
    assert!(
        cbor_bytes.len() < json_bytes.len(),
        "CBOR should be smaller than JSON"
    );
    let decoded: Vec<TelemetryPoint> = decode(&cbor_bytes, Format::Cbor).expect("CBOR decode failed");
    assert_eq!(decoded, batch);
}

#[test]
fn test_point_json_shape() {
    let point = TelemetryPoint::new(Measurement::Humidity, 45.5, 42).with_tag("device_id", "106");
    let value: serde_json::Value =
        serde_json::from_slice(&encode(&point, Format::Json).unwrap()).unwrap();

    assert_eq!(value["measurement"], "humidity");
    assert_eq!(value["value"], 45.5);
    assert_eq!(value["timestamp"], 42);
    assert_eq!(value["tags"]["device_id"], "106");
}

#[test]
fn test_untagged_point_omits_tags() {
    let point = TelemetryPoint::new(Measurement::Temperature, 20.0, 0);
    let json = String::from_utf8(encode(&point, Format::Json).unwrap()).unwrap();
    assert!(!json.contains("tags"));
}

#[test]
fn test_logging_config_from_json5() {
    let config: LoggingConfig = parse_config(r#"{ level: "debug", format: "json" }"#).unwrap();
    assert_eq!(config.level, "debug");
    assert_eq!(config.format, LogFormat::Json);
}
