use std::collections::HashMap;

use confidence::{ApiConfig, Confidence, Value};

pub fn main() {
    env_logger::init();

    let api_key = std::env::var("CONFIDENCE_CLIENT_SECRET").unwrap();
    let confidence = Confidence::builder()
        .api_config(ApiConfig::from_api_key(api_key))
        .build()
        .unwrap();

    // Every flag read is resolved against the current context.
    confidence.put_context("targeting_key", "test-subject");
    confidence.put_context("country", "SE");

    let color = confidence.get_string_flag("hawkflag.color", "blue");
    println!("Color: {} ({:?})", color.value, color.details);

    // A derived client sees its parent's context plus its own overrides.
    let mobile = confidence.with_context(HashMap::from([(
        "platform".to_owned(),
        Value::from("mobile"),
    )]));
    let size = mobile.get_int_value("hawkflag.size", 10);
    println!("Size on mobile: {size}");

    // Wait for the upload so the process does not exit before it is sent.
    mobile
        .track(
            "navigate",
            HashMap::from([("screen".to_owned(), Value::from("home"))]),
        )
        .wait();
}
