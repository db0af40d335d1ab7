use std::collections::HashMap;

use confidence::{
    openfeature::{ConfidenceProvider, FeatureProvider},
    ApiConfig, Confidence, Value,
};

pub fn main() {
    env_logger::init();

    let api_key = std::env::var("CONFIDENCE_CLIENT_SECRET").unwrap();
    let confidence = Confidence::builder()
        .api_config(ApiConfig::from_api_key(api_key))
        .build()
        .unwrap();
    let provider = ConfidenceProvider::new(confidence);
    println!("Provider: {}", provider.metadata().name);

    // OpenFeature's targetingKey is sent as targeting_key.
    let context = HashMap::from([("targetingKey".to_owned(), Value::from("test-subject"))]);

    let enabled = provider.bool_evaluation("hawkflag.enabled", false, context.clone());
    println!(
        "Enabled: {} (reason: {:?}, variant: {:?})",
        enabled.value, enabled.reason, enabled.variant
    );

    let flag = provider.object_evaluation("hawkflag", Value::Null, context);
    match flag.error {
        Some(err) => println!("Failed to read flag: {err}"),
        None => println!("Flag: {:?}", flag.value),
    }
}
