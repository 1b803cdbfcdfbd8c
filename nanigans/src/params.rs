use common_events::{scalar_string, Event};

use crate::config::{Descriptor, EventType, Settings};
use crate::hash::sha256_hex;
use crate::template;

/// Parallel product arrays for purchase and cart parameters. Index `i` in
/// every vector refers to the same line item.
#[derive(Debug, Default, PartialEq)]
pub struct ProductParams {
    pub sku: Vec<String>,
    pub qty: Vec<f64>,
    pub value: Vec<f64>,
}

/// Flatten the event's line items into the destination's parallel arrays,
/// preserving input order. `revenueInCents` switches values to integer
/// cents, the destination's alternate revenue mode.
pub fn product_params(event: &Event, settings: &Settings) -> ProductParams {
    let mut params = ProductParams::default();
    for item in event.products() {
        params.qty.push(item.quantity);
        params.value.push(if settings.revenue_in_cents {
            item.price * 100.0
        } else {
            item.price
        });
        params.sku.push(item.sku);
    }
    params
}

/// Build the per-event query parameters for one matched descriptor.
///
/// Identifying fields (account identity, advertising id, device type,
/// timestamp) are appended by the dispatcher, which knows the call-level
/// settings; everything here derives from the mapping and the payload.
pub fn event_params(
    descriptor: &Descriptor,
    event: &Event,
    settings: &Settings,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("type".into(), descriptor.r#type.as_str().into()),
        ("name".into(), template::render(&descriptor.name, event)),
    ];

    if let Some(user_id) = event.user_id.as_deref() {
        params.push(("user_id".into(), user_id.into()));
    }
    if let Some(email) = event.email() {
        params.push(("ut1".into(), sha256_hex(email)));
    }

    let products = product_params(event, settings);

    match descriptor.r#type {
        EventType::Purchase => {
            if let Some(order_id) = event.order_id() {
                params.push(("unique".into(), order_id));
            }
            push_product_arrays(&mut params, &products);
        }
        // Product views send a single sku, never the full array.
        EventType::User if descriptor.name == "product" => {
            if let Some(first) = products.sku.first() {
                params.push(("sku".into(), first.clone()));
            }
        }
        EventType::User if descriptor.name == "add_to_cart" => {
            push_product_arrays(&mut params, &products);
        }
        _ => {}
    }

    for custom in &descriptor.custom_parameters {
        if let Some(value) = event
            .lookup(&custom.source_path)
            .as_ref()
            .and_then(scalar_string)
        {
            params.push((custom.destination_key.clone(), value));
        }
    }

    params
}

fn push_product_arrays(params: &mut Vec<(String, String)>, products: &ProductParams) {
    for sku in &products.sku {
        params.push(("sku".into(), sku.clone()));
    }
    for qty in &products.qty {
        params.push(("qty".into(), qty.to_string()));
    }
    for value in &products.value {
        params.push(("value".into(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(body: serde_json::Value) -> Event {
        serde_json::from_value(body).expect("event fixture must deserialize")
    }

    fn settings(body: serde_json::Value) -> Settings {
        serde_json::from_value(body).expect("settings fixture must deserialize")
    }

    fn descriptor(body: serde_json::Value) -> Descriptor {
        serde_json::from_value(body).expect("descriptor fixture must deserialize")
    }

    fn plain_settings() -> Settings {
        settings(json!({ "appId": "123", "events": [] }))
    }

    fn purchase_event() -> Event {
        event(json!({
            "event": "completed order",
            "userId": "u1",
            "properties": {
                "orderId": "o1",
                "products": [
                    { "sku": "1", "quantity": 1, "price": 1 },
                    { "sku": "2", "quantity": 2, "price": 2 },
                ],
            },
            "context": { "traits": { "email": "email" } },
        }))
    }

    const EMAIL_DIGEST: &str =
        "82244417f956ac7c599f191593f7e441a4fafa20a4158fd52e154f1dc4c8ed92";

    #[test]
    fn purchase_includes_order_and_product_arrays() {
        let d = descriptor(json!({ "type": "purchase", "name": "main" }));
        let params = event_params(&d, &purchase_event(), &plain_settings());

        assert_eq!(
            params,
            vec![
                ("type".to_string(), "purchase".to_string()),
                ("name".to_string(), "main".to_string()),
                ("user_id".to_string(), "u1".to_string()),
                ("ut1".to_string(), EMAIL_DIGEST.to_string()),
                ("unique".to_string(), "o1".to_string()),
                ("sku".to_string(), "1".to_string()),
                ("sku".to_string(), "2".to_string()),
                ("qty".to_string(), "1".to_string()),
                ("qty".to_string(), "2".to_string()),
                ("value".to_string(), "1".to_string()),
                ("value".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn product_view_sends_only_the_first_sku() {
        let d = descriptor(json!({ "type": "user", "name": "product" }));
        let params = event_params(&d, &purchase_event(), &plain_settings());

        let skus: Vec<_> = params.iter().filter(|(k, _)| k == "sku").collect();
        assert_eq!(skus, vec![&("sku".to_string(), "1".to_string())]);
        assert!(!params.iter().any(|(k, _)| k == "qty" || k == "value"));
        assert!(!params.iter().any(|(k, _)| k == "unique"));
    }

    #[test]
    fn product_view_without_products_omits_sku() {
        let d = descriptor(json!({ "type": "user", "name": "product" }));
        let params = event_params(&d, &event(json!({})), &plain_settings());
        assert!(!params.iter().any(|(k, _)| k == "sku"));
    }

    #[test]
    fn add_to_cart_sends_full_product_arrays() {
        let d = descriptor(json!({ "type": "user", "name": "add_to_cart" }));
        let params = event_params(&d, &purchase_event(), &plain_settings());

        let skus = params.iter().filter(|(k, _)| k == "sku").count();
        assert_eq!(skus, 2);
        assert_eq!(params.iter().filter(|(k, _)| k == "qty").count(), 2);
        assert_eq!(params.iter().filter(|(k, _)| k == "value").count(), 2);
    }

    #[test]
    fn generic_user_events_carry_no_product_params() {
        let d = descriptor(json!({ "type": "user", "name": "invite" }));
        let params = event_params(&d, &purchase_event(), &plain_settings());
        assert!(!params
            .iter()
            .any(|(k, _)| k == "sku" || k == "qty" || k == "value" || k == "unique"));
    }

    #[test]
    fn revenue_in_cents_scales_values() {
        let s = settings(json!({ "appId": "123", "revenueInCents": true, "events": [] }));
        let e = event(json!({
            "properties": { "products": [
                { "sku": "1", "quantity": 1, "price": 1 },
                { "sku": "2", "quantity": 1, "price": 2.5 },
            ] },
        }));
        let products = product_params(&e, &s);
        assert_eq!(products.value, vec![100.0, 250.0]);

        let d = descriptor(json!({ "type": "purchase", "name": "main" }));
        let params = event_params(&d, &e, &s);
        let values: Vec<_> = params
            .iter()
            .filter(|(k, _)| k == "value")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(values, vec!["100", "250"]);
    }

    #[test]
    fn missing_identity_fields_are_omitted() {
        let d = descriptor(json!({ "type": "user", "name": "invite" }));
        let params = event_params(&d, &event(json!({})), &plain_settings());
        assert!(!params.iter().any(|(k, _)| k == "user_id" || k == "ut1"));
    }

    #[test]
    fn empty_product_list_yields_empty_arrays() {
        let products = product_params(&event(json!({})), &plain_settings());
        assert_eq!(products, ProductParams::default());
    }

    #[test]
    fn name_templates_render_before_sending() {
        let d = descriptor(json!({ "type": "user", "name": "visit_{{ properties.category }}" }));
        let e = event(json!({ "properties": { "category": "shoes" } }));
        let params = event_params(&d, &e, &plain_settings());
        assert!(params.contains(&("name".to_string(), "visit_shoes".to_string())));
    }

    #[test]
    fn custom_parameters_copy_non_empty_scalars_only() {
        let d = descriptor(json!({ "type": "user", "name": "invite", "customParameters": [
            { "sourcePath": "properties.coupon", "destinationKey": "coupon" },
            { "sourcePath": "properties.missing", "destinationKey": "missing" },
            { "sourcePath": "properties.blank", "destinationKey": "blank" },
            { "sourcePath": "properties.zero", "destinationKey": "zero" },
        ] }));
        let e = event(json!({
            "properties": { "coupon": "SAVE10", "blank": "", "zero": 0 },
        }));
        let params = event_params(&d, &e, &plain_settings());

        assert!(params.contains(&("coupon".to_string(), "SAVE10".to_string())));
        assert!(!params
            .iter()
            .any(|(k, _)| k == "missing" || k == "blank" || k == "zero"));
    }
}
