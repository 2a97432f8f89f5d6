use serde_json::Value;
use tracing::debug;
use crate::data::types::MarketEvent;

/// "Yes" probability of a matched event on a 0-100 scale.
///
/// Prices come from the event itself, or from its first sub-market when the
/// event has no usable first price. Only the first price is used: binary markets list the
/// "yes" outcome first. `None` means no usable price data.
pub fn extract_probability(event: &MarketEvent) -> Option<f64> {
    let yes = event
        .outcome_prices
        .as_ref()
        .and_then(|raw| first_price(raw, &event.id))
        .or_else(|| {
            let market = event.markets.first()?;
            let price = first_price(market.outcome_prices.as_ref()?, &event.id)?;
            debug!(
                event_id = %event.id,
                market_id = %market.id,
                question = market.question.as_deref().unwrap_or_default(),
                "Using first sub-market price"
            );
            Some(price)
        })?;

    if yes < 0.0 {
        debug!(event_id = %event.id, price = yes, "Negative outcome price");
        return None;
    }
    Some(yes * 100.0)
}

/// Flip to "risk" orientation when the "yes" outcome is the protective one.
pub fn apply_inversion(probability: f64, invert: bool) -> f64 {
    if invert {
        100.0 - probability
    } else {
        probability
    }
}

/// First price of an outcome-price payload: a JSON array, or a string holding
/// one. The element may be a number or a numeric string; later elements are
/// never looked at.
fn first_price(raw: &Value, event_id: &str) -> Option<f64> {
    let items = match raw {
        Value::Array(items) => items.clone(),
        Value::String(s) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => items,
            Err(e) => {
                debug!(error = %e, raw = %s, event_id, "Failed to parse outcome prices");
                return None;
            }
        },
        _ => return None,
    };

    let price = match items.first()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    price.filter(|p| p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::SubMarket;
    use crate::risk::matcher::event;
    use serde_json::json;

    fn with_prices(prices: Value) -> MarketEvent {
        let mut e = event("1", "Test?", None);
        e.outcome_prices = Some(prices);
        e
    }

    fn sub_market(prices: Value) -> SubMarket {
        SubMarket {
            id: "m1".to_string(),
            question: None,
            outcome_prices: Some(prices),
        }
    }

    #[test]
    fn test_string_encoded_prices() {
        let e = with_prices(json!("[0.18,0.82]"));
        let raw = extract_probability(&e).unwrap();

        assert!((raw - 18.0).abs() < 1e-9);
        assert!((apply_inversion(raw, true) - 82.0).abs() < 1e-9);
        assert!((apply_inversion(raw, false) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_string_elements_and_literal_array() {
        let e = with_prices(json!(["0.445", "0.555"]));
        assert!((extract_probability(&e).unwrap() - 44.5).abs() < 1e-9);

        let e = with_prices(json!("[\"0.125\", \"0.875\"]"));
        assert!((extract_probability(&e).unwrap() - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_price() {
        let e = with_prices(json!([0.3]));
        assert!((extract_probability(&e).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_falls_back_to_first_sub_market() {
        let mut e = event("1", "Macron out by...?", None);
        e.markets = vec![sub_market(json!("[\"0.07\", \"0.93\"]")), sub_market(json!("[\"0.9\", \"0.1\"]"))];

        assert!((extract_probability(&e).unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_event_prices_fall_back() {
        let mut e = with_prices(json!("[]"));
        e.markets = vec![sub_market(json!([0.5, 0.5]))];

        assert!((extract_probability(&e).unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_first_price_is_read() {
        let e = with_prices(json!(["0.3", "abc"]));
        assert!((extract_probability(&e).unwrap() - 30.0).abs() < 1e-9);

        let e = with_prices(json!("[0.3, null]"));
        assert!((extract_probability(&e).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_unusable_event_price_falls_back_to_sub_market() {
        let mut e = with_prices(json!(["n/a", "0.5"]));
        e.markets = vec![sub_market(json!("[\"0.42\", \"0.58\"]"))];

        assert!((extract_probability(&e).unwrap() - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_payloads_are_no_data() {
        assert!(extract_probability(&with_prices(json!("[invalid]"))).is_none());
        assert!(extract_probability(&with_prices(json!(["abc", "0.5"]))).is_none());
        assert!(extract_probability(&with_prices(json!([null, 0.5]))).is_none());
        assert!(extract_probability(&with_prices(json!({"yes": 0.4}))).is_none());
        assert!(extract_probability(&with_prices(json!([-0.2, 1.2]))).is_none());
        assert!(extract_probability(&event("1", "No prices", None)).is_none());
    }
}
