#[cfg(test)]
mod tests {
    use crate::error::ExtractionError;
    use crate::extract::{KeyBy, Payload, SeqBy};
    use crate::types::{Key, Sequence};
    use serde_json::{Value, json};
    use std::borrow::Cow;

    struct Trade {
        account: String,
        seq: u64,
    }

    impl Payload for Trade {
        fn field(&self, name: &str) -> Result<Cow<'_, Value>, ExtractionError> {
            match name {
                "account" => Ok(Cow::Owned(Value::from(self.account.clone()))),
                "seq" => Ok(Cow::Owned(Value::from(self.seq))),
                _ => Err(ExtractionError::missing_field(name)),
            }
        }
    }

    #[test]
    fn test_field_lookup_on_mapping_payload() {
        let by: KeyBy<Value> = KeyBy::field("player");
        let key = by.resolve(&json!({"player": "p1", "x": 3})).unwrap();
        assert_eq!(key, Key::from("p1"));
    }

    #[test]
    fn test_field_lookup_on_structured_payload() {
        let trade = Trade {
            account: "acc-9".to_string(),
            seq: 42,
        };
        let key_by: KeyBy<Trade> = "account".into();
        let seq_by: SeqBy<Trade> = "seq".into();
        assert_eq!(key_by.resolve(&trade).unwrap(), Key::from("acc-9"));
        assert_eq!(seq_by.resolve(&trade).unwrap(), Sequence::from(42));
    }

    #[test]
    fn test_missing_field_is_an_extraction_error() {
        let by: KeyBy<Value> = KeyBy::field("player");
        assert_eq!(
            by.resolve(&json!({"other": 1})),
            Err(ExtractionError::MissingField {
                field: "player".to_string()
            })
        );
    }

    #[test]
    fn test_field_on_non_mapping_payload_is_rejected() {
        let by: KeyBy<Value> = KeyBy::field("player");
        assert_eq!(
            by.resolve(&json!([1, 2])),
            Err(ExtractionError::NotAMapping {
                field: "player".to_string(),
                found: "array"
            })
        );
    }

    #[test]
    fn test_array_field_becomes_composite_key() {
        let by: KeyBy<Value> = KeyBy::field("cell");
        let key = by.resolve(&json!({"cell": ["room-1", 4]})).unwrap();
        assert_eq!(key, Key::from(("room-1", 4)));
    }

    #[test]
    fn test_unhashable_key_values_are_rejected() {
        let by: KeyBy<Value> = KeyBy::field("k");
        for (value, found) in [
            (json!({"k": 1.5}), "float"),
            (json!({"k": null}), "null"),
            (json!({"k": {"nested": true}}), "object"),
        ] {
            assert_eq!(
                by.resolve(&value),
                Err(ExtractionError::UnhashableKey { found })
            );
        }
    }

    #[test]
    fn test_function_extractor_builds_composite_key() {
        let by: KeyBy<Value> = KeyBy::func(|payload: &Value| {
            (
                payload["session"].as_str().unwrap_or_default().to_string(),
                payload["device"].as_str().unwrap_or_default().to_string(),
            )
        });
        let key = by
            .resolve(&json!({"session": "s1", "device": "phone"}))
            .unwrap();
        assert_eq!(key, Key::from(("s1", "phone")));
        assert_eq!(by.describe(), "fn");
    }

    #[test]
    fn test_failing_function_extractor_propagates() {
        let by: SeqBy<Value> = SeqBy::try_func(|payload: &Value| {
            payload["seq"]
                .as_u64()
                .map(Sequence::from)
                .ok_or_else(|| ExtractionError::Custom("seq must be an unsigned integer".into()))
        });
        assert_eq!(
            by.resolve(&json!({"seq": "x"})),
            Err(ExtractionError::Custom(
                "seq must be an unsigned integer".to_string()
            ))
        );
    }

    #[test]
    fn test_sequence_rejects_non_ordered_values() {
        let by: SeqBy<Value> = SeqBy::field("seq");
        assert_eq!(
            by.resolve(&json!({"seq": true})),
            Err(ExtractionError::UnorderedSequence { found: "bool" })
        );
        assert_eq!(by.describe(), "field:seq");
    }

    #[test]
    fn test_integer_sequences_sort_before_text() {
        assert!(Sequence::from(1_000_000) < Sequence::from("0"));
    }
}
