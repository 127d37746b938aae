use serde_json::Value;

use super::{to_canonical_json, Payload};
use crate::errors::ChainError;

/// Codifica el payload para persistirlo (JSON canónico, autodescriptivo).
pub fn encode_payload(payload: &Payload) -> String {
    to_canonical_json(payload.as_value())
}

/// Decodifica un payload persistido. Un texto inválido indica datos
/// corruptos en el backend.
pub fn decode_payload(encoded: &str) -> Result<Payload, ChainError> {
    serde_json::from_str::<Value>(encoded).map(Payload::new)
                                          .map_err(|e| ChainError::Codec(format!("stored payload is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_query_payload_survives_roundtrip() {
        let p = Payload::from(json!({"select": ["Gene.id"], "where": {"id": [1, 2, 3]}}));
        let back = decode_payload(&encode_payload(&p)).expect("decode");
        assert_eq!(back, p);
        assert_eq!(back["where"]["id"], json!([1, 2, 3]));
    }

    #[test]
    fn integer_and_float_stay_distinct() {
        let p = Payload::from(json!([1, 1.0, -7, 2.5e-3, u64::MAX]));
        let back = decode_payload(&encode_payload(&p)).expect("decode");
        let arr = back.as_array().expect("array");
        assert!(arr[0].is_i64());
        assert!(arr[1].is_f64());
        assert!(arr[4].is_u64());
        assert_eq!(back, p);
    }

    #[test]
    fn hard_floats_decode_to_the_same_bits() {
        let hard = [1.0715660391465826e-75, -1.81996730402717e-179, -1.603964615428183e143, f64::MIN_POSITIVE, f64::MAX];
        let p = Payload::from(json!(hard));
        let back = decode_payload(&encode_payload(&p)).expect("decode");
        for (i, f) in hard.iter().enumerate() {
            let got = back[i].as_f64().expect("float");
            assert_eq!(got.to_bits(), f.to_bits(), "float {f:e} came back as {got:e}");
        }
        assert_eq!(back, p);
    }

    #[test]
    fn plain_string_payload() {
        let p = Payload::from("my search string");
        assert_eq!(encode_payload(&p), "\"my search string\"");
        assert_eq!(decode_payload("\"my search string\"").expect("decode"), p);
    }

    #[test]
    fn corrupt_text_is_a_codec_error() {
        let err = decode_payload("{not json").unwrap_err();
        assert!(matches!(err, ChainError::Codec(_)), "got {err:?}");
    }
}
