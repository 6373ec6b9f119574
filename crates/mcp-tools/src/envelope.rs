//! Tool-response envelope (spec.md §6): every operation returns
//! `{success: true, ...}` or `{success: false, error, error_type}`.

use ragsmith_common::Result;
use serde::Serialize;
use serde_json::{json, Value};

pub fn envelope<T: Serialize>(result: Result<T>) -> Value {
    match result {
        Ok(data) => {
            let mut value = serde_json::to_value(data).unwrap_or_else(|_| json!({}));
            match value.as_object_mut() {
                Some(obj) => {
                    obj.insert("success".to_string(), json!(true));
                    value
                }
                None => json!({"success": true, "result": value}),
            }
        }
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
            "error_type": e.error_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsmith_common::EngineError;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Payload {
        count: usize,
    }

    #[test]
    fn ok_result_gets_success_true_merged_in() {
        let v = envelope(Ok(Payload { count: 3 }));
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["count"], json!(3));
    }

    #[test]
    fn err_result_carries_error_type() {
        let v: Value = envelope::<Payload>(Err(EngineError::Validation("bad url".into())));
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["error_type"], json!("validation_error"));
        assert!(v["error"].as_str().unwrap().contains("bad url"));
    }
}
