use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 完整性校验服务返回的裁决
///
/// 只有 `statusCode == 200` 视为通过，其余一律视为拒绝。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationVerdict {
    #[serde(rename = "statusCode")]
    pub status_code: i64,
    #[serde(default)]
    pub body: Value,
}

impl InvocationVerdict {
    pub fn is_accepted(&self) -> bool {
        self.status_code == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verdict_accepted() {
        let verdict: InvocationVerdict =
            serde_json::from_value(json!({"statusCode": 200, "body": "ok"})).unwrap();
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_verdict_rejected() {
        let verdict: InvocationVerdict =
            serde_json::from_value(json!({"statusCode": 500, "body": {"reason": "签名不匹配"}}))
                .unwrap();
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn test_verdict_body_optional() {
        let verdict: InvocationVerdict =
            serde_json::from_value(json!({"statusCode": 200})).unwrap();
        assert!(verdict.is_accepted());
        assert!(verdict.body.is_null());
    }
}
