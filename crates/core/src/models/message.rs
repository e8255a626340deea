use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{OrchestratorError, OrchestratorResult};

/// 从队列收到的一条消息
///
/// `delivery_handle` 是确认（删除）这一次投递所必需的不透明令牌；
/// 句柄缺失时该投递无法被确认，只能等待可见性超时后重投。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessage {
    /// 诊断用标识，正确性不依赖它
    pub id: Option<String>,
    /// 原始消息体，期望是JSON文本
    pub body: Option<String>,
    /// 本次投递的确认句柄
    pub delivery_handle: Option<String>,
}

impl QueueMessage {
    pub fn new(id: Option<String>, body: Option<String>, delivery_handle: Option<String>) -> Self {
        Self {
            id,
            body,
            delivery_handle,
        }
    }

    /// 日志里标识这条消息用的名字
    pub fn log_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<无ID>")
    }
}

/// 消息体到业务载荷的映射方式
///
/// 每个部署只启用一种格式，由配置在启动时选定，绝不按消息猜测——
/// 猜测会把恰好长得像通知信封的直发载荷静默解析错。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeFormat {
    /// 消息体本身就是业务载荷JSON
    Direct,
    /// 消息体是通知信封，载荷在其 `Message` 字段里（二次JSON解析）
    Enveloped,
}

impl Default for EnvelopeFormat {
    fn default() -> Self {
        Self::Direct
    }
}

/// 通知信封的线上格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "MessageId")]
    pub message_id: Option<String>,
    #[serde(rename = "TopicArn")]
    pub topic_arn: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
}

impl EnvelopeFormat {
    /// 按当前格式把原始消息体解码成业务载荷
    ///
    /// 载荷作为不透明的JSON值树在各阶段间原样传递，只在这里解析一次
    /// （信封格式需要对 `Message` 字段再解析一次）。
    pub fn decode(&self, raw_body: &str) -> OrchestratorResult<Value> {
        match self {
            EnvelopeFormat::Direct => serde_json::from_str(raw_body).map_err(|e| {
                OrchestratorError::serialization_error(format!("解析消息体失败: {e}"))
            }),
            EnvelopeFormat::Enveloped => {
                let envelope: NotificationEnvelope =
                    serde_json::from_str(raw_body).map_err(|e| {
                        OrchestratorError::serialization_error(format!("解析通知信封失败: {e}"))
                    })?;
                serde_json::from_str(&envelope.message).map_err(|e| {
                    OrchestratorError::serialization_error(format!(
                        "解析信封内Message载荷失败: {e}"
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_decode() {
        let payload = EnvelopeFormat::Direct
            .decode(r#"{"orderId":"123","amount":42}"#)
            .unwrap();
        assert_eq!(payload, json!({"orderId": "123", "amount": 42}));
    }

    #[test]
    fn test_enveloped_decode() {
        let body = json!({
            "Type": "Notification",
            "Message": "{\"orderId\":\"123\",\"amount\":42}",
            "MessageId": "m-1",
            "TopicArn": "arn:aws:sns:us-east-1:000000000000:orders",
            "Timestamp": "2024-01-01T00:00:00Z"
        })
        .to_string();

        let payload = EnvelopeFormat::Enveloped.decode(&body).unwrap();
        assert_eq!(payload, json!({"orderId": "123", "amount": 42}));
    }

    #[test]
    fn test_direct_decode_invalid_json() {
        let result = EnvelopeFormat::Direct.decode("not-json{{");
        assert!(matches!(
            result,
            Err(OrchestratorError::Serialization(_))
        ));
    }

    #[test]
    fn test_enveloped_decode_inner_invalid() {
        // 信封本身合法，但Message字段不是JSON
        let body = json!({"Type": "Notification", "Message": "plain text"}).to_string();
        let result = EnvelopeFormat::Enveloped.decode(&body);
        assert!(matches!(
            result,
            Err(OrchestratorError::Serialization(_))
        ));
    }

    #[test]
    fn test_enveloped_decode_direct_body_fails() {
        // 直发载荷没有Message字段，在信封格式下必须报错而不是蒙混过关
        let result = EnvelopeFormat::Enveloped.decode(r#"{"orderId":"123"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_format_from_config_string() {
        let fmt: EnvelopeFormat = serde_json::from_str("\"enveloped\"").unwrap();
        assert_eq!(fmt, EnvelopeFormat::Enveloped);
        let fmt: EnvelopeFormat = serde_json::from_str("\"direct\"").unwrap();
        assert_eq!(fmt, EnvelopeFormat::Direct);
    }

    #[test]
    fn test_message_log_id() {
        let msg = QueueMessage::new(Some("abc".into()), None, None);
        assert_eq!(msg.log_id(), "abc");
        let msg = QueueMessage::new(None, None, None);
        assert_eq!(msg.log_id(), "<无ID>");
    }
}
