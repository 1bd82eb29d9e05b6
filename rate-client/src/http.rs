// rate-client/src/http.rs
// HTTP 客户端 - 网络通信

use crate::{ClientConfig, ClientError, ClientResult, RateApi};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::Envelope;
use shared::error::ErrorCode;
use shared::models::{
    Bracket, BracketCreate, BracketPatch, CopyBracketsRequest, CopyBracketsResult,
    DestAdjustment, DestAdjustmentUpdate, DestAdjustmentUpsert, PricingSchemeDetail,
    ProvinceMembersPut, SegmentTemplate, SegmentTemplateCreate, Surcharge, SurchargeCreate,
    SurchargeUpdate, TemplateItemInput, Zone, ZoneBracketsMatrixOut, ZoneCreateAtomic, ZoneUpdate,
};

/// 服务端返回的错误响应格式
///
/// Accepts both `{"detail": ...}` and `{"code": .., "message": .., "details": ..}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    details: Option<Value>,
}

/// Code implied by an auth status when the body carries none
fn code_for_status(status: u16) -> Option<ErrorCode> {
    match status {
        401 => Some(ErrorCode::NotAuthenticated),
        403 => Some(ErrorCode::PermissionDenied),
        _ => None,
    }
}

/// Turn a failed response body into [`ClientError::Api`]
fn parse_error_body(status: u16, text: &str) -> ClientError {
    let Ok(body) = serde_json::from_str::<ErrorBody>(text) else {
        return ClientError::Api {
            status,
            code: code_for_status(status),
            message: text.to_string(),
            detail: None,
        };
    };

    let code = body
        .code
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .and_then(|c| ErrorCode::try_from(c).ok())
        .or_else(|| code_for_status(status));

    let detail = body.detail.or(body.details);
    let message = body
        .message
        .or_else(|| match &detail {
            Some(Value::String(s)) => Some(s.clone()),
            Some(d) => d.get("message").and_then(Value::as_str).map(str::to_string),
            None => None,
        })
        .unwrap_or_else(|| text.to_string());

    let detail = detail.filter(|d| d.is_object());
    ClientError::Api {
        status,
        code,
        message,
        detail,
    }
}

#[derive(Serialize)]
struct ItemsBody<'a> {
    items: &'a [TemplateItemInput],
}

#[derive(Serialize)]
struct ActiveBody {
    active: bool,
}

/// 网络客户端
#[derive(Debug, Clone)]
pub struct NetworkRateClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl NetworkRateClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout_duration())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.client.request(method, &url);
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = req.send().await?;
        let text = Self::checked_text(response).await?;
        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        Ok(envelope.into_inner())
    }

    async fn send_unit(&self, req: reqwest::RequestBuilder) -> ClientResult<()> {
        let response = req.send().await?;
        Self::checked_text(response).await?;
        Ok(())
    }

    async fn checked_text(response: reqwest::Response) -> ClientResult<String> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %text, "API request failed");
            return Err(parse_error_body(status.as_u16(), &text));
        }
        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.request(Method::POST, path)).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.request(Method::PATCH, path).json(body)).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send_unit(self.request(Method::DELETE, path)).await
    }
}

#[async_trait]
impl RateApi for NetworkRateClient {
    async fn scheme_detail(&self, scheme_id: i64) -> ClientResult<PricingSchemeDetail> {
        self.get(&format!("pricing-schemes/{scheme_id}")).await
    }

    async fn zone_brackets_matrix(&self, scheme_id: i64) -> ClientResult<ZoneBracketsMatrixOut> {
        self.get(&format!("pricing-schemes/{scheme_id}/zone-brackets-matrix"))
            .await
    }

    async fn segment_templates(&self, scheme_id: i64) -> ClientResult<Vec<SegmentTemplate>> {
        self.get(&format!("pricing-schemes/{scheme_id}/segment-templates"))
            .await
    }

    async fn segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.get(&format!("segment-templates/{template_id}")).await
    }

    async fn create_segment_template(
        &self,
        scheme_id: i64,
        payload: &SegmentTemplateCreate,
    ) -> ClientResult<SegmentTemplate> {
        self.post(
            &format!("pricing-schemes/{scheme_id}/segment-templates"),
            payload,
        )
        .await
    }

    async fn put_template_items(
        &self,
        template_id: i64,
        items: &[TemplateItemInput],
    ) -> ClientResult<SegmentTemplate> {
        self.put(
            &format!("segment-templates/{template_id}/items"),
            &ItemsBody { items },
        )
        .await
    }

    async fn publish_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.post_empty(&format!("segment-templates/{template_id}:publish"))
            .await
    }

    async fn activate_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.post_empty(&format!("segment-templates/{template_id}:activate"))
            .await
    }

    async fn archive_segment_template(&self, template_id: i64) -> ClientResult<SegmentTemplate> {
        self.post_empty(&format!("segment-templates/{template_id}:archive"))
            .await
    }

    async fn patch_template_item_active(
        &self,
        item_id: i64,
        active: bool,
    ) -> ClientResult<SegmentTemplate> {
        self.patch(
            &format!("segment-template-items/{item_id}"),
            &ActiveBody { active },
        )
        .await
    }

    async fn create_bracket(&self, zone_id: i64, payload: &BracketCreate) -> ClientResult<Bracket> {
        self.post(&format!("zones/{zone_id}/brackets"), payload).await
    }

    async fn patch_bracket(
        &self,
        bracket_id: i64,
        payload: &BracketPatch,
    ) -> ClientResult<Bracket> {
        self.patch(&format!("zone-brackets/{bracket_id}"), payload)
            .await
    }

    async fn delete_bracket(&self, bracket_id: i64) -> ClientResult<()> {
        self.delete(&format!("zone-brackets/{bracket_id}")).await
    }

    async fn copy_brackets(
        &self,
        target_zone_id: i64,
        payload: &CopyBracketsRequest,
    ) -> ClientResult<CopyBracketsResult> {
        self.post(&format!("zones/{target_zone_id}/brackets:copy"), payload)
            .await
    }

    async fn create_zone_atomic(
        &self,
        scheme_id: i64,
        payload: &ZoneCreateAtomic,
    ) -> ClientResult<Zone> {
        self.post(&format!("pricing-schemes/{scheme_id}/zones-atomic"), payload)
            .await
    }

    async fn patch_zone(&self, zone_id: i64, payload: &ZoneUpdate) -> ClientResult<Zone> {
        self.patch(&format!("zones/{zone_id}"), payload).await
    }

    async fn replace_province_members(
        &self,
        zone_id: i64,
        payload: &ProvinceMembersPut,
    ) -> ClientResult<Zone> {
        self.put(&format!("zones/{zone_id}/province-members"), payload)
            .await
    }

    async fn upsert_dest_adjustment(
        &self,
        scheme_id: i64,
        payload: &DestAdjustmentUpsert,
    ) -> ClientResult<DestAdjustment> {
        self.post(
            &format!("pricing-schemes/{scheme_id}/dest-adjustments:upsert"),
            payload,
        )
        .await
    }

    async fn patch_dest_adjustment(
        &self,
        adjustment_id: i64,
        payload: &DestAdjustmentUpdate,
    ) -> ClientResult<DestAdjustment> {
        self.patch(&format!("dest-adjustments/{adjustment_id}"), payload)
            .await
    }

    async fn delete_dest_adjustment(&self, adjustment_id: i64) -> ClientResult<()> {
        self.delete(&format!("dest-adjustments/{adjustment_id}"))
            .await
    }

    async fn create_surcharge(
        &self,
        scheme_id: i64,
        payload: &SurchargeCreate,
    ) -> ClientResult<Surcharge> {
        self.post(&format!("pricing-schemes/{scheme_id}/surcharges"), payload)
            .await
    }

    async fn patch_surcharge(
        &self,
        surcharge_id: i64,
        payload: &SurchargeUpdate,
    ) -> ClientResult<Surcharge> {
        self.patch(&format!("surcharges/{surcharge_id}"), payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detail_conflict_body() {
        let text = r#"{"detail": {"code": "dest_adjustment_scope_conflict", "message": "scope conflict", "conflicts": [{"id": 3}, {"id": 8}]}}"#;
        let err = parse_error_body(409, text);
        assert!(err.is_conflict());
        assert_eq!(err.conflict_ids(), vec![3, 8]);
        assert_eq!(err.detail_code(), Some("dest_adjustment_scope_conflict"));
        assert!(err.to_string().contains("scope conflict"));
    }

    #[test]
    fn test_parse_string_detail() {
        let err = parse_error_body(500, r#"{"detail": "violates foreign key constraint"}"#);
        match err {
            ClientError::Api {
                status,
                message,
                detail,
                ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "violates foreign key constraint");
                assert!(detail.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_auth_statuses_get_codes() {
        match parse_error_body(401, "Unauthorized") {
            ClientError::Api { code, .. } => assert_eq!(code, Some(ErrorCode::NotAuthenticated)),
            other => panic!("unexpected {other:?}"),
        }
        match parse_error_body(403, r#"{"detail": "forbidden"}"#) {
            ClientError::Api { code, .. } => assert_eq!(code, Some(ErrorCode::PermissionDenied)),
            other => panic!("unexpected {other:?}"),
        }
        match parse_error_body(401, r#"{"code": 1003, "message": "Token has expired"}"#) {
            ClientError::Api { code, .. } => assert_eq!(code, Some(ErrorCode::TokenExpired)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_app_error_body() {
        let err = parse_error_body(409, r#"{"code": 5002, "message": "Bracket is still referenced"}"#);
        match err {
            ClientError::Api { code, .. } => assert_eq!(code, Some(ErrorCode::BracketInUse)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_plain_text_body() {
        let err = parse_error_body(502, "Bad Gateway");
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = NetworkRateClient::new(&ClientConfig::new("http://rates.local/api/")).unwrap();
        assert_eq!(client.base_url(), "http://rates.local/api");
    }
}
