use crate::config::WechatConfig;
use crate::errors::PayError;
use crate::utils::{gen_nonce, now_ts, rsa_sign_sha256};
use async_trait::async_trait;
use openssl::pkey::{PKey, Private};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

pub const BASE_URL: &str = "https://api.mch.weixin.qq.com";

#[derive(Debug)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 微信APIv3签名传输层，可注入替换(测试用mock)
#[async_trait]
pub trait SignedTransport: Send + Sync {
    async fn post(&self, path: &str, body: &str) -> Result<GatewayResponse, PayError>;
}

pub struct WechatTransport {
    cfg: Arc<WechatConfig>,
    key: PKey<Private>,
    http: Client,
    base_url: String,
}

impl WechatTransport {
    pub fn new(cfg: Arc<WechatConfig>, key: PKey<Private>) -> Self {
        let http = Client::builder()
            .user_agent("minipay")
            .build()
            .expect("client");
        Self {
            cfg,
            key,
            http,
            base_url: BASE_URL.to_string(),
        }
    }

    /// 请求签名串固定五行：方法、路径、时间戳、随机串、请求体，每行以\n结尾
    fn authorization(&self, method: &str, path: &str, body: &str) -> Result<String, PayError> {
        let timestamp = now_ts();
        let nonce = gen_nonce(32);
        let sign_str = format!("{}\n{}\n{}\n{}\n{}\n", method, path, timestamp, nonce, body);
        let signature = rsa_sign_sha256(&self.key, sign_str.as_bytes())?;
        Ok(format!(
            r#"WECHATPAY2-SHA256-RSA2048 mchid="{mchid}",nonce_str="{nonce}",timestamp="{ts}",serial_no="{serial}",signature="{sig}""#,
            mchid = self.cfg.mchid,
            nonce = nonce,
            ts = timestamp,
            serial = self.cfg.mch_serial_no,
            sig = signature
        ))
    }
}

#[async_trait]
impl SignedTransport for WechatTransport {
    async fn post(&self, path: &str, body: &str) -> Result<GatewayResponse, PayError> {
        let auth = self.authorization("POST", path, body)?;
        let url = format!("{}{}", self.base_url, path);
        debug!("wechat pay request: {}", path);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", auth)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(GatewayResponse { status, body })
    }
}
