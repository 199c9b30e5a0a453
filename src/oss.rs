use crate::config::OssConfig;
use crate::errors::StorageError;
use crate::utils::base64_encode;
use async_trait::async_trait;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use reqwest::Client;
use std::sync::Arc;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::info;

const CONTENT_TYPE: &str = "application/octet-stream";

// OSS要求 GMT 时间，如 "Wed, 02 Jan 2019 13:04:05 GMT"
const DATE_FMT: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// 对象存储能力边界
#[async_trait]
pub trait Storage: Send + Sync {
    /// 上传文件，返回访问地址；失败向上传播，不吞错
    async fn upload(&self, bytes: &[u8], object_name: &str) -> Result<String, StorageError>;
}

#[derive(Debug)]
pub struct OssResponse {
    pub status: u16,
    pub body: String,
}

impl OssResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// OSS传输层，可注入替换(测试用mock)
#[async_trait]
pub trait OssTransport: Send + Sync {
    async fn put(
        &self,
        url: &str,
        date: &str,
        authorization: &str,
        bytes: &[u8],
    ) -> Result<OssResponse, StorageError>;
}

pub struct HttpOssTransport {
    http: Client,
}

impl HttpOssTransport {
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent("minipay")
            .build()
            .expect("client");
        Self { http }
    }
}

impl Default for HttpOssTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OssTransport for HttpOssTransport {
    async fn put(
        &self,
        url: &str,
        date: &str,
        authorization: &str,
        bytes: &[u8],
    ) -> Result<OssResponse, StorageError> {
        let resp = self
            .http
            .put(url)
            .header("Authorization", authorization)
            .header("Date", date)
            .header("Content-Type", CONTENT_TYPE)
            .body(bytes.to_vec())
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(OssResponse { status, body })
    }
}

pub struct OssClient {
    cfg: Arc<OssConfig>,
    transport: Arc<dyn OssTransport>,
}

impl OssClient {
    pub fn new(cfg: Arc<OssConfig>) -> Self {
        Self {
            cfg,
            transport: Arc::new(HttpOssTransport::new()),
        }
    }

    /// 注入自定义传输层，测试时使用
    pub fn with_transport(cfg: Arc<OssConfig>, transport: Arc<dyn OssTransport>) -> Self {
        Self { cfg, transport }
    }

    // 访问路径规则 https://BucketName.Endpoint/ObjectName
    fn object_url(&self, object_name: &str) -> String {
        format!(
            "https://{}.{}/{}",
            self.cfg.bucket_name, self.cfg.endpoint, object_name
        )
    }

    fn authorization(&self, date: &str, object_name: &str) -> Result<String, StorageError> {
        let string_to_sign = format!(
            "PUT\n\n{}\n{}\n/{}/{}",
            CONTENT_TYPE, date, self.cfg.bucket_name, object_name
        );
        let sig = hmac_sha1(
            self.cfg.access_key_secret.as_bytes(),
            string_to_sign.as_bytes(),
        )
        .map_err(|e| StorageError::Sign(e.to_string()))?;
        Ok(format!(
            "OSS {}:{}",
            self.cfg.access_key_id,
            base64_encode(sig)
        ))
    }
}

#[async_trait]
impl Storage for OssClient {
    async fn upload(&self, bytes: &[u8], object_name: &str) -> Result<String, StorageError> {
        let date = http_date(OffsetDateTime::now_utc())?;
        let auth = self.authorization(&date, object_name)?;
        let url = self.object_url(object_name);
        let resp = self.transport.put(&url, &date, &auth, bytes).await?;
        if !resp.is_success() {
            return Err(StorageError::Rejected {
                status: resp.status,
                body: resp.body,
            });
        }
        info!("文件上传到: {}", url);
        Ok(url)
    }
}

fn http_date(now: OffsetDateTime) -> Result<String, StorageError> {
    now.format(&DATE_FMT)
        .map_err(|e| StorageError::Sign(e.to_string()))
}

fn hmac_sha1(secret: &[u8], data: &[u8]) -> Result<Vec<u8>, openssl::error::ErrorStack> {
    let key = PKey::hmac(secret)?;
    let mut signer = Signer::new(MessageDigest::sha1(), &key)?;
    signer.update(data)?;
    signer.sign_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    struct MockOss {
        status: u16,
        body: String,
    }

    #[async_trait]
    impl OssTransport for MockOss {
        async fn put(
            &self,
            _url: &str,
            _date: &str,
            _authorization: &str,
            _bytes: &[u8],
        ) -> Result<OssResponse, StorageError> {
            Ok(OssResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn test_cfg() -> Arc<OssConfig> {
        Arc::new(OssConfig {
            endpoint: "oss-cn-hangzhou.aliyuncs.com".to_string(),
            access_key_id: "LTAItest".to_string(),
            access_key_secret: "secret".to_string(),
            bucket_name: "sky-bucket".to_string(),
        })
    }

    fn test_client() -> OssClient {
        OssClient::new(test_cfg())
    }

    #[test]
    fn object_url_follows_bucket_endpoint_pattern() {
        let client = test_client();
        assert_eq!(
            client.object_url("dish/2024/cover.png"),
            "https://sky-bucket.oss-cn-hangzhou.aliyuncs.com/dish/2024/cover.png"
        );
    }

    #[test]
    fn date_header_is_rfc1123_gmt() {
        let d = http_date(datetime!(2019-01-02 13:04:05 UTC)).unwrap();
        assert_eq!(d, "Wed, 02 Jan 2019 13:04:05 GMT");
    }

    #[test]
    fn hmac_sha1_matches_known_vector() {
        // RFC 2202 风格样例
        let sig = hmac_sha1(b"key", b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(base64_encode(sig), "3nybhbi3iqa8ino29wqQcBydtNk=");
    }

    #[tokio::test]
    async fn upload_returns_access_url_on_success() {
        let client = OssClient::with_transport(
            test_cfg(),
            Arc::new(MockOss {
                status: 200,
                body: String::new(),
            }),
        );
        let url = client.upload(b"bytes", "dish/cover.png").await.unwrap();
        assert_eq!(
            url,
            "https://sky-bucket.oss-cn-hangzhou.aliyuncs.com/dish/cover.png"
        );
    }

    #[tokio::test]
    async fn upload_rejection_propagates_instead_of_returning_url() {
        let client = OssClient::with_transport(
            test_cfg(),
            Arc::new(MockOss {
                status: 403,
                body: r#"<Error><Code>AccessDenied</Code></Error>"#.to_string(),
            }),
        );
        let err = client.upload(b"bytes", "dish/cover.png").await.unwrap_err();
        match err {
            StorageError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("AccessDenied"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
