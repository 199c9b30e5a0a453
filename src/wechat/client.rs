use crate::config::WechatConfig;
use crate::errors::PayError;
use crate::utils::{gen_nonce, load_private_key, now_ts, rsa_sign_sha256, yuan_to_fen, CURRENCY};
use crate::wechat::transport::{SignedTransport, WechatTransport};
use openssl::pkey::{PKey, Private};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const JSAPI_PATH: &str = "/v3/pay/transactions/jsapi";
const REFUND_PATH: &str = "/v3/refund/domestic/refunds";

/// 小程序拉起支付所需的五个字段，字段名按小程序端要求序列化
#[derive(Serialize, Debug, Clone)]
pub struct PaymentAuthorization {
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(rename = "nonceStr")]
    pub nonce_str: String,
    /// "prepay_id={prepay_id}"
    pub package: String,
    #[serde(rename = "signType")]
    pub sign_type: String,
    #[serde(rename = "paySign")]
    pub pay_sign: String,
}

pub struct WechatClient {
    cfg: Arc<WechatConfig>,
    key: PKey<Private>,
    transport: Arc<dyn SignedTransport>,
}

impl WechatClient {
    /// 私钥在此一次性加载，之后所有签名复用同一句柄
    pub fn new(cfg: Arc<WechatConfig>) -> Result<Self, PayError> {
        let key = load_private_key(&cfg.private_key_path)?;
        let transport = Arc::new(WechatTransport::new(cfg.clone(), key.clone()));
        Ok(Self {
            cfg,
            key,
            transport,
        })
    }

    /// 注入自定义传输层，测试或替换签名方案时使用
    pub fn with_transport(
        cfg: Arc<WechatConfig>,
        key: PKey<Private>,
        transport: Arc<dyn SignedTransport>,
    ) -> Self {
        Self {
            cfg,
            key,
            transport,
        }
    }

    /// jsapi 下单并生成小程序支付签名
    ///
    /// total 单位为元，内部按四舍五入转为分
    pub async fn jsapi(
        &self,
        out_trade_no: &str,
        total: Decimal,
        description: &str,
        openid: &str,
    ) -> Result<PaymentAuthorization, PayError> {
        if out_trade_no.is_empty() {
            return Err(PayError::Invalid("out_trade_no 不能为空".into()));
        }
        if openid.is_empty() {
            return Err(PayError::Invalid("openid 不能为空".into()));
        }
        if total <= Decimal::ZERO {
            return Err(PayError::Invalid(format!("金额必须大于0: {}", total)));
        }

        let body = json!({
            "appid": self.cfg.appid,
            "mchid": self.cfg.mchid,
            "description": description,
            "out_trade_no": out_trade_no,
            "notify_url": self.cfg.notify_url,
            "amount": { "total": yuan_to_fen(total)?, "currency": CURRENCY },
            "payer": { "openid": openid },
        });
        let resp = self.transport.post(JSAPI_PATH, &body.to_string()).await?;
        if !resp.is_success() {
            return Err(PayError::Gateway {
                status: resp.status,
                body: resp.body,
            });
        }
        let v: Value = match serde_json::from_str(&resp.body) {
            Ok(v) => v,
            Err(_) => {
                return Err(PayError::Gateway {
                    status: resp.status,
                    body: resp.body,
                })
            }
        };
        let prepay_id = match v.get("prepay_id").and_then(|p| p.as_str()) {
            Some(p) => p,
            None => {
                return Err(PayError::Gateway {
                    status: resp.status,
                    body: resp.body,
                })
            }
        };
        debug!("jsapi下单成功: out_trade_no={}", out_trade_no);

        let time_stamp = now_ts();
        let nonce_str = gen_nonce(32);
        let package = format!("prepay_id={}", prepay_id);
        let message = pay_sign_message(&self.cfg.appid, &time_stamp, &nonce_str, &package);
        let pay_sign = rsa_sign_sha256(&self.key, message.as_bytes())?;

        Ok(PaymentAuthorization {
            time_stamp,
            nonce_str,
            package,
            sign_type: "RSA".into(),
            pay_sign,
        })
    }

    /// 申请退款，退款与原单金额各自独立转分
    ///
    /// 成功时返回网关原始响应体，内容解释交给调用方
    pub async fn refund(
        &self,
        out_trade_no: &str,
        out_refund_no: &str,
        refund: Decimal,
        total: Decimal,
    ) -> Result<String, PayError> {
        if out_trade_no.is_empty() || out_refund_no.is_empty() {
            return Err(PayError::Invalid("订单号/退款单号不能为空".into()));
        }
        if refund <= Decimal::ZERO || refund > total {
            return Err(PayError::Invalid(format!(
                "退款金额必须大于0且不超过原订单金额: refund={} total={}",
                refund, total
            )));
        }

        let body = json!({
            "out_trade_no": out_trade_no,
            "out_refund_no": out_refund_no,
            "amount": {
                "refund": yuan_to_fen(refund)?,
                "total": yuan_to_fen(total)?,
                "currency": CURRENCY,
            },
            "notify_url": self.cfg.refund_notify_url,
        });
        let resp = self.transport.post(REFUND_PATH, &body.to_string()).await?;
        if !resp.is_success() {
            return Err(PayError::Gateway {
                status: resp.status,
                body: resp.body,
            });
        }
        debug!("退款请求已受理: out_refund_no={}", out_refund_no);
        Ok(resp.body)
    }
}

/// 支付签名串固定四行：appid、时间戳、随机串、package，每行以\n结尾
fn pay_sign_message(appid: &str, time_stamp: &str, nonce: &str, package: &str) -> String {
    format!("{}\n{}\n{}\n{}\n", appid, time_stamp, nonce, package)
}
