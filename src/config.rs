use std::sync::Arc;

/// 微信支付商户配置，启动时装载，进程期间只读
#[derive(Clone)]
pub struct WechatConfig {
    pub appid: String,
    pub mchid: String,
    /// 商户API证书序列号
    pub mch_serial_no: String,
    /// 商户私钥文件路径(PEM)
    pub private_key_path: String,
    /// 平台证书文件路径
    pub platform_cert_path: String,
    /// 证书解密密钥(APIv3)
    pub api_v3_key: String,
    /// 支付成功回调地址
    pub notify_url: String,
    /// 退款成功回调地址
    pub refund_notify_url: String,
}

/// 阿里云OSS配置
#[derive(Clone)]
pub struct OssConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket_name: String,
}

#[derive(Clone)]
pub struct PayConfig {
    pub wechat: Option<Arc<WechatConfig>>,
    pub oss: Option<Arc<OssConfig>>,
}
