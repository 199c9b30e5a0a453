use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayError {
    /// 私钥/证书加载失败，或必要配置缺失
    #[error("config: {0}")]
    Config(String),
    /// 本地参数校验失败，未发起网络请求
    #[error("invalid: {0}")]
    Invalid(String),
    /// 网关返回非2xx、响应非JSON或缺少必要字段，body为原始响应体
    #[error("gateway: status={status} body={body}")]
    Gateway { status: u16, body: String },
    #[error("crypto: {0}")]
    Crypto(String),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("oss rejected: status={status} body={body}")]
    Rejected { status: u16, body: String },
    #[error("sign: {0}")]
    Sign(String),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
}
