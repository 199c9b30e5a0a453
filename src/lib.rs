pub mod client;
pub mod config;
pub mod errors;
pub mod oss;
pub mod utils;
pub mod wechat;

pub use client::Pay;
pub use config::{OssConfig, PayConfig, WechatConfig};
pub use errors::{PayError, StorageError};
pub use oss::{OssClient, OssResponse, OssTransport, Storage};
pub use wechat::client::{PaymentAuthorization, WechatClient};
pub use wechat::transport::{GatewayResponse, SignedTransport};
