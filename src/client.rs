use crate::config::PayConfig;
use crate::errors::PayError;
use crate::oss::OssClient;
use crate::wechat::client::WechatClient;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static CONFIG: OnceCell<Arc<PayConfig>> = OnceCell::new();

pub struct Pay;

impl Pay {
    /// 进程启动时安装配置，只生效一次
    pub fn config(cfg: PayConfig) {
        let _ = CONFIG.set(Arc::new(cfg));
    }

    fn cfg() -> Result<Arc<PayConfig>, PayError> {
        CONFIG
            .get()
            .cloned()
            .ok_or_else(|| PayError::Config("config not initialized".into()))
    }

    pub fn wechat() -> Result<WechatClient, PayError> {
        let cfg = Self::cfg()?;
        let wx = cfg
            .wechat
            .clone()
            .ok_or_else(|| PayError::Config("wechat config missing".into()))?;
        WechatClient::new(wx)
    }

    pub fn oss() -> Result<OssClient, PayError> {
        let cfg = Self::cfg()?;
        let oss = cfg
            .oss
            .clone()
            .ok_or_else(|| PayError::Config("oss config missing".into()))?;
        Ok(OssClient::new(oss))
    }
}
