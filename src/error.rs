//! 错误类型定义

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// 服务端返回的错误，原样传递给调用方，不做重试
    #[error("服务器错误: {0}")]
    Server(String),

    #[error("传输错误: {0}")]
    Transport(String),

    #[error("响应格式错误: {0}")]
    MalformedReply(String),

    #[error("无效参数: {0}")]
    InvalidParameter(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedReply(msg.into())
    }

    /// 是否为服务端错误
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server(_))
    }
}
