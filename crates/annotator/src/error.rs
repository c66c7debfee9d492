//! Annotator 错误类型
//!
//! 帧标注本身不会失败，这里只涉及流注册与排队。

use thiserror::Error;

/// 标注管道错误
#[derive(Debug, Error)]
pub enum AnnotatorError {
    /// 流队列已关闭
    #[error("channel closed for stream {stream_id}")]
    ChannelClosed {
        /// 流 ID
        stream_id: String,
    },

    /// 流重复注册
    #[error("stream {stream_id} is already registered")]
    DuplicateStream {
        /// 流 ID
        stream_id: String,
    },

    /// 流未注册
    #[error("stream {stream_id} is not registered")]
    UnknownStream {
        /// 流 ID
        stream_id: String,
    },
}

/// Annotator Result 类型别名
pub type Result<T> = std::result::Result<T, AnnotatorError>;
