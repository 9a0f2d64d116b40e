//! チャット会話データの永続化
//!
//! 会話ごとのメッセージ履歴・生APIレスポンスログ・メタデータを
//! ユーザー別のディレクトリツリーに保存・読み込みする機能を提供します。

mod allocator;
mod message;
mod store;

pub use allocator::{
    format_conversation_id, next_conversation_id, parse_conversation_id, DEFAULT_ID_WIDTH,
};
pub use message::{Message, MessageRole};
pub use store::{ChatStore, ConversationTitle, TitleFn, TITLE_PLACEHOLDER};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
