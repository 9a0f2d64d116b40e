//! チャットエンジン
//!
//! ChatStore と ProviderRegistry を使って1ターン
//! （ユーザー入力 → 永続化 → プロバイダ呼び出し → 永続化）を処理します。

use std::sync::Arc;

use ai_provider::ProviderRegistry;
use chat_store::{ChatStore, ConversationTitle, Message};
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod error;

pub use error::ChatError;

/// 1ターンの結果
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub conversation_id: String,
    pub assistant_message: Message,
    /// 生レスポンスログの対応エントリと共有する相関ID
    pub turn_id: String,
}

/// チャットエンジン
///
/// プロバイダ・モデルの切り替えは単なる属性の更新で、過去のターンは
/// ディスク上に記録されたまま変わらない。1つの会話に対するターンは
/// 呼び出し側で直列化される前提（エンジン自身はロックしない）。
pub struct ChatEngine {
    store: ChatStore,
    registry: Arc<ProviderRegistry>,
    provider_spec: String,
    model: String,
    options: Map<String, Value>,
    system_seed: Option<String>,
}

impl ChatEngine {
    pub fn new(
        store: ChatStore,
        registry: Arc<ProviderRegistry>,
        provider_spec: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            provider_spec: provider_spec.into(),
            model: model.into(),
            options: Map::new(),
            system_seed: None,
        }
    }

    /// 最初のターンの前に差し込むシステムメッセージを設定
    pub fn with_system_seed(mut self, seed: impl Into<String>) -> Self {
        self.system_seed = Some(seed.into());
        self
    }

    /// プロバイダ呼び出しに渡す追加オプション（temperature など）
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// プロバイダを切り替える（会話状態には触れない）
    pub fn set_provider_spec(&mut self, spec: impl Into<String>) {
        self.provider_spec = spec.into();
    }

    /// モデルを切り替える（会話状態には触れない）
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn provider_spec(&self) -> &str {
        &self.provider_spec
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// 次の会話IDを計算する（ファイルは作られない）
    pub fn next_conversation_id(&self, user_id: &str) -> Result<String, ChatError> {
        Ok(self.store.next_conversation_id(user_id)?)
    }

    /// 会話のメッセージ履歴を取得
    pub fn history(&self, user_id: &str, convo_id: &str) -> Result<Vec<Message>, ChatError> {
        Ok(self.store.load_messages(user_id, convo_id)?)
    }

    /// 会話一覧（サイドバー表示用）
    pub fn conversation_titles(&self, user_id: &str) -> Result<Vec<ConversationTitle>, ChatError> {
        Ok(self.store.load_conversation_titles(user_id)?)
    }

    /// ユーザーメッセージを送信して1ターンを実行する
    ///
    /// `convo_id` が `None` の場合は新しい会話IDを採番する。
    /// 失敗はすべてこのターンに閉じる:
    /// - ユーザーメッセージはプロバイダ呼び出しの前に永続化され、
    ///   呼び出しが失敗しても残る
    /// - 生レスポンスはアシスタントメッセージより先に書き込まれ、
    ///   テキスト抽出に失敗しても診断用に残る
    pub async fn send_message(
        &self,
        user_id: &str,
        convo_id: Option<&str>,
        user_input: &str,
    ) -> Result<TurnOutcome, ChatError> {
        // 未登録プロバイダは何も書き込む前に弾く
        let provider = self.registry.get(&self.provider_spec)?;

        let convo_id = match convo_id {
            Some(id) => id.to_string(),
            None => self.store.next_conversation_id(user_id)?,
        };

        if let Some(seed) = &self.system_seed {
            if self.store.load_messages(user_id, &convo_id)?.is_empty() {
                self.store
                    .append_message(user_id, &convo_id, &Message::system(seed.clone()))?;
            }
        }

        self.store
            .append_message(user_id, &convo_id, &Message::user(user_input))?;

        let history = self.store.load_messages(user_id, &convo_id)?;
        let formatted = provider.format_messages(&history);

        log::debug!(
            "invoking {} (model {}) for {}/{}",
            self.provider_spec,
            self.model,
            user_id,
            convo_id
        );
        let raw = provider.invoke(&formatted, &self.model, &self.options).await?;

        let turn_id = Uuid::new_v4().to_string();
        let entry = serde_json::json!({ "turn_id": turn_id, "response": raw });
        self.store.append_raw_response(user_id, &convo_id, &entry)?;

        let text = provider.extract(&raw)?;

        let assistant =
            Message::assistant(text).with_extra("turn_id", Value::String(turn_id.clone()));
        self.store.append_message(user_id, &convo_id, &assistant)?;

        Ok(TurnOutcome {
            conversation_id: convo_id,
            assistant_message: assistant,
            turn_id,
        })
    }
}
