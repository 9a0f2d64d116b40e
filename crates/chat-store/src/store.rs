//! 会話ファイルストア

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::allocator::{self, DEFAULT_ID_WIDTH};
use crate::{Message, Result, StoreError};

const CHAT_DATA_DIR: &str = "chat_data";
const MESSAGES_FILE: &str = "messages.json";
const RAW_RESPONSES_FILE: &str = "raw_api_responses.jsonl";
const METADATA_FILE: &str = "metadata.json";

/// タイトルが導出できない会話に使うプレースホルダ
pub const TITLE_PLACEHOLDER: &str = "New Chat";

/// タイトル導出フック
///
/// メッセージ履歴から表示用タイトルを導出する。`None` を返すと
/// プレースホルダが使われる。
pub type TitleFn = Arc<dyn Fn(&[Message]) -> Option<String> + Send + Sync>;

/// 会話一覧の1エントリ（サイドバー表示用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTitle {
    pub id: String,
    pub title: String,
}

/// 会話ファイルストア
///
/// `<base_dir>/chat_data/<user_id>/<convo_id>/` 配下に
/// `messages.json`・`raw_api_responses.jsonl`・`metadata.json` を保存する。
/// ディレクトリは最初の書き込み時に遅延作成される（`new` は何も作らない）。
pub struct ChatStore {
    base_dir: PathBuf,
    id_width: usize,
    title_fn: TitleFn,
}

impl ChatStore {
    /// 新しいストアを作成する。ファイルシステムには触れない。
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            id_width: DEFAULT_ID_WIDTH,
            title_fn: Arc::new(default_title_fn),
        }
    }

    /// 会話IDの桁数を変更
    pub fn with_id_width(mut self, width: usize) -> Self {
        self.id_width = width;
        self
    }

    /// タイトル導出フックを差し替え
    pub fn with_title_fn(mut self, title_fn: TitleFn) -> Self {
        self.title_fn = title_fn;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 会話ディレクトリを冪等に作成する。
    ///
    /// ディスク上の構造を作るのはこの操作だけで、他の書き込み操作は
    /// すべてここを経由する。
    pub fn ensure_conversation_dir(&self, user_id: &str, convo_id: &str) -> Result<PathBuf> {
        let dir = self.conversation_dir(user_id, convo_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// メッセージ履歴を読み込み
    ///
    /// まだディスク上に存在しない会話は空の履歴として扱う
    /// （URL などで参照されただけの会話でもエラーにならない）。
    pub fn load_messages(&self, user_id: &str, convo_id: &str) -> Result<Vec<Message>> {
        let path = self.conversation_dir(user_id, convo_id).join(MESSAGES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json).map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    /// メッセージを1件追記
    ///
    /// 履歴ファイル全体を一時ファイルに書き出してから rename で
    /// 置き換える。外部の読み手には旧履歴か新履歴のどちらかしか見えない。
    pub fn append_message(&self, user_id: &str, convo_id: &str, message: &Message) -> Result<()> {
        let dir = self.ensure_conversation_dir(user_id, convo_id)?;

        let mut messages = self.load_messages(user_id, convo_id)?;
        messages.push(message.clone());

        let json = serde_json::to_string_pretty(&messages)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&dir.join(MESSAGES_FILE), json.as_bytes())
    }

    /// 生APIレスポンスを1行追記
    ///
    /// ログは追記専用で、書き換えられることはない。
    pub fn append_raw_response(&self, user_id: &str, convo_id: &str, entry: &Value) -> Result<()> {
        let dir = self.ensure_conversation_dir(user_id, convo_id)?;

        let line = serde_json::to_string(entry)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(RAW_RESPONSES_FILE))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// 生APIレスポンスログを読み込み（診断用）
    ///
    /// 解釈できない行は警告を出してスキップする。
    pub fn load_raw_responses(&self, user_id: &str, convo_id: &str) -> Result<Vec<Value>> {
        let path = self
            .conversation_dir(user_id, convo_id)
            .join(RAW_RESPONSES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&path)?;
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(value) => entries.push(value),
                Err(e) => log::warn!(
                    "skipping malformed raw response line {} in {}: {}",
                    lineno + 1,
                    path.display(),
                    e
                ),
            }
        }
        Ok(entries)
    }

    /// ユーザーの会話ID一覧（数値名のディレクトリのみ、番号順）
    pub fn list_conversation_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let user_dir = self.user_dir(user_id);
        if !user_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&user_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if allocator::parse_conversation_id(name).is_some() {
                ids.push(name.to_string());
            }
        }

        ids.sort_by_key(|id| allocator::parse_conversation_id(id));
        Ok(ids)
    }

    /// 次の会話IDを計算する（副作用なし、ファイルは作られない）
    pub fn next_conversation_id(&self, user_id: &str) -> Result<String> {
        let ids = self.list_conversation_ids(user_id)?;
        Ok(allocator::next_conversation_id(
            ids.iter().map(String::as_str),
            self.id_width,
        ))
    }

    /// 会話一覧を `{id, title}` で返す
    ///
    /// タイトルは設定されたフックで最初のメッセージから導出する。
    /// 空・読めない会話でも失敗せず、プレースホルダに落とす。
    pub fn load_conversation_titles(&self, user_id: &str) -> Result<Vec<ConversationTitle>> {
        let mut titles = Vec::new();
        for id in self.list_conversation_ids(user_id)? {
            let messages = self.load_messages(user_id, &id).unwrap_or_else(|e| {
                log::warn!("could not read conversation {}/{}: {}", user_id, id, e);
                Vec::new()
            });

            let title =
                (self.title_fn)(&messages).unwrap_or_else(|| TITLE_PLACEHOLDER.to_string());
            titles.push(ConversationTitle { id, title });
        }
        Ok(titles)
    }

    /// メタデータを読み込み（無ければ None、エラーにしない）
    pub fn load_metadata(&self, user_id: &str, convo_id: &str) -> Result<Option<Value>> {
        let path = self.conversation_dir(user_id, convo_id).join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    /// メタデータを保存（自由形式のJSONオブジェクト）
    pub fn save_metadata(&self, user_id: &str, convo_id: &str, metadata: &Value) -> Result<()> {
        let dir = self.ensure_conversation_dir(user_id, convo_id)?;
        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&dir.join(METADATA_FILE), json.as_bytes())
    }

    /// 会話をファイルごと削除
    pub fn delete_conversation(&self, user_id: &str, convo_id: &str) -> Result<()> {
        fs::remove_dir_all(self.conversation_dir(user_id, convo_id))?;
        Ok(())
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_dir.join(CHAT_DATA_DIR).join(user_id)
    }

    fn conversation_dir(&self, user_id: &str, convo_id: &str) -> PathBuf {
        self.user_dir(user_id).join(convo_id)
    }
}

/// デフォルトのタイトル導出
///
/// 最初のメッセージ本文を30文字に切り詰める。
fn default_title_fn(messages: &[Message]) -> Option<String> {
    let first = messages.first()?;
    let trimmed = first.content.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(derive_title(trimmed))
}

fn derive_title(source: &str) -> String {
    const MAX: usize = 30;
    if source.chars().count() <= MAX {
        return source.to_string();
    }

    let mut truncated = String::with_capacity(MAX + 3);
    for ch in source.chars().take(MAX) {
        truncated.push(ch);
    }
    truncated.push_str("...");
    truncated
}

/// 一時ファイルに書き出してから rename で置き換える
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
