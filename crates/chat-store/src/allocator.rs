//! 会話ID採番
//!
//! 既存の会話ディレクトリ名から次の会話IDを計算します。
//! ここではファイルシステムに一切触れません。

use std::collections::BTreeSet;

/// 会話IDの桁数（ゼロ埋め）のデフォルト値
pub const DEFAULT_ID_WIDTH: usize = 3;

/// 既存IDに含まれない最小の正整数を、指定桁数のゼロ埋め文字列で返す。
///
/// 削除による欠番はそのまま再利用される。数値として解釈できない
/// 名前は警告を出してスキップする（エラーにしない）。
pub fn next_conversation_id<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    width: usize,
) -> String {
    let used: BTreeSet<u64> = existing
        .into_iter()
        .filter_map(|name| {
            let parsed = parse_conversation_id(name);
            if parsed.is_none() {
                log::warn!("ignoring non-numeric conversation directory: {}", name);
            }
            parsed
        })
        .collect();

    let mut candidate: u64 = 1;
    while used.contains(&candidate) {
        candidate += 1;
    }

    format_conversation_id(candidate, width)
}

/// 会話IDを指定桁数のゼロ埋め文字列に整形する。
pub fn format_conversation_id(id: u64, width: usize) -> String {
    format!("{:0width$}", id, width = width)
}

/// ディレクトリ名を会話IDとして解釈する。
/// すべて10進数字で構成されている場合のみ有効。
pub fn parse_conversation_id(name: &str) -> Option<u64> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
