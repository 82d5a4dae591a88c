//! # パスリゾルバ
//!
//! ドット区切りのキーパス（例: `parent.father.name`）をネストした JSON
//! コンテキストに対して解決する。
//!
//! 各ホップで完全一致のキーを試し、見つからなければそのセグメントの
//! 別表記（camelCase ↔ snake_case）で 1 回だけ再試行する。
//! それでも見つからない場合、またはセグメントが残っているのに現在値が
//! オブジェクトでない場合は `None` を返す。入力は変更しない。
//!
//! 配列インデックス記法（`items.0`）はサポートしない。

use serde_json::Value;

/// パスの区切り文字
pub const PATH_SEPARATOR: char = '.';

/// ドット区切りのパスを解決する
///
/// JSON の `null` が格納されている場合は `Some(&Value::Null)` を返す。
/// 呼び出し側で「値なし」として扱うこと。
///
/// # 使用例
///
/// ```rust
/// use scholamail_domain::notification::path::resolve_path;
/// use serde_json::json;
///
/// let context = json!({ "student": { "first_name": "Ana" } });
/// assert_eq!(resolve_path(&context, "student.firstName"), Some(&json!("Ana")));
/// assert_eq!(resolve_path(&context, "student.lastName"), None);
/// ```
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split(PATH_SEPARATOR) {
        let object = current.as_object()?;
        current = match object.get(segment) {
            Some(value) => value,
            None => object.get(&alternate_key(segment)?)?,
        };
    }
    Some(current)
}

/// セグメントの別表記を導出する
///
/// - `_` を含む場合は camelCase に変換する
/// - 大文字を含む場合は snake_case に変換する
/// - どちらでもない、または変換結果が同じ場合は `None`
pub fn alternate_key(segment: &str) -> Option<String> {
    let alternate = if segment.contains('_') {
        to_camel_case(segment)
    } else if segment.chars().any(|c| c.is_ascii_uppercase()) {
        to_snake_case(segment)
    } else {
        return None;
    };

    (alternate != segment).then_some(alternate)
}

/// camelCase を snake_case に変換する
///
/// 大文字 1 文字ごとに `_` + 小文字へ置き換える（先頭は `_` を付けない）。
/// `photoURL` は `photo_u_r_l` になる。
pub fn to_snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, c) in segment.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// snake_case を camelCase に変換する
///
/// `_` の直後が英小文字の場合のみ、`_` を取り除いて大文字化する。
pub fn to_camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}
