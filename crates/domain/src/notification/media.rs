//! # メディア判定
//!
//! 埋め込む値が画像アセットの URL であり、かつ HTML 属性値の位置にない場合、
//! 値をそのまま出力する代わりに `<img>` タグを生成する。
//!
//! テンプレート作者は `{{student.photo}}` を本文中に書けば画像が埋め込まれ、
//! `src="{{student.photo}}"` と書けば URL のまま属性値として使える。
//!
//! ## 属性位置の判定
//!
//! プレースホルダー直前のテンプレート原文 [`LOOKBACK_CHARS`] 文字を窓として、
//! `src="`、`href="`、`url("` のいずれかを含むかで判定する。
//! 属性の開始記号とプレースホルダーの間に空白が多いと窓から外れ、
//! 属性位置と判定されない（既知の制約。描画結果が変わるため修正しない）。

use once_cell::sync::Lazy;
use regex::Regex;

/// 属性判定に使う直前の文字数
pub const LOOKBACK_CHARS: usize = 10;

/// 属性値の開始とみなす記法
const ATTRIBUTE_OPENERS: [&str; 3] = ["src=\"", "href=\"", "url(\""];

/// 埋め込み画像のインラインスタイル
const IMAGE_STYLE: &str =
    "display:block;max-width:100%;width:160px;height:auto;border:0;border-radius:8px;";

static IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^(?:https?://|/uploads/)[^\s"'<>]+\.(?:png|jpe?g|gif|webp|svg|bmp)(?:\?[^\s"'<>]*)?$"#,
    )
    .expect("画像 URL パターンは有効な正規表現")
});

/// 値が画像アセットの URL か
pub fn is_image_url(value: &str) -> bool {
    IMAGE_URL.is_match(value)
}

/// 直前の窓が属性値の開始位置を含むか
pub fn is_attribute_position(lookback: &str) -> bool {
    ATTRIBUTE_OPENERS
        .iter()
        .any(|opener| lookback.contains(opener))
}

/// 画像を埋め込む `<img>` タグを生成する
pub fn image_tag(url: &str) -> String {
    format!(r#"<img src="{url}" alt="" style="{IMAGE_STYLE}" />"#)
}

/// 文字列の末尾 `n` 文字を返す
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((index, _)) => &s[index..],
        None => s,
    }
}

/// 文字列値の出力形を決める
///
/// 画像 URL かつ属性位置でなければ `<img>` タグ、それ以外はそのまま。
pub fn embed_or_raw(value: &str, lookback: &str) -> Option<String> {
    (is_image_url(value) && !is_attribute_position(lookback)).then(|| image_tag(value))
}
