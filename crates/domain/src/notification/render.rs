//! # テンプレートレンダラー
//!
//! 解析済みテンプレートとコンテキストから文字列を生成する。
//! 処理は 2 パスで、順序は既存テンプレートとの互換性のため固定されている。
//!
//! 1. **ディレクティブ評価**: `{{#if path}}` ブロックを評価し、保持する本文だけを
//!    平坦なセグメント列に展開する。本文内のプレースホルダーは未解決のまま残る
//! 2. **埋め込み**: セグメント列を先頭から順に出力し、プレースホルダーを
//!    フォールバックチェーンで解決する
//!
//! 1 パス目が先に完了するため、ブロック本文内のプレースホルダーがブロックの
//! 保持・除去の判定に影響することはない。
//!
//! レンダリングは (テンプレート, コンテキスト) の純粋関数で、失敗しない。
//! 欠損データは空文字列になる。

use std::borrow::Cow;

use serde_json::Value;

use super::{
    context::NotificationContext,
    media,
    syntax::{Candidate, Node, ParsedTemplate, Placeholder},
};

/// ディレクティブ評価後のセグメント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t, 'a> {
    Text(&'a str),
    Placeholder(&'t Placeholder<'a>),
}

/// テンプレート文字列をレンダリングする
///
/// # 使用例
///
/// ```rust
/// use scholamail_domain::notification::{NotificationContext, render::render};
/// use serde_json::json;
///
/// let context = NotificationContext::from_value(json!({ "student": { "firstName": "Ana" } }));
/// assert_eq!(render("Hi {{student.firstName}}", &context), "Hi Ana");
/// ```
pub fn render(source: &str, context: &NotificationContext) -> String {
    let template = ParsedTemplate::parse(source);
    let segments = evaluate_directives(&template, context);
    interpolate(&segments, context)
}

/// 条件ブロックを評価し、保持する部分を平坦なセグメント列にする
pub fn evaluate_directives<'t, 'a>(
    template: &'t ParsedTemplate<'a>,
    context: &NotificationContext,
) -> Vec<Segment<'t, 'a>> {
    let mut segments = Vec::new();
    flatten(template.nodes(), context, &mut segments);
    segments
}

fn flatten<'t, 'a>(
    nodes: &'t [Node<'a>],
    context: &NotificationContext,
    segments: &mut Vec<Segment<'t, 'a>>,
) {
    for node in nodes {
        match node {
            Node::Text(text) => segments.push(Segment::Text(*text)),
            Node::Placeholder(placeholder) => segments.push(Segment::Placeholder(placeholder)),
            Node::If { path, body } => {
                if context.resolve(path).is_some_and(is_truthy) {
                    flatten(body, context, segments);
                }
            }
        }
    }
}

/// セグメント列のプレースホルダーを解決して連結する
///
/// 画像判定の窓は、置換後の出力ではなくディレクティブ評価後の原文から取る。
pub fn interpolate(segments: &[Segment<'_, '_>], context: &NotificationContext) -> String {
    let mut output = String::new();
    let mut source = String::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => {
                output.push_str(text);
                source.push_str(text);
            }
            Segment::Placeholder(placeholder) => {
                if let Some(value) = evaluate(placeholder, context) {
                    let lookback = media::tail_chars(&source, media::LOOKBACK_CHARS);
                    match value.embed(lookback) {
                        Some(tag) => output.push_str(&tag),
                        None => output.push_str(value.as_str()),
                    }
                }
                source.push_str(placeholder.source);
            }
        }
    }

    output
}

/// 解決された値
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved<'c> {
    /// 文字列値（リテラルを含む）。画像判定の対象
    Str(Cow<'c, str>),
    /// 数値・真偽値・配列・オブジェクトの文字列表現
    Other(String),
}

impl Resolved<'_> {
    fn as_str(&self) -> &str {
        match self {
            Self::Str(s) => s,
            Self::Other(s) => s,
        }
    }

    fn embed(&self, lookback: &str) -> Option<String> {
        match self {
            Self::Str(s) => media::embed_or_raw(s, lookback),
            Self::Other(_) => None,
        }
    }
}

/// フォールバックチェーンを先頭から評価する
///
/// `null`・未定義・空文字列でない最初の値を返す。すべて該当する場合は `None`。
fn evaluate<'c>(placeholder: &Placeholder<'c>, context: &'c NotificationContext) -> Option<Resolved<'c>> {
    placeholder.candidates.iter().find_map(|candidate| match candidate {
        Candidate::Literal(literal) => {
            (!literal.is_empty()).then(|| Resolved::Str(Cow::Borrowed(*literal)))
        }
        Candidate::Path(path) => context.resolve(path).and_then(stringify),
    })
}

fn stringify(value: &Value) -> Option<Resolved<'_>> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Resolved::Str(Cow::Borrowed(s))),
        other => Some(Resolved::Other(other.to_string())),
    }
}

/// 条件ブロックの真偽判定
///
/// `null`・`false`・`0`・空文字列は偽。空の配列・オブジェクトを含むそれ以外は真。
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
