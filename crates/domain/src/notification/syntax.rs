//! # テンプレート構文
//!
//! 通知テンプレートのミニ言語を 1 パスでトークン化し、最小限の再帰下降で
//! ノード木に組み立てる。
//!
//! ## 構文
//!
//! | 記法 | 意味 |
//! |------|------|
//! | `{{path}}` | パスの値を埋め込む |
//! | `{{a \|\| b \|\| 'literal'}}` | フォールバックチェーン（リテラルは `'` または `"` で囲む） |
//! | `{{#if path}}...{{/if}}` | 条件ブロック（ネスト不可） |
//!
//! ## トークン
//!
//! - `Text`: プレースホルダー以外の文字列
//! - `Placeholder`: 候補（`Path` / `Literal`）の並び
//! - `IfOpen` / `IfClose`: 条件ブロックの開始・終了
//!
//! ## 不正な入力（fail open）
//!
//! 構文エラーは発生させず、解釈できないタグは元のテキストのまま残す。
//!
//! - 閉じ `}}` のない `{{` 以降
//! - 空の `{{}}`、未知のディレクティブ（`{{#each x}}` など）、パスのない `{{#if}}`
//! - 対応する `{{/if}}` のない `{{#if path}}`、対応する開始のない `{{/if}}`
//! - ブロック本文内の `{{#if path}}`（ネストは非対応）。外側のブロックは最初の
//!   `{{/if}}` で閉じ、残った `{{/if}}` はリテラルになる

/// プレースホルダーの開始記号
const OPEN: &str = "{{";
/// プレースホルダーの終了記号
const CLOSE: &str = "}}";
/// フォールバックチェーンの区切り
const FALLBACK_SEPARATOR: &str = "||";

/// フォールバックチェーンの候補
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate<'a> {
    /// ドット区切りのパス
    Path(&'a str),
    /// 引用符を外したリテラル
    Literal(&'a str),
}

/// `{{expr}}` プレースホルダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// `{{` から `}}` までの元のテキスト
    pub source:     &'a str,
    /// 評価順の候補
    pub candidates: Vec<Candidate<'a>>,
}

/// 字句解析の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Placeholder(Placeholder<'a>),
    IfOpen { source: &'a str, path: &'a str },
    IfClose { source: &'a str },
}

/// 構文木のノード
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Text(&'a str),
    Placeholder(Placeholder<'a>),
    If { path: &'a str, body: Vec<Node<'a>> },
}

/// 解析済みテンプレート
///
/// 元の文字列を借用するため、解析はレンダリングのたびに行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> ParsedTemplate<'a> {
    /// テンプレート文字列を解析する（失敗しない）
    pub fn parse(source: &'a str) -> Self {
        let mut tokens = tokenize(source).into_iter();
        let mut nodes = Vec::new();

        while let Some(token) = tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Placeholder(placeholder) => nodes.push(Node::Placeholder(placeholder)),
                Token::IfClose { source } => nodes.push(Node::Text(source)),
                Token::IfOpen { source, path } => {
                    let (body, closed) = parse_block_body(&mut tokens);
                    if closed {
                        nodes.push(Node::If { path, body });
                    } else {
                        nodes.push(Node::Text(source));
                        nodes.extend(body);
                    }
                }
            }
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node<'a>] {
        &self.nodes
    }
}

/// 条件ブロックの本文を最初の `{{/if}}` まで読み進める
///
/// 戻り値の `bool` は `{{/if}}` で閉じられたかどうか。
fn parse_block_body<'a>(tokens: &mut impl Iterator<Item = Token<'a>>) -> (Vec<Node<'a>>, bool) {
    let mut body = Vec::new();
    for token in tokens {
        match token {
            Token::IfClose { .. } => return (body, true),
            Token::IfOpen { source, .. } | Token::Text(source) => body.push(Node::Text(source)),
            Token::Placeholder(placeholder) => body.push(Node::Placeholder(placeholder)),
        }
    }
    (body, false)
}

/// テンプレート文字列をトークン列に分解する
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = input[cursor..].find(OPEN) {
        let start = cursor + offset;
        let inner_start = start + OPEN.len();
        let Some(inner_len) = input[inner_start..].find(CLOSE) else {
            break;
        };
        let inner = &input[inner_start..inner_start + inner_len];

        // `{{{x}}}` や `{{a}b}}` は、同じ `}}` と組める最も右の `{{` まで読み飛ばす。
        // 組める `{{` がなければ `}}` の手前から探索を再開する
        if let Some(brace) = inner.rfind(['{', '}']) {
            cursor = skip_to_last_open(input, inner_start + brace, inner_start + inner_len);
            continue;
        }

        let end = inner_start + inner_len + CLOSE.len();
        let Some(token) = classify(&input[start..end], inner) else {
            cursor = end;
            continue;
        };

        if start > text_start {
            tokens.push(Token::Text(&input[text_start..start]));
        }
        tokens.push(token);
        text_start = end;
        cursor = end;
    }

    if text_start < input.len() {
        tokens.push(Token::Text(&input[text_start..]));
    }
    tokens
}

/// 中身に波括弧を含まない `{{` の位置を返す
///
/// `brace` は `close` より前にある最後の波括弧。その直前が `{` なら `brace - 1`
/// から始まる `{{` が候補になり、そうでなければ `close` までに候補はない。
fn skip_to_last_open(input: &str, brace: usize, close: usize) -> usize {
    let bytes = input.as_bytes();
    if bytes[brace] == b'{' && bytes[brace - 1] == b'{' {
        brace - 1
    } else {
        close
    }
}

/// `{{` と `}}` の間の内容からトークンを決める
///
/// 解釈できない場合は `None`（呼び出し側でテキストとして扱う）。
fn classify<'a>(source: &'a str, inner: &'a str) -> Option<Token<'a>> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("#if") {
        let path = rest.trim();
        let separated = rest.starts_with(char::is_whitespace);
        if !separated || path.is_empty() || path.contains(char::is_whitespace) {
            return None;
        }
        return Some(Token::IfOpen { source, path });
    }

    if trimmed == "/if" {
        return Some(Token::IfClose { source });
    }

    if trimmed.starts_with(['#', '/']) {
        return None;
    }

    Some(Token::Placeholder(Placeholder {
        source,
        candidates: parse_candidates(trimmed),
    }))
}

/// `||` で区切られた候補を解析する
fn parse_candidates(expr: &str) -> Vec<Candidate<'_>> {
    expr.split(FALLBACK_SEPARATOR)
        .map(str::trim)
        .map(|candidate| match unquote(candidate) {
            Some(literal) => Candidate::Literal(literal),
            None => Candidate::Path(candidate),
        })
        .collect()
}

/// 同じ引用符で囲まれていれば中身を返す
fn unquote(candidate: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        candidate
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}
