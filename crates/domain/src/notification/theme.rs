//! # テーマ
//!
//! レンダリング済みの本文 HTML を、テナントのブランド情報入りの
//! 完結した HTML ドキュメントで包む。
//!
//! 5 種類のプリセットは同じ構造（ヘッダー・本文・フッター）を共有し、
//! 配色・書体・余白だけが異なる。
//!
//! - ヘッダー: ロゴ画像（ある場合）とテナント名
//! - 本文: 引数の HTML をそのまま挿入する
//! - フッター: テナント名と、設定されている連絡先
//!
//! レイアウトは `templates/themes/layout.html` を tera で描画する。
//! ブランド情報のテキストは HTML エスケープする。本文はエスケープしない。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use tera::{Context, Tera};

use super::NotificationError;
use crate::tenant::TenantBranding;

/// テーマ ID
///
/// notification_templates テーブルの `theme_id` カラムに格納される値。
/// 未知の値は [`ThemeId::parse_or_default`] で `Classic` に読み替える。
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ThemeId {
    #[default]
    Classic,
    Modern,
    Minimal,
    Vibrant,
    Formal,
}

impl ThemeId {
    /// 保存値からテーマを決める（未知の値は `Classic`）
    pub fn parse_or_default(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    fn preset(self) -> &'static ThemePreset {
        match self {
            Self::Classic => &CLASSIC,
            Self::Modern => &MODERN,
            Self::Minimal => &MINIMAL,
            Self::Vibrant => &VIBRANT,
            Self::Formal => &FORMAL,
        }
    }
}

/// テーマの見た目の定義
///
/// レイアウトテンプレートに `theme` として渡す。
#[derive(Debug, Serialize)]
struct ThemePreset {
    page_background:   &'static str,
    card_background:   &'static str,
    header_background: &'static str,
    header_text:       &'static str,
    text:              &'static str,
    muted_text:        &'static str,
    accent:            &'static str,
    font_family:       &'static str,
    header_align:      &'static str,
    content_padding:   &'static str,
    border_radius:     &'static str,
}

const CLASSIC: ThemePreset = ThemePreset {
    page_background:   "#f4f4f7",
    card_background:   "#ffffff",
    header_background: "#1f3a5f",
    header_text:       "#ffffff",
    text:              "#333333",
    muted_text:        "#6b7280",
    accent:            "#1f3a5f",
    font_family:       "Georgia,'Times New Roman',serif",
    header_align:      "center",
    content_padding:   "32px",
    border_radius:     "6px",
};

const MODERN: ThemePreset = ThemePreset {
    page_background:   "#eef2ff",
    card_background:   "#ffffff",
    header_background: "#4f46e5",
    header_text:       "#ffffff",
    text:              "#1f2937",
    muted_text:        "#6b7280",
    accent:            "#4f46e5",
    font_family:       "'Helvetica Neue',Arial,sans-serif",
    header_align:      "left",
    content_padding:   "28px",
    border_radius:     "16px",
};

const MINIMAL: ThemePreset = ThemePreset {
    page_background:   "#ffffff",
    card_background:   "#ffffff",
    header_background: "#ffffff",
    header_text:       "#111111",
    text:              "#111111",
    muted_text:        "#8a8a8a",
    accent:            "#111111",
    font_family:       "-apple-system,'Segoe UI',Roboto,sans-serif",
    header_align:      "left",
    content_padding:   "16px",
    border_radius:     "0",
};

const VIBRANT: ThemePreset = ThemePreset {
    page_background:   "#fff7ed",
    card_background:   "#ffffff",
    header_background: "#f97316",
    header_text:       "#ffffff",
    text:              "#292524",
    muted_text:        "#78716c",
    accent:            "#db2777",
    font_family:       "'Trebuchet MS',Verdana,sans-serif",
    header_align:      "center",
    content_padding:   "28px",
    border_radius:     "20px",
};

const FORMAL: ThemePreset = ThemePreset {
    page_background:   "#f5f5f0",
    card_background:   "#fffffa",
    header_background: "#2b2b2b",
    header_text:       "#f5f5f0",
    text:              "#222222",
    muted_text:        "#5c5c5c",
    accent:            "#7a1f1f",
    font_family:       "'Palatino Linotype','Book Antiqua',Palatino,serif",
    header_align:      "center",
    content_padding:   "40px",
    border_radius:     "2px",
};

/// tera に登録するレイアウトテンプレート名
const LAYOUT_TEMPLATE: &str = "theme_layout.html";

/// 全プリセット共通のレイアウトを登録した tera エンジン
///
/// `.html` で登録するため自動エスケープが有効になる。
static ENGINE: Lazy<Result<Tera, tera::Error>> = Lazy::new(|| {
    let mut engine = Tera::default();
    engine.add_raw_templates(vec![(
        LAYOUT_TEMPLATE,
        include_str!("../../templates/themes/layout.html"),
    )])?;
    Ok(engine)
});

/// 本文をテーマで包んだ HTML ドキュメントを返す
///
/// ブランド情報は tera の自動エスケープを通し、本文は `safe` でそのまま挿入する。
pub fn wrap(body_html: &str, theme: ThemeId, branding: &TenantBranding) -> Result<String, NotificationError> {
    let engine = ENGINE
        .as_ref()
        .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

    let contacts: Vec<&str> = [&branding.address, &branding.phone, &branding.email]
        .into_iter()
        .filter_map(|value| value.as_deref())
        .filter(|value| !value.is_empty())
        .collect();
    let logo_url = branding.logo_url.as_deref().filter(|url| !url.is_empty());

    let mut context = Context::new();
    context.insert("theme", theme.preset());
    context.insert("tenant_name", &branding.tenant_name);
    context.insert("logo_url", &logo_url);
    context.insert("contacts", &contacts);
    context.insert("body", body_html);

    engine
        .render(LAYOUT_TEMPLATE, &context)
        .map_err(|e| NotificationError::TemplateFailed(e.to_string()))
}
