//! # 通知コンテキスト
//!
//! テンプレート解決に渡す実行時データ。送信ごとに新しく組み立てられ、
//! 永続化されず、解決処理によって変更されることもない。
//!
//! ## 構造（慣例）
//!
//! | キー | 内容 |
//! |------|------|
//! | `school` | テナントのブランド情報（`name`, `logo_url`, `address`, `phone`, `email`） |
//! | `student` / `staff` など | 主題となるエンティティ |
//! | `parent` / `leave` など | 付随するエンティティ |
//! | その他 | 任意のスカラー値 |
//!
//! ## キーの正規化
//!
//! 取り込み時にすべてのオブジェクトキーを snake_case に一度だけ畳み込む。
//! 解決時はパスの各セグメントも同じ規則で正規化してから検索するため、
//! 呼び出し側は camelCase / snake_case のどちらで書いてもよい。
//!
//! 同じオブジェクトに `firstName` と `first_name` が両方ある場合は、元から
//! snake_case だったキーの値だけが残る。パスを `firstName` と書いても
//! `first_name` の値に解決される（完全一致のキーを優先する従来の挙動から
//! 意図的に変更している）。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::path::{PATH_SEPARATOR, resolve_path, to_snake_case};
use crate::tenant::{TenantBranding, TenantProfile};

/// ブランド情報を格納するトップレベルキー
pub const SCHOOL_KEY: &str = "school";

/// テーマが参照する `school.*` のフィールド
pub const BRANDING_FIELDS: [&str; 5] = ["name", "logo_url", "address", "phone", "email"];

/// 通知コンテキスト
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContext {
    root: Value,
}

impl NotificationContext {
    /// 空のコンテキストを作成する
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// JSON 値からコンテキストを作成する（キーを正規化する）
    ///
    /// オブジェクト以外のルート値は空のコンテキストとして扱う。
    pub fn from_value(value: Value) -> Self {
        match normalize_keys(value) {
            root @ Value::Object(_) => Self { root },
            _ => Self::new(),
        }
    }

    /// トップレベルにエントリを追加したコンテキストを返す
    pub fn with(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.root {
            map.insert(to_snake_case(key), normalize_keys(value));
        }
        self
    }

    /// ドット区切りのパスを解決する
    ///
    /// パスの各セグメントを snake_case に正規化してから検索する。
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let normalized = path
            .split(PATH_SEPARATOR)
            .map(to_snake_case)
            .collect::<Vec<_>>()
            .join(".");
        resolve_path(&self.root, &normalized)
    }

    /// パスを文字列として解決する
    ///
    /// 文字列以外、空文字列、未定義はすべて `None`。
    pub fn resolve_str(&self, path: &str) -> Option<&str> {
        self.resolve(path)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// 内部の JSON 値を参照する
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// テーマが参照するブランド情報がすべて設定されているか
    pub fn has_complete_branding(&self) -> bool {
        BRANDING_FIELDS
            .iter()
            .all(|key| self.resolve_str(&format!("{SCHOOL_KEY}.{key}")).is_some())
    }

    /// テナントプロファイルで `school.*` の欠損フィールドを補完したコンテキストを返す
    ///
    /// 既に値がある（`null` / 空文字列でない）フィールドは上書きしない。
    /// `self` は変更せず、補完済みの複製を返す。
    pub fn with_missing_school_fields(&self, profile: &TenantProfile) -> Self {
        let mut root = self.root.clone();
        let Value::Object(map) = &mut root else {
            return self.clone();
        };

        let school = map
            .entry(SCHOOL_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !school.is_object() {
            *school = Value::Object(Map::new());
        }
        let Value::Object(school) = school else {
            return self.clone();
        };

        let fields = [
            ("name", Some(profile.display_name().as_str())),
            ("address", profile.address()),
            ("email", profile.contact_email()),
            ("phone", profile.contact_phone()),
            ("logo_url", profile.logo_url()),
        ];
        for (key, value) in fields {
            let Some(value) = value else {
                continue;
            };
            let missing = match school.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                school.insert(key.to_string(), Value::String(value.to_string()));
            }
        }

        Self { root }
    }

    /// `school.*` からテーマ描画用のブランド情報を組み立てる
    pub fn branding(&self) -> TenantBranding {
        let field = |key: &str| {
            self.resolve_str(&format!("{SCHOOL_KEY}.{key}"))
                .map(str::to_string)
        };

        TenantBranding {
            logo_url:    field("logo_url"),
            tenant_name: field("name").unwrap_or_default(),
            address:     field("address"),
            phone:       field("phone"),
            email:       field("email"),
        }
    }
}

impl Default for NotificationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&TenantProfile> for NotificationContext {
    fn from(profile: &TenantProfile) -> Self {
        Self::new().with_missing_school_fields(profile)
    }
}

impl Serialize for NotificationContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NotificationContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// オブジェクトキーを再帰的に snake_case に畳み込む
fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut normalized = Map::with_capacity(map.len());
            let mut derived = Vec::new();
            for (key, value) in map {
                let canonical = to_snake_case(&key);
                if canonical == key {
                    normalized.insert(key, normalize_keys(value));
                } else {
                    derived.push((canonical, value));
                }
            }
            for (key, value) in derived {
                if !normalized.contains_key(&key) {
                    normalized.insert(key, normalize_keys(value));
                }
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}
