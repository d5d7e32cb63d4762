//! シャウトアウト管理
//!
//! 配信セッション中、同じ視聴者へのシャウトアウトは1回だけにする。
//! 記録は視聴者を初めて観測したときに作られ、`reset` または `initialize` で全消去される。

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// ログイン名を比較用に正規化
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// シャウトアウト・一括タイムアウトの対象外とする視聴者（Botなど）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExemptChatters {
    logins: HashSet<String>,
}

impl ExemptChatters {
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            logins: logins
                .into_iter()
                .map(|s| normalize(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.logins.contains(&normalize(username))
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

/// 視聴者ごとの記録
#[derive(Debug, Clone, PartialEq)]
pub struct ShoutoutRecord {
    /// 初めて観測した時刻
    pub first_seen: DateTime<Utc>,
    /// シャウトアウト済みならその時刻
    pub shouted_out_at: Option<DateTime<Utc>>,
}

impl ShoutoutRecord {
    fn seen_now() -> Self {
        Self {
            first_seen: Utc::now(),
            shouted_out_at: None,
        }
    }

    pub fn is_shouted_out(&self) -> bool {
        self.shouted_out_at.is_some()
    }
}

/// シャウトアウトトラッカー
#[derive(Debug, Clone)]
pub struct ShoutoutTracker {
    exempt: ExemptChatters,
    records: HashMap<String, ShoutoutRecord>,
    initialized: bool,
}

impl ShoutoutTracker {
    pub fn new(exempt: ExemptChatters) -> Self {
        Self {
            exempt,
            records: HashMap::new(),
            initialized: false,
        }
    }

    /// 使用前の準備。記録を空にして、現在チャットにいる視聴者を「未シャウトアウト」として登録する
    pub fn initialize<I, S>(&mut self, present_chatters: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.records.clear();
        for username in present_chatters {
            self.observe(username.as_ref());
        }
        self.initialized = true;
        tracing::info!(
            "📣 [SHOUTOUT] Tracker initialized with {} present chatters",
            self.records.len()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn exempt(&self) -> &ExemptChatters {
        &self.exempt
    }

    /// 視聴者を観測済みとして記録（既存の記録は変更しない）
    pub fn observe(&mut self, username: &str) {
        let key = normalize(username);
        if key.is_empty() || self.exempt.contains(&key) {
            return;
        }
        self.records.entry(key).or_insert_with(ShoutoutRecord::seen_now);
    }

    /// シャウトアウトすべきか判定する。判定だけで、済みの記録はしない
    pub fn should_shout_out(&mut self, username: &str) -> bool {
        if !self.initialized {
            tracing::warn!("⚠️ [SHOUTOUT] Queried before initialization: {}", username);
            return false;
        }
        if self.exempt.contains(username) {
            return false;
        }

        self.observe(username);
        self.records
            .get(&normalize(username))
            .map(|record| !record.is_shouted_out())
            .unwrap_or(false)
    }

    /// シャウトアウト完了を記録
    pub fn mark_shouted_out(&mut self, username: &str) {
        let key = normalize(username);
        if key.is_empty() || self.exempt.contains(&key) {
            return;
        }
        let record = self
            .records
            .entry(key)
            .or_insert_with(ShoutoutRecord::seen_now);
        record.shouted_out_at = Some(Utc::now());
    }

    /// 全記録を消去（配信者のみのコマンドから呼ばれる）
    pub fn reset(&mut self) {
        let cleared = self.records.len();
        self.records.clear();
        tracing::info!("🗑️ [SHOUTOUT] Cleared {} shoutout records", cleared);
    }

    pub fn record(&self, username: &str) -> Option<&ShoutoutRecord> {
        self.records.get(&normalize(username))
    }

    pub fn shouted_out_count(&self) -> usize {
        self.records.values().filter(|r| r.is_shouted_out()).count()
    }
}
