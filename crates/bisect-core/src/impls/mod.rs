//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **ScriptedQuest**: 決められた手順どおりに状態が進む Quest
//!
//! 本番用の Quest (isolate の検索、テスト実行など) は外部サービスに依存する
//! ため、このクレートには含めません。

pub mod scripted;

pub use self::scripted::{QuestLog, ScriptedExecution, ScriptedQuest, Step, arguments};
