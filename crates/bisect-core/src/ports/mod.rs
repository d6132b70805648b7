//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。外部システム（ビルド、テスト実行、
//! 時刻、ID 生成）へのインターフェースを trait で定義します。

pub mod clock;
pub mod id_generator;
pub mod quest;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::quest::{Execution, Quest};
