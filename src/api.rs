pub mod control_surface; // プラットフォーム操作の抽象化
pub mod helix; // Helix REST クライアント
pub mod scripted; // ドライラン・テスト用のインメモリ実装

pub use control_surface::{
    ChannelUpdate, Chatter, ClipId, ControlSurface, MessageId, NewPoll, NewPrediction, Outcome,
    PlatformError, Poll, Prediction,
};
pub use helix::{HelixClient, HelixCredentials};
pub use scripted::{Operation, ScriptedSurface, SurfaceCall};
