//! UseCase 層
//!
//! HTTP / WebSocket ハンドラから呼ばれるアプリケーションロジック。
//! 各ユースケースは Repository trait と `RoomRegistry` にのみ依存します。

pub mod connect_participant;
pub mod error;
pub mod get_room_detail;
pub mod get_room_history;
pub mod get_rooms;
pub mod log_in;
pub mod sign_up;

pub use connect_participant::ConnectParticipantUseCase;
pub use error::{
    ConnectError, GetRoomDetailError, GetRoomHistoryError, GetRoomsError, LogInError, SignUpError,
};
pub use get_room_detail::GetRoomDetailUseCase;
pub use get_room_history::GetRoomHistoryUseCase;
pub use get_rooms::{GetRoomsUseCase, RoomListing};
pub use log_in::LogInUseCase;
pub use sign_up::SignUpUseCase;
