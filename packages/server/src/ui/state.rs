//! Shared application state.

use std::sync::Arc;

use parlor_shared::time::Clock;

use crate::{
    domain::{MessageRepository, PasswordHasher, UserRepository},
    room::{PumpConfig, RoomRegistry},
    usecase::{
        ConnectParticipantUseCase, GetRoomDetailUseCase, GetRoomHistoryUseCase, GetRoomsUseCase,
        LogInUseCase, SignUpUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// SignUpUseCase（アカウント登録のユースケース）
    pub sign_up_usecase: Arc<SignUpUseCase>,
    /// LogInUseCase（ログインのユースケース）
    pub log_in_usecase: Arc<LogInUseCase>,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム参加者取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// GetRoomHistoryUseCase（ルーム履歴取得のユースケース）
    pub get_room_history_usecase: Arc<GetRoomHistoryUseCase>,
    /// 受信メッセージのタイムスタンプ用
    pub clock: Arc<dyn Clock>,
    /// 各 WebSocket 接続のポンプ設定
    pub pump_config: PumpConfig,
}

impl AppState {
    /// Wire every use case from the storage gateways and the room registry
    pub fn new(
        users: Arc<dyn UserRepository>,
        messages: Arc<dyn MessageRepository>,
        hasher: Arc<dyn PasswordHasher>,
        registry: Arc<RoomRegistry>,
        clock: Arc<dyn Clock>,
        pump_config: PumpConfig,
    ) -> Self {
        Self {
            sign_up_usecase: Arc::new(SignUpUseCase::new(users.clone(), hasher.clone())),
            log_in_usecase: Arc::new(LogInUseCase::new(users.clone(), hasher)),
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                users,
                registry.clone(),
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(messages.clone(), registry.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(registry)),
            get_room_history_usecase: Arc::new(GetRoomHistoryUseCase::new(messages)),
            clock,
            pump_config,
        }
    }
}
