//! The upstream operation surface.

use crate::error::ApiError;
use crate::models::{
    CreateRoom, Deleted, ListParams, MeetingToken, MeetingTokenRequest, Recording, RecordingList,
    Room, RoomList, TokenValidation, UpdateRoom,
};
use async_trait::async_trait;
use std::sync::Arc;

/// One method per upstream operation.
///
/// [`HttpRoomsClient`](crate::HttpRoomsClient) talks to the real API;
/// [`ResilientClient`](crate::ResilientClient) wraps any implementation.
#[async_trait]
pub trait RoomsApi: Send + Sync {
    /// Lists rooms.
    async fn list_rooms(&self, params: &ListParams) -> Result<RoomList, ApiError>;

    /// Fetches one room by name.
    async fn get_room(&self, name: &str) -> Result<Room, ApiError>;

    /// Creates a room.
    async fn create_room(&self, request: &CreateRoom) -> Result<Room, ApiError>;

    /// Changes a room's settings.
    async fn update_room(&self, name: &str, request: &UpdateRoom) -> Result<Room, ApiError>;

    /// Deletes a room.
    async fn delete_room(&self, name: &str) -> Result<Deleted, ApiError>;

    /// Generates a meeting token.
    async fn generate_room_token(
        &self,
        request: &MeetingTokenRequest,
    ) -> Result<MeetingToken, ApiError>;

    /// Checks a meeting token.
    async fn validate_room_token(&self, token: &str) -> Result<TokenValidation, ApiError>;

    /// Lists recordings.
    async fn list_recordings(&self, params: &ListParams) -> Result<RecordingList, ApiError>;

    /// Fetches one recording by id.
    async fn get_recording(&self, id: &str) -> Result<Recording, ApiError>;

    /// Deletes a recording.
    async fn delete_recording(&self, id: &str) -> Result<Deleted, ApiError>;
}

#[async_trait]
impl<T: RoomsApi + ?Sized> RoomsApi for Arc<T> {
    async fn list_rooms(&self, params: &ListParams) -> Result<RoomList, ApiError> {
        (**self).list_rooms(params).await
    }

    async fn get_room(&self, name: &str) -> Result<Room, ApiError> {
        (**self).get_room(name).await
    }

    async fn create_room(&self, request: &CreateRoom) -> Result<Room, ApiError> {
        (**self).create_room(request).await
    }

    async fn update_room(&self, name: &str, request: &UpdateRoom) -> Result<Room, ApiError> {
        (**self).update_room(name, request).await
    }

    async fn delete_room(&self, name: &str) -> Result<Deleted, ApiError> {
        (**self).delete_room(name).await
    }

    async fn generate_room_token(
        &self,
        request: &MeetingTokenRequest,
    ) -> Result<MeetingToken, ApiError> {
        (**self).generate_room_token(request).await
    }

    async fn validate_room_token(&self, token: &str) -> Result<TokenValidation, ApiError> {
        (**self).validate_room_token(token).await
    }

    async fn list_recordings(&self, params: &ListParams) -> Result<RecordingList, ApiError> {
        (**self).list_recordings(params).await
    }

    async fn get_recording(&self, id: &str) -> Result<Recording, ApiError> {
        (**self).get_recording(id).await
    }

    async fn delete_recording(&self, id: &str) -> Result<Deleted, ApiError> {
        (**self).delete_recording(id).await
    }
}
