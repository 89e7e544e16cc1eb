use crate::{EntityId, WindowId};

/// Errors surfaced by the runtime core.
///
/// Entity lookups fail with [`FlashError::EntityNotFound`] both when the entity has been
/// released and when it is currently leased by an enclosing `update`. No operation is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum FlashError {
    #[error("entity {id:?} of type {type_name} is released or currently being updated")]
    EntityNotFound {
        id: EntityId,
        type_name: &'static str,
    },
    #[error("{0} was used before it was initialized")]
    NotInitialized(&'static str),
    #[error("no {0} is available")]
    MissingCollaborator(&'static str),
    #[error("window {0:?} is closed")]
    WindowClosed(WindowId),
    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}

/// Failures reported by a [`crate::Renderer`] while submitting a scene.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer has not been initialized")]
    NotInitialized,
    #[error("graphics device was lost")]
    DeviceLost,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RenderError> for FlashError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::NotInitialized => FlashError::NotInitialized("renderer"),
            RenderError::DeviceLost => FlashError::MissingCollaborator("graphics device"),
            RenderError::Other(error) => FlashError::Platform(error),
        }
    }
}

pub type Result<T, E = FlashError> = std::result::Result<T, E>;
