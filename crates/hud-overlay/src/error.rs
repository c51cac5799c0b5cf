use mc_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HudError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("player entity id {0} is not positive; its overlay id would collide")]
    InvalidPlayerId(i32),
    #[error("unknown command: /{0}")]
    UnknownCommand(String),
    #[error("invalid namespaced key: {0:?}")]
    InvalidKey(String),
    #[error("inventory slot out of range: {0}")]
    InvalidSlot(usize),
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HudError>;
