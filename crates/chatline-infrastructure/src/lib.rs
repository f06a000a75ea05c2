pub mod config_service;
pub mod graphql;
pub mod paths;
pub mod state_repository;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::graphql::GraphqlChatApi;
pub use crate::paths::ChatlinePaths;
pub use crate::state_repository::TomlStateRepository;
