pub mod client;
pub mod provider;

pub use client::{AiClient, AiClientTrait, OpenAiClient};
pub use provider::{build_client, AiProvider};
