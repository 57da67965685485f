//! Outbound clients for the identity provider and the directory service.

mod graph_client;
mod token_provider;

pub use graph_client::{DirectoryClient, GraphClient};
pub use token_provider::{AccessToken, CachingTokenProvider, ClientCredentialsProvider, TokenProvider};

#[cfg(any(test, feature = "test-utils"))]
pub use graph_client::MockDirectoryClient;
#[cfg(any(test, feature = "test-utils"))]
pub use token_provider::MockTokenProvider;
