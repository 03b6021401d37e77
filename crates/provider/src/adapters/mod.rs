pub mod bluesky;
pub mod github;
pub mod linear;
pub mod memory;
pub mod reddit;
pub mod twitter;
pub mod youtube;

pub use bluesky::BlueskyProvider;
pub use github::GithubProvider;
pub use linear::LinearProvider;
pub use memory::MemoryProvider;
pub use reddit::RedditProvider;
pub use twitter::TwitterProvider;
pub use youtube::YoutubeProvider;
