pub mod error;
pub mod tmdb;
pub mod traits;
pub mod trakt;

pub use error::SourceError;
pub use tmdb::TmdbClient;
pub use traits::{HistorySource, PosterSource, TokenProvider};
pub use trakt::{authorize_url, TraktClient};
