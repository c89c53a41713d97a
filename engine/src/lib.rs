use std::path::PathBuf;

use log::info;
use nonempty::NonEmpty;

pub mod config;
pub mod error;
pub mod job;
pub mod materialize;
pub mod output;
pub mod request;
pub mod response;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use job::{JobHandler, PollPolicy};
pub use materialize::Materializer;
pub use output::OutputResolver;
pub use request::{GenerationRequest, MediaKind, Resolution, SourceImage};
pub use transport::{HttpTransport, Transport};

/// Runs one request end to end and returns the paths of the written files
pub async fn generate<T: Transport>(
    transport: &T,
    config: &Config,
    api_key: &str,
    request: &GenerationRequest,
    policy: PollPolicy,
    filename: &str,
) -> Result<Vec<PathBuf>> {
    let done = JobHandler::new(transport, config, api_key)
        .run(request, policy)
        .await?;

    let items = NonEmpty::from_vec(done.items).ok_or_else(|| Error::no_results(&done.raw))?;
    info!("Received {} result item(s)", items.len());

    let resolver = OutputResolver::from_config(config);
    Materializer::new(transport, &resolver, config.submit_timeout())
        .materialize(&items, filename, request.kind().default_extension())
        .await
}
