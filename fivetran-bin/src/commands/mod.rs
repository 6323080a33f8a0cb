pub(crate) mod connectors;
pub(crate) mod groups;
pub(crate) mod schemas;

pub(crate) use connectors::connectors;
pub(crate) use groups::groups;
pub(crate) use schemas::schemas;

use fivetran_lib::Client;
use tokio_util::sync::CancellationToken;

use crate::formatters::listing::ListingFormatter;

/// Parameters passed to every command
pub(crate) struct CommandParams {
    pub(crate) client: Client,
    pub(crate) formatter: Box<dyn ListingFormatter>,
    /// Fired on Ctrl-C
    pub(crate) cancel: CancellationToken,
}
