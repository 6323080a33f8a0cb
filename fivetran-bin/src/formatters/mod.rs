pub(crate) mod color;
pub(crate) mod listing;
pub(crate) mod log;

use self::listing::ListingFormatter;
use crate::options::OutputFormat;

pub(crate) fn get_listing_formatter(format: OutputFormat) -> Box<dyn ListingFormatter> {
    match format {
        OutputFormat::Compact => Box::new(listing::Compact::new()),
        OutputFormat::Json => Box::new(listing::Json::new()),
    }
}
