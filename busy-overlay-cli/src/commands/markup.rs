//! Markup command - print the overlay's style block and container.

use busy_overlay::markup::OverlayMarkup;
use clap::Args;

use super::common::{resolve_config, ConfigArgs};
use crate::error::CliError;

/// Arguments for the markup command.
#[derive(Debug, Args)]
pub struct MarkupArgs {
    /// HTML placed inside the content box
    #[arg(long, default_value = "Loading...")]
    pub content: String,

    /// Print only the container, without the style block
    #[arg(long)]
    pub no_style: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Run the markup command.
pub fn run(args: MarkupArgs) -> Result<(), CliError> {
    let (config, _) = resolve_config(&args.config)?;
    let markup = OverlayMarkup::from_config(&config, args.content);

    if args.no_style {
        println!("{}", markup.container());
    } else {
        print!("{}", markup.render());
    }

    Ok(())
}
