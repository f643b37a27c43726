//! `doctor` (spec section 4.7). Read-only diagnostics; never takes the
//! writer lock, only probes whether someone else holds it.

use clap::Args;

use wacli_core::error::WacliError;

use super::GlobalArgs;
use crate::output;

#[derive(Debug, Args)]
pub struct DoctorArgs {
    /// Also attempt a live connection, not just an auth check.
    #[arg(long)]
    connect: bool,
}

pub async fn run(globals: &GlobalArgs, args: DoctorArgs) -> Result<(), WacliError> {
    let proto = super::open_protocol(globals);
    let report = wacli_app::doctor(&globals.config, Some(proto), args.connect).await?;
    output::print_doctor(&report, globals.json);
    Ok(())
}
