// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use anyhow::Result;
use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter};

/// Command line flags shared by every binary in the pipeline.
#[derive(Clone, Debug, structopt::StructOpt)]
pub struct TraceLogOpts {
    /// Capture a chrome://tracing format execution trace.
    #[structopt(short = "T", long)]
    pub trace: bool,

    /// Override RUST_LOG, e.g. "landform_tiles=debug".
    #[structopt(long)]
    pub log_filter: Option<String>,
}

/// Keeps the chrome trace file flushing until dropped; hold onto this for
/// the lifetime of `main`.
pub struct ChromeGuard(#[allow(dead_code)] tracing_chrome::FlushGuard);

/// Install the global tracing subscriber: an env-filtered formatter to stderr,
/// plus an optional chrome-trace layer for profiling a build run.
///
/// This is the only logging sink the pipeline core knows about; callers
/// (the CLI front ends) are responsible for invoking it exactly once.
pub fn init(opts: &TraceLogOpts) -> Result<Option<ChromeGuard>> {
    let filter = opts
        .log_filter
        .clone()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let subscriber = Registry::default().with(filter).with(tracing_error::ErrorLayer::default());

    if opts.trace {
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().build();
        let subscriber = subscriber
            .with(tracing_subscriber::fmt::Layer::default())
            .with(chrome_layer);
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(Some(ChromeGuard(guard)));
    }

    let subscriber = subscriber.with(tracing_subscriber::fmt::Layer::default());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(None)
}
