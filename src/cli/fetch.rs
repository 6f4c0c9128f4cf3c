//! Fetch command implementation

use hawkcache::{Call, PartialPolicy};

use crate::cli::FetchArgs;
use crate::cli::args::GlobalOptions;
use crate::cli::CommandContext;
use crate::output::{CallRow, Formattable};

/// Run the fetch command: GET the URL `--repeat` times through the cache
pub async fn run(opts: &GlobalOptions, args: &FetchArgs) -> anyhow::Result<()> {
    let ctx = CommandContext::new(opts)?;
    let options = call_options(args);

    let mut rows = Vec::with_capacity(args.repeat);
    for index in 1..=args.repeat {
        let mut call = Call::get(&args.url);
        for (key, value) in &args.params {
            call = call.param(key, value);
        }
        if let Some(options) = &options {
            call = call.cache_options(options.clone());
        }

        let response = ctx.pipeline.request(call).await?;
        rows.push(CallRow::from_response(index, &response));
    }

    log::debug!(
        "{} of {} calls served from cache (session {:?})",
        rows.iter().filter(|r| r.source == "cache").count(),
        rows.len(),
        ctx.config.session_id
    );

    rows.print(ctx.format)
}

/// Per-call cache options from the command line, if any were given
fn call_options(args: &FetchArgs) -> Option<PartialPolicy> {
    if args.ttl.is_none() && args.use_cache.is_none() {
        return None;
    }
    let mut options = PartialPolicy::new();
    options.time_to_live = args.ttl;
    options.use_cache = args.use_cache;
    Some(options)
}
