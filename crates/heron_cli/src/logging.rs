use tracing_subscriber::EnvFilter;

/// Filter directives come from `HERON_LOG`; `verbose` forces `debug` for heron crates.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info,heron=debug,heron_core=debug,heron_remote=debug,heron_ssh=debug,heron_jobs=debug,heron_server=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_env("HERON_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
