use tracing_subscriber::EnvFilter;

const CRATE_NAMES: &[&str] = &["uploadbench", "uploadbench_storage", "uploadbench_test"];

/// Initialize the logger for a test.
///
/// Logs are written through the test writer, so they only show up for failing tests or with
/// `--nocapture`. Unless `RUST_LOG` is set, everything from the benchmark crates is logged at
/// `TRACE` and all other crates only log errors.
///
/// Calling this more than once is fine.
///
/// # Example
///
/// ```
/// uploadbench_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        CRATE_NAMES
            .iter()
            .fold(EnvFilter::new("ERROR"), |filter, name| {
                filter.add_directive(format!("{name}=TRACE").parse().unwrap())
            })
    });

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
