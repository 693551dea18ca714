//! Process-level setup for applications embedding volviz.

/// Installs the `env_logger` logger, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls (or a logger installed by the
/// host) are left alone. Returns true if this call installed the logger.
///
/// # Example
///
/// ```no_run
/// volviz::init_logging();
/// let ctx = volviz::VizContext::default();
/// ```
pub fn init_logging() -> bool {
    env_logger::try_init().is_ok()
}
