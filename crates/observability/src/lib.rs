//! Tracing and logging setup shared by the MediBook binaries and tests.

/// Initialize process-wide tracing (JSON lines, `RUST_LOG` filter).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Human-readable output captured by the test harness.
///
/// Call at the top of integration tests; safe to call from every test.
pub fn init_test() {
    tracing::init_test();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
