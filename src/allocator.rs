//! Global memory allocator configuration.
//!
//! `mimalloc` replaces the system allocator. The worker pool allocates and
//! frees chunk-sized buffers across threads constantly, which is the workload
//! mimalloc is built for.

use mimalloc::MiMalloc;

/// The global allocator instance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
