//! Files written at the end of a cycle.
//!
//! - [`json`]: the [`CrawlReport`](crate::models::CrawlReport) for downstream consumers
//! - [`links`]: the visited-link set, read back by the next cycle
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── morning.json
//! links_file              # ["https://…", …]
//! ```

pub mod json;
pub mod links;
