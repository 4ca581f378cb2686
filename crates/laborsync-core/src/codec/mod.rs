//! Compact wire codec for snapshot sharing.
//!
//! Instead of raw JSON, contractions are stored as positional arrays with
//! delta timestamps, enum-coded locations, and trailing-default trimming.
//! This typically yields 50-80% smaller payloads before deflate.
//!
//! ## Wire format (v2)
//!
//! ```text
//! {v:2, t0:<epoch ms>,
//!  c:[[id, startDelta, endDelta|null, intensity|null, locEnum, notes, phases|null, flags], ...],
//!  e?:[[id, tsDelta, typeEnum, notes], ...],
//!  p?:true, pa?:<delta ms>, pm?:<ms>, l?:[int,...], sk?:<compact settings>}
//! ```
//!
//! Every timestamp is a signed millisecond delta from the `t0` anchor.
//! Optional keys are omitted entirely when they equal their default. The
//! legacy `s` key (raw, uncompressed settings) is honored on decode only.

mod categories;
mod session;
mod settings;

pub use categories::{detect_categories, extract_shared, filter_by_categories};
pub use session::{decode_session, encode_session, CompactV2, DecodedSession};
pub use settings::{decode_settings, encode_settings, CompactSettings};
