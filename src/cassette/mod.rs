//! Cassettes: recorded generation calls that can be replayed offline.
//!
//! A cassette is a YAML file listing port interactions in call order. The
//! recording adapter writes one while a live run proceeds; the replaying
//! adapter serves the answers back so a run can be reproduced without a
//! network or credentials.

pub mod format;
pub mod recorder;
pub mod replayer;

pub use format::{Cassette, Interaction};
pub use recorder::CassetteRecorder;
pub use replayer::CassetteReplayer;
