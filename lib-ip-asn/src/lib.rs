#![warn(clippy::pedantic)]
// TODO: fix
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::semicolon_if_nothing_returned)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

pub mod network;
pub mod table;

pub use self::network::{get_network_of_ip, summarise_range, EntryNetworks};
pub use self::table::{Annotation, AsEntry, AsEntryParseError, AsnTable, LoadError, LookupError};
