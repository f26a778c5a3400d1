//! Static inputs: the GeoIP CSV tables and local list files.

mod lists;
mod maxmind;

pub use lists::{load_list_dir, load_list_file, parse_plain_list, DirScan, ListFile};
pub use maxmind::{load_blocks, load_country_codes, BaseGroups, CountryCodes};
